//! Steps that load binding configuration from a stubbed environment.

use crate::bdd::fixtures::TestWorld;
use anyhow::{Context, Result, ensure};
use rstest_bdd_macros::{given, then, when};
use stepbind::BindingConfig;
use test_support::{StubEnv, StubSystemLocale};

#[given("the culture environment variable is {value:string}")]
fn set_culture_env(world: &TestWorld, value: &str) {
    world.culture_env.set(value.to_owned());
}

#[given("the environment variable {key:string} is {value:string}")]
fn set_env_var(world: &TestWorld, key: &str, value: &str) {
    world
        .env_vars
        .borrow_mut()
        .push((key.to_owned(), value.to_owned()));
}

#[given("the system locale is {locale:string}")]
fn set_system_locale(world: &TestWorld, locale: &str) {
    world.system_locale.set(locale.to_owned());
}

#[when("the binding configuration is loaded")]
fn load_configuration(world: &TestWorld) {
    let seed = world
        .culture_env
        .get()
        .map_or_else(StubEnv::default, StubEnv::with_culture);
    let env = world
        .env_vars
        .borrow()
        .iter()
        .fold(seed, |env, (key, value)| env.with_var(key, value));
    let system = world
        .system_locale
        .get()
        .map_or_else(StubSystemLocale::default, StubSystemLocale::with_locale);
    match BindingConfig::from_env(&env, &system) {
        Ok(config) => {
            let tag = config.culture().tag().unwrap_or("invariant").to_owned();
            world.resolved_culture.set(tag);
        }
        Err(err) => world.config_error.set(format!("{err:#}")),
    }
}

#[then("the resolved culture is {tag:string}")]
fn resolved_culture_is(world: &TestWorld, tag: &str) -> Result<()> {
    let resolved = world
        .resolved_culture
        .get()
        .context("configuration should have loaded")?;
    ensure!(resolved == tag, "expected culture '{tag}', got '{resolved}'");
    Ok(())
}

#[then("loading the configuration fails mentioning {fragment:string}")]
fn loading_fails_mentioning(world: &TestWorld, fragment: &str) -> Result<()> {
    let error = world
        .config_error
        .get()
        .context("configuration loading should have failed")?;
    ensure!(error.contains(fragment), "expected '{fragment}' in '{error}'");
    Ok(())
}
