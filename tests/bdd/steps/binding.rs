//! Steps that register bindings, execute step text and inspect outcomes.

use crate::bdd::fixtures::{RefCellOptionExt, TestWorld};
use anyhow::{Context, Result, ensure};
use rstest_bdd_macros::{given, then, when};
use std::sync::Arc;
use stepbind::{
    BindingConfig, BindingFailure, BindingMethod, MethodIdentity, Outcome, Parameter, ParamType,
    RegistryBuilder, StepCategory, StepDefinition, StepEngine, StepRequest, Table, Value,
};
use test_support::bindings::{User, users_from_table};

#[derive(Default)]
struct Calculator {
    entered: Vec<i32>,
    price: Option<f64>,
}

#[derive(Default)]
struct KnownUsers(Vec<User>);

fn entry_step(method: &str) -> Result<StepDefinition> {
    Ok(StepDefinition::new(
        StepCategory::Given,
        r"I have entered (\d+) into the calculator",
        [Parameter::plain(ParamType::I32)],
        BindingMethod::new(MethodIdentity::new("Calculator", method), |ctx, args| {
            ctx.instance::<Calculator>()?.entered.push(args.get(0)?);
            Ok(Value::Unit)
        }),
    )?)
}

fn calculator_steps() -> Result<Vec<StepDefinition>> {
    let check = StepDefinition::new(
        StepCategory::Then,
        r"the result should be (\d+)",
        [Parameter::plain(ParamType::I32)],
        BindingMethod::new(MethodIdentity::new("Calculator", "check"), |ctx, args| {
            let total: i32 = ctx.instance::<Calculator>()?.entered.iter().sum();
            let expected: i32 = args.get(0)?;
            ensure!(total == expected, "expected {expected} but the total is {total}");
            Ok(Value::I32(total))
        }),
    )?;
    let price = StepDefinition::new(
        StepCategory::Given,
        "the price is (.*)",
        [Parameter::plain(ParamType::F64)],
        BindingMethod::new(MethodIdentity::new("Calculator", "price"), |ctx, args| {
            ctx.instance::<Calculator>()?.price = Some(args.get(0)?);
            Ok(Value::Unit)
        }),
    )?;
    Ok(vec![entry_step("enter")?, check, price])
}

fn ensure_engine(world: &TestWorld) -> Result<()> {
    if world.engine.is_some() {
        return Ok(());
    }
    let builder = world
        .builder
        .borrow_mut()
        .take()
        .unwrap_or_else(RegistryBuilder::new);
    let config = match world.culture_tag.get() {
        Some(tag) => BindingConfig::new().with_culture_tag(&tag)?,
        None => BindingConfig::new(),
    };
    world
        .engine
        .set_value(StepEngine::new(Arc::new(builder.build()), config));
    Ok(())
}

fn execute(world: &TestWorld, request: &StepRequest) -> Result<()> {
    ensure_engine(world)?;
    let outcome = world
        .engine
        .with_ref(|engine| engine.execute(&mut world.context.borrow_mut(), request))
        .context("engine should be built")?;
    world.outcome.set_value(outcome);
    Ok(())
}

fn with_outcome<R>(world: &TestWorld, f: impl FnOnce(&Outcome) -> R) -> Result<R> {
    world
        .outcome
        .with_ref(f)
        .context("expected a step to have been executed")
}

#[given("the calculator bindings are registered")]
fn register_calculator(world: &TestWorld) -> Result<()> {
    let steps = calculator_steps()?;
    world.register(|builder| {
        for step in steps {
            builder.register_step(step);
        }
    });
    Ok(())
}

#[given("the entry binding is registered twice")]
fn register_entry_twice(world: &TestWorld) -> Result<()> {
    let duplicate = entry_step("enter_again")?;
    world.register(|builder| {
        builder.register_step(duplicate);
    });
    Ok(())
}

#[given("the user bindings are registered")]
fn register_users(world: &TestWorld) -> Result<()> {
    let recorder = world.recorder();
    let with_table = StepDefinition::new(
        StepCategory::Given,
        "the following users exist",
        [Parameter::table_of(ParamType::of::<Vec<User>>())],
        BindingMethod::new(MethodIdentity::new("UserSteps", "with_table"), |ctx, args| {
            let users = args.object::<Vec<User>>(0)?;
            ctx.instance::<KnownUsers>()?.0.extend(users.iter().cloned());
            Ok(Value::Unit)
        }),
    )?;
    let without_table = StepDefinition::new(
        StepCategory::Given,
        "the following users exist",
        [],
        recorder.method("UserSteps", "without_table"),
    )?;
    world.register(|builder| {
        builder
            .register_step(with_table)
            .register_step(without_table)
            .register_transformation(users_from_table(&recorder));
    });
    Ok(())
}

#[given("the binding culture is {tag:string}")]
fn set_binding_culture(world: &TestWorld, tag: &str) {
    world.culture_tag.set(tag.to_owned());
}

#[when("the given step {text:string} is executed")]
fn execute_given(world: &TestWorld, text: &str) -> Result<()> {
    execute(world, &StepRequest::given(text))
}

#[when("the when step {text:string} is executed")]
fn execute_when(world: &TestWorld, text: &str) -> Result<()> {
    execute(world, &StepRequest::when(text))
}

#[when("the then step {text:string} is executed")]
fn execute_then(world: &TestWorld, text: &str) -> Result<()> {
    execute(world, &StepRequest::then(text))
}

#[when("{count:usize} users are supplied to the given step {text:string}")]
fn execute_with_users(world: &TestWorld, count: usize, text: &str) -> Result<()> {
    let mut table = Table::new(["Name"])?;
    for index in 1..=count {
        table.add_row([format!("User {index}")])?;
    }
    execute(world, &StepRequest::given(text).with_table(table))
}

#[then("the step succeeds")]
fn step_succeeds(world: &TestWorld) -> Result<()> {
    let succeeded = with_outcome(world, Outcome::is_success)?;
    let description = with_outcome(world, |outcome| format!("{outcome:?}"))?;
    ensure!(succeeded, "expected success, got {description}");
    Ok(())
}

#[then("the step ends in stage {stage:string}")]
fn step_ends_in_stage(world: &TestWorld, stage: &str) -> Result<()> {
    let actual = with_outcome(world, |outcome| outcome.stage().to_string())?;
    ensure!(actual == stage, "expected stage '{stage}', got '{actual}'");
    Ok(())
}

#[then("the suggested pattern is {pattern:string}")]
fn suggested_pattern_is(world: &TestWorld, pattern: &str) -> Result<()> {
    let suggested = with_outcome(world, |outcome| match outcome {
        Outcome::BindingFailure(BindingFailure::Undefined { suggestion, .. }) => {
            Some(suggestion.pattern().to_owned())
        }
        _ => None,
    })?
    .context("expected an undefined step")?;
    ensure!(suggested == pattern, "expected pattern '{pattern}', got '{suggested}'");
    Ok(())
}

#[then("the bound method is {method:string}")]
fn bound_method_is(world: &TestWorld, method: &str) -> Result<()> {
    let bound = with_outcome(world, |outcome| {
        outcome.binding().map(|binding| binding.method().to_owned())
    })?
    .context("expected a bound method")?;
    ensure!(bound == method, "expected method '{method}', got '{bound}'");
    Ok(())
}

#[then("the calculator total is {total:usize}")]
fn calculator_total_is(world: &TestWorld, total: usize) -> Result<()> {
    let context = world.context.borrow();
    let sum: i32 = context
        .get::<Calculator>()
        .context("calculator should exist")?
        .entered
        .iter()
        .sum();
    ensure!(usize::try_from(sum)? == total, "expected total {total}, got {sum}");
    Ok(())
}

#[then("the recorded price is {price:string}")]
fn recorded_price_is(world: &TestWorld, price: &str) -> Result<()> {
    let context = world.context.borrow();
    let recorded = context
        .get::<Calculator>()
        .and_then(|calculator| calculator.price)
        .context("a price should be recorded")?;
    ensure!(recorded.to_string() == price, "expected price {price}, got {recorded}");
    Ok(())
}

#[then("the scenario knows {count:usize} users")]
fn scenario_knows_users(world: &TestWorld, count: usize) -> Result<()> {
    let context = world.context.borrow();
    let known = context.get::<KnownUsers>().map_or(0, |users| users.0.len());
    ensure!(known == count, "expected {count} users, got {known}");
    Ok(())
}

#[then("the users transformation ran once")]
fn users_transformation_ran_once(world: &TestWorld) -> Result<()> {
    let runs = world.recorder().calls_to("create_users");
    ensure!(runs == 1, "transformation ran {runs} times");
    Ok(())
}
