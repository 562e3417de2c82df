//! Registered step definitions and argument transformations.
//!
//! The registry is assembled once through [`RegistryBuilder`] and never
//! changes afterwards, so it can be shared between threads behind an `Arc`
//! without locking.

use crate::binding::{StepArgumentTransformation, StepCategory, StepDefinition};
use crate::value::ParamType;
use indexmap::IndexMap;
use std::sync::Arc;

/// A definition whose pattern matched, together with its captures.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The matching definition.
    pub definition: Arc<StepDefinition>,
    /// Capture groups in order.
    pub captures: Vec<String>,
}

/// Collects bindings before freezing them into a [`BindingRegistry`].
///
/// # Examples
///
/// ```
/// use stepbind::binding::{BindingMethod, MethodIdentity, StepCategory, StepDefinition};
/// use stepbind::registry::RegistryBuilder;
/// use stepbind::value::Value;
///
/// let mut builder = RegistryBuilder::new();
/// builder.register_step(
///     StepDefinition::new(
///         StepCategory::When,
///         "I press add",
///         [],
///         BindingMethod::new(MethodIdentity::new("Calculator", "add"), |_, _| Ok(Value::Unit)),
///     )
///     .expect("valid pattern"),
/// );
/// let registry = builder.build();
/// assert_eq!(registry.candidates_for(StepCategory::When, "I press add").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    steps: Vec<StepDefinition>,
    transformations: Vec<StepArgumentTransformation>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step definition. Registration order is preserved.
    pub fn register_step(&mut self, definition: StepDefinition) -> &mut Self {
        self.steps.push(definition);
        self
    }

    /// Add a step argument transformation. Registration order decides ties.
    pub fn register_transformation(
        &mut self,
        transformation: StepArgumentTransformation,
    ) -> &mut Self {
        self.transformations.push(transformation);
        self
    }

    /// Freeze the registered bindings.
    #[must_use]
    pub fn build(self) -> BindingRegistry {
        let mut by_output: IndexMap<ParamType, Vec<usize>> = IndexMap::new();
        for (index, transformation) in self.transformations.iter().enumerate() {
            by_output
                .entry(transformation.output())
                .or_default()
                .push(index);
        }
        BindingRegistry {
            steps: self.steps.into_iter().map(Arc::new).collect(),
            transformations: self.transformations.into_iter().map(Arc::new).collect(),
            by_output,
        }
    }
}

/// Immutable lookup over registered bindings.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    steps: Vec<Arc<StepDefinition>>,
    transformations: Vec<Arc<StepArgumentTransformation>>,
    by_output: IndexMap<ParamType, Vec<usize>>,
}

impl BindingRegistry {
    /// Start a new registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Definitions accepting `category` whose pattern matches all of `text`,
    /// in registration order. Shape is not considered here.
    #[must_use]
    pub fn candidates_for(&self, category: StepCategory, text: &str) -> Vec<Candidate> {
        self.steps
            .iter()
            .filter(|definition| definition.category().accepts(category))
            .filter_map(|definition| {
                definition.pattern().captures(text).map(|captures| Candidate {
                    definition: Arc::clone(definition),
                    captures,
                })
            })
            .collect()
    }

    /// Transformations producing `output`, in registration order.
    pub fn transformations_for(
        &self,
        output: ParamType,
    ) -> impl Iterator<Item = (usize, &StepArgumentTransformation)> + '_ {
        self.by_output
            .get(&output)
            .into_iter()
            .flatten()
            .filter_map(|&index| {
                self.transformations
                    .get(index)
                    .map(|transformation| (index, transformation.as_ref()))
            })
    }

    /// Number of captures a plain parameter of type `ty` consumes.
    ///
    /// Built-in types take one capture. A custom type takes as many captures
    /// as the first type-only transformation producing it declares inputs,
    /// unless a single-input or pattern-gated transformation for it exists,
    /// in which case it takes one.
    #[must_use]
    pub fn capture_arity(&self, ty: ParamType) -> usize {
        if !matches!(ty, ParamType::Custom(_)) {
            return 1;
        }
        let mut compound = None;
        for (_, transformation) in self.transformations_for(ty) {
            let Some(arity) = transformation.plain_arity() else {
                continue;
            };
            if transformation.pattern().is_some() || arity <= 1 {
                return 1;
            }
            compound.get_or_insert(arity);
        }
        compound.unwrap_or(1)
    }

    /// All step definitions in registration order.
    #[must_use]
    pub fn steps(&self) -> &[Arc<StepDefinition>] {
        &self.steps
    }

    /// Number of registered transformations.
    #[must_use]
    pub fn transformation_count(&self) -> usize {
        self.transformations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingMethod, MethodIdentity, Parameter};
    use crate::value::{TypeKey, Value};
    use rstest::{fixture, rstest};

    struct Pair;
    struct Single;

    fn method(name: &str) -> BindingMethod {
        BindingMethod::new(MethodIdentity::new("Bindings", name), |_, _| Ok(Value::Unit))
    }

    fn step(category: StepCategory, pattern: &str, name: &str) -> StepDefinition {
        StepDefinition::new(category, pattern, [Parameter::plain(ParamType::Text)], method(name))
            .expect("valid pattern")
    }

    fn pair_type() -> ParamType {
        ParamType::Custom(TypeKey::of::<Pair>())
    }

    fn single_type() -> ParamType {
        ParamType::Custom(TypeKey::of::<Single>())
    }

    #[fixture]
    fn registry() -> BindingRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .register_step(step(StepCategory::Given, "a (.*)", "given_a"))
            .register_step(step(StepCategory::When, "a (.*)", "when_a"))
            .register_step(step(StepCategory::Any, "a (thing)", "any_thing"))
            .register_transformation(StepArgumentTransformation::new(
                pair_type(),
                [ParamType::Table],
                method("pair_from_table"),
            ))
            .register_transformation(StepArgumentTransformation::new(
                pair_type(),
                [ParamType::Text, ParamType::Text],
                method("pair_from_two"),
            ))
            .register_transformation(StepArgumentTransformation::new(
                single_type(),
                [ParamType::Text, ParamType::I32],
                method("single_from_two"),
            ))
            .register_transformation(StepArgumentTransformation::new(
                single_type(),
                [ParamType::Text],
                method("single_from_text"),
            ));
        builder.build()
    }

    #[rstest]
    fn candidates_respect_category(registry: BindingRegistry) {
        let names: Vec<String> = registry
            .candidates_for(StepCategory::Given, "a thing")
            .iter()
            .map(|c| c.definition.identity().method().to_owned())
            .collect();
        assert_eq!(names, ["given_a", "any_thing"]);
    }

    #[rstest]
    fn candidates_require_full_match(registry: BindingRegistry) {
        assert!(registry.candidates_for(StepCategory::Then, "not a thing").is_empty());
    }

    #[rstest]
    fn transformations_keep_registration_order(registry: BindingRegistry) {
        let names: Vec<&str> = registry
            .transformations_for(pair_type())
            .map(|(_, t)| t.identity().method())
            .collect();
        assert_eq!(names, ["pair_from_table", "pair_from_two"]);
        assert_eq!(registry.transformations_for(ParamType::F64).count(), 0);
    }

    #[rstest]
    #[case(ParamType::I32, 1)]
    #[case(pair_type(), 2)]
    #[case(single_type(), 1)]
    #[case(ParamType::Custom(TypeKey::of::<String>()), 1)]
    fn capture_arity_follows_transformations(
        registry: BindingRegistry,
        #[case] ty: ParamType,
        #[case] expected: usize,
    ) {
        assert_eq!(registry.capture_arity(ty), expected);
    }
}
