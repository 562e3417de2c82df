//! Conversion of raw step inputs into declared parameter types.
//!
//! A raw value reaches its target type by one of these routes, tried in
//! order and never combined:
//!
//! 1. it already has the target type;
//! 2. it is text, the target is primitive and the text parses under the
//!    invariant or configured culture; a failed parse is final;
//! 3. a registered transformation producing the target type accepts it.
//!
//! Transformation inputs are converted through the same routes, which lets
//! transformations chain. A transformation already being evaluated is never
//! re-entered, so cyclic registrations end in a conversion error instead of
//! unbounded recursion.

mod primitive;

use crate::binding::{ScenarioContext, StepArgumentTransformation};
use crate::culture::Culture;
use crate::invoke::Invoker;
use crate::outcome::ExecutionFailure;
use crate::reconcile::RawArgument;
use crate::registry::BindingRegistry;
use crate::tracer::StepTracer;
use crate::value::{Arguments, ParamType, Value};
use thiserror::Error;
use tracing::trace;

/// Reasons a single conversion failed.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// No route produced the target type.
    #[error("cannot convert '{value}' to {target}: {reason}")]
    Unconvertible {
        /// Raw value, rendered for display.
        value: String,
        /// Required type.
        target: ParamType,
        /// Why every route failed.
        reason: String,
    },
    /// A transformation was invoked and failed.
    #[error(transparent)]
    Execution(#[from] ExecutionFailure),
}

fn unconvertible(value: String, target: ParamType, reason: impl Into<String>) -> ConvertError {
    ConvertError::Unconvertible {
        value,
        target,
        reason: reason.into(),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Table(table) => format!("<table with {} rows>", table.row_count()),
        other => format!("{other:?}"),
    }
}

/// Converts raw arguments for one step request.
///
/// The converter borrows the registry and culture for the duration of a
/// request and tracks which transformations are currently being evaluated.
pub struct Converter<'a> {
    registry: &'a BindingRegistry,
    culture: &'a Culture,
    invoker: &'a Invoker,
    tracer: Option<&'a dyn StepTracer>,
    active: Vec<usize>,
}

impl std::fmt::Debug for Converter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("culture", self.culture)
            .field("traced", &self.tracer.is_some())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl<'a> Converter<'a> {
    /// Create a converter over `registry` parsing with `culture`.
    #[must_use]
    pub const fn new(registry: &'a BindingRegistry, culture: &'a Culture, invoker: &'a Invoker) -> Self {
        Self {
            registry,
            culture,
            invoker,
            tracer: None,
            active: Vec::new(),
        }
    }

    /// Report every transformation invocation to `tracer`.
    #[must_use]
    pub const fn with_tracer(mut self, tracer: &'a dyn StepTracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Convert one reconciled raw argument into `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Unconvertible`] when no route applies and
    /// [`ConvertError::Execution`] when a transformation fails.
    pub fn convert_raw(
        &mut self,
        ctx: &mut ScenarioContext,
        raw: RawArgument,
        target: ParamType,
    ) -> Result<Value, ConvertError> {
        match raw {
            RawArgument::Text(text) => self.convert_value(ctx, Value::Text(text), target),
            RawArgument::Table(table) => self.convert_value(ctx, Value::Table(table), target),
            RawArgument::Compound(parts) => self.convert_compound(ctx, parts, target),
        }
    }

    /// Convert an already materialised value into `target`.
    ///
    /// # Errors
    ///
    /// See [`Converter::convert_raw`].
    pub fn convert_value(
        &mut self,
        ctx: &mut ScenarioContext,
        value: Value,
        target: ParamType,
    ) -> Result<Value, ConvertError> {
        if value.param_type() == target {
            return Ok(value);
        }
        if let Value::Text(text) = &value
            && target.is_primitive()
        {
            return primitive::parse_primitive(text, target, self.culture).ok_or_else(|| {
                let reason = self.culture.tag().map_or_else(
                    || "not in invariant format".to_owned(),
                    |tag| format!("not in invariant or {tag} format"),
                );
                unconvertible(text.clone(), target, reason)
            });
        }
        if let Some((index, transformation, inputs)) = self.select_transformation(&value, target) {
            return self.apply(ctx, index, transformation, inputs, target);
        }
        Err(unconvertible(
            describe(&value),
            target,
            format!("no transformation from {} is registered", value.param_type()),
        ))
    }

    fn convert_compound(
        &mut self,
        ctx: &mut ScenarioContext,
        parts: Vec<String>,
        target: ParamType,
    ) -> Result<Value, ConvertError> {
        let registry: &'a BindingRegistry = self.registry;
        let selected = registry
            .transformations_for(target)
            .find(|(index, transformation)| {
                transformation.pattern().is_none()
                    && transformation.plain_arity() == Some(parts.len())
                    && !self.active.contains(index)
            });
        let Some((index, transformation)) = selected else {
            return Err(unconvertible(
                format!("({})", parts.join(", ")),
                target,
                format!("no transformation takes {} inputs", parts.len()),
            ));
        };
        let inputs = parts.into_iter().map(Value::Text).collect();
        self.apply(ctx, index, transformation, inputs, target)
    }

    /// Pick the transformation for `value`, with the raw inputs it receives.
    ///
    /// For text, pattern-gated transformations whose pattern matches win
    /// over type-only ones; within each tier the first registered wins.
    fn select_transformation(
        &self,
        value: &Value,
        target: ParamType,
    ) -> Option<(usize, &'a StepArgumentTransformation, Vec<Value>)> {
        let registry: &'a BindingRegistry = self.registry;
        let active = &self.active;
        let available = move || {
            registry
                .transformations_for(target)
                .filter(move |(index, _)| !active.contains(index))
        };
        match value {
            Value::Text(text) => available()
                .find_map(|(index, transformation)| {
                    let pattern = transformation.pattern()?;
                    let captures = pattern.captures(text)?;
                    let inputs: Vec<Value> = if captures.is_empty() {
                        vec![value.clone()]
                    } else {
                        captures.into_iter().map(Value::Text).collect()
                    };
                    (inputs.len() == transformation.inputs().len())
                        .then_some((index, transformation, inputs))
                })
                .or_else(|| {
                    available()
                        .find(|(_, transformation)| {
                            transformation.pattern().is_none()
                                && transformation.plain_arity() == Some(1)
                        })
                        .map(|(index, transformation)| (index, transformation, vec![value.clone()]))
                }),
            Value::Table(_) => available()
                .find(|(_, transformation)| {
                    transformation.pattern().is_none() && transformation.consumes_table()
                })
                .map(|(index, transformation)| (index, transformation, vec![value.clone()])),
            other => available()
                .find(|(_, transformation)| {
                    transformation.pattern().is_none()
                        && transformation.inputs() == [other.param_type()]
                })
                .map(|(index, transformation)| (index, transformation, vec![value.clone()])),
        }
    }

    fn apply(
        &mut self,
        ctx: &mut ScenarioContext,
        index: usize,
        transformation: &StepArgumentTransformation,
        inputs: Vec<Value>,
        target: ParamType,
    ) -> Result<Value, ConvertError> {
        trace!(
            transformation = %transformation.identity(),
            target = %target,
            "applying step argument transformation"
        );
        self.active.push(index);
        let result = self.invoke_transformation(ctx, transformation, inputs);
        self.active.pop();
        let produced = result?;
        if produced.param_type() == target {
            Ok(produced)
        } else {
            Err(unconvertible(
                describe(&produced),
                target,
                format!(
                    "transformation {} returned {} instead",
                    transformation.identity(),
                    produced.param_type()
                ),
            ))
        }
    }

    fn invoke_transformation(
        &mut self,
        ctx: &mut ScenarioContext,
        transformation: &StepArgumentTransformation,
        inputs: Vec<Value>,
    ) -> Result<Value, ConvertError> {
        let mut converted = Vec::with_capacity(inputs.len());
        for (input, ty) in inputs.into_iter().zip(transformation.inputs()) {
            converted.push(self.convert_value(ctx, input, *ty)?);
        }
        let arguments = Arguments::new(converted);
        if let Some(tracer) = self.tracer {
            tracer.trace_invocation(transformation.identity(), &arguments);
        }
        let invocation = self
            .invoker
            .invoke(transformation.method(), ctx, &arguments)?;
        Ok(invocation.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingMethod, MethodIdentity};
    use crate::registry::RegistryBuilder;
    use crate::table::Table;
    use crate::tracer::MockStepTracer;
    use crate::value::TypeKey;
    use rstest::rstest;

    #[derive(Debug, PartialEq)]
    struct Celsius(f64);

    #[derive(Debug, PartialEq)]
    struct Loop;

    fn celsius() -> ParamType {
        ParamType::Custom(TypeKey::of::<Celsius>())
    }

    fn transformation<F>(
        name: &str,
        output: ParamType,
        inputs: &[ParamType],
        body: F,
    ) -> StepArgumentTransformation
    where
        F: Fn(&mut ScenarioContext, &Arguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        StepArgumentTransformation::new(
            output,
            inputs.iter().copied(),
            BindingMethod::new(MethodIdentity::new("Transforms", name), body),
        )
    }

    fn run(
        registry: &BindingRegistry,
        raw: RawArgument,
        target: ParamType,
    ) -> Result<Value, ConvertError> {
        let culture = Culture::invariant();
        let invoker = Invoker::new();
        let mut ctx = ScenarioContext::new();
        Converter::new(registry, &culture, &invoker).convert_raw(&mut ctx, raw, target)
    }

    fn text(value: &str) -> RawArgument {
        RawArgument::Text(value.to_owned())
    }

    #[rstest]
    fn pattern_gated_transformation_wins_over_type_only() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_transformation(transformation("any", celsius(), &[ParamType::F64], |_, args| {
                Ok(Value::object(Celsius(args.get::<f64>(0)?)))
            }))
            .register_transformation(
                transformation("fahrenheit", celsius(), &[ParamType::F64], |_, args| {
                    Ok(Value::object(Celsius((args.get::<f64>(0)? - 32.0) * 5.0 / 9.0)))
                })
                .with_pattern(r"(\d+)F")
                .expect("valid pattern"),
            );
        let registry = builder.build();

        let gated = run(&registry, text("212F"), celsius()).expect("converted");
        assert_eq!(gated.downcast_ref::<Celsius>(), Some(&Celsius(100.0)));
        let plain = run(&registry, text("21.5"), celsius()).expect("converted");
        assert_eq!(plain.downcast_ref::<Celsius>(), Some(&Celsius(21.5)));
    }

    #[rstest]
    fn first_registered_type_only_transformation_wins() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_transformation(transformation("first", celsius(), &[ParamType::Text], |_, _| {
                Ok(Value::object(Celsius(1.0)))
            }))
            .register_transformation(transformation("second", celsius(), &[ParamType::Text], |_, _| {
                Ok(Value::object(Celsius(2.0)))
            }));
        let registry = builder.build();
        let value = run(&registry, text("x"), celsius()).expect("converted");
        assert_eq!(value.downcast_ref::<Celsius>(), Some(&Celsius(1.0)));
    }

    #[rstest]
    fn table_transformation_runs_once_for_whole_table() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = std::sync::Arc::clone(&calls);
        let names = ParamType::of::<Vec<String>>();
        let mut builder = RegistryBuilder::new();
        builder.register_transformation(transformation("names", names, &[ParamType::Table], move |_, args| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let table = args.table(0)?;
            let collected: Vec<String> = table
                .rows()
                .iter()
                .filter_map(|row| row.get("Name").map(str::to_owned))
                .collect();
            Ok(Value::object(collected))
        }));
        let registry = builder.build();
        let mut table = Table::new(["Name"]).expect("headers");
        table.add_row(["Ada"]).expect("row");
        table.add_row(["Grace"]).expect("row");

        let value = run(&registry, RawArgument::Table(table), names).expect("converted");
        let collected = value.downcast_ref::<Vec<String>>().expect("names");
        assert_eq!(collected.len(), 2);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[rstest]
    fn compound_inputs_are_converted_before_invocation() {
        let mut builder = RegistryBuilder::new();
        builder.register_transformation(transformation(
            "pair",
            celsius(),
            &[ParamType::I32, ParamType::I32],
            |_, args| Ok(Value::object(Celsius(f64::from(args.get::<i32>(0)? + args.get::<i32>(1)?)))),
        ));
        let registry = builder.build();
        let raw = RawArgument::Compound(vec!["10".to_owned(), "5".to_owned()]);
        let value = run(&registry, raw, celsius()).expect("converted");
        assert_eq!(value.downcast_ref::<Celsius>(), Some(&Celsius(15.0)));
    }

    #[rstest]
    fn cyclic_transformations_end_in_conversion_error() {
        let looping = ParamType::Custom(TypeKey::of::<Loop>());
        let mut builder = RegistryBuilder::new();
        builder
            .register_transformation(transformation("to_loop", looping, &[celsius()], |_, _| {
                Ok(Value::object(Loop))
            }))
            .register_transformation(transformation("to_celsius", celsius(), &[looping], |_, _| {
                Ok(Value::object(Celsius(0.0)))
            }));
        let registry = builder.build();
        let err = run(&registry, text("x"), looping).expect_err("no route");
        assert!(matches!(err, ConvertError::Unconvertible { .. }), "{err}");
    }

    #[rstest]
    fn transformation_failures_are_execution_failures() {
        let mut builder = RegistryBuilder::new();
        builder.register_transformation(transformation("broken", celsius(), &[ParamType::Text], |_, _| {
            anyhow::bail!("sensor offline")
        }));
        let registry = builder.build();
        let err = run(&registry, text("x"), celsius()).expect_err("failure");
        let ConvertError::Execution(failure) = err else {
            panic!("expected execution failure, got {err}");
        };
        assert_eq!(failure.error.to_string(), "sensor offline");
    }

    #[rstest]
    fn wrong_output_type_is_a_conversion_error() {
        let mut builder = RegistryBuilder::new();
        builder.register_transformation(transformation("liar", celsius(), &[ParamType::Text], |_, _| {
            Ok(Value::from(1_i32))
        }));
        let registry = builder.build();
        let err = run(&registry, text("x"), celsius()).expect_err("wrong type");
        assert!(err.to_string().contains("returned i32"), "{err}");
    }

    #[rstest]
    fn primitive_targets_ignore_transformations() {
        let mut builder = RegistryBuilder::new();
        builder.register_transformation(transformation("fixed", ParamType::F64, &[ParamType::Text], |_, _| {
            Ok(Value::F64(99.0))
        }));
        let registry = builder.build();

        let parsed = run(&registry, text("10.1"), ParamType::F64).expect("parsed");
        assert_eq!(parsed, Value::F64(10.1));
        let err = run(&registry, text("ten"), ParamType::F64).expect_err("unparsable");
        assert!(matches!(err, ConvertError::Unconvertible { .. }), "{err}");
    }

    #[rstest]
    fn tracer_sees_each_transformation_call() {
        let mut builder = RegistryBuilder::new();
        builder.register_transformation(transformation("reading", celsius(), &[ParamType::F64], |_, args| {
            Ok(Value::object(Celsius(args.get::<f64>(0)?)))
        }));
        let registry = builder.build();
        let mut tracer = MockStepTracer::new();
        tracer
            .expect_trace_invocation()
            .withf(|binding, arguments| {
                binding.to_string() == "Transforms::reading"
                    && arguments.as_slice() == [Value::F64(4.5)]
            })
            .times(1)
            .return_const(());

        let culture = Culture::invariant();
        let invoker = Invoker::new();
        let mut converter = Converter::new(&registry, &culture, &invoker).with_tracer(&tracer);
        let value = converter
            .convert_raw(&mut ScenarioContext::new(), text("4.5"), celsius())
            .expect("converted");
        assert_eq!(value.downcast_ref::<Celsius>(), Some(&Celsius(4.5)));
    }

    #[rstest]
    #[case(text("10.1"), ParamType::F64, Some(Value::F64(10.1)))]
    #[case(text("abc"), ParamType::I32, None)]
    #[case(text("same"), ParamType::Text, Some(Value::from("same")))]
    #[case(text("no route"), ParamType::Custom(TypeKey::of::<Loop>()), None)]
    fn builtin_routes(#[case] raw: RawArgument, #[case] target: ParamType, #[case] expected: Option<Value>) {
        let registry = BindingRegistry::default();
        assert_eq!(run(&registry, raw, target).ok(), expected);
    }
}
