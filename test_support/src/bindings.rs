//! Sample domain types and bindings shared by the integration suites.

use crate::recorder::CallRecorder;
use serde::Deserialize;
use stepbind::binding::PatternError;
use stepbind::{
    BindingMethod, MethodIdentity, Parameter, ParamType, RegistryBuilder,
    StepArgumentTransformation, StepCategory, StepDefinition, Value,
};

/// A user, built from a single name or one table row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Display name.
    #[serde(rename = "Name")]
    pub name: String,
}

/// An employee, built from two captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

/// Pair of integers, built from two captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntThing {
    /// First capture.
    pub first_int: i32,
    /// Second capture.
    pub last_int: i32,
}

/// Pair of doubles, built from two captures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleThing {
    /// First capture.
    pub first_double: f64,
    /// Second capture.
    pub last_double: f64,
}

/// Transformation `String -> User`, selected by output type only.
pub fn user_from_name() -> StepArgumentTransformation {
    StepArgumentTransformation::new(
        ParamType::of::<User>(),
        [ParamType::Text],
        BindingMethod::new(MethodIdentity::new("UserCreator", "create"), |_, args| {
            Ok(Value::object(User {
                name: args.text(0)?.to_owned(),
            }))
        }),
    )
}

/// Transformation `"user (\w+)" -> User`, gated on its pattern.
///
/// # Errors
///
/// Never in practice; the pattern is a valid regex.
pub fn user_from_mention() -> Result<StepArgumentTransformation, PatternError> {
    user_from_name().with_pattern(r"user (\w+)")
}

/// Transformation `Table -> Vec<User>`, counting its calls in `recorder`.
pub fn users_from_table(recorder: &CallRecorder) -> StepArgumentTransformation {
    let counted = recorder.method("UserCreator", "create_users");
    StepArgumentTransformation::new(
        ParamType::of::<Vec<User>>(),
        [ParamType::Table],
        BindingMethod::new(MethodIdentity::new("UserCreator", "create_users"), move |ctx, args| {
            counted.call(ctx, args)?;
            let users: Vec<User> = args.table(0)?.deserialize_rows()?;
            Ok(Value::object(users))
        }),
    )
}

/// Transformation `(String, String) -> Employee`.
pub fn employee_from_names() -> StepArgumentTransformation {
    StepArgumentTransformation::new(
        ParamType::of::<Employee>(),
        [ParamType::Text, ParamType::Text],
        BindingMethod::new(
            MethodIdentity::new("EmployeeCreator", "create_employee"),
            |_, args| {
                Ok(Value::object(Employee {
                    first_name: args.text(0)?.to_owned(),
                    last_name: args.text(1)?.to_owned(),
                }))
            },
        ),
    )
}

/// Transformation `(i32, i32) -> IntThing`.
pub fn int_thing_from_ints() -> StepArgumentTransformation {
    StepArgumentTransformation::new(
        ParamType::of::<IntThing>(),
        [ParamType::I32, ParamType::I32],
        BindingMethod::new(MethodIdentity::new("Things", "to_int_thing"), |_, args| {
            Ok(Value::object(IntThing {
                first_int: args.get(0)?,
                last_int: args.get(1)?,
            }))
        }),
    )
}

/// Transformation `(f64, f64) -> DoubleThing`.
pub fn double_thing_from_doubles() -> StepArgumentTransformation {
    StepArgumentTransformation::new(
        ParamType::of::<DoubleThing>(),
        [ParamType::F64, ParamType::F64],
        BindingMethod::new(MethodIdentity::new("Things", "to_double_thing"), |_, args| {
            Ok(Value::object(DoubleThing {
                first_double: args.get(0)?,
                last_double: args.get(1)?,
            }))
        }),
    )
}

/// Register the `sample step ...` bindings on `builder`, recording every
/// call in `recorder`.
///
/// # Errors
///
/// Never in practice; every pattern is a valid regex.
pub fn register_sample_steps(
    builder: &mut RegistryBuilder,
    recorder: &CallRecorder,
) -> Result<(), PatternError> {
    let text = Parameter::plain(ParamType::Text);
    let steps = [
        ("sample step without param", vec![], "without_param"),
        ("sample step with (single) param", vec![text.clone()], "single_param"),
        (
            "sample step with (multi)(ple) param",
            vec![text.clone(), text.clone()],
            "multiple_param",
        ),
        ("sample step with table param", vec![Parameter::table()], "table_param"),
        (
            "sample step with multi-line string param",
            vec![Parameter::text_block()],
            "text_block_param",
        ),
        (
            "sample step with table and multi-line string param",
            vec![Parameter::text_block(), Parameter::table()],
            "text_block_and_table_param",
        ),
        (
            "sample step with (mixed) params",
            vec![text, Parameter::text_block(), Parameter::table()],
            "mixed_params",
        ),
        (
            "sample step with simple convert param: (.*)",
            vec![Parameter::plain(ParamType::F64)],
            "simple_convert_param",
        ),
        (
            "sample step with wrong param number",
            vec![Parameter::plain(ParamType::F64)],
            "wrong_param_number",
        ),
        ("Distinguish by table param", vec![], "without_table"),
        ("Distinguish by table param", vec![Parameter::table()], "with_table"),
    ];
    for (pattern, parameters, method) in steps {
        builder.register_step(StepDefinition::new(
            StepCategory::Given,
            pattern,
            parameters,
            recorder.method("SampleSteps", method),
        )?);
    }
    Ok(())
}

/// Register the multi-capture transformation steps and their
/// transformations on `builder`.
///
/// # Errors
///
/// Never in practice; every pattern is a valid regex.
pub fn register_compound_steps(
    builder: &mut RegistryBuilder,
    recorder: &CallRecorder,
) -> Result<(), PatternError> {
    let steps = [
        (
            "sample step with user param firstname '(.*)' lastname '(.*)'",
            ParamType::of::<Employee>(),
            "employee_param",
        ),
        (
            "sample step with user param firstint (.*) lastint (.*)",
            ParamType::of::<IntThing>(),
            "int_thing_param",
        ),
        (
            "sample step with user param firstdouble (.*) lastdouble (.*)",
            ParamType::of::<DoubleThing>(),
            "double_thing_param",
        ),
    ];
    for (pattern, ty, method) in steps {
        builder.register_step(StepDefinition::new(
            StepCategory::Given,
            pattern,
            [Parameter::plain(ty)],
            recorder.method("CompoundSteps", method),
        )?);
    }
    builder
        .register_transformation(employee_from_names())
        .register_transformation(int_thing_from_ints())
        .register_transformation(double_thing_from_doubles());
    Ok(())
}
