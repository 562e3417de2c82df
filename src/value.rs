//! Dynamic values flowing between step text and step implementations.
//!
//! Step text only ever yields strings and tables, while implementations ask
//! for integers, dates, domain objects and so on. [`Value`] is the common
//! currency of the binding pipeline and [`ParamType`] describes what a
//! declared parameter (or transformation input) requires.
//!
//! # Examples
//!
//! ```
//! use stepbind::value::{Arguments, ParamType, Value};
//!
//! assert_eq!(ParamType::of::<i32>(), ParamType::I32);
//! assert_eq!(Value::from(7_i32).param_type(), ParamType::I32);
//!
//! let args = Arguments::new(vec![Value::from("John"), Value::from(10_i32)]);
//! assert_eq!(args.text(0).expect("text"), "John");
//! assert_eq!(args.get::<i32>(1).expect("int"), 10);
//! ```

use crate::table::Table;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;
use time::{Date, OffsetDateTime};

/// Identity of a Rust type used as a custom parameter type.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for the type `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name recorded at construction.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Type required by a step parameter or produced by a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// No value; returned by steps that produce nothing.
    Unit,
    /// Plain string.
    Text,
    /// `true` / `false`.
    Bool,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Calendar date.
    Date,
    /// Date and time with offset.
    DateTime,
    /// Data table attached to a step.
    Table,
    /// Any other Rust type, produced by transformations.
    Custom(TypeKey),
}

impl ParamType {
    /// Map a Rust type onto its parameter type.
    ///
    /// Known primitive types and [`Table`] map onto their dedicated variants;
    /// everything else becomes [`ParamType::Custom`].
    #[must_use]
    pub fn of<T: Any>() -> Self {
        let id = TypeId::of::<T>();
        let known = [
            (TypeId::of::<()>(), Self::Unit),
            (TypeId::of::<String>(), Self::Text),
            (TypeId::of::<bool>(), Self::Bool),
            (TypeId::of::<i32>(), Self::I32),
            (TypeId::of::<i64>(), Self::I64),
            (TypeId::of::<u32>(), Self::U32),
            (TypeId::of::<u64>(), Self::U64),
            (TypeId::of::<f32>(), Self::F32),
            (TypeId::of::<f64>(), Self::F64),
            (TypeId::of::<Date>(), Self::Date),
            (TypeId::of::<OffsetDateTime>(), Self::DateTime),
            (TypeId::of::<Table>(), Self::Table),
        ];
        known
            .into_iter()
            .find_map(|(known_id, ty)| (known_id == id).then_some(ty))
            .unwrap_or_else(|| Self::Custom(TypeKey::of::<T>()))
    }

    /// Whether text can be parsed into this type without a transformation.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::I32
                | Self::I64
                | Self::U32
                | Self::U64
                | Self::F32
                | Self::F64
                | Self::Date
                | Self::DateTime
        )
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unit => "()",
            Self::Text => "String",
            Self::Bool => "bool",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Date => "Date",
            Self::DateTime => "OffsetDateTime",
            Self::Table => "Table",
            Self::Custom(key) => key.name(),
        };
        f.write_str(name)
    }
}

/// Shared, type-erased domain value produced by a transformation.
#[derive(Clone)]
pub struct Object {
    key: TypeKey,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Object {
    /// Wrap `value`, recording its type.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Type of the wrapped value.
    #[must_use]
    pub const fn type_key(&self) -> TypeKey {
        self.key
    }

    /// Borrow the wrapped value as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.key.name())
    }
}

/// A runtime value passed to, or returned from, a binding.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// No value.
    #[default]
    Unit,
    /// String value.
    Text(String),
    /// Boolean value.
    Bool(bool),
    /// Signed 32-bit integer.
    I32(i32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Calendar date.
    Date(Date),
    /// Date and time with offset.
    DateTime(OffsetDateTime),
    /// Data table.
    Table(Table),
    /// Custom domain object.
    Object(Object),
}

impl Value {
    /// Wrap a custom domain value.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Self::Object(Object::new(value))
    }

    /// The parameter type this value satisfies exactly.
    #[must_use]
    pub const fn param_type(&self) -> ParamType {
        match self {
            Self::Unit => ParamType::Unit,
            Self::Text(_) => ParamType::Text,
            Self::Bool(_) => ParamType::Bool,
            Self::I32(_) => ParamType::I32,
            Self::I64(_) => ParamType::I64,
            Self::U32(_) => ParamType::U32,
            Self::U64(_) => ParamType::U64,
            Self::F32(_) => ParamType::F32,
            Self::F64(_) => ParamType::F64,
            Self::Date(_) => ParamType::Date,
            Self::DateTime(_) => ParamType::DateTime,
            Self::Table(_) => ParamType::Table,
            Self::Object(object) => ParamType::Custom(object.type_key()),
        }
    }

    /// Borrow the string payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow a custom object payload as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Object(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Objects compare by identity; everything else compares by content.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a == b,
            (Self::F64(a), Self::F64(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Table(a), Self::Table(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(&a.inner, &b.inner),
            _ => false,
        }
    }
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(inner) => Some(inner.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

/// Extraction of a concrete Rust value from a [`Value`].
pub trait FromValue: Sized {
    /// Return the payload when `value` holds exactly this type.
    fn from_value(value: &Value) -> Option<Self>;
}

value_conversions! {
    String => Text,
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Date => Date,
    OffsetDateTime => DateTime,
    Table => Table,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Unit
    }
}

/// Errors raised while reading typed arguments inside a binding body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// The binding asked for an argument position that does not exist.
    #[error("argument {index} requested but only {len} supplied")]
    Missing {
        /// Requested position.
        index: usize,
        /// Number of supplied arguments.
        len: usize,
    },
    /// The argument exists but holds another type.
    #[error("argument {index} is {actual}, expected {expected}")]
    TypeMismatch {
        /// Requested position.
        index: usize,
        /// Type the binding asked for.
        expected: String,
        /// Type actually supplied.
        actual: ParamType,
    },
}

/// Ordered, fully converted arguments handed to a binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    /// Wrap already converted values.
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the raw values.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Consume the wrapper.
    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }

    fn value(&self, index: usize) -> Result<&Value, ArgumentError> {
        self.values.get(index).ok_or(ArgumentError::Missing {
            index,
            len: self.values.len(),
        })
    }

    /// Read argument `index` as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] when the position is missing or holds a
    /// different type.
    pub fn get<T: FromValue + Any>(&self, index: usize) -> Result<T, ArgumentError> {
        let value = self.value(index)?;
        T::from_value(value).ok_or_else(|| ArgumentError::TypeMismatch {
            index,
            expected: ParamType::of::<T>().to_string(),
            actual: value.param_type(),
        })
    }

    /// Borrow argument `index` as a string slice.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] when the position is missing or not text.
    pub fn text(&self, index: usize) -> Result<&str, ArgumentError> {
        let value = self.value(index)?;
        value.as_text().ok_or_else(|| ArgumentError::TypeMismatch {
            index,
            expected: ParamType::Text.to_string(),
            actual: value.param_type(),
        })
    }

    /// Borrow argument `index` as a table.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] when the position is missing or not a table.
    pub fn table(&self, index: usize) -> Result<&Table, ArgumentError> {
        match self.value(index)? {
            Value::Table(table) => Ok(table),
            other => Err(ArgumentError::TypeMismatch {
                index,
                expected: ParamType::Table.to_string(),
                actual: other.param_type(),
            }),
        }
    }

    /// Borrow argument `index` as a custom object of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] when the position is missing or holds another
    /// type.
    pub fn object<T: Any>(&self, index: usize) -> Result<&T, ArgumentError> {
        let value = self.value(index)?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| ArgumentError::TypeMismatch {
                index,
                expected: std::any::type_name::<T>().to_owned(),
                actual: value.param_type(),
            })
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
