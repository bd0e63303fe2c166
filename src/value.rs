use std::fmt;

use crate::error::{ErrorKind, Result};
use crate::lossy_str::LossyStr;
use crate::{Signature, Type};

/// A dynamically typed D-Bus value.
///
/// Values carry no type of their own. The type they are encoded or decoded
/// with comes from a [`Signature`], so the same `Value::Array` can be an `ai`
/// or an `as` depending on where it ends up.
///
/// # Examples
///
/// ```
/// use dbus_stream::{Type, Value};
///
/// let value = Value::from(vec![Value::from("a"), Value::from("b")]);
/// assert_eq!(value.as_array().map(|v| v.len()), Some(2));
///
/// let variant = Value::variant(Type::UInt32, 42u32);
/// assert_eq!(variant.as_variant().and_then(|(_, v)| v.as_u32()), Some(42));
/// ```
#[derive(Clone, PartialEq)]
pub enum Value {
    Byte(u8),
    Boolean(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
    ObjectPath(String),
    Signature(Signature),
    UnixFd(u32),
    /// A string or object path received from the wire which was not valid
    /// UTF-8. The raw bytes are kept so the rest of the message survives.
    Unchecked(Vec<u8>),
    Array(Vec<Value>),
    /// An array of dict entries, in wire order with unique keys.
    Dict(Vec<(Value, Value)>),
    Struct(Vec<Value>),
    Variant(Type, Box<Value>),
}

impl Value {
    /// Construct a variant holding `value` of type `ty`.
    pub fn variant(ty: Type, value: impl Into<Value>) -> Self {
        Value::Variant(ty, Box::new(value.into()))
    }

    /// Construct an object path value.
    pub fn object_path(path: impl Into<String>) -> Self {
        Value::ObjectPath(path.into())
    }

    /// Construct an empty dict.
    pub fn empty_dict() -> Self {
        Value::Dict(Vec::new())
    }

    /// A short description of what kind of value this is, used in errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Byte(..) => "byte",
            Value::Boolean(..) => "boolean",
            Value::Int16(..) => "int16",
            Value::UInt16(..) => "uint16",
            Value::Int32(..) => "int32",
            Value::UInt32(..) => "uint32",
            Value::Int64(..) => "int64",
            Value::UInt64(..) => "uint64",
            Value::Double(..) => "double",
            Value::String(..) => "string",
            Value::ObjectPath(..) => "object path",
            Value::Signature(..) => "signature",
            Value::UnixFd(..) => "unix fd",
            Value::Unchecked(..) => "unchecked string",
            Value::Array(..) => "array",
            Value::Dict(..) => "dict",
            Value::Struct(..) => "struct",
            Value::Variant(..) => "variant",
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match *self {
            Value::Byte(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int32(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::UInt32(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int64(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt64(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(value) => Some(value),
            _ => None,
        }
    }

    /// Access a string or object path.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) | Value::ObjectPath(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&Signature> {
        match self {
            Value::Signature(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&[Value]> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_variant(&self) -> Option<(&Type, &Value)> {
        match self {
            Value::Variant(ty, value) => Some((ty, value)),
            _ => None,
        }
    }

    /// Look up the value of `key` in a dict.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.as_dict()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(value) => write!(f, "{value}u8"),
            Value::Boolean(value) => value.fmt(f),
            Value::Int16(value) => write!(f, "{value}i16"),
            Value::UInt16(value) => write!(f, "{value}u16"),
            Value::Int32(value) => write!(f, "{value}i32"),
            Value::UInt32(value) => write!(f, "{value}u32"),
            Value::Int64(value) => write!(f, "{value}i64"),
            Value::UInt64(value) => write!(f, "{value}u64"),
            Value::Double(value) => write!(f, "{value:?}f64"),
            Value::String(value) => value.fmt(f),
            Value::ObjectPath(value) => write!(f, "ObjectPath({value:?})"),
            Value::Signature(value) => value.fmt(f),
            Value::UnixFd(value) => write!(f, "UnixFd({value})"),
            Value::Unchecked(bytes) => write!(f, "Unchecked({:?})", LossyStr::new(bytes)),
            Value::Array(values) => f.debug_list().entries(values).finish(),
            Value::Dict(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
            Value::Struct(fields) => {
                let mut f = f.debug_tuple("");

                for field in fields {
                    f.field(field);
                }

                f.finish()
            }
            Value::Variant(ty, value) => write!(f, "<{ty}>{value:?}"),
        }
    }
}

macro_rules! from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    }
}

from_scalar! {
    u8 => Byte,
    bool => Boolean,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
    String => String,
    Signature => Signature,
    Vec<Value> => Array,
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<Vec<(Value, Value)>> for Value {
    #[inline]
    fn from(entries: Vec<(Value, Value)>) -> Self {
        Value::Dict(entries)
    }
}

/// Positional access to the fields of a struct value by name.
///
/// D-Bus structs are positional on the wire. A `Fields` table assigns a name
/// to each position of one particular struct type so that callers can read
/// and build such values by name.
///
/// # Examples
///
/// ```
/// use dbus_stream::{Fields, Type, Value};
///
/// let fields = Fields::new(Type::parse("(su)")?, &["name", "flags"])?;
///
/// let value = fields.build([("flags", Value::from(4u32)), ("name", Value::from("x"))])?;
/// assert_eq!(fields.get(&value, "name").and_then(Value::as_str), Some("x"));
/// assert_eq!(fields.get(&value, "flags").and_then(Value::as_u32), Some(4));
/// # Ok::<_, dbus_stream::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Fields {
    ty: Type,
    names: Box<[Box<str>]>,
}

impl Fields {
    /// Name the fields of the struct type `ty`.
    ///
    /// # Errors
    ///
    /// Errors if `ty` is not a struct, or if the number of names doesn't
    /// match the number of fields.
    pub fn new(ty: Type, names: &[&str]) -> Result<Self> {
        let Type::Struct(types) = &ty else {
            return Err(ErrorKind::TypeMismatch {
                expected: "a struct".into(),
                found: "non-struct type",
            }
            .into());
        };

        if types.len() != names.len() {
            return Err(ErrorKind::ArgumentCount {
                expected: types.len(),
                found: names.len(),
            }
            .into());
        }

        Ok(Self {
            names: names.iter().map(|&n| Box::from(n)).collect(),
            ty,
        })
    }

    /// The struct type the names apply to.
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Position of the field called `name`.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| **n == *name)
    }

    /// Type of the field called `name`.
    pub fn field_type(&self, name: &str) -> Option<&Type> {
        let Type::Struct(types) = &self.ty else {
            return None;
        };

        types.get(self.index(name)?)
    }

    /// Read the field called `name` out of a struct value.
    pub fn get<'a>(&self, value: &'a Value, name: &str) -> Option<&'a Value> {
        value.as_struct()?.get(self.index(name)?)
    }

    /// Mutably access the field called `name` of a struct value.
    pub fn get_mut<'a>(&self, value: &'a mut Value, name: &str) -> Option<&'a mut Value> {
        let index = self.index(name)?;

        match value {
            Value::Struct(fields) => fields.get_mut(index),
            _ => None,
        }
    }

    /// Build a struct value from named fields given in any order.
    ///
    /// # Errors
    ///
    /// Errors if a name is unknown, or if not every field is given.
    pub fn build<'a, I>(&self, named: I) -> Result<Value>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut slots = vec![None; self.names.len()];

        for (name, value) in named {
            let Some(index) = self.index(name) else {
                return Err(ErrorKind::UnknownField(name.into()).into());
            };

            slots[index] = Some(value);
        }

        let given = slots.iter().filter(|s| s.is_some()).count();

        if given != slots.len() {
            return Err(ErrorKind::ArgumentCount {
                expected: slots.len(),
                found: given,
            }
            .into());
        }

        Ok(Value::Struct(slots.into_iter().flatten().collect()))
    }
}
