use std::fmt;

use crate::proto::TypeCode;

use super::{SignatureError, SignatureParser, MAX_CONTAINER_DEPTH, MAX_SIGNATURE};

/// A single complete D-Bus type.
///
/// Containers own their element types, so arbitrarily nested types such as
/// `a(sa{sv})` are represented as a tree.
///
/// # Examples
///
/// ```
/// use dbus_stream::Type;
///
/// let ty = Type::parse("a{sv}")?;
/// assert!(ty.is_dict());
/// assert_eq!(ty.alignment(), 4);
/// assert_eq!(ty.to_string(), "a{sv}");
/// # Ok::<_, dbus_stream::SignatureError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Byte,
    Boolean,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    String,
    ObjectPath,
    Signature,
    UnixFd,
    Variant,
    Array(Box<Type>),
    Struct(Vec<Type>),
    DictEntry(Box<Type>, Box<Type>),
}

/// Table of the types which are fully described by a single code.
static SINGLE_CODE_TYPES: [(TypeCode, Type); 14] = [
    (TypeCode::BYTE, Type::Byte),
    (TypeCode::BOOLEAN, Type::Boolean),
    (TypeCode::INT16, Type::Int16),
    (TypeCode::UINT16, Type::UInt16),
    (TypeCode::INT32, Type::Int32),
    (TypeCode::UINT32, Type::UInt32),
    (TypeCode::INT64, Type::Int64),
    (TypeCode::UINT64, Type::UInt64),
    (TypeCode::DOUBLE, Type::Double),
    (TypeCode::STRING, Type::String),
    (TypeCode::OBJECT_PATH, Type::ObjectPath),
    (TypeCode::SIGNATURE, Type::Signature),
    (TypeCode::UNIX_FD, Type::UnixFd),
    (TypeCode::VARIANT, Type::Variant),
];

impl Type {
    /// Parse exactly one complete type.
    ///
    /// # Errors
    ///
    /// Errors if `text` is not a valid type, or if anything remains after the
    /// first complete type.
    ///
    /// ```
    /// use dbus_stream::{SignatureError, Type};
    ///
    /// assert_eq!(Type::parse("(ii)")?, Type::Struct(vec![Type::Int32, Type::Int32]));
    /// assert_eq!(Type::parse("ii"), Err(SignatureError::TrailingCharacters));
    /// # Ok::<_, SignatureError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Type, SignatureError> {
        let mut parser = SignatureParser::new(text.as_bytes())?;

        let Some(ty) = parser.next_type()? else {
            return Err(SignatureError::ExpectedSingleCompleteType);
        };

        if !parser.is_empty() {
            return Err(SignatureError::TrailingCharacters);
        }

        Ok(ty)
    }

    /// Look up a type which is described by a single code, such as `i` or
    /// `v`.
    pub(crate) fn from_code(code: TypeCode) -> Option<Type> {
        SINGLE_CODE_TYPES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, ty)| ty.clone())
    }

    /// The leading type code of the type.
    pub fn code(&self) -> TypeCode {
        match self {
            Type::Byte => TypeCode::BYTE,
            Type::Boolean => TypeCode::BOOLEAN,
            Type::Int16 => TypeCode::INT16,
            Type::UInt16 => TypeCode::UINT16,
            Type::Int32 => TypeCode::INT32,
            Type::UInt32 => TypeCode::UINT32,
            Type::Int64 => TypeCode::INT64,
            Type::UInt64 => TypeCode::UINT64,
            Type::Double => TypeCode::DOUBLE,
            Type::String => TypeCode::STRING,
            Type::ObjectPath => TypeCode::OBJECT_PATH,
            Type::Signature => TypeCode::SIGNATURE,
            Type::UnixFd => TypeCode::UNIX_FD,
            Type::Variant => TypeCode::VARIANT,
            Type::Array(..) => TypeCode::ARRAY,
            Type::Struct(..) => TypeCode::OPEN_PAREN,
            Type::DictEntry(..) => TypeCode::OPEN_BRACE,
        }
    }

    /// The alignment in bytes that a value of this type starts at.
    pub fn alignment(&self) -> usize {
        match self {
            Type::Byte | Type::Signature | Type::Variant => 1,
            Type::Int16 | Type::UInt16 => 2,
            Type::Boolean
            | Type::Int32
            | Type::UInt32
            | Type::UnixFd
            | Type::String
            | Type::ObjectPath
            | Type::Array(..) => 4,
            Type::Int64 | Type::UInt64 | Type::Double => 8,
            Type::Struct(..) | Type::DictEntry(..) => 8,
        }
    }

    /// The size of the type on the wire if it is fixed.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Type::Byte => Some(1),
            Type::Int16 | Type::UInt16 => Some(2),
            Type::Boolean | Type::Int32 | Type::UInt32 | Type::UnixFd => Some(4),
            Type::Int64 | Type::UInt64 | Type::Double => Some(8),
            _ => None,
        }
    }

    /// Test if this is a basic type, which is what dict keys must be.
    pub fn is_basic(&self) -> bool {
        !matches!(
            self,
            Type::Variant | Type::Array(..) | Type::Struct(..) | Type::DictEntry(..)
        )
    }

    /// Test if this is an array of dict entries.
    pub fn is_dict(&self) -> bool {
        matches!(self, Type::Array(element) if matches!(**element, Type::DictEntry(..)))
    }

    /// Check that a type built by hand obeys the same rules as a parsed one.
    ///
    /// Structs need at least one field, dict entries may only appear as the
    /// element of an array and need a basic key, nesting is limited and the
    /// rendered signature must fit in a signature.
    ///
    /// # Errors
    ///
    /// Errors with the same error parsing the rendered type would raise.
    ///
    /// ```
    /// use dbus_stream::{SignatureError, Type};
    ///
    /// let ty = Type::Array(Box::new(Type::DictEntry(
    ///     Box::new(Type::Variant),
    ///     Box::new(Type::Byte),
    /// )));
    ///
    /// assert_eq!(ty.validate(), Err(SignatureError::DictKeyMustBeBasicType));
    /// assert_eq!(Type::Struct(Vec::new()).validate(), Err(SignatureError::StructHasNoFields));
    /// ```
    pub fn validate(&self) -> Result<(), SignatureError> {
        self.validate_at(0, 0)?;

        if self.signature_len() >= MAX_SIGNATURE {
            return Err(SignatureError::SignatureTooLong);
        }

        Ok(())
    }

    fn validate_at(&self, arrays: usize, structs: usize) -> Result<(), SignatureError> {
        match self {
            Type::Array(element) => {
                let arrays = arrays + 1;

                if arrays > MAX_CONTAINER_DEPTH {
                    return Err(SignatureError::ExceededMaximumArrayRecursion);
                }

                let Type::DictEntry(key, value) = &**element else {
                    return element.validate_at(arrays, structs);
                };

                let structs = structs + 1;

                if structs > MAX_CONTAINER_DEPTH {
                    return Err(SignatureError::ExceededMaximumStructRecursion);
                }

                if !key.is_basic() {
                    return Err(SignatureError::DictKeyMustBeBasicType);
                }

                value.validate_at(arrays, structs)
            }
            Type::Struct(fields) => {
                let structs = structs + 1;

                if structs > MAX_CONTAINER_DEPTH {
                    return Err(SignatureError::ExceededMaximumStructRecursion);
                }

                if fields.is_empty() {
                    return Err(SignatureError::StructHasNoFields);
                }

                for field in fields {
                    field.validate_at(arrays, structs)?;
                }

                Ok(())
            }
            Type::DictEntry(..) => Err(SignatureError::DictEntryNotInsideArray),
            _ => Ok(()),
        }
    }

    /// The length of the signature of this type.
    pub(crate) fn signature_len(&self) -> usize {
        match self {
            Type::Array(element) => 1 + element.signature_len(),
            Type::Struct(fields) => 2 + fields.iter().map(Type::signature_len).sum::<usize>(),
            Type::DictEntry(key, value) => 2 + key.signature_len() + value.signature_len(),
            _ => 1,
        }
    }

    /// Append the signature of this type to `out`.
    pub(crate) fn write_signature(&self, out: &mut String) {
        match self {
            Type::Array(element) => {
                out.push('a');
                element.write_signature(out);
            }
            Type::Struct(fields) => {
                out.push('(');

                for field in fields {
                    field.write_signature(out);
                }

                out.push(')');
            }
            Type::DictEntry(key, value) => {
                out.push('{');
                key.write_signature(out);
                value.write_signature(out);
                out.push('}');
            }
            ty => out.push(char::from(ty.code().get())),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_signature(&mut out);
        f.write_str(&out)
    }
}
