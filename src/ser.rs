//! Encoding of values into the wire format.

use crate::buf::Marshaller;
use crate::error::{ErrorKind, Result};
use crate::object_path::is_valid_object_path;
use crate::proto::MAX_ARRAY_LENGTH;
use crate::signature::{MAX_DEPTH, MAX_SIGNATURE};
use crate::{Signature, SignatureError, Type, Value};

/// Encode `value` as a value of type `ty` at the end of `buf`.
pub(crate) fn encode(buf: &mut Marshaller, value: &Value, ty: &Type) -> Result<()> {
    ty.validate()?;
    encode_at(buf, value, ty, 0)
}

fn encode_at(buf: &mut Marshaller, value: &Value, ty: &Type, depth: usize) -> Result<()> {
    match (ty, value) {
        (Type::Byte, &Value::Byte(v)) => {
            buf.store(v);
        }
        (Type::Boolean, &Value::Boolean(v)) => {
            buf.store(u32::from(v));
        }
        (Type::Int16, &Value::Int16(v)) => {
            buf.store(v);
        }
        (Type::UInt16, &Value::UInt16(v)) => {
            buf.store(v);
        }
        (Type::Int32, &Value::Int32(v)) => {
            buf.store(v);
        }
        (Type::UInt32, &Value::UInt32(v)) => {
            buf.store(v);
        }
        (Type::Int64, &Value::Int64(v)) => {
            buf.store(v);
        }
        (Type::UInt64, &Value::UInt64(v)) => {
            buf.store(v);
        }
        (Type::Double, &Value::Double(v)) => {
            buf.store(v);
        }
        (Type::UnixFd, &Value::UnixFd(v)) => {
            buf.store(v);
        }
        (Type::String, Value::String(s)) => {
            write_string(buf, s)?;
        }
        (Type::ObjectPath, Value::ObjectPath(path) | Value::String(path)) => {
            if !is_valid_object_path(path) {
                return Err(ErrorKind::InvalidObjectPath(path.as_str().into()).into());
            }

            write_string(buf, path)?;
        }
        (Type::Signature, Value::Signature(signature)) => {
            write_signature(buf, signature.as_str())?;
        }
        (Type::Signature, Value::String(text)) => {
            let signature = Signature::new(text)?;
            write_signature(buf, signature.as_str())?;
        }
        (Type::Variant, Value::Variant(inner_ty, inner)) => {
            let depth = enter(depth)?;
            inner_ty.validate()?;
            write_signature(buf, &inner_ty.to_string())?;
            encode_at(buf, inner, inner_ty, depth)?;
        }
        (Type::Array(element), Value::Array(values)) => {
            let depth = enter(depth)?;

            write_array(buf, element, |buf| {
                for value in values {
                    encode_at(buf, value, element, depth)?;
                }

                Ok(())
            })?;
        }
        (Type::Array(element), Value::Dict(entries)) => {
            let Type::DictEntry(key_ty, value_ty) = &**element else {
                return Err(mismatch(ty, value));
            };

            let depth = enter(depth)?;

            write_array(buf, element, |buf| {
                for (key, value) in entries {
                    buf.write_pad(8);
                    encode_at(buf, key, key_ty, depth)?;
                    encode_at(buf, value, value_ty, depth)?;
                }

                Ok(())
            })?;
        }
        (Type::Struct(types), Value::Struct(values)) => {
            if types.len() != values.len() {
                return Err(ErrorKind::ArgumentCount {
                    expected: types.len(),
                    found: values.len(),
                }
                .into());
            }

            let depth = enter(depth)?;
            buf.write_pad(8);

            for (ty, value) in types.iter().zip(values) {
                encode_at(buf, value, ty, depth)?;
            }
        }
        (Type::DictEntry(key_ty, value_ty), Value::Struct(values)) => {
            let [key, value] = &values[..] else {
                return Err(ErrorKind::ArgumentCount {
                    expected: 2,
                    found: values.len(),
                }
                .into());
            };

            let depth = enter(depth)?;
            buf.write_pad(8);
            encode_at(buf, key, key_ty, depth)?;
            encode_at(buf, value, value_ty, depth)?;
        }
        (ty, value) => {
            return Err(mismatch(ty, value));
        }
    }

    Ok(())
}

fn enter(depth: usize) -> Result<usize> {
    let depth = depth + 1;

    if depth > MAX_DEPTH {
        return Err(SignatureError::ExceededMaximumDepth.into());
    }

    Ok(depth)
}

fn mismatch(ty: &Type, value: &Value) -> crate::Error {
    ErrorKind::TypeMismatch {
        expected: ty.to_string().into(),
        found: value.kind_name(),
    }
    .into()
}

/// Write a string with a 4-byte length prefix and a NUL terminator.
fn write_string(buf: &mut Marshaller, s: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        return Err(ErrorKind::InteriorNul.into());
    }

    let Ok(len) = u32::try_from(s.len()) else {
        return Err(ErrorKind::BodyTooLong(s.len()).into());
    };

    buf.store(len);
    buf.extend_from_slice_nul(s.as_bytes());
    Ok(())
}

/// Write a signature with a 1-byte length prefix and a NUL terminator.
fn write_signature(buf: &mut Marshaller, s: &str) -> Result<()> {
    if s.len() >= MAX_SIGNATURE {
        return Err(SignatureError::SignatureTooLong.into());
    }

    buf.store(s.len() as u8);
    buf.extend_from_slice_nul(s.as_bytes());
    Ok(())
}

/// Write an array whose elements are produced by `f`, backpatching the
/// length once they are known.
///
/// The length excludes the padding between the length field and the first
/// element.
pub(crate) fn write_array<F>(buf: &mut Marshaller, element: &Type, f: F) -> Result<()>
where
    F: FnOnce(&mut Marshaller) -> Result<()>,
{
    let at = buf.store(0u32);
    buf.write_pad(element.alignment());
    let start = buf.len();

    f(buf)?;

    let len = buf.len() - start;

    if len > MAX_ARRAY_LENGTH {
        return Err(ErrorKind::ArrayTooLong(u32::try_from(len).unwrap_or(u32::MAX)).into());
    }

    buf.store_at(at, len as u32);
    Ok(())
}
