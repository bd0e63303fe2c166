//! Decoding of values from the wire format.

use std::collections::hash_map::{Entry, HashMap};
use std::str::from_utf8;

use crate::buf::Marshaller;
use crate::error::{ErrorKind, Result};
use crate::lossy_str::LossyStr;
use crate::object_path::is_valid_object_path;
use crate::proto::MAX_ARRAY_LENGTH;
use crate::signature::MAX_DEPTH;
use crate::{Signature, SignatureError, Type, Value};

/// Decode a value of type `ty` at the read position of `buf`.
///
/// The read position is left wherever decoding stopped on errors, callers
/// are responsible for restoring it.
pub(crate) fn decode(buf: &mut Marshaller, ty: &Type) -> Result<Value> {
    ty.validate()?;
    decode_at(buf, ty, 0)
}

fn decode_at(buf: &mut Marshaller, ty: &Type, depth: usize) -> Result<Value> {
    let value = match ty {
        Type::Byte => Value::Byte(buf.load::<u8>()?),
        Type::Boolean => match buf.load::<u32>()? {
            0 => Value::Boolean(false),
            1 => Value::Boolean(true),
            n => return Err(ErrorKind::InvalidBoolean(n).into()),
        },
        Type::Int16 => Value::Int16(buf.load::<i16>()?),
        Type::UInt16 => Value::UInt16(buf.load::<u16>()?),
        Type::Int32 => Value::Int32(buf.load::<i32>()?),
        Type::UInt32 => Value::UInt32(buf.load::<u32>()?),
        Type::Int64 => Value::Int64(buf.load::<i64>()?),
        Type::UInt64 => Value::UInt64(buf.load::<u64>()?),
        Type::Double => Value::Double(buf.load::<f64>()?),
        Type::UnixFd => Value::UnixFd(buf.load::<u32>()?),
        Type::String => {
            let bytes = read_string(buf)?;

            match from_utf8(bytes) {
                Ok(s) => Value::String(s.to_owned()),
                Err(error) => {
                    tracing::warn!(?error, string = ?LossyStr::new(bytes), "Keeping invalid UTF-8 string as raw bytes");
                    Value::Unchecked(bytes.to_vec())
                }
            }
        }
        Type::ObjectPath => {
            let bytes = read_string(buf)?;

            match from_utf8(bytes) {
                Ok(path) if is_valid_object_path(path) => Value::ObjectPath(path.to_owned()),
                Ok(path) => return Err(ErrorKind::InvalidObjectPath(path.into()).into()),
                Err(error) => {
                    tracing::warn!(?error, path = ?LossyStr::new(bytes), "Keeping invalid UTF-8 object path as raw bytes");
                    Value::Unchecked(bytes.to_vec())
                }
            }
        }
        Type::Signature => Value::Signature(read_signature(buf)?),
        Type::Variant => {
            let depth = enter(depth)?;
            let signature = read_signature(buf)?;

            let Some(inner) = signature.single_type() else {
                return Err(SignatureError::ExpectedSingleCompleteType.into());
            };

            let value = decode_at(buf, inner, depth)?;
            Value::Variant(inner.clone(), Box::new(value))
        }
        Type::Array(element) => {
            let depth = enter(depth)?;
            let end = read_array_bounds(buf, element)?;

            if let Type::DictEntry(key_ty, value_ty) = &**element {
                let mut entries = Vec::<(Value, Value)>::new();
                let mut index = HashMap::<DictKey, usize>::new();

                while buf.tell() < end {
                    buf.read_pad(8)?;
                    let key = decode_at(buf, key_ty, depth)?;
                    let value = decode_at(buf, value_ty, depth)?;
                    check_array_end(buf, end)?;

                    // Duplicate keys keep their first position and the last value.
                    match index.entry(DictKey::new(&key)?) {
                        Entry::Occupied(e) => entries[*e.get()].1 = value,
                        Entry::Vacant(e) => {
                            e.insert(entries.len());
                            entries.push((key, value));
                        }
                    }
                }

                Value::Dict(entries)
            } else {
                let mut values = Vec::new();

                while buf.tell() < end {
                    values.push(decode_at(buf, element, depth)?);
                    check_array_end(buf, end)?;
                }

                Value::Array(values)
            }
        }
        Type::Struct(types) => {
            let depth = enter(depth)?;
            buf.read_pad(8)?;

            let mut fields = Vec::with_capacity(types.len());

            for ty in types {
                fields.push(decode_at(buf, ty, depth)?);
            }

            Value::Struct(fields)
        }
        Type::DictEntry(key_ty, value_ty) => {
            let depth = enter(depth)?;
            buf.read_pad(8)?;
            let key = decode_at(buf, key_ty, depth)?;
            let value = decode_at(buf, value_ty, depth)?;
            Value::Struct(vec![key, value])
        }
    };

    Ok(value)
}

/// Hashable projection of a basic value used to find duplicate dict keys.
///
/// Doubles are compared by their bit pattern.
#[derive(PartialEq, Eq, Hash)]
enum DictKey {
    Number(u8, u64),
    Text(u8, Vec<u8>),
}

impl DictKey {
    fn new(value: &Value) -> Result<Self> {
        let key = match value {
            Value::Byte(v) => DictKey::Number(0, u64::from(*v)),
            Value::Boolean(v) => DictKey::Number(1, u64::from(*v)),
            Value::Int16(v) => DictKey::Number(2, *v as u64),
            Value::UInt16(v) => DictKey::Number(3, u64::from(*v)),
            Value::Int32(v) => DictKey::Number(4, *v as u64),
            Value::UInt32(v) => DictKey::Number(5, u64::from(*v)),
            Value::Int64(v) => DictKey::Number(6, *v as u64),
            Value::UInt64(v) => DictKey::Number(7, *v),
            Value::Double(v) => DictKey::Number(8, v.to_bits()),
            Value::UnixFd(v) => DictKey::Number(9, u64::from(*v)),
            Value::String(v) => DictKey::Text(10, v.as_bytes().to_vec()),
            Value::ObjectPath(v) => DictKey::Text(11, v.as_bytes().to_vec()),
            Value::Signature(v) => DictKey::Text(12, v.as_str().as_bytes().to_vec()),
            Value::Unchecked(v) => DictKey::Text(13, v.to_vec()),
            other => {
                return Err(ErrorKind::TypeMismatch {
                    expected: "basic type".into(),
                    found: other.kind_name(),
                }
                .into());
            }
        };

        Ok(key)
    }
}

fn enter(depth: usize) -> Result<usize> {
    let depth = depth + 1;

    if depth > MAX_DEPTH {
        return Err(SignatureError::ExceededMaximumDepth.into());
    }

    Ok(depth)
}

/// Read the length of an array and the padding before its first element,
/// returning the position the array ends at.
pub(crate) fn read_array_bounds(buf: &mut Marshaller, element: &Type) -> Result<usize> {
    let len = buf.load::<u32>()?;

    if len as usize > MAX_ARRAY_LENGTH {
        return Err(ErrorKind::ArrayTooLong(len).into());
    }

    buf.read_pad(element.alignment())?;

    if buf.remaining() < len as usize {
        return Err(ErrorKind::NotEnoughData.into());
    }

    Ok(buf.tell() + len as usize)
}

#[inline]
fn check_array_end(buf: &Marshaller, end: usize) -> Result<()> {
    if buf.tell() > end {
        return Err(ErrorKind::ArrayLengthMismatch.into());
    }

    Ok(())
}

fn read_string(buf: &mut Marshaller) -> Result<&[u8]> {
    let len = buf.load::<u32>()?;
    let bytes = buf.load_slice_nul(len as usize)?;

    if bytes.contains(&0) {
        return Err(ErrorKind::InteriorNul.into());
    }

    Ok(bytes)
}

fn read_signature(buf: &mut Marshaller) -> Result<Signature> {
    let len = buf.load::<u8>()?;
    let bytes = buf.load_slice_nul(len as usize)?;
    Ok(Signature::from_bytes(bytes)?)
}
