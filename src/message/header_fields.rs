use std::num::NonZeroU32;

use crate::error::{ErrorKind, Result};
use crate::proto::HeaderField;
use crate::{Signature, Type, Value};

/// The variable header fields of a message, extracted from the `a(yv)` array
/// in the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct HeaderFields {
    pub path: Option<Box<str>>,
    pub interface: Option<Box<str>>,
    pub member: Option<Box<str>>,
    pub error_name: Option<Box<str>>,
    pub reply_serial: Option<NonZeroU32>,
    pub destination: Option<Box<str>>,
    pub sender: Option<Box<str>>,
    pub signature: Option<Signature>,
    pub unix_fds: Option<u32>,
}

impl HeaderFields {
    /// Fold decoded `(yv)` entries into header fields.
    ///
    /// Unknown field codes are skipped. A known field holding a value of the
    /// wrong type is an error.
    pub(crate) fn from_entries(entries: &[Value]) -> Result<Self> {
        let mut fields = Self::default();

        for entry in entries {
            let Some([code, value]) = entry.as_struct() else {
                return Err(ErrorKind::InvalidProtocol.into());
            };

            let (Some(code), Some((_, value))) = (code.as_u8(), value.as_variant()) else {
                return Err(ErrorKind::InvalidProtocol.into());
            };

            let code = HeaderField::new(code);
            let invalid = || crate::Error::from(ErrorKind::InvalidHeaderField(code.get()));

            match code {
                HeaderField::PATH => match value {
                    Value::ObjectPath(path) => fields.path = Some(path.as_str().into()),
                    _ => return Err(invalid()),
                },
                HeaderField::INTERFACE => fields.interface = Some(string(value).ok_or_else(invalid)?),
                HeaderField::MEMBER => fields.member = Some(string(value).ok_or_else(invalid)?),
                HeaderField::ERROR_NAME => {
                    fields.error_name = Some(string(value).ok_or_else(invalid)?)
                }
                HeaderField::REPLY_SERIAL => {
                    let serial = value.as_u32().ok_or_else(invalid)?;

                    let Some(serial) = NonZeroU32::new(serial) else {
                        return Err(ErrorKind::ZeroReplySerial.into());
                    };

                    fields.reply_serial = Some(serial);
                }
                HeaderField::DESTINATION => {
                    fields.destination = Some(string(value).ok_or_else(invalid)?)
                }
                HeaderField::SENDER => fields.sender = Some(string(value).ok_or_else(invalid)?),
                HeaderField::SIGNATURE => {
                    fields.signature = Some(value.as_signature().ok_or_else(invalid)?.clone())
                }
                HeaderField::UNIX_FDS => fields.unix_fds = Some(value.as_u32().ok_or_else(invalid)?),
                _ => {
                    tracing::trace!(?code, "Skipping unknown header field");
                }
            }
        }

        Ok(fields)
    }

    /// Render the fields which are set as `(yv)` entries in field code order.
    pub(crate) fn to_entries(&self) -> Vec<Value> {
        let mut entries = Vec::new();

        let mut push = |code: HeaderField, ty: Type, value: Value| {
            entries.push(Value::Struct(vec![
                Value::Byte(code.get()),
                Value::variant(ty, value),
            ]));
        };

        if let Some(path) = &self.path {
            push(HeaderField::PATH, Type::ObjectPath, Value::object_path(&**path));
        }

        if let Some(interface) = &self.interface {
            push(HeaderField::INTERFACE, Type::String, Value::from(&**interface));
        }

        if let Some(member) = &self.member {
            push(HeaderField::MEMBER, Type::String, Value::from(&**member));
        }

        if let Some(error_name) = &self.error_name {
            push(HeaderField::ERROR_NAME, Type::String, Value::from(&**error_name));
        }

        if let Some(reply_serial) = self.reply_serial {
            push(HeaderField::REPLY_SERIAL, Type::UInt32, Value::from(reply_serial.get()));
        }

        if let Some(destination) = &self.destination {
            push(HeaderField::DESTINATION, Type::String, Value::from(&**destination));
        }

        if let Some(sender) = &self.sender {
            push(HeaderField::SENDER, Type::String, Value::from(&**sender));
        }

        if let Some(signature) = &self.signature {
            push(HeaderField::SIGNATURE, Type::Signature, Value::from(signature.clone()));
        }

        if let Some(unix_fds) = self.unix_fds {
            push(HeaderField::UNIX_FDS, Type::UInt32, Value::from(unix_fds));
        }

        entries
    }
}

fn string(value: &Value) -> Option<Box<str>> {
    match value {
        Value::String(s) => Some(s.as_str().into()),
        _ => None,
    }
}
