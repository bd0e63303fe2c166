use std::num::NonZeroU32;
use std::sync::OnceLock;

use crate::buf::{padding_to, Marshaller};
use crate::error::{ErrorKind, Result};
use crate::frame::Frame;
use crate::proto::{
    Endianness, Flags, MessageType, FIXED_HEADER, MAX_ARRAY_LENGTH, MAX_BODY_LENGTH, VERSION,
};
use crate::{Fields, HeaderFields, Message, MessageKind, Signature, Type, Value};

/// The layout of the message header as a struct type, with its fields named.
fn header() -> &'static Fields {
    static HEADER: OnceLock<Fields> = OnceLock::new();

    HEADER.get_or_init(|| {
        let ty = Type::Struct(vec![
            Type::Byte,
            Type::Byte,
            Type::Byte,
            Type::Byte,
            Type::UInt32,
            Type::UInt32,
            Type::Array(Box::new(Type::Struct(vec![Type::Byte, Type::Variant]))),
        ]);

        match Fields::new(
            ty,
            &[
                "endianness",
                "message_type",
                "flags",
                "version",
                "body_length",
                "serial",
                "fields",
            ],
        ) {
            Ok(fields) => fields,
            Err(..) => unreachable!("header layout has seven fields"),
        }
    })
}

/// Render a message into bytes ready to be written to the socket.
///
/// # Errors
///
/// Errors if the body doesn't match the message signature, or if a field
/// required by the message kind is missing.
pub fn render(message: &Message) -> Result<Vec<u8>> {
    let types = message.signature.types();

    if types.len() != message.body.len() {
        return Err(ErrorKind::ArgumentCount {
            expected: types.len(),
            found: message.body.len(),
        }
        .into());
    }

    // The body starts 8-aligned after the header, so encoding it on its own
    // gives it the same padding.
    let mut body = Marshaller::new(message.endianness);

    for (ty, value) in types.iter().zip(&message.body) {
        body.write_value(value, ty)?;
    }

    if body.len() > MAX_BODY_LENGTH {
        return Err(ErrorKind::BodyTooLong(body.len()).into());
    }

    let fields = header_fields(message)?;

    let value = header().build([
        ("endianness", Value::Byte(message.endianness.get())),
        ("message_type", Value::Byte(message.kind.message_type().get())),
        ("flags", Value::Byte(message.flags.bits())),
        ("version", Value::Byte(VERSION)),
        ("body_length", Value::UInt32(body.len() as u32)),
        ("serial", Value::UInt32(message.serial.get())),
        ("fields", Value::Array(fields.to_entries())),
    ])?;

    let mut buf = Marshaller::new(message.endianness);
    buf.write_value(&value, header().ty())?;
    buf.write_pad(8);
    buf.extend_from_slice(body.written());
    Ok(buf.into_vec())
}

fn header_fields(message: &Message) -> Result<HeaderFields> {
    let mut fields = HeaderFields {
        interface: message.interface.clone(),
        destination: message.destination.clone(),
        sender: message.sender.clone(),
        unix_fds: message.unix_fds,
        ..HeaderFields::default()
    };

    if !message.signature.is_empty() {
        fields.signature = Some(message.signature.clone());
    }

    match &message.kind {
        MessageKind::MethodCall { path, member } => {
            fields.path = Some(path.clone());
            fields.member = Some(member.clone());
        }
        MessageKind::MethodReturn { reply_serial } => {
            fields.reply_serial = Some(*reply_serial);
        }
        MessageKind::Error {
            error_name,
            reply_serial,
        } => {
            fields.error_name = Some(error_name.clone());
            fields.reply_serial = Some(*reply_serial);
        }
        MessageKind::Signal { path, member } => {
            if message.interface.is_none() {
                return Err(ErrorKind::MissingInterface.into());
            }

            fields.path = Some(path.clone());
            fields.member = Some(member.clone());
        }
    }

    Ok(fields)
}

/// Inspect the fixed part of a header to determine how many bytes the whole
/// message at the start of `bytes` occupies.
///
/// Returns `None` if not enough bytes are available to tell.
///
/// # Errors
///
/// Errors if the fixed header is such that no message boundary can be
/// trusted, in which case the stream can't be resynchronized.
pub fn frame_length(bytes: &[u8]) -> Result<Option<usize>> {
    let Some(fixed) = bytes.get(..FIXED_HEADER) else {
        return Ok(None);
    };

    let endianness = Endianness::new(fixed[0]);

    if !endianness.is_valid() {
        return Err(ErrorKind::InvalidEndianness(fixed[0]).into());
    }

    if fixed[3] != VERSION {
        return Err(ErrorKind::InvalidVersion(fixed[3]).into());
    }

    let body_length = u32::load(&fixed[4..8], endianness) as usize;
    let fields_length = u32::load(&fixed[12..16], endianness) as usize;

    if body_length > MAX_BODY_LENGTH {
        return Err(ErrorKind::BodyTooLong(body_length).into());
    }

    if fields_length > MAX_ARRAY_LENGTH {
        return Err(ErrorKind::InvalidProtocol.into());
    }

    let header_length = FIXED_HEADER + fields_length;
    Ok(Some(header_length + padding_to(header_length, 8) + body_length))
}

/// Parse one message at the read position of `buf`.
///
/// Returns `Ok(None)` if the whole message hasn't been buffered yet, in which
/// case the read position is unchanged and parsing can be retried once more
/// bytes have been appended.
///
/// On errors the read position is also left unchanged. Errors which
/// [`frame_length`] doesn't report only concern this one message, so the
/// caller can skip it using the length reported by [`frame_length`].
///
/// On success the read position is moved past the message.
pub fn parse(buf: &mut Marshaller) -> Result<Option<Message>> {
    let start = buf.tell();

    let Some(total) = frame_length(buf.get())? else {
        return Ok(None);
    };

    if buf.remaining() < total {
        return Ok(None);
    }

    let endianness = Endianness::new(buf.get()[0]);
    let saved_endianness = buf.endianness();

    buf.set_base(start);
    buf.set_endianness(endianness);
    buf.set_limit(Some(start + total));

    let result = parse_frame(buf, start + total);

    buf.set_limit(None);
    buf.set_endianness(saved_endianness);

    match result {
        Ok(message) => {
            buf.seek(start + total);
            Ok(Some(message))
        }
        Err(error) => {
            buf.seek(start);

            // Running out of data inside of a fully buffered frame means that
            // the lengths inside of it are inconsistent.
            if error.not_enough_data() {
                return Err(ErrorKind::BodyLengthMismatch.into());
            }

            Err(error)
        }
    }
}

fn parse_frame(buf: &mut Marshaller, end: usize) -> Result<Message> {
    let header_fields = header();
    let header = buf.read_value(header_fields.ty())?;

    let byte = |name| header_fields.get(&header, name).and_then(Value::as_u8);
    let uint = |name| header_fields.get(&header, name).and_then(Value::as_u32);

    let (Some(endianness), Some(message_type), Some(flags), Some(body_length), Some(serial)) = (
        byte("endianness"),
        byte("message_type"),
        byte("flags"),
        uint("body_length"),
        uint("serial"),
    ) else {
        return Err(ErrorKind::InvalidProtocol.into());
    };

    let Some(entries) = header_fields
        .get(&header, "fields")
        .and_then(Value::as_array)
    else {
        return Err(ErrorKind::InvalidProtocol.into());
    };

    let Some(serial) = NonZeroU32::new(serial) else {
        return Err(ErrorKind::ZeroSerial.into());
    };

    let fields = HeaderFields::from_entries(entries)?;

    buf.read_pad(8)?;

    if buf.tell() + body_length as usize != end {
        return Err(ErrorKind::BodyLengthMismatch.into());
    }

    let kind = message_kind(MessageType::new(message_type), &fields)?;
    let signature = fields.signature.unwrap_or_else(Signature::empty);

    let mut body = Vec::with_capacity(signature.len());

    for ty in signature.types() {
        body.push(buf.read_value(ty)?);
    }

    if buf.tell() != end {
        return Err(ErrorKind::BodyLengthMismatch.into());
    }

    Ok(Message {
        kind,
        serial,
        flags: Flags(flags),
        interface: fields.interface,
        destination: fields.destination,
        sender: fields.sender,
        signature,
        body,
        endianness: Endianness::new(endianness),
        unix_fds: fields.unix_fds,
    })
}

/// Check that the fields required by the message type are present.
fn message_kind(message_type: MessageType, fields: &HeaderFields) -> Result<MessageKind> {
    let kind = match message_type {
        MessageType::METHOD_CALL => MessageKind::MethodCall {
            path: fields.path.clone().ok_or(ErrorKind::MissingPath)?,
            member: fields.member.clone().ok_or(ErrorKind::MissingMember)?,
        },
        MessageType::METHOD_RETURN => MessageKind::MethodReturn {
            reply_serial: fields.reply_serial.ok_or(ErrorKind::MissingReplySerial)?,
        },
        MessageType::ERROR => MessageKind::Error {
            error_name: fields.error_name.clone().ok_or(ErrorKind::MissingErrorName)?,
            reply_serial: fields.reply_serial.ok_or(ErrorKind::MissingReplySerial)?,
        },
        MessageType::SIGNAL => {
            if fields.interface.is_none() {
                return Err(ErrorKind::MissingInterface.into());
            }

            MessageKind::Signal {
                path: fields.path.clone().ok_or(ErrorKind::MissingPath)?,
                member: fields.member.clone().ok_or(ErrorKind::MissingMember)?,
            }
        }
        other => return Err(ErrorKind::UnknownMessageType(other.get()).into()),
    };

    Ok(kind)
}
