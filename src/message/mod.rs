//! Messages and their framing on the wire.

pub use self::message::Message;
mod message;

pub use self::message_kind::MessageKind;
mod message_kind;

pub use self::header_fields::HeaderFields;
mod header_fields;

pub use self::codec::{frame_length, parse, render};
mod codec;

#[cfg(test)]
mod tests;
