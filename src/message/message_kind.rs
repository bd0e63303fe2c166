use std::num::NonZeroU32;

use crate::proto::MessageType;

/// The kind of a D-Bus message, holding the header fields which are required
/// for that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageKind {
    MethodCall {
        /// The path being called.
        path: Box<str>,
        /// The member being called.
        member: Box<str>,
    },
    MethodReturn {
        /// The serial this is a reply to.
        reply_serial: NonZeroU32,
    },
    Error {
        /// The name of the error.
        error_name: Box<str>,
        /// The serial this is a reply to.
        reply_serial: NonZeroU32,
    },
    Signal {
        /// The path the signal is emitted from.
        path: Box<str>,
        /// The member being signalled.
        member: Box<str>,
    },
}

impl MessageKind {
    /// The message type code of this kind.
    pub fn message_type(&self) -> MessageType {
        match self {
            MessageKind::MethodCall { .. } => MessageType::METHOD_CALL,
            MessageKind::MethodReturn { .. } => MessageType::METHOD_RETURN,
            MessageKind::Error { .. } => MessageType::ERROR,
            MessageKind::Signal { .. } => MessageType::SIGNAL,
        }
    }

    /// The serial this message replies to, if it is a reply.
    pub fn reply_serial(&self) -> Option<NonZeroU32> {
        match *self {
            MessageKind::MethodReturn { reply_serial } => Some(reply_serial),
            MessageKind::Error { reply_serial, .. } => Some(reply_serial),
            _ => None,
        }
    }
}
