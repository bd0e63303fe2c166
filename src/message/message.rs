use std::num::NonZeroU32;

use crate::proto::{Endianness, Flags};
use crate::{MessageKind, Signature, Value};

/// A D-Bus message.
///
/// The body is kept decoded as a sequence of [`Value`]s typed by the
/// message's [`Signature`].
///
/// # Examples
///
/// ```
/// use std::num::NonZeroU32;
///
/// use dbus_stream::{Message, MessageKind, Signature, Value};
///
/// let serial = NonZeroU32::MIN;
///
/// let m = Message::method_call("/org/freedesktop/DBus", "NameHasOwner", serial)
///     .with_interface("org.freedesktop.DBus")
///     .with_destination("org.freedesktop.DBus")
///     .with_body(Signature::new("s")?, vec![Value::from("org.freedesktop.Notifications")]);
///
/// assert!(matches!(m.kind(), MessageKind::MethodCall { .. }));
/// assert_eq!(m.member(), Some("NameHasOwner"));
/// assert_eq!(m.signature().as_str(), "s");
/// # Ok::<_, dbus_stream::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub(super) kind: MessageKind,
    pub(super) serial: NonZeroU32,
    pub(super) flags: Flags,
    pub(super) interface: Option<Box<str>>,
    pub(super) destination: Option<Box<str>>,
    pub(super) sender: Option<Box<str>>,
    pub(super) signature: Signature,
    pub(super) body: Vec<Value>,
    pub(super) endianness: Endianness,
    pub(super) unix_fds: Option<u32>,
}

impl Message {
    fn new(kind: MessageKind, serial: NonZeroU32) -> Self {
        Self {
            kind,
            serial,
            flags: Flags::EMPTY,
            interface: None,
            destination: None,
            sender: None,
            signature: Signature::empty(),
            body: Vec::new(),
            endianness: Endianness::NATIVE,
            unix_fds: None,
        }
    }

    /// Construct a method call.
    pub fn method_call(path: &str, member: &str, serial: NonZeroU32) -> Self {
        Self::new(
            MessageKind::MethodCall {
                path: path.into(),
                member: member.into(),
            },
            serial,
        )
    }

    /// Construct a signal.
    ///
    /// Signals must have an interface before they can be sent, see
    /// [`Message::with_interface`].
    pub fn signal(path: &str, member: &str, serial: NonZeroU32) -> Self {
        Self::new(
            MessageKind::Signal {
                path: path.into(),
                member: member.into(),
            },
            serial,
        )
    }

    /// Construct an empty reply to this message.
    ///
    /// ```
    /// use std::num::NonZeroU32;
    ///
    /// use dbus_stream::{Message, MessageKind};
    ///
    /// let call = Message::method_call("/", "Ping", NonZeroU32::MIN)
    ///     .with_sender(":1.7")
    ///     .with_destination(":1.1");
    ///
    /// let reply = call.method_return(NonZeroU32::MIN.saturating_add(1));
    /// assert_eq!(reply.kind().reply_serial(), Some(call.serial()));
    /// assert_eq!(reply.destination(), Some(":1.7"));
    /// assert_eq!(reply.sender(), Some(":1.1"));
    /// ```
    pub fn method_return(&self, serial: NonZeroU32) -> Self {
        let mut m = Self::new(
            MessageKind::MethodReturn {
                reply_serial: self.serial,
            },
            serial,
        );

        m.destination = self.sender.clone();
        m.sender = self.destination.clone();
        m.endianness = self.endianness;
        m
    }

    /// Construct an error reply to this message.
    pub fn error(&self, error_name: &str, serial: NonZeroU32) -> Self {
        let mut m = Self::new(
            MessageKind::Error {
                error_name: error_name.into(),
                reply_serial: self.serial,
            },
            serial,
        );

        m.destination = self.sender.clone();
        m.sender = self.destination.clone();
        m.endianness = self.endianness;
        m
    }

    /// Get the kind of the message.
    #[inline]
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Get the serial of the message.
    #[inline]
    pub fn serial(&self) -> NonZeroU32 {
        self.serial
    }

    /// Modify the serial of the message.
    pub fn with_serial(self, serial: NonZeroU32) -> Self {
        Self { serial, ..self }
    }

    /// Get the flags of the message.
    #[inline]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Modify the flags of the message.
    pub fn with_flags(self, flags: Flags) -> Self {
        Self { flags, ..self }
    }

    /// Get the interface of the message.
    #[inline]
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Modify the interface of the message.
    pub fn with_interface(self, interface: &str) -> Self {
        Self {
            interface: Some(interface.into()),
            ..self
        }
    }

    /// Get the destination of the message.
    #[inline]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Modify the destination of the message.
    pub fn with_destination(self, destination: &str) -> Self {
        Self {
            destination: Some(destination.into()),
            ..self
        }
    }

    /// Get the sender of the message.
    #[inline]
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Modify the sender of the message.
    pub fn with_sender(self, sender: &str) -> Self {
        Self {
            sender: Some(sender.into()),
            ..self
        }
    }

    /// Get the signature of the body.
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Get the decoded body.
    #[inline]
    pub fn body(&self) -> &[Value] {
        &self.body
    }

    /// Take the decoded body out of the message.
    pub fn into_body(self) -> Vec<Value> {
        self.body
    }

    /// Modify the body and its signature.
    ///
    /// The values are checked against the signature when the message is
    /// rendered.
    pub fn with_body(self, signature: Signature, body: Vec<Value>) -> Self {
        Self {
            signature,
            body,
            ..self
        }
    }

    /// The byte order the message is or will be encoded with.
    #[inline]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Modify the byte order used when rendering the message.
    pub fn with_endianness(self, endianness: Endianness) -> Self {
        Self { endianness, ..self }
    }

    /// The number of unix file descriptors declared to accompany the message.
    #[inline]
    pub fn unix_fds(&self) -> Option<u32> {
        self.unix_fds
    }

    /// The object path of a method call or signal.
    pub fn path(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::MethodCall { path, .. } | MessageKind::Signal { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The member of a method call or signal.
    pub fn member(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::MethodCall { member, .. } | MessageKind::Signal { member, .. } => {
                Some(member)
            }
            _ => None,
        }
    }

    /// The error name of an error reply.
    pub fn error_name(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Error { error_name, .. } => Some(error_name),
            _ => None,
        }
    }

    /// The human readable message of an error reply, which by convention is
    /// its first argument if that is a string.
    pub fn error_message(&self) -> Option<&str> {
        if !matches!(self.kind, MessageKind::Error { .. }) {
            return None;
        }

        self.body.first().and_then(Value::as_str)
    }
}
