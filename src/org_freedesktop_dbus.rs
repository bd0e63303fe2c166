//! Calls to the `org.freedesktop.DBus` interface of the message bus.

use std::num::NonZeroU32;

use crate::error::Result;
use crate::{Connection, Message, PendingCall, Signature, Value};

/// Well known destination name.
pub const DESTINATION: &str = "org.freedesktop.DBus";

/// Well known interface name.
pub const INTERFACE: &str = "org.freedesktop.DBus";

/// Well known D-Bus path.
pub const PATH: &str = "/org/freedesktop/DBus";

/// The interface used to introspect objects.
pub const INTROSPECTABLE: &str = "org.freedesktop.DBus.Introspectable";

raw_set! {
    /// The flags to a `RequestName` call.
    #[repr(u32)]
    pub enum NameFlag {
        /// Allow another connection which requests the name with
        /// [`NameFlag::REPLACE_EXISTING`] to take it over.
        ALLOW_REPLACEMENT = 1,
        /// Take over the name if its current owner allows replacement.
        REPLACE_EXISTING = 2,
        /// Fail instead of queueing for the name if it is already owned.
        DO_NOT_QUEUE = 4,
    }
}

raw_enum! {
    /// The reply to a `RequestName` call.
    #[repr(u32)]
    pub enum NameReply {
        /// The caller is now the primary owner of the name.
        PRIMARY_OWNER = 1,
        /// The name is owned and the caller was placed in the queue for it.
        IN_QUEUE = 2,
        /// The name is owned and the caller asked not to be queued.
        EXISTS = 3,
        /// The caller already owns the name.
        ALREADY_OWNER = 4,
    }
}

impl NameReply {
    /// Read the reply code from the reply to a `RequestName` call.
    pub fn from_reply(reply: &Message) -> Option<Self> {
        reply.body().first()?.as_u32().map(Self::new)
    }
}

/// The `Hello` call which a bus requires as the first message.
pub(crate) fn hello_message(serial: NonZeroU32) -> Message {
    Message::method_call(PATH, "Hello", serial)
        .with_interface(INTERFACE)
        .with_destination(DESTINATION)
}

fn bus_call(c: &mut Connection, member: &str) -> Message {
    c.method_call(PATH, member)
        .with_interface(INTERFACE)
        .with_destination(DESTINATION)
}

fn string_arg(value: &str) -> Result<(Signature, Vec<Value>)> {
    Ok((Signature::new("s")?, vec![Value::from(value)]))
}

/// Call `Hello`, which replies with the unique name of the connection.
///
/// The connection does this on its own unless disabled through
/// [`ConnectionBuilder::hello`].
///
/// [`ConnectionBuilder::hello`]: crate::ConnectionBuilder::hello
pub fn hello(c: &mut Connection) -> Result<PendingCall> {
    let m = bus_call(c, "Hello");
    c.call(m)
}

/// Call `ListNames`, which replies with every name on the bus as `as`.
pub fn list_names(c: &mut Connection) -> Result<PendingCall> {
    let m = bus_call(c, "ListNames");
    c.call(m)
}

/// Call `NameHasOwner`, which replies with a boolean.
pub fn name_has_owner(c: &mut Connection, name: &str) -> Result<PendingCall> {
    let (signature, body) = string_arg(name)?;
    let m = bus_call(c, "NameHasOwner").with_body(signature, body);
    c.call(m)
}

/// Call `AddMatch` to subscribe to messages matching `rule`, such as
/// `type='signal',interface='org.freedesktop.Notifications'`.
pub fn add_match(c: &mut Connection, rule: &str) -> Result<PendingCall> {
    let (signature, body) = string_arg(rule)?;
    let m = bus_call(c, "AddMatch").with_body(signature, body);
    c.call(m)
}

/// Call `RemoveMatch` to undo an earlier [`add_match`].
pub fn remove_match(c: &mut Connection, rule: &str) -> Result<PendingCall> {
    let (signature, body) = string_arg(rule)?;
    let m = bus_call(c, "RemoveMatch").with_body(signature, body);
    c.call(m)
}

/// Call `RequestName` to request a well-known name. The reply is read with
/// [`NameReply::from_reply`].
pub fn request_name(c: &mut Connection, name: &str, flags: NameFlag) -> Result<PendingCall> {
    let m = bus_call(c, "RequestName").with_body(
        Signature::new("su")?,
        vec![Value::from(name), Value::from(flags.bits())],
    );

    c.call(m)
}

/// Call `Introspect` on the object at `path` owned by `destination`, which
/// replies with an XML description as a string.
pub fn introspect(c: &mut Connection, destination: &str, path: &str) -> Result<PendingCall> {
    let m = c
        .method_call(path, "Introspect")
        .with_interface(INTROSPECTABLE)
        .with_destination(destination);

    c.call(m)
}
