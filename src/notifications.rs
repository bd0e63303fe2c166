//! Desktop notifications through `org.freedesktop.Notifications`.

use std::num::NonZeroU32;

use crate::error::Result;
use crate::{Connection, Message, PendingCall, Signature, Type, Value};

/// Well known destination name.
pub const DESTINATION: &str = "org.freedesktop.Notifications";

/// Well known interface name.
pub const INTERFACE: &str = "org.freedesktop.Notifications";

/// Well known path.
pub const PATH: &str = "/org/freedesktop/Notifications";

/// A notification to be shown by the notification server.
///
/// # Examples
///
/// ```no_run
/// use dbus_stream::notifications::Notification;
/// use dbus_stream::Connection;
///
/// let mut c = Connection::session_bus()?;
///
/// let call = Notification::new("Hello")
///     .app_name("demo")
///     .body("From D-Bus")
///     .expire_timeout(5000)
///     .send(&mut c)?;
/// # Ok::<_, dbus_stream::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    app_name: String,
    replaces_id: u32,
    app_icon: String,
    summary: String,
    body: String,
    actions: Vec<String>,
    hints: Vec<(String, Type, Value)>,
    expire_timeout: i32,
}

impl Notification {
    /// Construct a notification with the given summary.
    pub fn new(summary: &str) -> Self {
        Self {
            app_name: String::new(),
            replaces_id: 0,
            app_icon: String::new(),
            summary: summary.to_owned(),
            body: String::new(),
            actions: Vec::new(),
            hints: Vec::new(),
            expire_timeout: -1,
        }
    }

    /// Set the name of the sending application.
    pub fn app_name(self, app_name: &str) -> Self {
        Self {
            app_name: app_name.to_owned(),
            ..self
        }
    }

    /// Replace an earlier notification with the given id.
    pub fn replaces_id(self, replaces_id: u32) -> Self {
        Self {
            replaces_id,
            ..self
        }
    }

    /// Set the icon to show.
    pub fn app_icon(self, app_icon: &str) -> Self {
        Self {
            app_icon: app_icon.to_owned(),
            ..self
        }
    }

    /// Set the body text.
    pub fn body(self, body: &str) -> Self {
        Self {
            body: body.to_owned(),
            ..self
        }
    }

    /// Add an action, identified by `key` and shown as `label`.
    pub fn action(mut self, key: &str, label: &str) -> Self {
        self.actions.push(key.to_owned());
        self.actions.push(label.to_owned());
        self
    }

    /// Add a hint such as `urgency` with a value of the given type.
    pub fn hint(mut self, name: &str, ty: Type, value: impl Into<Value>) -> Self {
        self.hints.push((name.to_owned(), ty, value.into()));
        self
    }

    /// Set the timeout in milliseconds, where `-1` leaves it to the server
    /// and `0` never expires.
    pub fn expire_timeout(self, expire_timeout: i32) -> Self {
        Self {
            expire_timeout,
            ..self
        }
    }

    /// Construct the `Notify` call.
    pub fn to_message(&self, serial: NonZeroU32) -> Result<Message> {
        let actions = self
            .actions
            .iter()
            .map(|a| Value::from(a.as_str()))
            .collect::<Vec<_>>();

        let hints = self
            .hints
            .iter()
            .map(|(name, ty, value)| {
                (
                    Value::from(name.as_str()),
                    Value::variant(ty.clone(), value.clone()),
                )
            })
            .collect::<Vec<_>>();

        let body = vec![
            Value::from(self.app_name.as_str()),
            Value::from(self.replaces_id),
            Value::from(self.app_icon.as_str()),
            Value::from(self.summary.as_str()),
            Value::from(self.body.as_str()),
            Value::Array(actions),
            Value::Dict(hints),
            Value::from(self.expire_timeout),
        ];

        Ok(Message::method_call(PATH, "Notify", serial)
            .with_interface(INTERFACE)
            .with_destination(DESTINATION)
            .with_body(Signature::new("susssasa{sv}i")?, body))
    }

    /// Send the notification. The reply carries the id of the notification,
    /// read with [`notification_id`].
    pub fn send(&self, c: &mut Connection) -> Result<PendingCall> {
        let m = self.to_message(c.next_serial())?;
        c.call(m)
    }
}

/// Read the notification id from the reply to `Notify`.
pub fn notification_id(reply: &Message) -> Option<u32> {
    reply.body().first()?.as_u32()
}

/// Close the notification with the given id.
pub fn close_notification(c: &mut Connection, id: u32) -> Result<PendingCall> {
    let m = c
        .method_call(PATH, "CloseNotification")
        .with_interface(INTERFACE)
        .with_destination(DESTINATION)
        .with_body(Signature::new("u")?, vec![Value::from(id)]);

    c.call(m)
}
