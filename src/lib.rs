//! An incremental D-Bus client protocol stack.
//!
//! The stack is layered so that each part can be used on its own:
//!
//! * [`Signature`] and [`Type`] describe values, which are represented
//!   dynamically by [`Value`].
//! * [`Marshaller`] encodes and decodes values following the alignment
//!   rules of the wire format.
//! * [`render`] and [`parse`] turn a [`Message`] into bytes and back, where
//!   parsing can be retried as bytes trickle in.
//! * [`sasl`] implements the authentication handshake which precedes the
//!   binary protocol.
//! * [`Connection`] ties it together over a non-blocking unix socket, and
//!   [`Client`] drives a connection using tokio.
//!
//! # Examples
//!
//! ```
//! use std::num::NonZeroU32;
//!
//! use dbus_stream::{parse, render, Endianness, Marshaller, Message, Signature, Value};
//!
//! let serial = NonZeroU32::MIN;
//!
//! let m = Message::method_call("/org/freedesktop/DBus", "NameHasOwner", serial)
//!     .with_destination("org.freedesktop.DBus")
//!     .with_body(Signature::new("s")?, vec![Value::from("org.example.Service")]);
//!
//! let bytes = render(&m)?;
//!
//! let mut buf = Marshaller::new(Endianness::NATIVE);
//! buf.extend_from_slice(&bytes[..10]);
//! assert!(parse(&mut buf)?.is_none());
//!
//! buf.extend_from_slice(&bytes[10..]);
//! assert_eq!(parse(&mut buf)?, Some(m));
//! # Ok::<_, dbus_stream::Error>(())
//! ```


#[macro_use]
mod macros;

#[doc(inline)]
pub use self::error::{Error, Result};
mod error;

#[doc(inline)]
pub use self::proto::{Endianness, Flags, MessageType};
mod proto;

#[doc(inline)]
pub use self::signature::{Signature, SignatureError, Type};
mod signature;

#[doc(inline)]
pub use self::value::{Fields, Value};
mod value;

pub use self::object_path::is_valid_object_path;
pub mod object_path;

pub use self::buf::Marshaller;
mod buf;

mod frame;

mod ser;

mod de;

#[doc(inline)]
pub use self::message::{frame_length, parse, render, HeaderFields, Message, MessageKind};
mod message;

pub mod sasl;

#[doc(inline)]
pub use self::address::Address;
pub mod address;

#[doc(inline)]
pub use self::connection::{
    Connection, ConnectionBuilder, ConnectionState, PendingCall, SignalHandlerId,
};
mod connection;

#[cfg(feature = "tokio")]
#[doc(inline)]
pub use self::client::Client;
#[cfg(feature = "tokio")]
mod client;

pub mod org_freedesktop_dbus;

pub mod notifications;

mod lossy_str;

mod utils;
