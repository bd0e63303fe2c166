use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use crate::address;
use crate::error::Result;
use crate::sasl::{Anonymous, AuthMechanism, Authenticator, CookieSha1, External, Mechanism};

use super::connection::Config;
use super::Connection;

const DEFAULT_READ_CHUNK: usize = 8192;
const DEFAULT_MAX_OUTGOING: usize = 1 << 27;

enum BusKind {
    Session,
    System,
    Address(Box<str>),
}

/// Builder of a [`Connection`].
pub struct ConnectionBuilder {
    bus: BusKind,
    mechanisms: Vec<AuthMechanism>,
    keyring_dir: Option<PathBuf>,
    read_chunk: usize,
    max_outgoing: usize,
    hello: bool,
}

impl ConnectionBuilder {
    /// Construct a new connection builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_stream::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            bus: BusKind::Session,
            mechanisms: AuthMechanism::DEFAULT.to_vec(),
            keyring_dir: None,
            read_chunk: DEFAULT_READ_CHUNK,
            max_outgoing: DEFAULT_MAX_OUTGOING,
            hello: true,
        }
    }

    /// Connect to the session bus (default).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dbus_stream::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new().session_bus().connect()?;
    /// # Ok::<_, dbus_stream::Error>(())
    /// ```
    pub fn session_bus(&mut self) -> &mut Self {
        self.bus = BusKind::Session;
        self
    }

    /// Connect to the system bus.
    pub fn system_bus(&mut self) -> &mut Self {
        self.bus = BusKind::System;
        self
    }

    /// Connect to the first working address in a `;` separated list such as
    /// `unix:path=/run/user/1000/bus;unix:abstract=/tmp/dbus-x`.
    pub fn address(&mut self, address: &str) -> &mut Self {
        self.bus = BusKind::Address(address.into());
        self
    }

    /// Set the authentication mechanisms to attempt, in order.
    ///
    /// Defaults to [`AuthMechanism::DEFAULT`].
    pub fn mechanisms(&mut self, mechanisms: &[AuthMechanism]) -> &mut Self {
        self.mechanisms = mechanisms.to_vec();
        self
    }

    /// Set the directory `DBUS_COOKIE_SHA1` looks for keyrings in.
    ///
    /// Defaults to `~/.dbus-keyrings`.
    pub fn keyring_dir(&mut self, keyring_dir: impl Into<PathBuf>) -> &mut Self {
        self.keyring_dir = Some(keyring_dir.into());
        self
    }

    /// Set the most bytes read from the socket at once. Defaults to 8192.
    pub fn read_chunk(&mut self, read_chunk: usize) -> &mut Self {
        self.read_chunk = read_chunk.max(1);
        self
    }

    /// Set the most bytes which can be waiting to be sent before sending
    /// fails. Defaults to 128 MiB.
    pub fn max_outgoing(&mut self, max_outgoing: usize) -> &mut Self {
        self.max_outgoing = max_outgoing;
        self
    }

    /// Set whether `org.freedesktop.DBus.Hello` is sent once authenticated,
    /// which a message bus requires. Disable it when talking directly to a
    /// peer. Defaults to `true`.
    pub fn hello(&mut self, hello: bool) -> &mut Self {
        self.hello = hello;
        self
    }

    /// Construct and connect a [`Connection`] with the current
    /// configuration.
    ///
    /// Authentication proceeds as the connection is driven.
    ///
    /// # Errors
    ///
    /// Errors if no address is configured for the bus or none of them could
    /// be connected to.
    pub fn connect(&self) -> Result<Connection> {
        let candidates = match &self.bus {
            BusKind::Session => address::session_bus()?,
            BusKind::System => address::system_bus(),
            BusKind::Address(address) => address::parse_list(address),
        };

        Connection::connect(candidates, self.authenticator(), self.config())
    }

    /// Construct a [`Connection`] over an already connected stream, such as
    /// one half of a socket pair.
    pub fn connect_stream(&self, stream: UnixStream) -> Result<Connection> {
        Connection::from_stream(stream, self.authenticator(), self.config())
    }

    fn authenticator(&self) -> Authenticator {
        let mechanisms = self
            .mechanisms
            .iter()
            .map(|m| -> Box<dyn Mechanism> {
                match m {
                    AuthMechanism::External => Box::new(External::new()),
                    AuthMechanism::CookieSha1 => match &self.keyring_dir {
                        Some(dir) => Box::new(CookieSha1::with_keyring_dir(dir)),
                        None => Box::new(CookieSha1::new()),
                    },
                    AuthMechanism::Anonymous => Box::new(Anonymous),
                }
            })
            .collect();

        Authenticator::new(mechanisms)
    }

    fn config(&self) -> Config {
        Config {
            read_chunk: self.read_chunk,
            max_outgoing: self.max_outgoing,
            hello: self.hello,
        }
    }
}

impl Default for ConnectionBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
