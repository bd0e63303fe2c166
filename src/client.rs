use std::os::fd::RawFd;

use tokio::io::unix::AsyncFd;
use tokio::io::{Interest, Ready};

use crate::error::{ErrorKind, Result};
use crate::{Connection, ConnectionState, Message, PendingCall};

/// An asynchronous D-Bus client, driving a [`Connection`] with tokio.
///
/// # Examples
///
/// ```no_run
/// use dbus_stream::{org_freedesktop_dbus, Client};
///
/// # #[tokio::main] async fn main() -> dbus_stream::Result<()> {
/// let mut c = Client::session_bus().await?;
///
/// let call = org_freedesktop_dbus::list_names(c.connection_mut())?;
/// let reply = c.wait(&call).await?;
/// println!("{:?}", reply.body());
/// # Ok(()) }
/// ```
pub struct Client {
    connection: Connection,
    /// The registered socket along with the connection generation it
    /// belongs to.
    fd: Option<(u64, AsyncFd<RawFd>)>,
}

impl Client {
    /// Wrap a connection.
    ///
    /// # Errors
    ///
    /// Errors if the socket can't be registered with the reactor, which
    /// requires a tokio runtime.
    pub fn new(connection: Connection) -> Result<Self> {
        let mut c = Self {
            connection,
            fd: None,
        };

        c.register()?;
        Ok(c)
    }

    /// Shorthand for connecting to the session bus using the default
    /// configuration and waiting until the connection is ready.
    pub async fn session_bus() -> Result<Self> {
        let mut c = Self::new(Connection::session_bus()?)?;
        c.ready().await?;
        Ok(c)
    }

    /// Shorthand for connecting to the system bus using the default
    /// configuration and waiting until the connection is ready.
    pub async fn system_bus() -> Result<Self> {
        let mut c = Self::new(Connection::system_bus()?)?;
        c.ready().await?;
        Ok(c)
    }

    /// Access the underlying connection.
    #[inline]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Access the underlying connection mutably, used to send messages.
    #[inline]
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Take the underlying connection.
    pub fn into_inner(self) -> Connection {
        self.connection
    }

    /// Wait for the socket to become ready and handle whatever it is ready
    /// for.
    ///
    /// This is what makes the connection progress, and needs to be called
    /// for replies and signals to be delivered.
    pub async fn process(&mut self) -> Result<()> {
        self.register()?;

        let Some((_, fd)) = &self.fd else {
            return Err(ErrorKind::InvalidState(self.connection.state()).into());
        };

        let mut interest = Interest::READABLE;

        if self.connection.wants_write() {
            interest |= Interest::WRITABLE;
        }

        let mut guard = fd.ready(interest).await?;
        let ready = guard.ready();

        // Reading first delivers whatever the peer sent before a failed
        // write tears the connection down.
        if ready.is_readable() {
            self.connection.handle_readable()?;
            guard.clear_ready_matching(Ready::READABLE);
        }

        if ready.is_writable() {
            self.connection.handle_writable()?;

            if self.connection.wants_write() {
                guard.clear_ready_matching(Ready::WRITABLE);
            }
        }

        Ok(())
    }

    /// Process the connection until it is authenticated and has nothing
    /// left to send.
    pub async fn flush(&mut self) -> Result<()> {
        while self.connection.wants_write()
            || self.connection.state() == ConnectionState::Authenticating
        {
            self.process().await?;
        }

        Ok(())
    }

    /// Process the connection until it is ready, see
    /// [`Connection::is_ready`].
    pub async fn ready(&mut self) -> Result<()> {
        while !self.connection.is_ready() {
            self.process().await?;
        }

        Ok(())
    }

    /// Process the connection until `call` is resolved, and take its
    /// outcome.
    ///
    /// Error replies are returned as errors for which
    /// [`Error::is_remote`] returns `true`. A reply which arrived right
    /// before the connection was lost is still returned.
    ///
    /// [`Error::is_remote`]: crate::Error::is_remote
    pub async fn wait(&mut self, call: &PendingCall) -> Result<Message> {
        loop {
            if let Some(outcome) = call.take() {
                return outcome;
            }

            if let Err(error) = self.process().await {
                if let Some(outcome) = call.take() {
                    return outcome;
                }

                return Err(error);
            }
        }
    }

    /// Register the socket of the connection with the reactor if it has
    /// changed.
    fn register(&mut self) -> Result<()> {
        let generation = self.connection.generation();

        if matches!(&self.fd, Some((g, _)) if *g == generation) {
            return Ok(());
        }

        // Deregister the old socket before a new one can reuse its number.
        self.fd = None;

        if let Some(fd) = self.connection.fd() {
            tracing::trace!(fd, generation, "Registering socket");
            self.fd = Some((generation, AsyncFd::new(fd)?));
        }

        Ok(())
    }
}
