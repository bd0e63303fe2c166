use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::num::NonZeroU32;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

use crate::address::Address;
use crate::error::{Error, ErrorKind, Result};
use crate::org_freedesktop_dbus;
use crate::proto::Endianness;
use crate::sasl::{AuthStep, Authenticator};
use crate::utils::find_line;
use crate::{frame_length, parse, render, Marshaller, Message, MessageKind, Signature, Value};

use super::{ConnectionBuilder, PendingCall, Transport};

/// Longest SASL line accepted from the server.
const MAX_LINE_LENGTH: usize = 16384;

type SignalHandler = Box<dyn FnMut(&Message)>;

/// The state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Exchanging SASL commands with the server.
    Authenticating,
    /// Exchanging binary messages.
    Open,
    /// Closed, either by the peer or because no server could be reached.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Authenticating => write!(f, "authenticating"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Identifies a handler registered with [`Connection::listen_for_signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalHandlerId(u64);

/// Tunables of a connection, set through [`ConnectionBuilder`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Config {
    pub(crate) read_chunk: usize,
    pub(crate) max_outgoing: usize,
    pub(crate) hello: bool,
}

/// A connection to a D-Bus server.
///
/// The connection doesn't block and doesn't drive itself. An event loop is
/// expected to wait for the socket returned by [`Connection::fd`] to become
/// readable, or writable if [`Connection::wants_write`] says so, and then
/// call [`Connection::handle_readable`] or [`Connection::handle_writable`].
/// The [`Client`] does this using tokio.
///
/// The connection starts out authenticating. Messages sent before
/// authentication has completed are queued and sent once it has. If
/// authentication with one server address fails, the next candidate address
/// is tried, and when there are none left the connection closes with an
/// error for which [`Error::is_no_server`] returns `true`.
///
/// [`Client`]: crate::Client
pub struct Connection {
    /// Addresses which haven't been tried yet.
    candidates: VecDeque<Address>,
    transport: Option<Transport>,
    state: ConnectionState,
    authenticator: Authenticator,
    config: Config,
    /// Bytes received and not yet processed.
    recv: Marshaller,
    /// Bytes to send, of which the first `sent` have been sent.
    send: Vec<u8>,
    sent: usize,
    /// Messages queued while authenticating.
    queued: Vec<u8>,
    serial: u32,
    pending: HashMap<NonZeroU32, PendingCall>,
    hello_serial: Option<NonZeroU32>,
    signal_handlers: HashMap<Box<str>, Vec<(SignalHandlerId, SignalHandler)>>,
    wildcard_handlers: Vec<(SignalHandlerId, SignalHandler)>,
    next_handler: u64,
    unique_name: Option<Box<str>>,
    server_guid: Option<Box<str>>,
    /// Incremented every time the underlying socket changes.
    generation: u64,
}

impl Connection {
    fn new(candidates: VecDeque<Address>, authenticator: Authenticator, config: Config) -> Self {
        Self {
            candidates,
            transport: None,
            state: ConnectionState::Closed,
            authenticator,
            config,
            recv: Marshaller::new(Endianness::NATIVE),
            send: Vec::new(),
            sent: 0,
            queued: Vec::new(),
            serial: 0,
            pending: HashMap::new(),
            hello_serial: None,
            signal_handlers: HashMap::new(),
            wildcard_handlers: Vec::new(),
            next_handler: 0,
            unique_name: None,
            server_guid: None,
            generation: 0,
        }
    }

    /// Connect to the first candidate address which accepts a connection.
    pub(crate) fn connect(
        candidates: Vec<Address>,
        authenticator: Authenticator,
        config: Config,
    ) -> Result<Self> {
        let mut c = Self::new(candidates.into(), authenticator, config);
        c.next_candidate()?;
        Ok(c)
    }

    /// Authenticate over an already connected stream.
    pub(crate) fn from_stream(
        stream: UnixStream,
        authenticator: Authenticator,
        config: Config,
    ) -> Result<Self> {
        let transport = Transport::from_std(stream)?;
        let mut c = Self::new(VecDeque::new(), authenticator, config);

        if !c.start(transport) {
            c.shutdown(|| ErrorKind::AuthenticationRejected);
            return Err(ErrorKind::AuthenticationRejected.into());
        }

        Ok(c)
    }

    /// Shorthand for connecting to the session bus using the default
    /// configuration.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dbus_stream::Connection;
    ///
    /// let c = Connection::session_bus()?;
    /// # Ok::<_, dbus_stream::Error>(())
    /// ```
    pub fn session_bus() -> Result<Self> {
        ConnectionBuilder::new().session_bus().connect()
    }

    /// Shorthand for connecting to the system bus using the default
    /// configuration.
    pub fn system_bus() -> Result<Self> {
        ConnectionBuilder::new().system_bus().connect()
    }

    /// The state of the connection.
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Test if the connection is open and, if `Hello` was sent, has received
    /// its unique name.
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Open && self.hello_serial.is_none()
    }

    /// The unique name assigned by the bus in reply to `Hello`.
    pub fn unique_name(&self) -> Option<&str> {
        self.unique_name.as_deref()
    }

    /// The GUID of the server, known once authenticated.
    pub fn server_guid(&self) -> Option<&str> {
        self.server_guid.as_deref()
    }

    /// The socket of the connection, if it has one.
    pub fn fd(&self) -> Option<RawFd> {
        self.transport.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// A counter which changes every time the socket returned by
    /// [`Connection::fd`] changes, which happens when the connection fails
    /// over to another address or closes.
    ///
    /// Event loops use this to know when to register the new socket.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Test if there are bytes waiting to be written to the socket.
    #[inline]
    pub fn wants_write(&self) -> bool {
        self.sent < self.send.len()
    }

    /// The number of calls waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Allocate a serial which isn't used by any outstanding call.
    pub fn next_serial(&mut self) -> NonZeroU32 {
        loop {
            self.serial = self.serial.wrapping_add(1);

            let Some(serial) = NonZeroU32::new(self.serial) else {
                continue;
            };

            if !self.pending.contains_key(&serial) && self.hello_serial != Some(serial) {
                return serial;
            }
        }
    }

    /// Construct a method call with a newly allocated serial.
    pub fn method_call(&mut self, path: &str, member: &str) -> Message {
        let serial = self.next_serial();
        Message::method_call(path, member, serial)
    }

    /// Construct a signal with a newly allocated serial.
    pub fn signal(&mut self, path: &str, member: &str, interface: &str) -> Message {
        let serial = self.next_serial();
        Message::signal(path, member, serial).with_interface(interface)
    }

    /// Send a method call and register it as waiting for a reply.
    ///
    /// # Errors
    ///
    /// Errors if the message isn't a method call, if it can't be rendered,
    /// if the send buffer is full, or if the connection is closed.
    pub fn call(&mut self, message: Message) -> Result<PendingCall> {
        if !matches!(message.kind(), MessageKind::MethodCall { .. }) {
            return Err(ErrorKind::InvalidProtocol.into());
        }

        let serial = message.serial();
        self.enqueue(&message)?;

        let call = PendingCall::new(serial);
        self.pending.insert(serial, call.clone());
        Ok(call)
    }

    /// Build and send a method call.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dbus_stream::{Connection, Signature};
    ///
    /// let mut c = Connection::session_bus()?;
    ///
    /// let call = c.call_method(
    ///     "/org/freedesktop/DBus",
    ///     "ListNames",
    ///     Some("org.freedesktop.DBus"),
    ///     Some("org.freedesktop.DBus"),
    ///     Signature::empty(),
    ///     Vec::new(),
    /// )?;
    ///
    /// call.on_return(|reply| println!("{:?}", reply.body()));
    /// # Ok::<_, dbus_stream::Error>(())
    /// ```
    pub fn call_method(
        &mut self,
        path: &str,
        member: &str,
        interface: Option<&str>,
        destination: Option<&str>,
        signature: Signature,
        body: Vec<Value>,
    ) -> Result<PendingCall> {
        let mut m = self.method_call(path, member).with_body(signature, body);

        if let Some(interface) = interface {
            m = m.with_interface(interface);
        }

        if let Some(destination) = destination {
            m = m.with_destination(destination);
        }

        self.call(m)
    }

    /// Build and send a signal. Without a destination the signal is
    /// broadcast to everyone listening for it.
    pub fn emit_signal(
        &mut self,
        path: &str,
        member: &str,
        interface: &str,
        destination: Option<&str>,
        signature: Signature,
        body: Vec<Value>,
    ) -> Result<()> {
        let mut m = self
            .signal(path, member, interface)
            .with_body(signature, body);

        if let Some(destination) = destination {
            m = m.with_destination(destination);
        }

        self.send(m)
    }

    /// Send a message without waiting for a reply.
    ///
    /// # Errors
    ///
    /// Errors if the message can't be rendered, such as a signal without an
    /// interface, if the send buffer is full, or if the connection is closed.
    pub fn send(&mut self, message: Message) -> Result<()> {
        self.enqueue(&message)
    }

    /// Register a handler for incoming signals from `interface`, or for all
    /// signals if `interface` is `None`.
    ///
    /// Handlers for the signal's interface run before the wildcard handlers.
    pub fn listen_for_signal<F>(&mut self, interface: Option<&str>, handler: F) -> SignalHandlerId
    where
        F: 'static + FnMut(&Message),
    {
        let id = SignalHandlerId(self.next_handler);
        self.next_handler += 1;

        let entry = (id, Box::new(handler) as SignalHandler);

        match interface {
            Some(interface) => self
                .signal_handlers
                .entry(interface.into())
                .or_default()
                .push(entry),
            None => self.wildcard_handlers.push(entry),
        }

        id
    }

    /// Remove a signal handler, returning `true` if it was registered.
    pub fn remove_signal_handler(&mut self, id: SignalHandlerId) -> bool {
        if let Some(at) = self.wildcard_handlers.iter().position(|(i, _)| *i == id) {
            drop(self.wildcard_handlers.remove(at));
            return true;
        }

        let Some((interface, handlers)) = self
            .signal_handlers
            .iter_mut()
            .find(|(_, handlers)| handlers.iter().any(|(i, _)| *i == id))
        else {
            return false;
        };

        handlers.retain(|(i, _)| *i != id);

        // Interfaces without handlers are forgotten.
        if handlers.is_empty() {
            let interface = interface.clone();
            self.signal_handlers.remove(&interface);
        }

        true
    }

    #[cfg(test)]
    pub(crate) fn signal_interfaces(&self) -> usize {
        self.signal_handlers.len()
    }

    /// Close the connection, failing every outstanding call.
    pub fn close(&mut self) {
        if self.state != ConnectionState::Closed {
            tracing::debug!("Closing connection");
            self.shutdown(|| ErrorKind::Closed);
        }
    }

    /// Read from the socket until it would block, processing every complete
    /// message or SASL line received.
    ///
    /// # Errors
    ///
    /// Errors if the connection is closed, which includes the peer
    /// disconnecting and every candidate address failing.
    pub fn handle_readable(&mut self) -> Result<()> {
        loop {
            let Some(transport) = &mut self.transport else {
                return Err(ErrorKind::InvalidState(self.state).into());
            };

            match transport.recv_some(&mut self.recv, self.config.read_chunk) {
                Ok(..) => {}
                Err(error) if error.would_block() => return Ok(()),
                Err(error) => return self.transport_failed(error),
            }

            let generation = self.generation;
            self.process_incoming()?;

            // The socket was replaced, so whatever is left on the old one is
            // no longer of interest.
            if self.generation != generation {
                return Ok(());
            }
        }
    }

    /// Write buffered bytes to the socket until it would block or nothing
    /// is left.
    ///
    /// # Errors
    ///
    /// Errors if the connection is closed.
    pub fn handle_writable(&mut self) -> Result<()> {
        while self.sent < self.send.len() {
            let Some(transport) = &mut self.transport else {
                return Err(ErrorKind::InvalidState(self.state).into());
            };

            match transport.send_some(&self.send[self.sent..]) {
                Ok(n) => self.sent += n,
                Err(error) if error.would_block() => return Ok(()),
                Err(error) => return self.transport_failed(error),
            }
        }

        self.send.clear();
        self.sent = 0;
        Ok(())
    }

    fn enqueue(&mut self, message: &Message) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Err(ErrorKind::Closed.into());
        }

        let bytes = render(message)?;
        let queued = self.send.len() - self.sent + self.queued.len();

        if queued + bytes.len() > self.config.max_outgoing {
            return Err(ErrorKind::SendBufferFull(queued).into());
        }

        match self.state {
            ConnectionState::Open => self.send.extend_from_slice(&bytes),
            _ => self.queued.extend_from_slice(&bytes),
        }

        Ok(())
    }

    /// Start authenticating over a new transport.
    ///
    /// Returns `false` if no mechanism could be attempted at all.
    fn start(&mut self, transport: Transport) -> bool {
        self.transport = Some(transport);
        self.state = ConnectionState::Authenticating;
        self.generation += 1;
        self.recv.clear();
        self.send.clear();
        self.sent = 0;
        self.authenticator.reset();

        self.authenticator.start(&mut self.send) != AuthStep::Exhausted
    }

    /// Move on to the next candidate address.
    fn next_candidate(&mut self) -> Result<()> {
        self.transport = None;

        while let Some(address) = self.candidates.pop_front() {
            match Transport::connect(&address) {
                Ok(transport) => {
                    tracing::debug!(%address, "Connected");

                    if self.start(transport) {
                        return Ok(());
                    }

                    tracing::warn!(%address, "No authentication mechanism available");
                }
                Err(error) => {
                    tracing::warn!(%address, %error, "Failed to connect");
                }
            }
        }

        tracing::error!("No D-Bus server available");
        self.shutdown(|| ErrorKind::NoServerAvailable);
        Err(ErrorKind::NoServerAvailable.into())
    }

    fn transport_failed(&mut self, error: Error) -> Result<()> {
        if self.state == ConnectionState::Authenticating {
            tracing::warn!(%error, "Transport failed while authenticating");
            return self.next_candidate();
        }

        if error.is_disconnected() {
            tracing::debug!("Disconnected by peer");
        } else {
            tracing::warn!(%error, "Transport failed");
        }

        self.shutdown(|| ErrorKind::Disconnected);
        Err(error)
    }

    /// Tear down the connection, failing outstanding calls with `reason`.
    fn shutdown(&mut self, reason: fn() -> ErrorKind) {
        self.state = ConnectionState::Closed;
        self.transport = None;
        self.generation += 1;
        self.recv.clear();
        self.send.clear();
        self.sent = 0;
        self.queued.clear();
        self.hello_serial = None;
        self.candidates.clear();

        for (_, call) in self.pending.drain() {
            call.fail(reason().into());
        }
    }

    fn process_incoming(&mut self) -> Result<()> {
        loop {
            match self.state {
                ConnectionState::Authenticating => {
                    let Some(n) = find_line(self.recv.get()) else {
                        if self.recv.remaining() > MAX_LINE_LENGTH {
                            tracing::warn!("SASL line too long");
                            return self.next_candidate();
                        }

                        break;
                    };

                    let step = self
                        .authenticator
                        .handle_line(&self.recv.get()[..n], &mut self.send);

                    self.recv.discard(n)?;

                    match step {
                        Ok(AuthStep::Continue) => {}
                        Ok(AuthStep::Authenticated(guid)) => {
                            self.authenticated(guid)?;
                        }
                        Ok(AuthStep::Exhausted) => {
                            tracing::warn!("Every authentication mechanism was rejected");
                            return self.next_candidate();
                        }
                        Err(error) => {
                            tracing::warn!(%error, "Authentication failed");
                            return self.next_candidate();
                        }
                    }
                }
                ConnectionState::Open => {
                    let total = match frame_length(self.recv.get()) {
                        Ok(Some(total)) => total,
                        Ok(None) => break,
                        Err(error) => {
                            tracing::error!(%error, "Lost track of message boundaries");
                            self.shutdown(|| ErrorKind::InvalidProtocol);
                            return Err(error);
                        }
                    };

                    if self.recv.remaining() < total {
                        break;
                    }

                    match parse(&mut self.recv) {
                        Ok(Some(message)) => self.dispatch(message),
                        Ok(None) => break,
                        Err(error) => {
                            tracing::warn!(%error, length = total, "Dropping malformed message");
                            self.recv.discard(total)?;
                        }
                    }
                }
                ConnectionState::Closed => break,
            }
        }

        self.recv.compact();
        Ok(())
    }

    /// Switch to the binary protocol after `BEGIN` has been queued.
    fn authenticated(&mut self, guid: Box<str>) -> Result<()> {
        self.state = ConnectionState::Open;
        self.server_guid = Some(guid);

        if self.config.hello {
            let serial = self.next_serial();
            let hello = org_freedesktop_dbus::hello_message(serial);
            self.send.extend_from_slice(&render(&hello)?);
            self.hello_serial = Some(serial);
        }

        if !self.queued.is_empty() {
            tracing::trace!(bytes = self.queued.len(), "Sending messages queued while authenticating");
            self.send.append(&mut self.queued);
        }

        Ok(())
    }

    fn dispatch(&mut self, message: Message) {
        match message.kind() {
            MessageKind::MethodReturn { reply_serial }
            | MessageKind::Error { reply_serial, .. } => {
                let reply_serial = *reply_serial;

                if self.hello_serial == Some(reply_serial) {
                    self.hello_reply(&message);
                    return;
                }

                match self.pending.remove(&reply_serial) {
                    Some(call) => call.resolve(message),
                    None => {
                        tracing::warn!(
                            reply_serial = reply_serial.get(),
                            sender = message.sender(),
                            "Dropping reply to unknown call"
                        );
                    }
                }
            }
            MessageKind::Signal { .. } => {
                self.handle_signal(&message);
            }
            MessageKind::MethodCall { path, member } => {
                tracing::warn!(
                    path = &**path,
                    member = &**member,
                    interface = message.interface(),
                    sender = message.sender(),
                    "Incoming method calls are not implemented"
                );
            }
        }
    }

    fn hello_reply(&mut self, message: &Message) {
        self.hello_serial = None;

        if let Some(error_name) = message.error_name() {
            tracing::warn!(error_name, reason = message.error_message(), "Hello was refused");
            return;
        }

        match message.body().first().and_then(Value::as_str) {
            Some(name) => {
                tracing::debug!(name, "Assigned unique name");
                self.unique_name = Some(name.into());
            }
            None => {
                tracing::warn!(signature = message.signature().as_str(), "Hello reply without a name");
            }
        }
    }

    fn handle_signal(&mut self, message: &Message) {
        let mut handled = false;

        if let Some(handlers) = message
            .interface()
            .and_then(|interface| self.signal_handlers.get_mut(interface))
        {
            for (_, handler) in handlers.iter_mut() {
                handler(message);
                handled = true;
            }
        }

        for (_, handler) in self.wildcard_handlers.iter_mut() {
            handler(message);
            handled = true;
        }

        if !handled {
            tracing::trace!(
                interface = message.interface(),
                member = message.member(),
                "Unhandled signal"
            );
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("unique_name", &self.unique_name)
            .field("pending", &self.pending.len())
            .field("wants_write", &self.wants_write())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
