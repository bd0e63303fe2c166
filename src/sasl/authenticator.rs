use std::fmt;

use crate::error::{ErrorKind, Result};
use crate::lossy_str::LossyStr;

use super::mechanism::mechanism_names;
use super::{Mechanism, SaslResponse};

/// The state of the SASL exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthState {
    /// Nothing has been sent yet.
    Init,
    /// `AUTH` has been sent for the mechanism at the given index.
    Waiting(usize),
    /// `CANCEL` has been sent for the mechanism at the given index, and a
    /// `REJECTED` is expected.
    Cancelled(usize),
    /// `OK` was received and `BEGIN` sent.
    Authenticated,
    /// Every mechanism has been rejected.
    Failed,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::Init => write!(f, "init"),
            AuthState::Waiting(index) => write!(f, "waiting ({index})"),
            AuthState::Cancelled(index) => write!(f, "cancelled ({index})"),
            AuthState::Authenticated => write!(f, "authenticated"),
            AuthState::Failed => write!(f, "failed"),
        }
    }
}

/// The outcome of feeding a line to the [`Authenticator`].
#[derive(Debug, PartialEq, Eq)]
pub enum AuthStep {
    /// More lines from the server are needed.
    Continue,
    /// Authentication succeeded and `BEGIN` has been written. Carries the
    /// GUID of the server.
    Authenticated(Box<str>),
    /// Every mechanism was tried and rejected.
    Exhausted,
}

/// Client side of the SASL exchange which precedes the binary protocol.
///
/// The authenticator doesn't perform any I/O. Commands to send are appended
/// to an output buffer and lines received from the server are fed to
/// [`Authenticator::handle_line`].
///
/// # Examples
///
/// ```
/// use dbus_stream::sasl::{Anonymous, AuthStep, Authenticator};
///
/// let mut auth = Authenticator::new(vec![Box::new(Anonymous)]);
/// let mut out = Vec::new();
///
/// assert_eq!(auth.start(&mut out), AuthStep::Continue);
/// assert!(out.starts_with(b"\0AUTH ANONYMOUS "));
///
/// out.clear();
/// let step = auth.handle_line(b"OK 1234deadbeef\r\n", &mut out)?;
/// assert_eq!(step, AuthStep::Authenticated("1234deadbeef".into()));
/// assert_eq!(out, b"BEGIN\r\n");
/// # Ok::<_, dbus_stream::Error>(())
/// ```
pub struct Authenticator {
    mechanisms: Vec<Box<dyn Mechanism>>,
    state: AuthState,
    /// Mechanisms supported by the server, once it has told us.
    supported: Option<Vec<Box<str>>>,
}

impl Authenticator {
    /// Construct an authenticator which tries `mechanisms` in order.
    pub fn new(mechanisms: Vec<Box<dyn Mechanism>>) -> Self {
        Self {
            mechanisms,
            state: AuthState::Init,
            supported: None,
        }
    }

    /// Reset the authenticator so that it can be used with a new server.
    pub fn reset(&mut self) {
        self.state = AuthState::Init;
        self.supported = None;
    }

    /// Test if authentication has completed.
    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Start authenticating, writing the initial NUL byte and the first
    /// `AUTH` command to `out`.
    pub fn start(&mut self, out: &mut Vec<u8>) -> AuthStep {
        out.push(0);
        self.auth_from(0, out)
    }

    /// Handle one line received from the server.
    ///
    /// # Errors
    ///
    /// Errors if the server sends something that doesn't fit the exchange.
    pub fn handle_line(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<AuthStep> {
        let response = SaslResponse::parse(line)?;

        match (self.state, response) {
            (AuthState::Waiting(..), SaslResponse::Ok(guid)) => {
                let Some(guid) = guid.as_str() else {
                    return Err(ErrorKind::InvalidSasl.into());
                };

                tracing::debug!(guid, "Authenticated");
                out.extend_from_slice(b"BEGIN\r\n");
                self.state = AuthState::Authenticated;
                Ok(AuthStep::Authenticated(guid.into()))
            }
            (AuthState::Waiting(index), SaslResponse::Data(data)) => {
                let mechanism = &mut self.mechanisms[index];

                match mechanism.challenge(&data) {
                    Ok(response) => {
                        write_command(out, "DATA", &response);
                    }
                    Err(error) => {
                        tracing::debug!(
                            mechanism = mechanism.name(),
                            %error,
                            "Cancelling mechanism which can't answer challenge"
                        );

                        out.extend_from_slice(b"CANCEL\r\n");
                        self.state = AuthState::Cancelled(index);
                    }
                }

                Ok(AuthStep::Continue)
            }
            (AuthState::Waiting(index), SaslResponse::Error(message)) => {
                tracing::debug!(
                    mechanism = self.mechanisms[index].name(),
                    message = ?LossyStr::new(message),
                    "Server reported error"
                );

                out.extend_from_slice(b"CANCEL\r\n");
                self.state = AuthState::Cancelled(index);
                Ok(AuthStep::Continue)
            }
            (
                AuthState::Waiting(index) | AuthState::Cancelled(index),
                SaslResponse::Rejected(list),
            ) => {
                tracing::debug!(
                    mechanism = self.mechanisms[index].name(),
                    supported = ?LossyStr::new(list),
                    "Mechanism rejected"
                );

                self.supported = Some(mechanism_names(list));
                Ok(self.auth_from(index + 1, out))
            }
            (state, response) => {
                tracing::debug!(%state, ?response, "Unexpected SASL response");
                Err(ErrorKind::InvalidSaslResponse.into())
            }
        }
    }

    /// Send `AUTH` for the first usable mechanism at or after `from`.
    fn auth_from(&mut self, from: usize, out: &mut Vec<u8>) -> AuthStep {
        for index in from..self.mechanisms.len() {
            let mechanism = &mut self.mechanisms[index];
            let name = mechanism.name();

            if let Some(supported) = &self.supported {
                if !supported.iter().any(|s| **s == *name) {
                    tracing::trace!(mechanism = name, "Skipping mechanism not supported by server");
                    continue;
                }
            }

            let initial = match mechanism.initial_response() {
                Ok(initial) => initial,
                Err(error) => {
                    tracing::debug!(mechanism = name, %error, "Skipping mechanism");
                    continue;
                }
            };

            tracing::trace!(mechanism = name, "Trying mechanism");

            out.extend_from_slice(b"AUTH ");
            out.extend_from_slice(name.as_bytes());

            if let Some(initial) = initial {
                out.push(b' ');
                out.extend_from_slice(hex::encode(initial).as_bytes());
            }

            out.extend_from_slice(b"\r\n");
            self.state = AuthState::Waiting(index);
            return AuthStep::Continue;
        }

        self.state = AuthState::Failed;
        AuthStep::Exhausted
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.mechanisms.iter().map(|m| m.name()).collect::<Vec<_>>();

        f.debug_struct("Authenticator")
            .field("mechanisms", &names)
            .field("state", &self.state)
            .field("supported", &self.supported)
            .finish()
    }
}

/// Write a command with an optional hex encoded payload.
fn write_command(out: &mut Vec<u8>, command: &str, payload: &[u8]) {
    out.extend_from_slice(command.as_bytes());

    if !payload.is_empty() {
        out.push(b' ');
        out.extend_from_slice(hex::encode(payload).as_bytes());
    }

    out.extend_from_slice(b"\r\n");
}
