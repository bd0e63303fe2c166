use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;

use crate::connection::ConnectionState;
use crate::SignatureError;

/// Result alias using an [`Error`] as the error type by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by this crate.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Self { kind }
    }

    /// Test if the error indicates that the operation would block.
    #[inline]
    pub(crate) fn would_block(&self) -> bool {
        matches!(self.kind, ErrorKind::WouldBlock)
    }

    /// Test if more bytes need to be buffered before the operation can
    /// succeed.
    #[inline]
    pub(crate) fn not_enough_data(&self) -> bool {
        matches!(self.kind, ErrorKind::NotEnoughData)
    }

    /// Test if the error is caused by a malformed signature.
    #[inline]
    pub fn is_signature(&self) -> bool {
        matches!(self.kind, ErrorKind::Signature(..))
    }

    /// Test if the error indicates that the peer went away.
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        matches!(self.kind, ErrorKind::Disconnected)
    }

    /// Test if the error indicates that every candidate bus address failed.
    #[inline]
    pub fn is_no_server(&self) -> bool {
        matches!(self.kind, ErrorKind::NoServerAvailable)
    }

    /// Test if the error is a value that doesn't match its declared type.
    #[inline]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self.kind, ErrorKind::TypeMismatch { .. })
    }

    /// Test if the error was sent by the remote end as an ERROR message.
    #[inline]
    pub fn is_remote(&self) -> bool {
        matches!(self.kind, ErrorKind::ResponseError(..))
    }

    /// The error name of an error reply sent by the remote end, such as
    /// `org.freedesktop.DBus.Error.ServiceUnknown`.
    pub fn error_name(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::ResponseError(error_name, _) => Some(error_name),
            _ => None,
        }
    }
}

impl From<SignatureError> for Error {
    #[inline]
    fn from(error: SignatureError) -> Self {
        Self::new(ErrorKind::Signature(error))
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::WouldBlock => Self::new(ErrorKind::WouldBlock),
            io::ErrorKind::UnexpectedEof => Self::new(ErrorKind::Disconnected),
            _ => Self::new(ErrorKind::Io(error)),
        }
    }
}

impl From<Utf8Error> for Error {
    #[inline]
    fn from(error: Utf8Error) -> Self {
        Self::new(ErrorKind::Utf8Error(error))
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::Io(error) => error.fmt(f),
            ErrorKind::Signature(error) => error.fmt(f),
            ErrorKind::Utf8Error(error) => error.fmt(f),
            ErrorKind::WouldBlock => write!(f, "Would block"),
            ErrorKind::NotEnoughData => write!(f, "Not enough data buffered"),
            ErrorKind::Disconnected => write!(f, "Connection closed by peer"),
            ErrorKind::Closed => write!(f, "Connection is closed"),
            ErrorKind::NoServerAvailable => write!(f, "No D-Bus server available"),
            ErrorKind::MissingBus => write!(f, "Missing bus address"),
            ErrorKind::InvalidAddress(address) => {
                write!(f, "Invalid D-Bus address `{address}`")
            }
            ErrorKind::UnsupportedTransport(transport) => {
                write!(f, "Unsupported transport `{transport}`")
            }
            ErrorKind::InvalidSasl => write!(f, "Invalid SASL message"),
            ErrorKind::InvalidSaslResponse => write!(f, "Invalid SASL command"),
            ErrorKind::AuthenticationRejected => {
                write!(f, "No authentication mechanism was accepted")
            }
            ErrorKind::MissingCookie(context, id) => {
                write!(f, "Missing cookie `{id}` in keyring `{context}`")
            }
            ErrorKind::InvalidState(state) => write!(f, "Invalid connection state `{state}`"),
            ErrorKind::InvalidProtocol => write!(f, "Invalid protocol"),
            ErrorKind::InvalidEndianness(b) => write!(f, "Invalid byte order marker {b:#04x}"),
            ErrorKind::InvalidVersion(version) => {
                write!(f, "Unsupported protocol version {version}")
            }
            ErrorKind::UnknownMessageType(ty) => write!(f, "Unknown message type {ty}"),
            ErrorKind::InvalidBoolean(value) => {
                write!(f, "Invalid boolean value {value}, expected 0 or 1")
            }
            ErrorKind::InvalidObjectPath(path) => write!(f, "Invalid object path `{path}`"),
            ErrorKind::InvalidHeaderField(code) => {
                write!(f, "Header field {code} has an unexpected type")
            }
            ErrorKind::NotNullTerminated => write!(f, "String is not null terminated"),
            ErrorKind::InteriorNul => write!(f, "String contains an interior NUL byte"),
            ErrorKind::NonZeroPadding => write!(f, "Alignment padding is not zeroed"),
            ErrorKind::UnknownField(name) => write!(f, "Unknown struct field `{name}`"),
            ErrorKind::MissingPath => write!(f, "Missing required PATH header"),
            ErrorKind::MissingMember => write!(f, "Missing required MEMBER header"),
            ErrorKind::MissingInterface => write!(f, "Missing required INTERFACE header"),
            ErrorKind::MissingReplySerial => write!(f, "Missing required REPLY_SERIAL header"),
            ErrorKind::MissingErrorName => write!(f, "Missing required ERROR_NAME header"),
            ErrorKind::ZeroSerial => write!(f, "Zero in header serial"),
            ErrorKind::ZeroReplySerial => write!(f, "Zero REPLY_SERIAL header"),
            ErrorKind::ArrayTooLong(length) => {
                write!(f, "Array of length {length} is too long (max is 67108864)")
            }
            ErrorKind::BodyTooLong(length) => {
                write!(f, "Body of length {length} is too long (max is 134217728)")
            }
            ErrorKind::ArrayLengthMismatch => {
                write!(f, "Array element crosses the declared array length")
            }
            ErrorKind::BodyLengthMismatch => {
                write!(f, "Body does not match its declared length")
            }
            ErrorKind::TypeMismatch { expected, found } => {
                write!(f, "Expected a value of type `{expected}` but found {found}")
            }
            ErrorKind::ArgumentCount { expected, found } => {
                write!(f, "Expected {expected} arguments but found {found}")
            }
            ErrorKind::SendBufferFull(len) => {
                write!(f, "Send buffer is full ({len} bytes queued)")
            }
            ErrorKind::ResponseError(error_name, message) => {
                write!(f, "Response error: {error_name}: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(error) => Some(error),
            ErrorKind::Signature(error) => Some(error),
            ErrorKind::Utf8Error(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Io(io::Error),
    Signature(SignatureError),
    Utf8Error(Utf8Error),
    WouldBlock,
    NotEnoughData,
    Disconnected,
    Closed,
    NoServerAvailable,
    MissingBus,
    InvalidAddress(Box<str>),
    UnsupportedTransport(Box<str>),
    InvalidSasl,
    InvalidSaslResponse,
    AuthenticationRejected,
    MissingCookie(Box<str>, Box<str>),
    InvalidState(ConnectionState),
    InvalidProtocol,
    InvalidEndianness(u8),
    InvalidVersion(u8),
    UnknownMessageType(u8),
    InvalidBoolean(u32),
    InvalidObjectPath(Box<str>),
    InvalidHeaderField(u8),
    NotNullTerminated,
    InteriorNul,
    NonZeroPadding,
    UnknownField(Box<str>),
    MissingPath,
    MissingMember,
    MissingInterface,
    MissingReplySerial,
    MissingErrorName,
    ZeroSerial,
    ZeroReplySerial,
    ArrayTooLong(u32),
    BodyTooLong(usize),
    ArrayLengthMismatch,
    BodyLengthMismatch,
    TypeMismatch {
        expected: Box<str>,
        found: &'static str,
    },
    ArgumentCount {
        expected: usize,
        found: usize,
    },
    SendBufferFull(usize),
    ResponseError(Box<str>, Box<str>),
}
