//! Low level constants of the D-Bus wire protocol.

/// The protocol version this crate speaks.
pub(crate) const VERSION: u8 = 1;

/// Size of the fixed part of the message header, up to and including the
/// length prefix of the header field array.
pub(crate) const FIXED_HEADER: usize = 16;

/// The maximum length of an array in bytes.
pub(crate) const MAX_ARRAY_LENGTH: usize = 1 << 26;

/// The maximum length of a message body in bytes.
pub(crate) const MAX_BODY_LENGTH: usize = 1 << 27;

raw_enum! {
    /// The byte order marker which starts every message.
    #[repr(u8)]
    pub enum Endianness {
        /// Little endian.
        LITTLE = b'l',
        /// Big endian.
        BIG = b'B',
    }
}

impl Endianness {
    /// Native endian.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::LITTLE;
    /// Native endian.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::BIG;

    /// Test if this is a byte order marker we understand.
    pub(crate) fn is_valid(self) -> bool {
        matches!(self, Self::LITTLE | Self::BIG)
    }
}

raw_enum! {
    /// The type of a message.
    #[repr(u8)]
    pub enum MessageType {
        /// Method call. This message type may prompt a reply.
        METHOD_CALL = 1,
        /// Method reply with returned data.
        METHOD_RETURN = 2,
        /// Error reply. If the first argument exists and is a string, it is an
        /// error message.
        ERROR = 3,
        /// Signal emission.
        SIGNAL = 4,
    }
}

raw_set! {
    /// Flags inside of a D-Bus message.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_stream::Flags;
    ///
    /// let flags = Flags::EMPTY | Flags::NO_REPLY_EXPECTED;
    /// assert!(flags & Flags::NO_REPLY_EXPECTED);
    /// assert!(!(flags & Flags::NO_AUTO_START));
    /// ```
    #[repr(u8)]
    pub enum Flags {
        /// An empty set of flags.
        EMPTY = 0,
        /// The sender does not want a METHOD_RETURN or ERROR in response.
        NO_REPLY_EXPECTED = 1,
        /// The bus must not launch an owner for the destination name.
        NO_AUTO_START = 2,
        /// The caller is prepared to wait for interactive authorization.
        ALLOW_INTERACTIVE_AUTHORIZATION = 4,
    }
}

raw_enum! {
    /// Codes of the fields in the header field array.
    #[repr(u8)]
    pub enum HeaderField {
        /// The object a call is sent to or a signal is emitted from.
        PATH = 1,
        /// The interface of a call or signal. Required for signals.
        INTERFACE = 2,
        /// The method or signal name.
        MEMBER = 3,
        /// The name of the error that occurred, for errors.
        ERROR_NAME = 4,
        /// The serial of the message this message is a reply to.
        REPLY_SERIAL = 5,
        /// The connection this message is intended for.
        DESTINATION = 6,
        /// Unique name of the sending connection, filled in by the bus.
        SENDER = 7,
        /// The signature of the body. Absent means an empty body.
        SIGNATURE = 8,
        /// The number of unix file descriptors accompanying the message.
        UNIX_FDS = 9,
    }
}

raw_enum! {
    /// A single type code inside of a signature.
    #[repr(u8)]
    pub enum TypeCode {
        /// 8-bit unsigned integer.
        BYTE = b'y',
        /// Boolean value, 0 is FALSE and 1 is TRUE. Everything else is invalid.
        BOOLEAN = b'b',
        /// 16-bit signed integer.
        INT16 = b'n',
        /// 16-bit unsigned integer.
        UINT16 = b'q',
        /// 32-bit signed integer.
        INT32 = b'i',
        /// 32-bit unsigned integer.
        UINT32 = b'u',
        /// 64-bit signed integer.
        INT64 = b'x',
        /// 64-bit unsigned integer.
        UINT64 = b't',
        /// IEEE 754 double.
        DOUBLE = b'd',
        /// UTF-8 string, nul terminated with no interior nul bytes.
        STRING = b's',
        /// Name of an object instance.
        OBJECT_PATH = b'o',
        /// A type signature.
        SIGNATURE = b'g',
        /// Array.
        ARRAY = b'a',
        OPEN_PAREN = b'(',
        CLOSE_PAREN = b')',
        /// Variant type, the type of the value is part of the value itself.
        VARIANT = b'v',
        OPEN_BRACE = b'{',
        CLOSE_BRACE = b'}',
        /// Unix file descriptor index.
        UNIX_FD = b'h',
    }
}
