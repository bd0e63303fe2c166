use crate::error::{ErrorKind, Result};
use crate::utils::{split_once, trim_end};

use super::Guid;

/// A SASL command sent by the server.
#[derive(Debug, PartialEq)]
pub enum SaslResponse<'a> {
    /// `OK <guid>`: the client is authenticated.
    Ok(&'a Guid),
    /// `REJECTED <mechanisms>`: the current mechanism was rejected, the
    /// payload lists the mechanisms the server supports.
    Rejected(&'a [u8]),
    /// `DATA <hex>`: a challenge for the current mechanism, hex decoded.
    Data(Vec<u8>),
    /// `ERROR [message]`: the server didn't understand the last command.
    Error(&'a [u8]),
    /// `AGREE_UNIX_FD`: reply to a unix fd negotiation.
    AgreeUnixFd,
}

impl<'a> SaslResponse<'a> {
    /// Parse a single line sent by the server, with or without its line
    /// terminator.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_stream::sasl::SaslResponse;
    ///
    /// let response = SaslResponse::parse(b"REJECTED EXTERNAL ANONYMOUS\r\n")?;
    /// assert_eq!(response, SaslResponse::Rejected(b"EXTERNAL ANONYMOUS"));
    ///
    /// let response = SaslResponse::parse(b"DATA 6869\r\n")?;
    /// assert_eq!(response, SaslResponse::Data(b"hi".to_vec()));
    /// # Ok::<_, dbus_stream::Error>(())
    /// ```
    pub fn parse(line: &'a [u8]) -> Result<Self> {
        let line = trim_end(line);

        let (command, rest) = match split_once(line, b' ') {
            Some((command, rest)) => (command, rest),
            None => (line, &[][..]),
        };

        match command {
            b"OK" => Ok(SaslResponse::Ok(Guid::new(rest))),
            b"REJECTED" => Ok(SaslResponse::Rejected(rest)),
            b"DATA" => match hex::decode(rest) {
                Ok(data) => Ok(SaslResponse::Data(data)),
                Err(..) => Err(ErrorKind::InvalidSasl.into()),
            },
            b"ERROR" => Ok(SaslResponse::Error(rest)),
            b"AGREE_UNIX_FD" => Ok(SaslResponse::AgreeUnixFd),
            _ => Err(ErrorKind::InvalidSaslResponse.into()),
        }
    }
}
