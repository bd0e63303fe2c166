use std::fs;
use std::io;
use std::path::PathBuf;

use rand::rngs::OsRng;
use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::error::{ErrorKind, Result};
use crate::lossy_str::LossyStr;
use crate::utils::split_once;

/// A SASL authentication mechanism.
pub trait Mechanism {
    /// The name of the mechanism as sent in `AUTH`.
    fn name(&self) -> &'static str;

    /// The response sent along with `AUTH`, if any.
    fn initial_response(&mut self) -> Result<Option<Vec<u8>>>;

    /// Answer a `DATA` challenge from the server.
    fn challenge(&mut self, data: &[u8]) -> Result<Vec<u8>>;
}

/// The mechanisms which can be selected when building a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthMechanism {
    /// `EXTERNAL`, using the credentials of the socket.
    External,
    /// `DBUS_COOKIE_SHA1`, using a shared secret in the user's keyring.
    CookieSha1,
    /// `ANONYMOUS`.
    Anonymous,
}

impl AuthMechanism {
    /// The default mechanisms in the order they are attempted.
    pub const DEFAULT: [AuthMechanism; 3] = [
        AuthMechanism::External,
        AuthMechanism::CookieSha1,
        AuthMechanism::Anonymous,
    ];
}

/// Identity of the current user as sent by `EXTERNAL` and
/// `DBUS_COOKIE_SHA1`.
#[cfg(all(unix, feature = "libc"))]
pub(crate) fn current_uid() -> u32 {
    // SAFETY: getuid has no preconditions and can't fail.
    unsafe { libc::getuid() }
}

#[cfg(not(all(unix, feature = "libc")))]
pub(crate) fn current_uid() -> u32 {
    use std::os::unix::fs::MetadataExt;

    // The owner of the home directory stands in for the user.
    dirs::home_dir()
        .and_then(|home| fs::metadata(home).ok())
        .map(|m| m.uid())
        .unwrap_or(0)
}

/// The `EXTERNAL` mechanism, where the server checks the credentials of the
/// peer on the socket against the claimed user id.
#[derive(Debug, Clone)]
pub struct External {
    uid: u32,
}

impl External {
    /// Authenticate as the current user.
    pub fn new() -> Self {
        Self::with_uid(current_uid())
    }

    /// Authenticate as the given user id.
    pub fn with_uid(uid: u32) -> Self {
        Self { uid }
    }
}

impl Default for External {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Mechanism for External {
    fn name(&self) -> &'static str {
        "EXTERNAL"
    }

    fn initial_response(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(Some(self.uid.to_string().into_bytes()))
    }

    fn challenge(&mut self, _: &[u8]) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// The `ANONYMOUS` mechanism.
#[derive(Debug, Clone, Default)]
pub struct Anonymous;

impl Mechanism for Anonymous {
    fn name(&self) -> &'static str {
        "ANONYMOUS"
    }

    fn initial_response(&mut self) -> Result<Option<Vec<u8>>> {
        // Trace information, which the server is free to ignore.
        Ok(Some(concat!("dbus-stream ", env!("CARGO_PKG_VERSION")).as_bytes().to_vec()))
    }

    fn challenge(&mut self, _: &[u8]) -> Result<Vec<u8>> {
        Err(ErrorKind::InvalidSasl.into())
    }
}

/// The `DBUS_COOKIE_SHA1` mechanism.
///
/// The server challenges the client with the name of a keyring, a cookie id
/// and a random string. The client proves that it can read the cookie from
/// its keyring by answering with its own random string and the SHA-1 digest
/// of `server_challenge:client_challenge:cookie`.
#[derive(Debug, Clone)]
pub struct CookieSha1 {
    keyring_dir: PathBuf,
    identity: String,
}

impl CookieSha1 {
    /// Authenticate as the current user using the default keyring directory
    /// `~/.dbus-keyrings`.
    pub fn new() -> Self {
        let keyring_dir = dirs::home_dir()
            .unwrap_or_default()
            .join(".dbus-keyrings");

        Self::with_keyring_dir(keyring_dir)
    }

    /// Authenticate as the current user using cookies in `keyring_dir`.
    pub fn with_keyring_dir(keyring_dir: impl Into<PathBuf>) -> Self {
        Self {
            keyring_dir: keyring_dir.into(),
            identity: current_uid().to_string(),
        }
    }

    /// Override the identity claimed in the initial response.
    pub fn with_identity(self, identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..self
        }
    }

    /// Look up the cookie with the given id in the keyring called `context`.
    fn cookie(&self, context: &str, id: &str) -> Result<String> {
        // Contexts name a file in the keyring directory.
        if context.is_empty() || context.starts_with('.') || context.contains(['/', '\\']) {
            return Err(ErrorKind::InvalidSasl.into());
        }

        let path = self.keyring_dir.join(context);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(ErrorKind::MissingCookie(context.into(), id.into()).into());
            }
            Err(error) => return Err(error.into()),
        };

        for line in contents.lines() {
            let mut parts = line.split_whitespace();

            if let (Some(cookie_id), Some(_created), Some(cookie)) =
                (parts.next(), parts.next(), parts.next())
            {
                if cookie_id == id {
                    return Ok(cookie.to_owned());
                }
            }
        }

        Err(ErrorKind::MissingCookie(context.into(), id.into()).into())
    }
}

impl Default for CookieSha1 {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Mechanism for CookieSha1 {
    fn name(&self) -> &'static str {
        "DBUS_COOKIE_SHA1"
    }

    fn initial_response(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(Some(self.identity.as_bytes().to_vec()))
    }

    fn challenge(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let Ok(data) = std::str::from_utf8(data) else {
            return Err(ErrorKind::InvalidSasl.into());
        };

        let mut parts = data.split(' ');

        let (Some(context), Some(id), Some(server_challenge), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            tracing::debug!(data = ?LossyStr::new(data.as_bytes()), "Malformed cookie challenge");
            return Err(ErrorKind::InvalidSasl.into());
        };

        let cookie = self.cookie(context, id)?;

        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        let client_challenge = hex::encode(bytes);

        Ok(cookie_response(server_challenge, &client_challenge, &cookie).into_bytes())
    }
}

/// Compute the answer to a cookie challenge.
pub(crate) fn cookie_response(server_challenge: &str, client_challenge: &str, cookie: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(server_challenge.as_bytes());
    hasher.update(b":");
    hasher.update(client_challenge.as_bytes());
    hasher.update(b":");
    hasher.update(cookie.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{client_challenge} {digest}")
}

/// Split a `REJECTED` payload into mechanism names.
pub(crate) fn mechanism_names(list: &[u8]) -> Vec<Box<str>> {
    let mut names = Vec::new();
    let mut rest = list;

    loop {
        let (head, tail) = match split_once(rest, b' ') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };

        if let Ok(name) = std::str::from_utf8(head) {
            if !name.is_empty() {
                names.push(name.into());
            }
        }

        match tail {
            Some(tail) => rest = tail,
            None => break,
        }
    }

    names
}
