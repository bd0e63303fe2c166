//! Parsing and discovery of D-Bus server addresses.
//!
//! An address list is a `;` separated list of `transport:key=value,...`
//! entries which are tried in order.


use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind, Result};
use crate::lossy_str::LossyStr;

const ENV_SESSION_BUS: &str = "DBUS_SESSION_BUS_ADDRESS";
const ENV_SYSTEM_BUS: &str = "DBUS_SYSTEM_BUS_ADDRESS";
const DEFAULT_SYSTEM_BUS: &str = "unix:path=/var/run/dbus/system_bus_socket";
const MACHINE_ID_PATHS: [&str; 2] = ["/var/lib/dbus/machine-id", "/etc/machine-id"];

/// A single server address which can be connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Address {
    /// A unix socket at a filesystem path.
    UnixPath(PathBuf),
    /// A unix socket in the Linux abstract namespace, named without the
    /// leading NUL byte.
    UnixAbstract(Vec<u8>),
}

impl Address {
    /// Parse a single address entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_stream::Address;
    ///
    /// let address = Address::parse("unix:path=/run/user/1000/bus,guid=abcd")?;
    /// assert_eq!(address, Address::UnixPath("/run/user/1000/bus".into()));
    ///
    /// let address = Address::parse("unix:abstract=/tmp/dbus-%41")?;
    /// assert_eq!(address, Address::UnixAbstract(b"/tmp/dbus-A".to_vec()));
    ///
    /// assert!(Address::parse("tcp:host=localhost,port=1234").is_err());
    /// # Ok::<_, dbus_stream::Error>(())
    /// ```
    pub fn parse(entry: &str) -> Result<Self> {
        let invalid = || Error::from(ErrorKind::InvalidAddress(entry.into()));

        let Some((transport, params)) = entry.split_once(':') else {
            return Err(invalid());
        };

        if transport != "unix" {
            return Err(ErrorKind::UnsupportedTransport(transport.into()).into());
        }

        let mut address = None;

        for param in params.split(',').filter(|p| !p.is_empty()) {
            let Some((key, value)) = param.split_once('=') else {
                return Err(invalid());
            };

            let value = unescape(value).ok_or_else(invalid)?;

            match key {
                "path" => address = Some(Address::UnixPath(path_from_bytes(value))),
                "abstract" => address = Some(Address::UnixAbstract(value)),
                // Keys like `guid` don't affect how we connect.
                _ => {}
            }
        }

        address.ok_or_else(|| ErrorKind::UnsupportedTransport(entry.into()).into())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::UnixPath(path) => write!(f, "unix:path={}", path.display()),
            Address::UnixAbstract(name) => write!(f, "unix:abstract={:?}", LossyStr::new(name)),
        }
    }
}

/// Parse a `;` separated list of addresses.
///
/// Entries which can't be parsed or which use a transport that isn't
/// supported are logged and skipped, so that the remaining entries still get
/// a chance.
pub fn parse_list(text: &str) -> Vec<Address> {
    let mut addresses = Vec::new();

    for entry in text.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        match Address::parse(entry) {
            Ok(address) => addresses.push(address),
            Err(error) => {
                tracing::warn!(entry, %error, "Skipping bus address");
            }
        }
    }

    addresses
}

/// Addresses of the session bus.
///
/// Uses `DBUS_SESSION_BUS_ADDRESS` if set, otherwise the address recorded in
/// `~/.dbus/session-bus/<machine-id>-<display>`.
///
/// # Errors
///
/// Errors if no address can be found.
pub fn session_bus() -> Result<Vec<Address>> {
    if let Some(address) = env::var_os(ENV_SESSION_BUS) {
        return Ok(parse_list(&address.to_string_lossy()));
    }

    let Some(home) = dirs::home_dir() else {
        return Err(ErrorKind::MissingBus.into());
    };

    let Some(machine_id) = read_machine_id() else {
        return Err(ErrorKind::MissingBus.into());
    };

    let display = env::var("DISPLAY").ok();
    let path = session_file_path(&home, &machine_id, display.as_deref());

    tracing::trace!(path = %path.display(), "Looking up session bus address");

    match read_session_file(&path)? {
        Some(address) => Ok(parse_list(&address)),
        None => Err(ErrorKind::MissingBus.into()),
    }
}

/// Addresses of the system bus.
///
/// Uses `DBUS_SYSTEM_BUS_ADDRESS` if set, otherwise the well-known address
/// `unix:path=/var/run/dbus/system_bus_socket`.
pub fn system_bus() -> Vec<Address> {
    match env::var_os(ENV_SYSTEM_BUS) {
        Some(address) => parse_list(&address.to_string_lossy()),
        None => parse_list(DEFAULT_SYSTEM_BUS),
    }
}

/// Read the machine id from the first of the well-known locations which
/// holds one.
fn read_machine_id() -> Option<String> {
    for path in MACHINE_ID_PATHS {
        let Ok(contents) = fs::read_to_string(path) else {
            continue;
        };

        let id = contents.trim();

        if id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Some(id.to_owned());
        }

        tracing::debug!(path, "Malformed machine id");
    }

    None
}

/// The display number in a `DISPLAY` value like `host:1.0`.
pub(crate) fn display_number(display: &str) -> Option<&str> {
    let (_, rest) = display.rsplit_once(':')?;
    let number = rest.split('.').next()?;

    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(number)
}

pub(crate) fn session_file_path(home: &Path, machine_id: &str, display: Option<&str>) -> PathBuf {
    let number = display.and_then(display_number).unwrap_or("0");

    home.join(".dbus")
        .join("session-bus")
        .join(format!("{machine_id}-{number}"))
}

/// Read the session bus address from a session file written by
/// `dbus-launch`.
pub(crate) fn read_session_file(path: &Path) -> Result<Option<String>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error.into()),
    };

    for line in contents.lines() {
        let Some(value) = line.trim().strip_prefix(ENV_SESSION_BUS) else {
            continue;
        };

        let Some(value) = value.strip_prefix('=') else {
            continue;
        };

        let value = value.trim();

        let value = value
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .unwrap_or(value);

        return Ok(Some(value.to_owned()));
    }

    Ok(None)
}

/// Unescape `%xx` sequences in an address value.
fn unescape(value: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(value.len());
    let mut bytes = value.bytes();

    while let Some(b) = bytes.next() {
        if b != b'%' {
            out.push(b);
            continue;
        }

        let (Some(hi), Some(lo)) = (bytes.next(), bytes.next()) else {
            return None;
        };

        let mut decoded = [0u8];
        hex::decode_to_slice([hi, lo], &mut decoded).ok()?;
        out.push(decoded[0]);
    }

    Some(out)
}

fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    PathBuf::from(OsString::from_vec(bytes))
}
