//! Validation of object paths.
//!
//! The rules for a [valid object path] are:
//!
//! * The path must begin with an ASCII '/' character, and must consist of
//!   elements separated by slash characters.
//! * Each element must only contain the ASCII characters "[A-Z][a-z][0-9]_".
//! * No element may be the empty string.
//! * Multiple '/' characters cannot occur in sequence.
//! * A trailing '/' character is not allowed unless the path is the root path.
//!
//! [valid object path]: https://dbus.freedesktop.org/doc/dbus-specification.html#message-protocol-marshaling-object-path

#[cfg(test)]
mod tests;

/// The root object path.
pub const ROOT: &str = "/";

/// Test if `path` is a valid object path.
///
/// # Examples
///
/// ```
/// use dbus_stream::is_valid_object_path;
///
/// assert!(is_valid_object_path("/"));
/// assert!(is_valid_object_path("/org/freedesktop/DBus"));
/// assert!(!is_valid_object_path("/org/"));
/// assert!(!is_valid_object_path("org"));
/// ```
pub const fn is_valid_object_path(path: &str) -> bool {
    let bytes = path.as_bytes();

    let [b'/', rest @ ..] = bytes else {
        return false;
    };

    if rest.is_empty() {
        return true;
    }

    let mut element = 0;
    let mut n = 0;

    while n < rest.len() {
        match rest[n] {
            b'/' => {
                if element == 0 {
                    return false;
                }

                element = 0;
            }
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' => {
                element += 1;
            }
            _ => return false,
        }

        n += 1;
    }

    element > 0
}
