//! Validated D-Bus type signatures.

pub use self::signature::Signature;
mod signature;

pub use self::signature_error::SignatureError;
mod signature_error;

pub use self::ty::Type;
mod ty;

pub(crate) use self::parser::SignatureParser;
mod parser;

#[cfg(test)]
mod tests;

/// The maximum length of a signature in bytes, exclusive.
pub(crate) const MAX_SIGNATURE: usize = 256;

/// The maximum number of nested arrays, and separately of nested structs.
pub(crate) const MAX_CONTAINER_DEPTH: usize = 32;

/// The maximum total container depth of a value, variants included.
pub(crate) const MAX_DEPTH: usize = MAX_CONTAINER_DEPTH * 2;
