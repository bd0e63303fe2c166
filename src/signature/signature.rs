use std::fmt;
use std::str::from_utf8;

use super::{SignatureError, SignatureParser, Type};

/// A validated D-Bus signature: a sequence of zero or more complete types.
///
/// # Examples
///
/// ```
/// use dbus_stream::{Signature, Type};
///
/// let sig = Signature::new("sa{sv}i")?;
/// assert_eq!(sig.len(), 3);
/// assert_eq!(sig.types()[0], Type::String);
/// assert_eq!(sig.as_str(), "sa{sv}i");
///
/// assert!(Signature::new("a").is_err());
/// # Ok::<_, dbus_stream::SignatureError>(())
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    text: Box<str>,
    types: Vec<Type>,
}

impl Signature {
    /// Parse and validate a signature.
    pub fn new(text: &str) -> Result<Self, SignatureError> {
        Self::from_bytes(text.as_bytes())
    }

    /// Parse and validate a signature from raw bytes as found on the wire.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let mut parser = SignatureParser::new(bytes)?;
        let mut types = Vec::new();

        while let Some(ty) = parser.next_type()? {
            types.push(ty);
        }

        // Only ASCII type codes survive parsing.
        let text = match from_utf8(bytes) {
            Ok(text) => text,
            Err(..) => return Err(SignatureError::UnknownTypeCode(bytes[0])),
        };

        Ok(Self {
            text: text.into(),
            types,
        })
    }

    /// The empty signature.
    pub fn empty() -> Self {
        Self {
            text: "".into(),
            types: Vec::new(),
        }
    }

    /// Construct a signature out of a sequence of types.
    ///
    /// # Errors
    ///
    /// Errors if any type is invalid as described in [`Type::validate`], or
    /// if the rendered signature exceeds the maximum length.
    pub fn from_types<I>(types: I) -> Result<Self, SignatureError>
    where
        I: IntoIterator<Item = Type>,
    {
        let types = types.into_iter().collect::<Vec<_>>();
        let mut text = String::new();

        for ty in &types {
            ty.validate()?;
            ty.write_signature(&mut text);
        }

        if text.len() >= super::MAX_SIGNATURE {
            return Err(SignatureError::SignatureTooLong);
        }

        Ok(Self {
            text: text.into(),
            types,
        })
    }

    /// The signature as text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The complete types in the signature.
    pub fn types(&self) -> &[Type] {
        &self.types
    }

    /// The number of complete types in the signature.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Test if the signature is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Get the single type this signature consists of.
    ///
    /// ```
    /// use dbus_stream::{Signature, Type};
    ///
    /// assert_eq!(Signature::new("ai")?.single_type(), Some(&Type::Array(Box::new(Type::Int32))));
    /// assert_eq!(Signature::new("ii")?.single_type(), None);
    /// # Ok::<_, dbus_stream::SignatureError>(())
    /// ```
    pub fn single_type(&self) -> Option<&Type> {
        match &self.types[..] {
            [ty] => Some(ty),
            _ => None,
        }
    }
}

impl fmt::Display for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:?})", &*self.text)
    }
}

impl AsRef<str> for Signature {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl PartialEq<str> for Signature {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        *self.text == *other
    }
}

impl PartialEq<&str> for Signature {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        *self.text == **other
    }
}
