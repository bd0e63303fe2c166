use std::fmt;

use crate::lossy_str::LossyStr;

/// A GUID sent by the server over SASL to identify itself.
#[repr(transparent)]
pub struct Guid([u8]);

impl Guid {
    #[inline]
    pub(crate) fn new(guid: &[u8]) -> &Guid {
        // SAFETY: The byte slice is repr transparent over this type.
        unsafe { &*(guid as *const [u8] as *const Guid) }
    }

    /// The GUID as a string if it is valid UTF-8, which a hex encoded GUID
    /// always is.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// The raw bytes of the GUID.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guid")
            .field(&LossyStr::new(&self.0))
            .finish()
    }
}

impl PartialEq for Guid {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
