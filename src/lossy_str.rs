use std::fmt;

/// Debug-format bytes as a string, escaping anything that isn't valid UTF-8.
#[repr(transparent)]
pub(crate) struct LossyStr([u8]);

impl LossyStr {
    #[inline]
    pub(crate) fn new(bytes: &[u8]) -> &LossyStr {
        // SAFETY: The byte slice is repr transparent over this type.
        unsafe { &*(bytes as *const [u8] as *const LossyStr) }
    }
}

impl fmt::Debug for LossyStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;

        for chunk in self.0.utf8_chunks() {
            write!(f, "{}", chunk.valid().escape_debug())?;

            for b in chunk.invalid() {
                write!(f, "\\x{b:02x}")?;
            }
        }

        write!(f, "\"")
    }
}
