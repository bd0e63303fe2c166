use crate::proto::Endianness;

/// A fixed-size scalar in the protocol.
///
/// The alignment of every frame is equal to its size.
pub(crate) trait Frame: Copy {
    /// Size and alignment of the frame in bytes.
    const SIZE: usize;

    /// Append the frame to `out` using the given byte order.
    fn store(self, endianness: Endianness, out: &mut Vec<u8>);

    /// Decode the frame from exactly [`Frame::SIZE`] bytes.
    fn load(bytes: &[u8], endianness: Endianness) -> Self;

    /// Overwrite the frame at the start of `at`.
    fn store_at(self, endianness: Endianness, at: &mut [u8]) {
        let mut tmp = Vec::with_capacity(Self::SIZE);
        self.store(endianness, &mut tmp);
        at[..Self::SIZE].copy_from_slice(&tmp);
    }
}

impl Frame for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn store(self, _: Endianness, out: &mut Vec<u8>) {
        out.push(self);
    }

    #[inline]
    fn load(bytes: &[u8], _: Endianness) -> Self {
        bytes[0]
    }
}

macro_rules! impl_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Frame for $ty {
                const SIZE: usize = ::std::mem::size_of::<$ty>();

                #[inline]
                fn store(self, endianness: Endianness, out: &mut Vec<u8>) {
                    if endianness == Endianness::BIG {
                        out.extend_from_slice(&self.to_be_bytes());
                    } else {
                        out.extend_from_slice(&self.to_le_bytes());
                    }
                }

                #[inline]
                fn load(bytes: &[u8], endianness: Endianness) -> Self {
                    let mut raw = [0; ::std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);

                    if endianness == Endianness::BIG {
                        <$ty>::from_be_bytes(raw)
                    } else {
                        <$ty>::from_le_bytes(raw)
                    }
                }
            }
        )*
    }
}

impl_number!(u16, u32, u64, i16, i32, i64, f64);
