//! Four-character box tags

use std::fmt;

/// A 4-byte box type code.
///
/// The bytes are kept verbatim. Unknown or non-ASCII codes are never
/// rejected; only their `Display` form escapes unprintable bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// File type box
    pub const FTYP: FourCC = FourCC(*b"ftyp");
    /// Movie (metadata) box
    pub const MOOV: FourCC = FourCC(*b"moov");
    /// Media data box
    pub const MDAT: FourCC = FourCC(*b"mdat");
    /// Padding box
    pub const FREE: FourCC = FourCC(*b"free");
    /// Padding box (QuickTime spelling)
    pub const SKIP: FourCC = FourCC(*b"skip");
    /// 32-bit chunk offset table
    pub const STCO: FourCC = FourCC(*b"stco");
    /// 64-bit chunk offset table
    pub const CO64: FourCC = FourCC(*b"co64");

    /// Raw tag bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// `free` and `skip` carry no content and may be dropped.
    pub fn is_padding(&self) -> bool {
        *self == Self::FREE || *self == Self::SKIP
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(bytes: [u8; 4]) -> Self {
        FourCC(bytes)
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(bytes: &[u8; 4]) -> Self {
        FourCC(*bytes)
    }
}

impl PartialEq<[u8; 4]> for FourCC {
    fn eq(&self, other: &[u8; 4]) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({})", self)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
