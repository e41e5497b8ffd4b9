//! 16-bit values with explicit byte order.
//!
//! Tape headers store pulse lengths low byte first, while the loader's
//! dynamic tables store addresses high byte first. `Word` makes the split
//! explicit at every call site instead of relying on shifts and casts.

use std::fmt;

/// An unsigned 16-bit quantity destined for the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Word(u16);

impl Word {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Most significant byte.
    #[must_use]
    pub const fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Least significant byte.
    #[must_use]
    pub const fn low(self) -> u8 {
        self.0 as u8
    }

    /// Low byte first, as used by TZX block fields.
    #[must_use]
    pub const fn le_bytes(self) -> [u8; 2] {
        [self.low(), self.high()]
    }

    /// High byte first, as used by dynamic table entries.
    #[must_use]
    pub const fn be_bytes(self) -> [u8; 2] {
        [self.high(), self.low()]
    }

    #[must_use]
    pub fn checked_add(self, rhs: u16) -> Option<Self> {
        self.0.checked_add(rhs).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: u16) -> Option<Self> {
        self.0.checked_sub(rhs).map(Self)
    }

    #[must_use]
    pub fn checked_mul(self, rhs: u16) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }
}

impl From<u16> for Word {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<Word> for u16 {
    fn from(word: Word) -> Self {
        word.0
    }
}

impl From<Word> for usize {
    fn from(word: Word) -> Self {
        usize::from(word.0)
    }
}

impl TryFrom<usize> for Word {
    type Error = std::num::TryFromIntError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        u16::try_from(value).map(Self)
    }
}

impl TryFrom<u32> for Word {
    type Error = std::num::TryFromIntError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u16::try_from(value).map(Self)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::UpperHex for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}
