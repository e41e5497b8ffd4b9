//! The 47loader block checksum.
//!
//! A Fletcher-16 variant: two 8-bit accumulators, L summing the data bytes
//! and H summing successive values of L. Whenever an addition carries out
//! of eight bits the accumulator is incremented, which makes both sums
//! behave modulo 255 rather than 256. The loader relies on this exact
//! behaviour, so it must not be replaced with a plain modulo-256 sum.
//!
//! Instead of comparing against a stored checksum, the loader seeds its
//! accumulators from two bytes at the start of the block and checks that
//! both end up at `$FF`.

/// The pair of checksum accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checksum {
    pub l: u8,
    pub h: u8,
}

impl Checksum {
    /// The state a valid block leaves the accumulators in.
    pub const VERIFIED: Self = Self { l: 0xFF, h: 0xFF };

    #[must_use]
    pub const fn new(l: u8, h: u8) -> Self {
        Self { l, h }
    }

    /// Fold one byte into the accumulators.
    pub fn add(&mut self, byte: u8) {
        let (l, carry) = self.l.overflowing_add(byte);
        self.l = if carry { l.wrapping_add(1) } else { l };
        let (h, carry) = self.h.overflowing_add(self.l);
        self.h = if carry { h.wrapping_add(1) } else { h };
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.add(byte);
        }
    }

    /// Run the accumulators over `data` starting from `seed`.
    #[must_use]
    pub fn compute(data: &[u8], seed: Self) -> Self {
        let mut sum = seed;
        sum.update(data);
        sum
    }

    /// Solve for the seed bytes `(start_l, start_h)` that make `data`
    /// verify, i.e. finish at [`Checksum::VERIFIED`].
    ///
    /// # Panics
    ///
    /// Panics if the derived seed does not verify; that can only be an
    /// arithmetic bug.
    #[must_use]
    pub fn derive_suffix(data: &[u8]) -> (u8, u8) {
        let first = Self::compute(data, Self::default());
        let start_l = !first.l;

        // H depends on every intermediate L, so rerun with the chosen L seed
        let second = Self::compute(data, Self::new(start_l, 0));
        let start_h = !second.h;

        let check = Self::compute(data, Self::new(start_l, start_h));
        assert_eq!(
            check,
            Self::VERIFIED,
            "checksum seed ${start_l:02X}/${start_h:02X} does not verify"
        );

        (start_l, start_h)
    }

    /// Whether `data` verifies from the given seed bytes.
    #[must_use]
    pub fn verifies(data: &[u8], start_l: u8, start_h: u8) -> bool {
        Self::compute(data, Self::new(start_l, start_h)) == Self::VERIFIED
    }
}
