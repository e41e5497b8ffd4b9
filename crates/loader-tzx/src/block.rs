//! 47loader data blocks.
//!
//! A block's body is laid out as:
//!
//! ```text
//! sanity   1 byte   0b1011_0010
//! start_l  1 byte   checksum L seed
//! start_h  1 byte   checksum H seed
//! data     n bytes  payload, each byte XORed with $90
//! ```
//!
//! The XOR toggles bits 4 and 7 of every byte, which keeps the pulse
//! stream balanced for typical Spectrum data (long runs of zero bytes).
//! The checksum seeds cover the transformed data only.

use std::io::{self, Write};

use format_tzx::{TurboBlockHeader, TzxError, encode_u24_le};
use tracing::trace;

use crate::checksum::Checksum;

/// First byte of every block body.
pub const SANITY: u8 = 0b1011_0010;

/// XOR mask applied to every payload byte.
pub const DATA_MASK: u8 = 0x90;

/// Body bytes added around the payload: sanity byte and two checksum seeds.
pub const BODY_OVERHEAD: usize = 3;

/// A fully prepared block: header plus checksummed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    header: TurboBlockHeader,
    body: Vec<u8>,
    length: [u8; 3],
}

impl Block {
    /// Transform and checksum a payload.
    ///
    /// # Errors
    ///
    /// Returns [`TzxError::DataTooLong`] if the body would not fit the
    /// 24-bit TZX length field.
    pub fn new(header: TurboBlockHeader, payload: &[u8]) -> Result<Self, TzxError> {
        Self::build(header, payload.iter().copied())
    }

    /// As [`Block::new`], but with the payload stored last byte first, for
    /// loading downwards through memory.
    pub fn new_reversed(header: TurboBlockHeader, payload: &[u8]) -> Result<Self, TzxError> {
        Self::build(header, payload.iter().rev().copied())
    }

    fn build(
        header: TurboBlockHeader,
        payload: impl ExactSizeIterator<Item = u8>,
    ) -> Result<Self, TzxError> {
        let length = encode_u24_le(payload.len() + BODY_OVERHEAD)?;

        let mut body = Vec::with_capacity(payload.len() + BODY_OVERHEAD);
        body.extend_from_slice(&[SANITY, 0, 0]);
        body.extend(payload.map(|b| b ^ DATA_MASK));

        let (start_l, start_h) = Checksum::derive_suffix(&body[BODY_OVERHEAD..]);
        body[1] = start_l;
        body[2] = start_h;
        trace!(
            len = body.len(),
            "block checksum seed ${start_l:02X}/${start_h:02X}"
        );

        Ok(Self {
            header,
            body,
            length,
        })
    }

    #[must_use]
    pub fn header(&self) -> &TurboBlockHeader {
        &self.header
    }

    /// The body as written to tape: sanity byte, checksum seeds, data.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Checksum seed bytes, L first.
    #[must_use]
    pub fn checksum(&self) -> (u8, u8) {
        (self.body[1], self.body[2])
    }

    /// The complete turbo block: header, 3-byte length and body.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TurboBlockHeader::LEN + 3 + self.body.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.length);
        out.extend_from_slice(&self.body);
        out
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.header.write_block(out, &self.body)
    }
}
