//! TZX tape image writer.
//!
//! TZX encodes tape signals as T-state-accurate pulse sequences. A file
//! starts with a 10-byte header (`"ZXTape!" + 0x1A + major + minor`)
//! followed by a sequence of blocks, each introduced by an ID byte.
//!
//! Only the blocks a turbo loader needs are written here: the turbo speed
//! data block ($11) and the pure tone block ($12).
//!
//! Reference: <https://worldofspectrum.net/TZXformat.html>

mod word;

use std::io::{self, Write};

use thiserror::Error;

pub use word::Word;

/// TZX header magic: "ZXTape!" + 0x1A.
pub const MAGIC: &[u8; 8] = b"ZXTape!\x1A";

/// Block ID of a turbo speed data block.
pub const TURBO_SPEED_ID: u8 = 0x11;

/// Block ID of a pure tone block.
pub const PURE_TONE_ID: u8 = 0x12;

/// Largest data length a turbo block can declare (3-byte length field).
pub const MAX_TURBO_DATA_LEN: usize = 0xFF_FFFF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TzxError {
    #[error("turbo block data is {0} bytes, the TZX length field holds at most {max}", max = MAX_TURBO_DATA_LEN)]
    DataTooLong(usize),
}

// ---------------------------------------------------------------------------
// File header
// ---------------------------------------------------------------------------

/// The 10-byte TZX file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TzxHeader {
    pub major: u8,
    pub minor: u8,
}

impl Default for TzxHeader {
    fn default() -> Self {
        Self {
            major: 1,
            minor: 20,
        }
    }
}

impl TzxHeader {
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[..8].copy_from_slice(MAGIC);
        bytes[8] = self.major;
        bytes[9] = self.minor;
        bytes
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.to_bytes())
    }
}

// ---------------------------------------------------------------------------
// Turbo speed block ($11)
// ---------------------------------------------------------------------------

/// A burst of short pulses played ahead of a block's pilot tone.
///
/// The burst is written as its own pure tone block; it is never part of the
/// turbo block header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickPilot {
    pub pulse: Word,
    pub count: Word,
}

impl ClickPilot {
    #[must_use]
    pub fn tone(&self) -> PureTone {
        PureTone {
            pulse: self.pulse,
            count: self.count,
        }
    }
}

/// Timing fields of a turbo speed data block.
///
/// Cloning yields a fully independent header, so a template can be copied
/// and have its pilot count or pause overridden per block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurboBlockHeader {
    pub pilot_pulse: Word,
    pub sync0_pulse: Word,
    pub sync1_pulse: Word,
    pub zero_pulse: Word,
    pub one_pulse: Word,
    pub pilot_pulse_count: Word,
    pub pause_ms: Word,
    /// Clicks to play before the pilot; not serialized with the header.
    pub click: Option<ClickPilot>,
}

impl TurboBlockHeader {
    /// Serialized header length, excluding the 3-byte data length.
    pub const LEN: usize = 16;

    /// The header bytes: ID, five pulse lengths, pilot count, used bits
    /// and pause, all little-endian.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        bytes[0] = TURBO_SPEED_ID;
        let fields = [
            self.pilot_pulse,
            self.sync0_pulse,
            self.sync1_pulse,
            self.zero_pulse,
            self.one_pulse,
            self.pilot_pulse_count,
        ];
        for (i, field) in fields.iter().enumerate() {
            bytes[1 + i * 2..3 + i * 2].copy_from_slice(&field.le_bytes());
        }
        // every bit of the final byte is used
        bytes[13] = 8;
        bytes[14..16].copy_from_slice(&self.pause_ms.le_bytes());
        bytes
    }

    /// Write the header, the 3-byte data length and the data.
    ///
    /// # Errors
    ///
    /// Fails with [`io::ErrorKind::InvalidInput`] wrapping
    /// [`TzxError::DataTooLong`] if the data does not fit the 24-bit length
    /// field; nothing is written in that case.
    pub fn write_block<W: Write>(&self, out: &mut W, data: &[u8]) -> io::Result<()> {
        let len = encode_u24_le(data.len())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        out.write_all(&self.to_bytes())?;
        out.write_all(&len)?;
        out.write_all(data)
    }
}

/// Encode a block data length as the 3-byte little-endian TZX field.
///
/// # Errors
///
/// Returns [`TzxError::DataTooLong`] for lengths above 24 bits.
pub fn encode_u24_le(len: usize) -> Result<[u8; 3], TzxError> {
    if len > MAX_TURBO_DATA_LEN {
        return Err(TzxError::DataTooLong(len));
    }
    Ok([len as u8, (len >> 8) as u8, (len >> 16) as u8])
}

// ---------------------------------------------------------------------------
// Pure tone block ($12)
// ---------------------------------------------------------------------------

/// A run of identical pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PureTone {
    pub pulse: Word,
    pub count: Word,
}

impl PureTone {
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 5] {
        let [p0, p1] = self.pulse.le_bytes();
        let [c0, c1] = self.count.le_bytes();
        [PURE_TONE_ID, p0, p1, c0, c1]
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.to_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
