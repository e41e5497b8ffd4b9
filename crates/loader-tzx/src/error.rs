//! Error types for tape mastering.
//!
//! Configuration and input-shape problems surface as these errors before
//! any output is written. Arithmetic or coverage bugs are assertions
//! instead, and never appear here.

use thiserror::Error;

use crate::screen::SCREEN_LEN;

/// Invalid timing parameters or pilot options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimingError {
    #[error("{extra_cycles} extra sampling cycles give a pulse length outside 1..=65535 T-states")]
    PulseOutOfRange { extra_cycles: i8 },
    #[error("a {ms}ms pilot needs more than 65535 pulses")]
    PilotTooLong { ms: u16 },
    #[error("a clicking pilot cannot be used with ROM timings")]
    ClickingWithRomTiming,
    #[error("a clicking pilot needs at least one click")]
    NoClicks,
}

/// Invalid dynamic table entries or operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("entry length {0} exceeds 32767 bytes")]
    LengthTooLarge(u16),
    #[error("entry length must be non-zero")]
    ZeroLength,
    #[error("entry address ${0:04X} has a zero high byte, which would end the table")]
    ZeroHighByte(u16),
    #[error("cannot split a {length} byte entry into {chunk} byte chunks")]
    UnevenSplit { length: u16, chunk: u16 },
    #[error("cannot split an entry that changes direction")]
    SplitDirectionChange,
    #[error("entry at ${address:04X} with length {length} runs past the end of memory")]
    AddressOverflow { address: u16, length: u16 },
    #[error("the table has no entries")]
    Empty,
}

/// Everything that can stop a tape from being mastered.
#[derive(Debug, Error)]
pub enum MasterError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Tzx(#[from] format_tzx::TzxError),
    #[error("not a {screen} byte screen: got {0} bytes", screen = SCREEN_LEN)]
    ScreenSize(usize),
    #[error("nothing to write: the payload is empty")]
    EmptyPayload,
    #[error("a {len} byte payload loaded at ${address:04X} runs past the end of memory")]
    PayloadOverflow { address: u16, len: usize },
    #[error("the dynamic table is {0} bytes, too long for its length block")]
    TableTooLong(usize),
    #[error("table entry at ${address:04X} with length {len} lies outside the loaded data")]
    OutsideImage { address: u16, len: u16 },
}
