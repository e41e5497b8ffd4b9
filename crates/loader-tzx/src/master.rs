//! Tape mastering.
//!
//! [`Master`] turns a payload into a [`Tape`]: the complete list of blocks
//! for one load, validated and checksummed in memory. [`TapeWriter`] then
//! writes tapes to a sink, starting with the TZX file header unless it is
//! appending to an existing file. Keeping the two steps apart means a bad
//! option or input never leaves a half-written file behind.
//!
//! A dynamic load (progressive or fancy screen) is laid out as:
//!
//! ```text
//! table length   2 bytes LE   full pilot, no pause
//! table          n bytes      resume pilot, no pause
//! entry 0        ...          full pilot, no pause
//! entry 1..      ...          resume pilot, no pause
//! last entry     ...          resume pilot, template pause
//! ```

use std::io::{self, Write};

use format_tzx::{TurboBlockHeader, TzxHeader, Word};
use serde::Serialize;
use tracing::{debug, info};

use crate::block::Block;
use crate::error::{MasterError, TableError};
use crate::pattern::LoadPattern;
use crate::screen::{SCREEN_BASE, SCREEN_LEN};
use crate::table::{DynamicTable, Entry};
use crate::timing::{RESUME_PILOT_COUNT, Timing};

/// Default block size for progressive loads.
pub const DEFAULT_CHUNK: u16 = 1024;

/// What to master, picked once from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// The whole payload as one block, optionally stored back to front.
    Simple { reverse: bool },
    /// A 6912-byte screen as one block.
    Instascreen,
    /// The payload in `chunk`-byte blocks loaded upwards from `address`.
    Progressive { address: u16, chunk: u16 },
    /// A 6912-byte screen loaded in the order of a [`LoadPattern`].
    FancyScreen(LoadPattern),
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Simple { reverse: false }
    }
}

/// Facts about a dynamic table that the loader must be assembled to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableReport {
    /// Serialized table size, including the terminator.
    pub table_length: usize,
    pub entries: usize,
    /// `LOADER_DYNAMIC_ONE_BYTE_LENGTHS`
    pub one_byte_lengths: bool,
    /// `LOADER_DYNAMIC_FORWARDS_ONLY`
    pub forwards_only: bool,
    /// `LOADER_DYNAMIC_FIXED_LENGTH`
    pub fixed_length: Option<u16>,
}

impl TableReport {
    fn new(table: &DynamicTable, table_length: usize) -> Self {
        Self {
            table_length,
            entries: table.len(),
            one_byte_lengths: table.has_one_byte_lengths(),
            forwards_only: table.is_forwards_only(),
            fixed_length: table.fixed_length(),
        }
    }

    fn log(&self) {
        info!(
            "dynamic table length: {} bytes, {} entries",
            self.table_length, self.entries
        );
        if self.one_byte_lengths {
            info!("define LOADER_DYNAMIC_ONE_BYTE_LENGTHS");
        }
        if self.forwards_only {
            info!("define LOADER_DYNAMIC_FORWARDS_ONLY");
        }
        if let Some(length) = self.fixed_length {
            info!("define LOADER_DYNAMIC_FIXED_LENGTH={length}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tape
// ---------------------------------------------------------------------------

/// Blocks ready to be written, in tape order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    blocks: Vec<Block>,
    report: Option<TableReport>,
}

impl Tape {
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The table report, for dynamic loads.
    #[must_use]
    pub fn report(&self) -> Option<&TableReport> {
        self.report.as_ref()
    }

    /// Write every block, preceded by its clicks if it has a click pilot.
    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for block in &self.blocks {
            if let Some(click) = block.header().click {
                click.tone().write(out)?;
            }
            block.write(out)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Master
// ---------------------------------------------------------------------------

/// Builds tapes from payloads with one timing configuration.
#[derive(Debug, Clone)]
pub struct Master {
    timing: Timing,
    fixed_length: bool,
}

impl Default for Master {
    fn default() -> Self {
        Self::new(Timing::default())
    }
}

impl Master {
    #[must_use]
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            fixed_length: true,
        }
    }

    /// Never emit fixed-length tables, even for uniform ones.
    #[must_use]
    pub fn disable_fixed_length(mut self) -> Self {
        self.fixed_length = false;
        self
    }

    #[must_use]
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Validate the payload for the mode and build every block.
    ///
    /// # Errors
    ///
    /// Returns a [`MasterError`] if the payload has the wrong shape for the
    /// mode or the resulting table or blocks cannot be encoded.
    pub fn prepare(&self, mode: OutputMode, payload: &[u8]) -> Result<Tape, MasterError> {
        match mode {
            OutputMode::Simple { reverse } => {
                if payload.is_empty() {
                    return Err(MasterError::EmptyPayload);
                }
                let header = self.timing.block_header();
                let block = if reverse {
                    Block::new_reversed(header, payload)?
                } else {
                    Block::new(header, payload)?
                };
                debug!(len = payload.len(), reverse, "simple block");
                Ok(Tape {
                    blocks: vec![block],
                    report: None,
                })
            }
            OutputMode::Instascreen => {
                check_screen(payload)?;
                Ok(Tape {
                    blocks: vec![Block::new(self.timing.block_header(), payload)?],
                    report: None,
                })
            }
            OutputMode::Progressive { address, chunk } => {
                let table = progressive_table(address, chunk, payload)?;
                self.dynamic(table, payload, address)
            }
            OutputMode::FancyScreen(pattern) => {
                check_screen(payload)?;
                debug!(%pattern, "fancy screen");
                self.dynamic(pattern.table(), payload, SCREEN_BASE)
            }
        }
    }

    /// Blocks for a dynamic load of `image`, whose first byte belongs at
    /// `base`.
    fn dynamic(
        &self,
        mut table: DynamicTable,
        image: &[u8],
        base: u16,
    ) -> Result<Tape, MasterError> {
        if table.is_empty() {
            return Err(TableError::Empty.into());
        }
        if !self.fixed_length {
            table.disable_fixed_length();
        }
        let layout = table.recompute_layout();
        debug!(?layout, "table layout");

        let table_bytes = table.to_bytes();
        let table_length = u16::try_from(table_bytes.len())
            .map_err(|_| MasterError::TableTooLong(table_bytes.len()))?;

        let template = self.timing.block_header();
        let resume = resume_header(&template);

        let mut blocks = Vec::with_capacity(table.len() + 2);
        blocks.push(Block::new(
            glued(&template),
            &Word::new(table_length).le_bytes(),
        )?);
        blocks.push(Block::new(glued(&resume), &table_bytes)?);

        let spans = table.spans()?;
        let last = spans.len() - 1;
        for (i, span) in spans.iter().enumerate() {
            let outside = || MasterError::OutsideImage {
                address: span.start,
                len: span.len,
            };
            let offset = usize::from(span.start.checked_sub(base).ok_or_else(outside)?);
            let data = image
                .get(offset..offset + usize::from(span.len))
                .ok_or_else(outside)?;

            let header = if i == 0 { &template } else { &resume };
            let header = if i == last {
                header.clone()
            } else {
                glued(header)
            };
            let block = if span.backwards {
                Block::new_reversed(header, data)?
            } else {
                Block::new(header, data)?
            };
            blocks.push(block);
        }

        let report = TableReport::new(&table, table_bytes.len());
        report.log();
        Ok(Tape {
            blocks,
            report: Some(report),
        })
    }
}

/// The template with no pause, so the next block follows immediately.
fn glued(header: &TurboBlockHeader) -> TurboBlockHeader {
    TurboBlockHeader {
        pause_ms: Word::ZERO,
        ..header.clone()
    }
}

/// The template with the minimal pilot and no clicks.
fn resume_header(template: &TurboBlockHeader) -> TurboBlockHeader {
    TurboBlockHeader {
        pilot_pulse_count: Word::new(RESUME_PILOT_COUNT),
        click: None,
        ..template.clone()
    }
}

fn check_screen(payload: &[u8]) -> Result<(), MasterError> {
    if payload.len() == SCREEN_LEN {
        Ok(())
    } else {
        Err(MasterError::ScreenSize(payload.len()))
    }
}

/// Consecutive `chunk`-byte entries covering the payload, followed by an
/// entry for whatever is left over.
fn progressive_table(
    address: u16,
    chunk: u16,
    payload: &[u8],
) -> Result<DynamicTable, MasterError> {
    if payload.is_empty() {
        return Err(MasterError::EmptyPayload);
    }
    let overflow = || MasterError::PayloadOverflow {
        address,
        len: payload.len(),
    };
    let len = u16::try_from(payload.len()).map_err(|_| overflow())?;
    let last = Word::new(address)
        .checked_add(len - 1)
        .ok_or_else(overflow)?;
    debug!(%last, "progressive load end");

    if chunk == 0 {
        return Err(TableError::UnevenSplit { length: len, chunk }.into());
    }
    let whole = len - len % chunk;
    let mut table = DynamicTable::default();
    for offset in (0..whole).step_by(usize::from(chunk)) {
        table.push(Entry::new(address + offset, chunk, false)?);
    }
    if whole < len {
        table.push(Entry::new(address + whole, len - whole, false)?);
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// TapeWriter
// ---------------------------------------------------------------------------

/// Writes tapes to a sink, emitting the TZX file header before the first.
#[derive(Debug)]
pub struct TapeWriter<W: Write> {
    out: W,
    header_pending: bool,
}

impl<W: Write> TapeWriter<W> {
    /// A writer for a new file.
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_pending: true,
        }
    }

    /// A writer adding blocks to a file that already has a header.
    pub fn appending(out: W) -> Self {
        Self {
            out,
            header_pending: false,
        }
    }

    pub fn write(&mut self, tape: &Tape) -> io::Result<()> {
        if self.header_pending {
            TzxHeader::default().write(&mut self.out)?;
            self.header_pending = false;
        }
        tape.write(&mut self.out)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
