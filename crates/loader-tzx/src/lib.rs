//! Tape mastering for the 47loader ZX Spectrum turbo loader.
//!
//! Payloads become TZX turbo blocks whose bodies carry a sanity byte and
//! the seeds of a mod-255 Fletcher checksum, so the loader can verify each
//! block as it arrives. Screens can also be split into many small blocks
//! loaded in a fancy order described by a dynamic table, which is itself
//! written to tape ahead of the data.

pub mod block;
pub mod checksum;
mod error;
pub mod master;
pub mod pattern;
pub mod screen;
pub mod table;
pub mod timing;

pub use block::Block;
pub use checksum::Checksum;
pub use error::{MasterError, TableError, TimingError};
pub use master::{Master, OutputMode, TableReport, Tape, TapeWriter};
pub use pattern::LoadPattern;
pub use table::{DynamicTable, Entry, Span, TableLayout};
pub use timing::{PilotTone, Speed, Timing};
