//! Dynamic load tables.
//!
//! A dynamic table tells the loader where each following block goes and
//! in which direction to fill it. Entries are written big-endian because
//! the high byte of a real load address is never zero, which lets a single
//! zero byte terminate the table.
//!
//! Three layouts exist, picked from the table's contents:
//!
//! | Layout | Per entry | When |
//! |---|---|---|
//! | fixed length | address | every length equal, no direction changes |
//! | compact | address, 1 byte length | every length <= 127 |
//! | full | address, 2 byte length | otherwise |
//!
//! The direction-change flag is bit 7 of a one-byte length or bit 15 of a
//! two-byte length. Fixed-length tables cannot express it at all.

use format_tzx::Word;

use crate::error::TableError;

/// A block to load: where, how many bytes, and whether to reverse the
/// load direction first.
///
/// When loading backwards the address is that of the *last* byte of the
/// block, and the loader works downwards from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    address: Word,
    length: Word,
    change_direction: bool,
}

impl Entry {
    /// Bit 15 of the length is reserved for the direction flag.
    pub const MAX_LENGTH: u16 = 32767;

    /// Largest length the compact layout can hold.
    pub const MAX_COMPACT_LENGTH: u16 = 127;

    /// # Errors
    ///
    /// Fails if the length is zero or exceeds [`Entry::MAX_LENGTH`], or if
    /// the address's high byte is zero.
    pub fn new(address: u16, length: u16, change_direction: bool) -> Result<Self, TableError> {
        if length == 0 {
            return Err(TableError::ZeroLength);
        }
        if length > Self::MAX_LENGTH {
            return Err(TableError::LengthTooLarge(length));
        }
        let address = Word::new(address);
        if address.high() == 0 {
            return Err(TableError::ZeroHighByte(address.get()));
        }
        Ok(Self {
            address,
            length: Word::new(length),
            change_direction,
        })
    }

    /// Construct an entry whose fields are known to be valid, such as the
    /// screen addresses produced by the load patterns.
    pub(crate) fn known(address: u16, length: u16, change_direction: bool) -> Self {
        debug_assert!(length > 0 && length <= Self::MAX_LENGTH);
        debug_assert!(address >> 8 != 0);
        Self {
            address: Word::new(address),
            length: Word::new(length),
            change_direction,
        }
    }

    #[must_use]
    pub fn address(&self) -> u16 {
        self.address.get()
    }

    #[must_use]
    pub fn length(&self) -> u16 {
        self.length.get()
    }

    #[must_use]
    pub fn change_direction(&self) -> bool {
        self.change_direction
    }

    /// Break the entry into consecutive `chunk`-byte entries.
    ///
    /// # Errors
    ///
    /// Only entries loaded forwards without a direction change can be
    /// split, and only into chunks that divide the length exactly.
    pub fn split(&self, chunk: u16) -> Result<Vec<Self>, TableError> {
        if self.change_direction {
            return Err(TableError::SplitDirectionChange);
        }
        let length = self.length();
        if chunk == 0 || length % chunk != 0 {
            return Err(TableError::UnevenSplit { length, chunk });
        }
        if self.address.checked_add(length - 1).is_none() {
            return Err(TableError::AddressOverflow {
                address: self.address(),
                length,
            });
        }

        Ok((0..length / chunk)
            .map(|i| Self {
                address: Word::new(self.address() + i * chunk),
                length: Word::new(chunk),
                change_direction: false,
            })
            .collect())
    }

    fn write(&self, layout: TableLayout, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.address.be_bytes());
        let flag = if self.change_direction { 0x80 } else { 0 };
        match layout {
            TableLayout::FixedLength(_) => {}
            TableLayout::Compact => out.push(self.length.low() | flag),
            TableLayout::Full => {
                out.push(self.length.high() | flag);
                out.push(self.length.low());
            }
        }
    }
}

/// How a table is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// Addresses only; every block has this length.
    FixedLength(u16),
    /// Address plus a one-byte length.
    Compact,
    /// Address plus a two-byte length.
    Full,
}

impl TableLayout {
    /// Serialized size of one entry.
    #[must_use]
    pub fn entry_len(self) -> usize {
        match self {
            Self::FixedLength(_) => 2,
            Self::Compact => 3,
            Self::Full => 4,
        }
    }
}

/// A resolved memory span: the lowest address loaded, the length, and
/// whether the loader fills it downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u16,
    pub len: u16,
    pub backwards: bool,
}

impl Span {
    /// One past the highest address loaded.
    #[must_use]
    pub fn end(&self) -> u32 {
        u32::from(self.start) + u32::from(self.len)
    }
}

// ---------------------------------------------------------------------------
// DynamicTable
// ---------------------------------------------------------------------------

/// An ordered list of entries.
///
/// Whether the table qualifies for the fixed-length layout is derived from
/// the entries. It is worked out on construction and again by
/// [`DynamicTable::recompute_layout`]; any mutation discards it, and a
/// discarded value is recomputed on demand rather than read stale.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DynamicTable {
    entries: Vec<Entry>,
    /// `None` when the entries changed since the last computation.
    fixed_length: Option<Option<u16>>,
    fixed_length_disabled: bool,
}

impl DynamicTable {
    #[must_use]
    pub fn new(entries: Vec<Entry>) -> Self {
        let mut table = Self {
            entries,
            fixed_length: None,
            fixed_length_disabled: false,
        };
        table.recompute_layout();
        table
    }

    /// Build a table that loads each span in order, inserting direction
    /// changes wherever the direction of travel differs from the previous
    /// span. The loader starts out going forwards.
    ///
    /// # Errors
    ///
    /// Fails if any span makes an invalid entry.
    pub fn from_spans(spans: &[Span]) -> Result<Self, TableError> {
        let mut backwards = false;
        let entries = spans
            .iter()
            .map(|span| {
                let change = span.backwards != backwards;
                backwards = span.backwards;
                let address = if span.backwards {
                    span.start
                        .checked_add(span.len.saturating_sub(1))
                        .ok_or(TableError::AddressOverflow {
                            address: span.start,
                            length: span.len,
                        })?
                } else {
                    span.start
                };
                Entry::new(address, span.len, change)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(entries))
    }

    /// As [`DynamicTable::from_spans`] for spans known to lie within the
    /// screen.
    pub(crate) fn from_screen_spans(spans: &[Span]) -> Self {
        let mut backwards = false;
        let entries = spans
            .iter()
            .map(|span| {
                let change = span.backwards != backwards;
                backwards = span.backwards;
                let address = if span.backwards {
                    span.start + (span.len - 1)
                } else {
                    span.start
                };
                Entry::known(address, span.len, change)
            })
            .collect();
        Self::new(entries)
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
        self.fixed_length = None;
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Never use the fixed-length layout, even for a uniform table.
    pub fn disable_fixed_length(&mut self) {
        self.fixed_length_disabled = true;
        self.fixed_length = None;
    }

    /// Recompute the derived layout from the current entries.
    pub fn recompute_layout(&mut self) -> TableLayout {
        self.fixed_length = Some(self.detect_fixed_length());
        self.layout()
    }

    fn detect_fixed_length(&self) -> Option<u16> {
        if self.fixed_length_disabled {
            return None;
        }
        let first = self.entries.first()?.length();
        self.entries
            .iter()
            .all(|e| !e.change_direction && e.length() == first)
            .then_some(first)
    }

    /// The common block length, if the fixed-length layout applies.
    #[must_use]
    pub fn fixed_length(&self) -> Option<u16> {
        match self.fixed_length {
            Some(cached) => cached,
            None => self.detect_fixed_length(),
        }
    }

    #[must_use]
    pub fn is_fixed_length(&self) -> bool {
        self.fixed_length().is_some()
    }

    /// Whether every length fits the compact layout.
    #[must_use]
    pub fn has_one_byte_lengths(&self) -> bool {
        self.entries
            .iter()
            .all(|e| e.length() <= Entry::MAX_COMPACT_LENGTH)
    }

    /// Whether the loader never changes direction.
    #[must_use]
    pub fn is_forwards_only(&self) -> bool {
        !self.entries.iter().any(Entry::change_direction)
    }

    #[must_use]
    pub fn layout(&self) -> TableLayout {
        if let Some(length) = self.fixed_length() {
            TableLayout::FixedLength(length)
        } else if self.has_one_byte_lengths() {
            TableLayout::Compact
        } else {
            TableLayout::Full
        }
    }

    /// Sum of all entry lengths.
    #[must_use]
    pub fn total_length(&self) -> usize {
        self.entries.iter().map(|e| usize::from(e.length())).sum()
    }

    /// The table as read by the loader, including the zero terminator.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let layout = self.layout();
        let mut out = Vec::with_capacity(self.entries.len() * layout.entry_len() + 1);
        for entry in &self.entries {
            entry.write(layout, &mut out);
        }
        out.push(0);
        out
    }

    /// Resolve every entry against the running load direction.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::AddressOverflow`] if an entry runs past either
    /// end of the address space in its direction of travel.
    pub fn spans(&self) -> Result<Vec<Span>, TableError> {
        let mut backwards = false;
        self.entries
            .iter()
            .map(|entry| {
                if entry.change_direction {
                    backwards = !backwards;
                }
                let overflow = TableError::AddressOverflow {
                    address: entry.address(),
                    length: entry.length(),
                };
                let start = if backwards {
                    entry.address.checked_sub(entry.length() - 1)
                } else {
                    let end = entry.address.checked_add(entry.length() - 1);
                    end.map(|_| entry.address)
                };
                let start = start.ok_or(overflow)?;
                Ok(Span {
                    start: start.get(),
                    len: entry.length(),
                    backwards,
                })
            })
            .collect()
    }
}

impl FromIterator<Entry> for DynamicTable {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Extend<Entry> for DynamicTable {
    fn extend<I: IntoIterator<Item = Entry>>(&mut self, iter: I) {
        self.entries.extend(iter);
        self.fixed_length = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
