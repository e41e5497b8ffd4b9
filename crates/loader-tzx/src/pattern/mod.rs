//! Fancy screen loads.
//!
//! A load pattern is an order in which the 6912 bytes of a Spectrum screen
//! arrive from tape. Each pattern is a list of [`Span`]s that covers the
//! display exactly once; [`LoadPattern::table`] turns it into the dynamic
//! table the loader follows, with direction changes inserted wherever
//! consecutive spans travel in different directions.
//!
//! Patterns are named on the command line:
//!
//! | Family | Names |
//! |---|---|
//! | combing | `bidi-pa` `bidi-pac` `bidi-pad` `bidi-ap` `bidi-acp` `bidi-adp` |
//! | whole regions | `fa-fp` `fa-rp` `ra-fp` `ra-rp` `fp-fa` `fp-ra` `rp-fa` `rp-ra` |
//! | striped | `ttb-fa` `ttb-ra` `fa-ttb` `ra-ttb` `btt-fa` `btt-ra` `fa-btt` `ra-btt` |
//! | linear | `linear-ttb` `linear-btt` `linear-converging` `linear-diverging` `linear-squares-N` |
//! | square attributes | `squares-N` |
//!
//! where N is 1, 2, 4 or 8 character cells.

mod combing;
mod linear;
mod squares;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::screen::{
    ATTR_BASE, ATTR_LEN, PIXMAP_LEN, SCANLINE_STRIDE, SCREEN_BASE, SCREEN_END, SCREEN_LEN,
    third_line_address,
};
use crate::table::{DynamicTable, Span};

/// Order of the attribute rows in a combing load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrOrder {
    /// Even rows downwards, then odd rows upwards.
    Alternate,
    /// 16-byte blocks from both ends, meeting in the middle.
    Converging,
    /// 16-byte blocks from the middle outwards.
    Diverging,
}

/// One of the two display areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Pixmap,
    Attrs,
}

impl Region {
    /// The area loaded after this one.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Pixmap => Self::Attrs,
            Self::Attrs => Self::Pixmap,
        }
    }
}

/// Row order of a linear load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinearOrder {
    TopToBottom,
    BottomToTop,
    Converging,
    Diverging,
    Squares(SquareSize),
}

/// Edge of a checkerboard square, in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SquareSize {
    One,
    Two,
    Four,
    Eight,
}

impl SquareSize {
    pub const ALL: [Self; 4] = [Self::One, Self::Two, Self::Four, Self::Eight];

    #[must_use]
    pub fn cells(self) -> u16 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

/// A named screen load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadPattern {
    /// Eight bidirectional passes over the pixmap scanlines, with the
    /// attributes before or after.
    Combing { attrs: AttrOrder, attrs_first: bool },
    /// Each region in one block.
    Whole {
        first: Region,
        first_backwards: bool,
        second_backwards: bool,
    },
    /// The pixmap one 256-byte line per third at a time, with the
    /// attributes in one block before or after.
    Striped {
        top_to_bottom: bool,
        attrs_backwards: bool,
        attrs_first: bool,
    },
    /// Character rows in picture order, attributes leading each row.
    Linear(LinearOrder),
    /// The pixmap forwards, then the attributes in checkerboard squares.
    SquareAttrs(SquareSize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown load pattern {0:?}")]
pub struct UnknownPattern(pub String);

impl LoadPattern {
    /// Every pattern, in the order they are listed to the user.
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut all = Vec::new();
        for attrs_first in [false, true] {
            for attrs in [AttrOrder::Alternate, AttrOrder::Converging, AttrOrder::Diverging] {
                all.push(Self::Combing { attrs, attrs_first });
            }
        }
        for first in [Region::Attrs, Region::Pixmap] {
            for first_backwards in [false, true] {
                for second_backwards in [false, true] {
                    all.push(Self::Whole {
                        first,
                        first_backwards,
                        second_backwards,
                    });
                }
            }
        }
        for top_to_bottom in [true, false] {
            for attrs_first in [false, true] {
                for attrs_backwards in [false, true] {
                    all.push(Self::Striped {
                        top_to_bottom,
                        attrs_backwards,
                        attrs_first,
                    });
                }
            }
        }
        all.extend(
            [
                LinearOrder::TopToBottom,
                LinearOrder::BottomToTop,
                LinearOrder::Converging,
                LinearOrder::Diverging,
            ]
            .map(Self::Linear),
        );
        all.extend(SquareSize::ALL.map(LinearOrder::Squares).map(Self::Linear));
        all.extend(SquareSize::ALL.map(Self::SquareAttrs));
        all
    }

    /// The screen spans in load order.
    #[must_use]
    pub fn spans(self) -> Vec<Span> {
        match self {
            Self::Combing { attrs, attrs_first } => {
                let (pixmap, attrs) = (combing::pixmap(), combing::attrs(attrs));
                if attrs_first {
                    [attrs, pixmap].concat()
                } else {
                    [pixmap, attrs].concat()
                }
            }
            Self::Whole {
                first,
                first_backwards,
                second_backwards,
            } => {
                vec![
                    whole_region(first, first_backwards),
                    whole_region(first.other(), second_backwards),
                ]
            }
            Self::Striped {
                top_to_bottom,
                attrs_backwards,
                attrs_first,
            } => {
                let pixmap = striped_pixmap(top_to_bottom);
                let attrs = whole_attrs(attrs_backwards);
                if attrs_first {
                    std::iter::once(attrs).chain(pixmap).collect()
                } else {
                    pixmap.into_iter().chain(std::iter::once(attrs)).collect()
                }
            }
            Self::Linear(order) => match order {
                LinearOrder::TopToBottom => linear::top_to_bottom(),
                LinearOrder::BottomToTop => linear::bottom_to_top(),
                LinearOrder::Converging => linear::converging(),
                LinearOrder::Diverging => linear::diverging(),
                LinearOrder::Squares(size) => squares::tiled(size),
            },
            Self::SquareAttrs(size) => {
                let mut spans = vec![whole_pixmap(false)];
                spans.extend(squares::attrs(size));
                spans
            }
        }
    }

    /// The dynamic table for this pattern.
    #[must_use]
    pub fn table(self) -> DynamicTable {
        let spans = self.spans();
        assert!(covers_screen(&spans), "{self} does not cover the screen");
        DynamicTable::from_screen_spans(&spans)
    }
}

fn whole_region(region: Region, backwards: bool) -> Span {
    match region {
        Region::Attrs => whole_attrs(backwards),
        Region::Pixmap => whole_pixmap(backwards),
    }
}

fn whole_pixmap(backwards: bool) -> Span {
    Span {
        start: SCREEN_BASE,
        len: PIXMAP_LEN,
        backwards,
    }
}

fn whole_attrs(backwards: bool) -> Span {
    Span {
        start: ATTR_BASE,
        len: ATTR_LEN,
        backwards,
    }
}

/// Scanline 0 of each third, then scanline 1 of each third, and so on.
/// Bottom to top reverses both orders and loads each line backwards.
fn striped_pixmap(top_to_bottom: bool) -> Vec<Span> {
    let mut spans = Vec::with_capacity(24);
    for scanline in 0..8 {
        for third in 0..3 {
            let (scanline, third) = if top_to_bottom {
                (scanline, third)
            } else {
                (7 - scanline, 2 - third)
            };
            spans.push(Span {
                start: third_line_address(third, scanline),
                len: SCANLINE_STRIDE,
                backwards: !top_to_bottom,
            });
        }
    }
    spans
}

/// Whether the spans load every screen byte exactly once and nothing else.
#[must_use]
pub fn covers_screen(spans: &[Span]) -> bool {
    let mut seen = vec![false; SCREEN_LEN];
    for span in spans {
        if span.start < SCREEN_BASE || span.end() > u32::from(SCREEN_END) {
            return false;
        }
        let from = usize::from(span.start - SCREEN_BASE);
        for byte in &mut seen[from..from + usize::from(span.len)] {
            if *byte {
                return false;
            }
            *byte = true;
        }
    }
    seen.iter().all(|&b| b)
}

impl fmt::Display for LoadPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = |backwards: bool| if backwards { 'r' } else { 'f' };
        match *self {
            Self::Combing { attrs, attrs_first } => {
                let order = match attrs {
                    AttrOrder::Alternate => "",
                    AttrOrder::Converging => "c",
                    AttrOrder::Diverging => "d",
                };
                if attrs_first {
                    write!(f, "bidi-a{order}p")
                } else {
                    write!(f, "bidi-pa{order}")
                }
            }
            Self::Whole {
                first,
                first_backwards,
                second_backwards,
            } => {
                let (a, b) = match first {
                    Region::Attrs => ('a', 'p'),
                    Region::Pixmap => ('p', 'a'),
                };
                write!(
                    f,
                    "{}{a}-{}{b}",
                    direction(first_backwards),
                    direction(second_backwards)
                )
            }
            Self::Striped {
                top_to_bottom,
                attrs_backwards,
                attrs_first,
            } => {
                let pixmap = if top_to_bottom { "ttb" } else { "btt" };
                let attrs = direction(attrs_backwards);
                if attrs_first {
                    write!(f, "{attrs}a-{pixmap}")
                } else {
                    write!(f, "{pixmap}-{attrs}a")
                }
            }
            Self::Linear(order) => match order {
                LinearOrder::TopToBottom => f.write_str("linear-ttb"),
                LinearOrder::BottomToTop => f.write_str("linear-btt"),
                LinearOrder::Converging => f.write_str("linear-converging"),
                LinearOrder::Diverging => f.write_str("linear-diverging"),
                LinearOrder::Squares(size) => write!(f, "linear-squares-{}", size.cells()),
            },
            Self::SquareAttrs(size) => write!(f, "squares-{}", size.cells()),
        }
    }
}

impl FromStr for LoadPattern {
    type Err = UnknownPattern;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|pattern| pattern.to_string() == s)
            .ok_or_else(|| UnknownPattern(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableLayout;

    fn pattern(name: &str) -> LoadPattern {
        name.parse().expect("known pattern")
    }

    #[test]
    fn every_pattern_covers_the_screen() {
        for pattern in LoadPattern::all() {
            let spans = pattern.spans();
            assert!(covers_screen(&spans), "{pattern}");
            let table = pattern.table();
            assert_eq!(table.total_length(), SCREEN_LEN, "{pattern}");
            assert_eq!(table.spans().expect("screen spans"), spans, "{pattern}");
        }
    }

    #[test]
    fn names_are_unique_and_parse_back() {
        let all = LoadPattern::all();
        assert_eq!(all.len(), 34);
        for pattern in &all {
            assert_eq!(pattern.to_string().parse::<LoadPattern>(), Ok(*pattern));
        }
        let mut names: Vec<String> = all.iter().map(ToString::to_string).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn familiar_names() {
        for name in [
            "bidi-pa", "bidi-pac", "bidi-pad", "bidi-ap", "bidi-acp", "bidi-adp", "fa-rp",
            "ra-fp", "rp-fa", "fp-ra", "ttb-fa", "ttb-ra", "fa-ttb", "ra-ttb", "btt-fa",
            "btt-ra", "fa-btt", "ra-btt", "linear-ttb", "linear-btt", "linear-converging",
            "linear-diverging", "linear-squares-1", "linear-squares-8", "squares-2",
        ] {
            assert_eq!(pattern(name).to_string(), name);
        }
        assert_eq!(
            "linear-squares-3".parse::<LoadPattern>(),
            Err(UnknownPattern("linear-squares-3".into()))
        );
    }

    #[test]
    fn whole_region_entries() {
        let table = pattern("fa-rp").table();
        let entries: Vec<_> = table
            .entries()
            .iter()
            .map(|e| (e.address(), e.length(), e.change_direction()))
            .collect();
        assert_eq!(entries, vec![(0x5800, 768, false), (0x57FF, 6144, true)]);

        let table = pattern("ra-fp").table();
        let entries: Vec<_> = table
            .entries()
            .iter()
            .map(|e| (e.address(), e.change_direction()))
            .collect();
        assert_eq!(entries, vec![(23295, true), (16384, true)]);
    }

    #[test]
    fn linear_ttb_is_fixed_length() {
        let table = pattern("linear-ttb").table();
        assert_eq!(table.layout(), TableLayout::FixedLength(32));
        assert_eq!(table.len(), 216);
        assert_eq!(table.to_bytes().len(), 216 * 2 + 1);
        assert!(pattern("linear-btt").table().is_fixed_length());
    }

    #[test]
    fn layouts_follow_entry_lengths() {
        for name in ["linear-converging", "linear-squares-4"] {
            assert_eq!(pattern(name).table().layout(), TableLayout::Compact, "{name}");
        }
        assert_eq!(pattern("bidi-pa").table().layout(), TableLayout::Full);
        assert_eq!(pattern("squares-8").table().layout(), TableLayout::Full);
        let striped = pattern("ttb-fa").table();
        assert_eq!(striped.layout(), TableLayout::Full);
        assert!(striped.is_forwards_only());
    }

    #[test]
    fn striped_bottom_to_top_enters_backwards() {
        let table = pattern("btt-fa").table();
        let first = table.entries()[0];
        assert_eq!(first.address(), 0x57FF);
        assert!(first.change_direction());
        let last = table.entries()[24];
        assert_eq!((last.address(), last.change_direction()), (0x5800, true));

        // already travelling backwards after the attributes
        let table = pattern("ra-btt").table();
        assert!(table.entries()[0].change_direction());
        assert!(!table.entries()[1].change_direction());
    }

    #[test]
    fn combing_attrs_first_enters_pixmap_backwards() {
        let table = pattern("bidi-ap").table();
        // attributes end travelling backwards, and the first pixmap pass
        // goes forwards again
        let spans = table.spans().expect("screen spans");
        assert!(spans[23].backwards);
        assert!(!spans[24].backwards);
        assert!(table.entries()[24].change_direction());
    }

    #[test]
    fn coverage_detects_gaps_and_overlaps() {
        let mut spans = pattern("linear-ttb").spans();
        let last = spans.pop().expect("non-empty");
        assert!(!covers_screen(&spans));
        spans.push(last);
        spans.push(last);
        assert!(!covers_screen(&spans));
        assert!(!covers_screen(&[Span {
            start: 0x3FFF,
            len: 1,
            backwards: false
        }]));
    }
}
