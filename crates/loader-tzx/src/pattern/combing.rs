//! Bidirectional "combing" screen loads.
//!
//! The bitmap is loaded in eight passes, one scanline of every character
//! row per third in each pass. Alternate passes run backwards and visit
//! the thirds bottom first, so the loader sweeps down and up the screen
//! while the picture fills in like teeth of a comb.

use crate::screen::{ATTR_BASE, ATTR_LEN, CHAR_ROWS, COLUMNS, SCANLINE_STRIDE};
use crate::screen::{attr_address, third_line_address};
use crate::table::Span;

use super::AttrOrder;

/// Scanline and direction of each pass.
const PASSES: [(u16, bool); 8] = [
    (0, false),
    (4, true),
    (2, false),
    (6, true),
    (1, false),
    (5, true),
    (3, false),
    (7, true),
];

/// Attribute block size for the converging and diverging orders.
const ATTR_BLOCK: u16 = 16;

pub(super) fn pixmap() -> Vec<Span> {
    let mut spans = Vec::with_capacity(PASSES.len() * 3);
    for (scanline, backwards) in PASSES {
        let thirds: [u16; 3] = if backwards { [2, 1, 0] } else { [0, 1, 2] };
        spans.extend(thirds.map(|third| Span {
            start: third_line_address(third, scanline),
            len: SCANLINE_STRIDE,
            backwards,
        }));
    }
    spans
}

pub(super) fn attrs(order: AttrOrder) -> Vec<Span> {
    match order {
        AttrOrder::Alternate => alternate_attrs(),
        AttrOrder::Converging => converging_attrs(),
        AttrOrder::Diverging => diverging_attrs(),
    }
}

/// Even attribute rows top to bottom, then odd rows bottom to top.
fn alternate_attrs() -> Vec<Span> {
    let row = |row: u16, backwards: bool| Span {
        start: attr_address(row, 0),
        len: COLUMNS,
        backwards,
    };
    (0..CHAR_ROWS)
        .step_by(2)
        .map(|r| row(r, false))
        .chain((1..CHAR_ROWS).step_by(2).rev().map(|r| row(r, true)))
        .collect()
}

/// Blocks taken alternately from the top and the bottom until they meet.
fn converging_attrs() -> Vec<Span> {
    let end = ATTR_BASE + ATTR_LEN;
    (0..ATTR_LEN / ATTR_BLOCK / 2)
        .flat_map(|i| {
            [
                Span {
                    start: ATTR_BASE + i * ATTR_BLOCK,
                    len: ATTR_BLOCK,
                    backwards: false,
                },
                Span {
                    start: end - (i + 1) * ATTR_BLOCK,
                    len: ATTR_BLOCK,
                    backwards: true,
                },
            ]
        })
        .collect()
}

/// Blocks spreading outwards from the middle row.
fn diverging_attrs() -> Vec<Span> {
    let middle = ATTR_BASE + ATTR_LEN / 2;
    (0..ATTR_LEN / ATTR_BLOCK / 2)
        .flat_map(|i| {
            [
                Span {
                    start: middle + i * ATTR_BLOCK,
                    len: ATTR_BLOCK,
                    backwards: false,
                },
                Span {
                    start: middle - (i + 1) * ATTR_BLOCK,
                    len: ATTR_BLOCK,
                    backwards: true,
                },
            ]
        })
        .collect()
}
