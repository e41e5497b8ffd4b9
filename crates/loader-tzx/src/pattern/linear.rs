//! Contiguous screen loads that follow the picture rather than memory.
//!
//! Each character row is loaded as its attribute row followed by its eight
//! 32-byte pixel scanlines, so the screen appears row by row in its final
//! colours. The row stream can run top to bottom, bottom to top, from both
//! ends towards the middle, or from the middle outwards.

use crate::screen::{CHAR_ROWS, COLUMNS, attr_address, pixel_address};
use crate::table::Span;

/// Every character row in screen order: attributes, then scanlines 0-7.
pub(super) fn top_to_bottom() -> Vec<Span> {
    let mut spans = Vec::with_capacity(usize::from(CHAR_ROWS) * 9);
    for row in 0..CHAR_ROWS {
        spans.push(forwards(attr_address(row, 0), COLUMNS));
        spans.extend((0..8).map(|scanline| forwards(pixel_address(row, scanline, 0), COLUMNS)));
    }
    spans
}

/// Every character row from the bottom: attributes, then scanlines 7-0.
pub(super) fn bottom_to_top() -> Vec<Span> {
    let mut spans = Vec::with_capacity(usize::from(CHAR_ROWS) * 9);
    for row in (0..CHAR_ROWS).rev() {
        spans.push(forwards(attr_address(row, 0), COLUMNS));
        spans.extend(
            (0..8)
                .rev()
                .map(|scanline| forwards(pixel_address(row, scanline, 0), COLUMNS)),
        );
    }
    spans
}

fn forwards(start: u16, len: u16) -> Span {
    Span {
        start,
        len,
        backwards: false,
    }
}

/// The top half loading downwards interleaved with the bottom half
/// loading upwards, until the two meet at the middle row.
pub(super) fn converging() -> Vec<Span> {
    let down = top_to_bottom();
    let up = bottom_to_top();
    let half = down.len() / 2;
    interleave(&down[..half], &up[..half])
}

/// Loading starts at the middle row and spreads both ways.
pub(super) fn diverging() -> Vec<Span> {
    let down = top_to_bottom();
    let up = bottom_to_top();
    let half = down.len() / 2;
    interleave(&down[half..], &up[half..])
}

/// Alternate a forwards stream with a stream loaded backwards, one entry
/// from each in turn.
pub(super) fn interleave(forward: &[Span], backward: &[Span]) -> Vec<Span> {
    debug_assert_eq!(forward.len(), backward.len());
    forward
        .iter()
        .zip(backward)
        .flat_map(|(f, b)| {
            [
                *f,
                Span {
                    backwards: true,
                    ..*b
                },
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_order() {
        let spans = top_to_bottom();
        assert_eq!(spans.len(), 216);
        assert_eq!(spans[0].start, 0x5800);
        assert_eq!(spans[1].start, 0x4000);
        assert_eq!(spans[2].start, 0x4100);
        assert_eq!(spans[9].start, 0x5820);
        assert_eq!(spans[10].start, 0x4020);
    }

    #[test]
    fn bottom_to_top_starts_at_last_row() {
        let spans = bottom_to_top();
        assert_eq!(spans[0].start, 0x5AE0);
        assert_eq!(spans[1].start, 0x57E0);
        assert_eq!(spans[8].start, 0x50E0);
        assert!(spans.iter().all(|s| !s.backwards));
    }

    #[test]
    fn converging_alternates_direction() {
        let spans = converging();
        assert_eq!(spans.len(), 216);
        assert_eq!(spans[0].start, 0x5800);
        assert_eq!(spans[1].start, 0x5AE0);
        assert!(spans.iter().step_by(2).all(|s| !s.backwards));
        assert!(spans.iter().skip(1).step_by(2).all(|s| s.backwards));
    }

    #[test]
    fn diverging_starts_at_middle_rows() {
        let spans = diverging();
        // row 12 downwards, row 11 upwards
        assert_eq!(spans[0].start, attr_address(12, 0));
        assert_eq!(spans[1].start, attr_address(11, 0));
        assert_eq!(spans[3].start, pixel_address(11, 7, 0));
    }
}
