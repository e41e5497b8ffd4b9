//! Checkerboard loads.
//!
//! The screen is divided into N×N character-cell squares coloured like a
//! chessboard. Black squares load top to bottom; white squares load
//! bottom to top with the loader running backwards. A square is loaded one
//! character row at a time, N bytes per row.

use crate::screen::{CHAR_ROWS, COLUMNS, attr_address, pixel_address};
use crate::table::Span;

use super::SquareSize;
use super::linear::interleave;

/// Top-left cell (row, column) of every square, in reading order, split
/// into black and white squares.
fn squares(size: u16) -> (Vec<(u16, u16)>, Vec<(u16, u16)>) {
    let mut black = Vec::new();
    let mut white = Vec::new();
    for square_row in 0..CHAR_ROWS / size {
        for square_col in 0..COLUMNS / size {
            let cell = (square_row * size, square_col * size);
            if (square_row + square_col) % 2 == 0 {
                black.push(cell);
            } else {
                white.push(cell);
            }
        }
    }
    (black, white)
}

fn attr_spans(size: u16, (row, col): (u16, u16)) -> impl Iterator<Item = Span> {
    (row..row + size).map(move |r| Span {
        start: attr_address(r, col),
        len: size,
        backwards: false,
    })
}

/// Attributes then the eight scanlines of each character row in a square.
fn cell_spans(size: u16, (row, col): (u16, u16)) -> impl Iterator<Item = Span> {
    (row..row + size).flat_map(move |r| {
        std::iter::once(Span {
            start: attr_address(r, col),
            len: size,
            backwards: false,
        })
        .chain((0..8).map(move |scanline| Span {
            start: pixel_address(r, scanline, col),
            len: size,
            backwards: false,
        }))
    })
}

/// Reverse a stream and mark every span for backwards loading.
fn backwards(mut spans: Vec<Span>) -> Vec<Span> {
    spans.reverse();
    for span in &mut spans {
        span.backwards = true;
    }
    spans
}

/// Attribute chunks only: black squares downwards, then white squares
/// upwards.
pub(super) fn attrs(size: SquareSize) -> Vec<Span> {
    let n = size.cells();
    let (black, white) = squares(n);
    let mut spans: Vec<Span> = black.iter().flat_map(|&sq| attr_spans(n, sq)).collect();
    let white: Vec<Span> = white.iter().flat_map(|&sq| attr_spans(n, sq)).collect();
    spans.extend(backwards(white));
    spans
}

/// Whole screen: the black stream downwards and the white stream upwards,
/// interleaved entry by entry.
pub(super) fn tiled(size: SquareSize) -> Vec<Span> {
    let n = size.cells();
    let (black, white) = squares(n);
    let down: Vec<Span> = black.iter().flat_map(|&sq| cell_spans(n, sq)).collect();
    let up: Vec<Span> = white.iter().flat_map(|&sq| cell_spans(n, sq)).collect();
    interleave(&down, &backwards(up))
}
