//! ZX Spectrum display memory layout.
//!
//! Bitmap at $4000-$57FF (6144 bytes), attributes at $5800-$5AFF (768
//! bytes). The bitmap is split into three 2K thirds of eight character
//! rows each; within a third, consecutive 256-byte lines are successive
//! pixel scanlines of all eight character rows, so the address of a byte
//! is `third * 2048 + scanline * 256 + row * 32 + column`.

pub const SCREEN_BASE: u16 = 0x4000;
pub const PIXMAP_LEN: u16 = 6144;
pub const ATTR_BASE: u16 = 0x5800;
pub const ATTR_LEN: u16 = 768;
pub const SCREEN_LEN: usize = 6912;
/// One past the last screen byte.
pub const SCREEN_END: u16 = ATTR_BASE + ATTR_LEN;

pub const COLUMNS: u16 = 32;
pub const CHAR_ROWS: u16 = 24;
pub const THIRD_LEN: u16 = 2048;
pub const SCANLINE_STRIDE: u16 = 256;

/// Address of a scanline within a third: 256 bytes covering that
/// scanline of all eight character rows.
#[must_use]
pub const fn third_line_address(third: u16, scanline: u16) -> u16 {
    SCREEN_BASE + third * THIRD_LEN + scanline * SCANLINE_STRIDE
}

/// Address of the bitmap byte for a character cell's pixel scanline.
#[must_use]
pub const fn pixel_address(char_row: u16, scanline: u16, column: u16) -> u16 {
    third_line_address(char_row / 8, scanline) + (char_row % 8) * COLUMNS + column
}

/// Address of the attribute byte for a character cell.
#[must_use]
pub const fn attr_address(char_row: u16, column: u16) -> u16 {
    ATTR_BASE + char_row * COLUMNS + column
}
