//! Audio sync display
//!
//! Draws recent feeder cursor snapshots over the backbuffer, scaled so the
//! full ring spans the buffer width. Useful for eyeballing how far ahead of
//! playback the producer stays.

use crate::audio::AudioMarker;
use crate::backbuffer::OffscreenBuffer;

/// Play cursor color
pub const PLAY_COLOR: u32 = 0xFFFFFFFF;
/// Write start color
pub const WRITE_COLOR: u32 = 0xFFFF0000;
/// Write target color
pub const TARGET_COLOR: u32 = 0xFFFFFF00;

/// Blank border around the display in pixels
const PAD: usize = 16;

/// Draw `markers` (oldest first) as vertical lines across `buffer`
///
/// Each marker gets its own band of rows so successive cycles stack top to
/// bottom. Does nothing for an empty ring or a buffer too small to pad.
pub fn draw_sync_display<'a, I>(buffer: &mut OffscreenBuffer, markers: I, capacity: usize)
where
    I: IntoIterator<Item = &'a AudioMarker>,
    I::IntoIter: ExactSizeIterator,
{
    let markers = markers.into_iter();
    let count = markers.len();
    if capacity == 0 || count == 0 || buffer.width <= 2 * PAD || buffer.height <= 2 * PAD {
        return;
    }

    let band = ((buffer.height - 2 * PAD) / count).max(1);
    let scale = (buffer.width - 2 * PAD) as f64 / capacity as f64;

    for (index, marker) in markers.enumerate() {
        let top = PAD + index * band;
        let bottom = (top + band).min(buffer.height - PAD);
        // Play cursor drawn last so it stays visible when cursors coincide
        for (offset, color) in [
            (marker.target_offset, TARGET_COLOR),
            (marker.write_offset, WRITE_COLOR),
            (marker.play_offset, PLAY_COLOR),
        ] {
            let x = PAD + (offset as f64 * scale) as usize;
            draw_vertical(buffer, x, top, bottom, color);
        }
    }
}

fn draw_vertical(buffer: &mut OffscreenBuffer, x: usize, top: usize, bottom: usize, color: u32) {
    for y in top..bottom {
        if let Some(pixel) = buffer.pixel_mut(x, y) {
            *pixel = color;
        }
    }
}
