//! Offscreen pixel buffer the game layer renders into
//!
//! Pixels are 32-bit `0xAARRGGBB` values stored row-major. Presenting the
//! buffer to a window is up to the platform layer.

/// Bytes per pixel in [`OffscreenBuffer::memory`]
pub const BYTES_PER_PIXEL: usize = 4;

/// Row-major 32-bit framebuffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffscreenBuffer {
    pub width: usize,
    pub height: usize,
    /// Row stride in bytes
    pub pitch: usize,
    pub memory: Vec<u32>,
}

impl OffscreenBuffer {
    /// Allocate a black buffer
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pitch: width * BYTES_PER_PIXEL,
            memory: vec![0; width * height],
        }
    }

    /// Reallocate for new dimensions (contents are cleared)
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pitch = width * BYTES_PER_PIXEL;
        self.memory = vec![0; width * height];
    }

    /// Fill every pixel with `color`
    pub fn clear(&mut self, color: u32) {
        self.memory.fill(color);
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> Option<&mut u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.memory.get_mut(y * self.width + x)
    }

    /// Row `y`, or `None` outside the buffer
    pub fn row_mut(&mut self, y: usize) -> Option<&mut [u32]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.memory.get_mut(start..start + self.width)
    }

    /// Mutable rows from top to bottom
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u32]> {
        // chunks_mut rejects a zero chunk size
        self.memory.chunks_mut(self.width.max(1))
    }

    /// Raw pixel bytes in memory order
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.memory)
    }
}
