//! Fixed-capacity circular byte store shared by the sound feeder and the audio callback
//!
//! One producer (main loop) and one consumer (audio thread). Cursors are kept as
//! absolute byte positions so "full" and "empty" never alias; offsets into the
//! store are the positions taken modulo capacity.
//!
//! ```text
//! 0            play_cursor                 write_cursor              capacity
//! |............|###########################|.........................|
//!               published, not yet played
//! ```
//!
//! Memory ordering: the producer copies bytes then publishes with a release
//! store of the write position; the consumer acquires the write position before
//! copying and publishes its play position with a release store afterwards.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use super::AudioError;

/// Circular byte store with a play cursor and a write cursor
pub struct AudioRingBuffer {
    /// Backing store. Elements are atomics so a starved read overlapping a
    /// concurrent write is defined behaviour (it just yields stale bytes).
    data: Box<[AtomicU8]>,
    capacity: usize,
    /// Absolute position of the next byte the consumer reads
    play: AtomicU64,
    /// Absolute end of the bytes the producer has published
    write: AtomicU64,
}

impl AudioRingBuffer {
    /// Allocate a zeroed ring of `capacity_bytes`
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity_bytes` is 0.
    pub fn new(capacity_bytes: usize) -> Result<Self, AudioError> {
        if capacity_bytes == 0 {
            return Err(AudioError::UnsupportedFormat(
                "ring buffer capacity must be greater than 0".into(),
            ));
        }

        let data = (0..capacity_bytes).map(|_| AtomicU8::new(0)).collect();

        Ok(Self {
            data,
            capacity: capacity_bytes,
            play: AtomicU64::new(0),
            write: AtomicU64::new(0),
        })
    }

    /// Total size of the store in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Map an absolute position to an offset into the store
    pub fn offset(&self, position: u64) -> usize {
        (position % self.capacity as u64) as usize
    }

    /// Absolute number of bytes the consumer has read
    pub fn play_position(&self) -> u64 {
        self.play.load(Ordering::Acquire)
    }

    /// Absolute end of the published bytes
    pub fn write_position(&self) -> u64 {
        self.write.load(Ordering::Acquire)
    }

    /// Offset of the next byte the consumer reads
    pub fn play_cursor(&self) -> usize {
        self.offset(self.play_position())
    }

    /// Offset just past the last published byte
    pub fn write_cursor(&self) -> usize {
        self.offset(self.write_position())
    }

    /// Published bytes the consumer has not read yet
    pub fn available(&self) -> usize {
        let play = self.play_position();
        self.write_position().saturating_sub(play) as usize
    }

    /// Move both cursors to `position`
    ///
    /// Only valid while no consumer is running (before the stream starts).
    pub fn reset(&self, position: u64) {
        self.play.store(position, Ordering::Release);
        self.write.store(position, Ordering::Release);
    }

    /// Copy `bytes` into the store starting at `offset`, wrapping at the end
    ///
    /// Performs no overwrite protection: the caller guarantees the span does not
    /// cover unread bytes ahead of the play cursor. Cursors are not moved; publish
    /// with [`commit_write`](Self::commit_write) once the copy is complete.
    pub fn write(&self, offset: usize, bytes: &[u8]) {
        debug_assert!(
            bytes.len() <= self.capacity,
            "write of {} bytes exceeds ring capacity {}",
            bytes.len(),
            self.capacity
        );

        let start = offset % self.capacity;
        let region_1_size = bytes.len().min(self.capacity - start);
        let (region_1, region_2) = bytes.split_at(region_1_size);

        store(&self.data[start..start + region_1_size], region_1);
        for chunk in region_2.chunks(self.capacity) {
            store(&self.data[..chunk.len()], chunk);
        }
    }

    /// Publish the producer's write position (release)
    ///
    /// The write position never moves backwards; publishing a position behind
    /// the current one is a no-op.
    pub fn commit_write(&self, position: u64) {
        self.write.fetch_max(position, Ordering::Release);
    }

    /// Copy `dest.len()` bytes out from the play cursor and advance the cursors
    ///
    /// Consumer only. Never blocks: if fewer bytes were published than requested,
    /// the remainder is whatever the store holds (stale or zeroed audio). Returns
    /// the number of bytes that were not published yet (0 when fully fed).
    pub fn read(&self, dest: &mut [u8]) -> usize {
        if dest.is_empty() {
            return 0;
        }

        debug_assert!(
            dest.len() <= self.capacity,
            "read of {} bytes exceeds ring capacity {}",
            dest.len(),
            self.capacity
        );
        let length = dest.len().min(self.capacity);

        let play = self.play.load(Ordering::Relaxed);
        let written = self.write.load(Ordering::Acquire);

        let start = self.offset(play);
        let region_1_size = length.min(self.capacity - start);
        let region_2_size = length - region_1_size;

        load(
            &self.data[start..start + region_1_size],
            &mut dest[..region_1_size],
        );
        load(&self.data[..region_2_size], &mut dest[region_1_size..length]);
        dest[length..].fill(0);

        let new_play = play + length as u64;
        // Drag the write cursor first so playback is never observed past it
        self.write.fetch_max(new_play, Ordering::AcqRel);
        self.play.store(new_play, Ordering::Release);

        let published = written.saturating_sub(play);
        (length as u64).saturating_sub(published) as usize
    }
}

impl fmt::Debug for AudioRingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioRingBuffer")
            .field("capacity", &self.capacity)
            .field("play", &self.play.load(Ordering::Relaxed))
            .field("write", &self.write.load(Ordering::Relaxed))
            .finish()
    }
}

fn store(dst: &[AtomicU8], src: &[u8]) {
    for (slot, &byte) in dst.iter().zip(src) {
        slot.store(byte, Ordering::Relaxed);
    }
}

fn load(src: &[AtomicU8], dst: &mut [u8]) {
    for (byte, slot) in dst.iter_mut().zip(src) {
        *byte = slot.load(Ordering::Relaxed);
    }
}
