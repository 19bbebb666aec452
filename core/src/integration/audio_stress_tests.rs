//! Concurrent ring buffer tests with randomized cadences

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::audio::{AudioFormat, AudioRingBuffer, FeedOutcome, SoundOutput, SoundOutputFeeder};

use super::test_utils::{RingDevice, tagged_frame};

const FRAME: usize = 4;

// ============================================================================
// Raw Ring Protocol
// ============================================================================

/// Producer writes whole tagged frames into free space, consumer reads only
/// published frames; every frame must arrive intact and in order.
fn run_spsc(seed: u64, capacity: usize, total_frames: u32) {
    let ring = Arc::new(AudioRingBuffer::new(capacity).unwrap());

    let producer_ring = Arc::clone(&ring);
    let producer = thread::spawn(move || {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut next = 0u32;
        let mut chunk = Vec::with_capacity(capacity);
        while next < total_frames {
            let write = producer_ring.write_position();
            let free = capacity - (write - producer_ring.play_position()) as usize;
            let free_frames = (free / FRAME).min((total_frames - next) as usize);
            if free_frames == 0 {
                thread::yield_now();
                continue;
            }

            let frames = rng.random_range(1..=free_frames);
            chunk.clear();
            for _ in 0..frames {
                chunk.extend_from_slice(&next.to_le_bytes());
                next += 1;
            }
            producer_ring.write(producer_ring.offset(write), &chunk);
            producer_ring.commit_write(write + chunk.len() as u64);
        }
    });

    let mut rng = Pcg32::seed_from_u64(seed ^ 0x5eed);
    let mut expected = 0u32;
    let mut buffer = vec![0u8; capacity];
    while expected < total_frames {
        let available_frames = ring.available() / FRAME;
        if available_frames == 0 {
            thread::yield_now();
            continue;
        }

        let frames = rng.random_range(1..=available_frames);
        let dest = &mut buffer[..frames * FRAME];
        assert_eq!(ring.read(dest), 0, "consumer starved on published data");

        for frame in dest.chunks_exact(FRAME) {
            let tag = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
            assert_eq!(tag, expected, "torn or reordered frame (seed {seed})");
            expected += 1;
        }
    }

    producer.join().unwrap();
    assert_eq!(ring.play_position(), ring.write_position());
}

#[test]
fn test_spsc_frames_arrive_intact() {
    for seed in 0..4 {
        run_spsc(seed, 1024, 50_000);
    }
}

#[test]
fn test_spsc_with_tiny_ring() {
    // Two frames of room forces constant wrap-around
    run_spsc(99, 8, 10_000);
}

// ============================================================================
// Feeder Against a Live Consumer
// ============================================================================

/// The feeder produces tagged frames while a consumer thread drains random
/// amounts, sometimes starving. Published bytes must only ever be whole
/// tagged frames in increasing order, or silence from a resync.
#[test]
fn test_feeder_never_publishes_torn_frames() {
    const TOTAL_FRAMES: u16 = 60_000;

    let ring = Arc::new(AudioRingBuffer::new(8192).unwrap());
    let output =
        SoundOutput::with_safety_bytes(AudioFormat::stereo(48_000), 8192, 2048).unwrap();
    let mut feeder = SoundOutputFeeder::new(output);
    let device = RingDevice {
        ring: Arc::clone(&ring),
    };

    let done = Arc::new(AtomicBool::new(false));
    let consumer_ring = Arc::clone(&ring);
    let consumer_done = Arc::clone(&done);
    let consumer = thread::spawn(move || {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut buffer = vec![0u8; 2048];
        let mut last_tag: Option<u16> = None;
        let mut frames_seen = 0usize;

        while !consumer_done.load(Ordering::Acquire) {
            let frames = rng.random_range(1..=512);
            let dest = &mut buffer[..frames * FRAME];
            let starved = consumer_ring.read(dest);
            let valid = dest.len() - starved;

            for frame in dest[..valid].chunks_exact(FRAME) {
                let left = i16::from_ne_bytes([frame[0], frame[1]]);
                let right = i16::from_ne_bytes([frame[2], frame[3]]);
                if left == 0 && right == 0 {
                    continue;
                }
                assert_eq!(right, !left, "torn frame");
                let tag = left as u16;
                if let Some(last) = last_tag {
                    assert!(tag > last, "frame {tag} replayed after {last}");
                }
                last_tag = Some(tag);
                frames_seen += 1;
            }

            if rng.random_bool(0.3) {
                thread::yield_now();
            }
        }
        frames_seen
    });

    let mut next_tag = 1u16;
    let mut wrote = 0;
    while next_tag < TOTAL_FRAMES {
        let outcome = feeder.feed(&device, &ring, |sound| {
            let frames = sound.sample_count.min((TOTAL_FRAMES - next_tag) as usize);
            for frame in sound.samples.chunks_exact_mut(2).take(frames) {
                frame.copy_from_slice(&tagged_frame(next_tag));
                next_tag += 1;
            }
            frames
        });
        if matches!(outcome, FeedOutcome::Wrote { .. }) {
            wrote += 1;
        }
        thread::yield_now();
    }

    done.store(true, Ordering::Release);
    let frames_seen = consumer.join().unwrap();

    assert!(wrote > 0);
    assert!(frames_seen > 0);
    assert!(ring.play_position() <= ring.write_position());
}
