//! Stream reassembly: turns arbitrarily chunked transport bytes into whole frames.
//!
//! The reassembler is owned by the ingest task, so `&mut self` is the only
//! synchronization it needs. It never validates checksums; that is the codec's job.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace};

use super::codec::{CHECKSUM_LEN, HEADER_LEN, SIGNATURE_LEN, START_MARKER, frame_len};

/// Default bound on buffered, not-yet-framed bytes.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Largest possible frame: full payload plus signature. Smaller buffers could
/// never hold a valid frame.
pub const MIN_CAPACITY: usize = HEADER_LEN + u8::MAX as usize + CHECKSUM_LEN + SIGNATURE_LEN;

#[derive(Debug)]
pub struct FrameReassembler {
    buffer: BytesMut,
    capacity: usize,
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl FrameReassembler {
    pub fn new(capacity: usize) -> Self {
        Self { buffer: BytesMut::with_capacity(capacity), capacity }
    }

    /// Append `data` and extract every complete frame now available, in stream order.
    ///
    /// Bytes before a start marker are discarded; an incomplete trailing frame stays
    /// buffered until more data arrives. Capacity bounds what is left over after
    /// framing: a remainder larger than it is dropped entirely.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        loop {
            let Some(start) = self.buffer.iter().position(|&b| b == START_MARKER) else {
                if !self.buffer.is_empty() {
                    trace!(discarded = self.buffer.len(), "No start marker in buffered bytes");
                }
                self.buffer.clear();
                break;
            };
            if start > 0 {
                trace!(discarded = start, "Skipping bytes before start marker");
                self.buffer.advance(start);
            }

            if self.buffer.len() < HEADER_LEN {
                break;
            }
            let total = frame_len(&self.buffer[..HEADER_LEN]);
            if self.buffer.len() < total {
                break;
            }
            frames.push(self.buffer.split_to(total).freeze());
        }

        if self.buffer.len() > self.capacity {
            debug!(
                buffered = self.buffer.len(),
                capacity = self.capacity,
                "Reassembly buffer overflow, discarding buffered bytes"
            );
            self.buffer.clear();
        }
        frames
    }

    /// Number of bytes held waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::{self, parse};
    use crate::protocol::message::{Value, ids};
    use proptest::prelude::*;

    fn attitude(seq: u8) -> Bytes {
        codec::serialize(
            ids::ATTITUDE,
            seq,
            1,
            1,
            &[("roll", Value::Float32(0.1)), ("pitch", Value::Float32(-0.2))],
        )
    }

    #[test]
    fn extracts_single_frame() {
        let mut reassembler = FrameReassembler::default();
        let frames = reassembler.push(&attitude(0));
        assert_eq!(frames.len(), 1);
        assert_eq!(reassembler.buffered(), 0);
        assert!(parse(&frames[0]).is_ok());
    }

    #[test]
    fn waits_for_split_frame() {
        let frame = attitude(1);
        let mut reassembler = FrameReassembler::default();
        assert!(reassembler.push(&frame[..5]).is_empty());
        assert!(reassembler.push(&frame[5..20]).is_empty());
        let frames = reassembler.push(&frame[20..]);
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn skips_leading_garbage() {
        let frame = attitude(2);
        let mut data = vec![0x00, 0x11, 0x22];
        data.extend_from_slice(&frame);
        let mut reassembler = FrameReassembler::default();
        assert_eq!(reassembler.push(&data), vec![frame]);
    }

    #[test]
    fn discards_input_without_marker() {
        let mut reassembler = FrameReassembler::default();
        assert!(reassembler.push(&[1, 2, 3, 4, 5]).is_empty());
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut data = Vec::new();
        for seq in 0..4 {
            data.extend_from_slice(&attitude(seq));
        }
        let mut reassembler = FrameReassembler::default();
        let frames = reassembler.push(&data);
        let sequences: Vec<u8> = frames.iter().map(|f| f[4]).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
    }

    #[test]
    fn overflow_resets_buffer() {
        let mut reassembler = FrameReassembler::new(64);
        // A header announcing a 200-byte payload keeps the buffer waiting.
        let mut pending = vec![START_MARKER, 200, 0, 0, 0, 1, 1, 30, 0, 0];
        pending.resize(50, 0);
        assert!(reassembler.push(&pending).is_empty());
        assert_eq!(reassembler.buffered(), 50);

        // Still stalled on the oversized frame and now past capacity: dropped.
        assert!(reassembler.push(&[0u8; 20]).is_empty());
        assert_eq!(reassembler.buffered(), 0);

        let frame = attitude(9);
        assert_eq!(reassembler.push(&frame), vec![frame]);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn full_reads_after_a_split_frame_keep_every_frame() {
        let mut stream = Vec::new();
        let mut seq = 0u8;
        while stream.len() <= DEFAULT_CAPACITY + 100 {
            stream.extend_from_slice(&attitude(seq));
            seq = seq.wrapping_add(1);
        }

        let expected = FrameReassembler::default().push(&stream);
        let mut reassembler = FrameReassembler::default();
        let mut actual = reassembler.push(&stream[..20]);
        actual.extend(reassembler.push(&stream[20..20 + DEFAULT_CAPACITY]));
        actual.extend(reassembler.push(&stream[20 + DEFAULT_CAPACITY..]));

        assert_eq!(actual.len(), expected.len());
        assert_eq!(actual, expected);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn signed_frame_is_extracted_whole() {
        let mut frame = attitude(3).to_vec();
        frame[2] = codec::INCOMPAT_FLAG_SIGNED;
        frame.extend_from_slice(&[0xAA; codec::SIGNATURE_LEN]);
        let mut reassembler = FrameReassembler::default();
        let frames = reassembler.push(&frame);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), frame.len());
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_frames(
            count in 1usize..8,
            garbage in prop::collection::vec(0u8..0xFD, 0..16),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
        ) {
            let mut stream = garbage.clone();
            for seq in 0..count {
                stream.extend_from_slice(&attitude(seq as u8));
                stream.extend_from_slice(&garbage);
            }

            let mut whole = FrameReassembler::default();
            let expected = whole.push(&stream);
            prop_assert_eq!(expected.len(), count);

            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(stream.len())).collect();
            points.sort_unstable();
            points.dedup();

            let mut chunked = FrameReassembler::default();
            let mut actual = Vec::new();
            let mut from = 0;
            for point in points.into_iter().chain(std::iter::once(stream.len())) {
                actual.extend(chunked.push(&stream[from..point]));
                from = point;
            }
            prop_assert_eq!(actual, expected);
        }
    }
}
