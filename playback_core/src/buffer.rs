//! Client-side accumulation of audio chunks.

use std::str::FromStr;

use bytes::{Bytes, BytesMut};
use protocol_core::DEFAULT_EXPECTED_CHUNKS;

use crate::error::PlaybackError;

/// How the buffer decides that a reply is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedCount {
    /// Ready once at least this many chunks are buffered. End-of-stream
    /// frames are ignored.
    Static(usize),
    /// Ready once the server has terminated a turn and every chunk it
    /// declared has arrived.
    Declared,
}

impl Default for ExpectedCount {
    fn default() -> Self {
        ExpectedCount::Static(DEFAULT_EXPECTED_CHUNKS)
    }
}

impl FromStr for ExpectedCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("declared") {
            return Ok(ExpectedCount::Declared);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("expected chunk count must be positive".to_string()),
            Ok(n) => Ok(ExpectedCount::Static(n)),
            Err(_) => Err(format!("invalid expected chunk count: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Idle,
    Accumulating,
    Ready,
}

/// Everything buffered since the last play, concatenated in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledAudio {
    pub chunks: usize,
    pub data: Bytes,
}

/// Ordered chunk store behind the Play control.
///
/// The received count is always the number of stored chunks.
#[derive(Debug, Clone)]
pub struct ChunkBuffer {
    chunks: Vec<Bytes>,
    expected: ExpectedCount,
    // Declared mode: chunks before this index belong to finished turns
    turn_start: usize,
    // Declared mode: chunks covered by a verified end-of-stream frame
    sealed: usize,
}

impl ChunkBuffer {
    pub fn new(expected: ExpectedCount) -> Self {
        Self {
            chunks: Vec::new(),
            expected,
            turn_start: 0,
            sealed: 0,
        }
    }

    pub fn expected(&self) -> ExpectedCount {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.chunks.len()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    pub fn push(&mut self, chunk: Bytes) -> BufferState {
        self.chunks.push(chunk);
        self.state()
    }

    /// Apply an end-of-stream frame for the current turn.
    ///
    /// In declared mode a complete turn whose chunk count matches what
    /// arrived is sealed; anything else drops the turn's chunks. Static
    /// mode ignores the frame.
    pub fn end_of_stream(&mut self, chunks: usize, complete: bool) -> BufferState {
        if self.expected == ExpectedCount::Declared {
            let arrived = self.chunks.len() - self.turn_start;
            if complete && chunks > 0 && arrived == chunks {
                self.sealed = self.chunks.len();
            } else {
                self.chunks.truncate(self.turn_start);
            }
            self.turn_start = self.chunks.len();
        }
        self.state()
    }

    pub fn play_enabled(&self) -> bool {
        match self.expected {
            ExpectedCount::Static(n) => self.chunks.len() >= n,
            ExpectedCount::Declared => !self.chunks.is_empty() && self.sealed == self.chunks.len(),
        }
    }

    pub fn state(&self) -> BufferState {
        if self.chunks.is_empty() {
            BufferState::Idle
        } else if self.play_enabled() {
            BufferState::Ready
        } else {
            BufferState::Accumulating
        }
    }

    /// Concatenate and clear. Rejected without touching the buffer unless
    /// play is enabled.
    pub fn take_audio(&mut self) -> Result<AssembledAudio, PlaybackError> {
        if !self.play_enabled() {
            return Err(PlaybackError::NotReady {
                received: self.chunks.len(),
            });
        }

        let mut data = BytesMut::with_capacity(self.buffered_bytes());
        for chunk in &self.chunks {
            data.extend_from_slice(chunk);
        }
        let chunks = self.chunks.len();
        self.reset();

        Ok(AssembledAudio {
            chunks,
            data: data.freeze(),
        })
    }

    pub fn reset(&mut self) {
        self.chunks.clear();
        self.turn_start = 0;
        self.sealed = 0;
    }
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new(ExpectedCount::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(tag: u8, len: usize) -> Bytes {
        Bytes::from(vec![tag; len])
    }

    #[test]
    fn test_static_count_states() {
        let mut buffer = ChunkBuffer::new(ExpectedCount::Static(5));
        assert_eq!(buffer.state(), BufferState::Idle);

        for i in 0..4u8 {
            assert_eq!(buffer.push(chunk(i, 1048)), BufferState::Accumulating);
            assert!(!buffer.play_enabled());
        }
        assert_eq!(buffer.push(chunk(4, 1048)), BufferState::Ready);
        assert!(buffer.play_enabled());
        assert_eq!(buffer.received(), 5);
    }

    #[test]
    fn test_take_audio_concatenates_in_order_and_resets() {
        let mut buffer = ChunkBuffer::new(ExpectedCount::Static(3));
        buffer.push(chunk(1, 4));
        buffer.push(chunk(2, 4));
        buffer.push(chunk(3, 2));

        let audio = buffer.take_audio().unwrap();
        assert_eq!(audio.chunks, 3);
        assert_eq!(&audio.data[..], &[1, 1, 1, 1, 2, 2, 2, 2, 3, 3]);
        assert_eq!(buffer.received(), 0);
        assert_eq!(buffer.state(), BufferState::Idle);
    }

    #[test]
    fn test_extra_chunks_are_retained() {
        let mut buffer = ChunkBuffer::new(ExpectedCount::Static(2));
        for i in 0..7u8 {
            buffer.push(chunk(i, 1));
        }
        let audio = buffer.take_audio().unwrap();
        assert_eq!(audio.chunks, 7);
        assert_eq!(&audio.data[..], &[0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_play_before_ready_is_rejected_without_effect() {
        let mut buffer = ChunkBuffer::new(ExpectedCount::Static(5));
        buffer.push(chunk(1, 10));
        buffer.push(chunk(2, 10));

        match buffer.take_audio() {
            Err(PlaybackError::NotReady { received }) => assert_eq!(received, 2),
            other => panic!("expected NotReady, got {other:?}"),
        }
        assert_eq!(buffer.received(), 2);
        assert_eq!(buffer.state(), BufferState::Accumulating);
    }

    #[test]
    fn test_static_mode_ignores_end_of_stream() {
        let mut buffer = ChunkBuffer::new(ExpectedCount::Static(5));
        buffer.push(chunk(1, 10));
        buffer.push(chunk(2, 10));
        assert_eq!(buffer.end_of_stream(2, false), BufferState::Accumulating);
        assert_eq!(buffer.received(), 2);
        assert_eq!(buffer.end_of_stream(2, true), BufferState::Accumulating);
    }

    #[test]
    fn test_declared_mode_seals_matching_turn() {
        let mut buffer = ChunkBuffer::new(ExpectedCount::Declared);
        for i in 0..3u8 {
            assert_eq!(buffer.push(chunk(i, 8)), BufferState::Accumulating);
        }
        assert_eq!(buffer.end_of_stream(3, true), BufferState::Ready);

        // A second turn arriving before play keeps play disabled until sealed.
        assert_eq!(buffer.push(chunk(9, 8)), BufferState::Accumulating);
        assert_eq!(buffer.end_of_stream(1, true), BufferState::Ready);
        assert_eq!(buffer.take_audio().unwrap().chunks, 4);
    }

    #[test]
    fn test_declared_mode_discards_partial_turn() {
        let mut buffer = ChunkBuffer::new(ExpectedCount::Declared);
        buffer.push(chunk(1, 8));
        buffer.push(chunk(2, 8));
        assert_eq!(buffer.end_of_stream(2, true), BufferState::Ready);

        buffer.push(chunk(3, 8));
        assert_eq!(buffer.end_of_stream(3, false), BufferState::Ready);
        assert_eq!(buffer.received(), 2);

        let mut buffer = ChunkBuffer::new(ExpectedCount::Declared);
        buffer.push(chunk(1, 8));
        assert_eq!(buffer.end_of_stream(2, true), BufferState::Idle);
        assert!(!buffer.play_enabled());
    }

    #[test]
    fn test_declared_mode_empty_turn_is_not_playable() {
        let mut buffer = ChunkBuffer::new(ExpectedCount::Declared);
        assert_eq!(buffer.end_of_stream(0, true), BufferState::Idle);
        assert!(buffer.take_audio().is_err());
    }

    #[test]
    fn test_expected_count_parsing() {
        assert_eq!("5".parse::<ExpectedCount>(), Ok(ExpectedCount::Static(5)));
        assert_eq!(" Declared ".parse::<ExpectedCount>(), Ok(ExpectedCount::Declared));
        assert!("0".parse::<ExpectedCount>().is_err());
        assert!("many".parse::<ExpectedCount>().is_err());
    }
}
