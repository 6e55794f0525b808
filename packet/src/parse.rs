//! Incremental frame detection over a byte stream.
//!
//! The detector only finds frame boundaries. CRC, stuffing, and field layout
//! are the disassembler's business.

use {
    crate::constants::{HEADER, LENGTH_OFFSET, PREAMBLE_LEN},
    alloc::vec::Vec,
};

/// Where the detector stands after a byte.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Status {
    /// Nothing buffered; waiting for `FF`.
    Idle,
    /// One or two `FF` bytes buffered.
    Starting,
    /// Start-of-frame seen; accumulating until the declared length is reached.
    InProgress,
    /// A whole frame, handed over. The detector is idle again.
    Complete(Vec<u8>),
}

impl Status {
    #[inline]
    pub const fn kind(&self) -> StatusKind {
        match *self {
            Self::Idle => StatusKind::Idle,
            Self::Starting => StatusKind::Starting,
            Self::InProgress => StatusKind::InProgress,
            Self::Complete(_) => StatusKind::Complete,
        }
    }
}

/// [`Status`] without the payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusKind {
    Idle,
    Starting,
    InProgress,
    Complete,
}

#[derive(Clone, Debug, Default)]
pub struct FrameDetector {
    buffer: Vec<u8>,
    expected: Option<usize>,
}

impl FrameDetector {
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            expected: None,
        }
    }

    #[inline]
    pub fn push(&mut self, byte: u8) -> Status {
        self.buffer.push(byte);

        if self.buffer.len() <= HEADER.len() {
            if !HEADER.starts_with(&self.buffer) {
                self.resync();
            }
            return self.status();
        }

        if self.buffer.len() == PREAMBLE_LEN {
            let declared = u16::from_le_bytes([
                self.buffer[LENGTH_OFFSET],
                self.buffer[LENGTH_OFFSET + 1],
            ]);
            self.expected = Some(usize::from(declared) + PREAMBLE_LEN);
        }

        match self.expected {
            Some(expected) if self.buffer.len() >= expected => {
                self.expected = None;
                Status::Complete(core::mem::take(&mut self.buffer))
            }
            _ => Status::InProgress,
        }
    }

    /// Push every byte of `bytes`, yielding each frame as it completes.
    #[inline]
    pub fn feed<'a>(&'a mut self, bytes: &'a [u8]) -> impl Iterator<Item = Vec<u8>> + 'a {
        bytes.iter().filter_map(move |&byte| match self.push(byte) {
            Status::Complete(frame) => Some(frame),
            Status::Idle | Status::Starting | Status::InProgress => None,
        })
    }

    #[inline]
    pub fn status(&self) -> Status {
        match self.buffer.len() {
            0 => Status::Idle,
            1 | 2 => Status::Starting,
            _ => Status::InProgress,
        }
    }

    /// Total frame length announced by the header, once it has been read.
    #[inline(always)]
    pub const fn expected_len(&self) -> Option<usize> {
        self.expected
    }

    /// Bytes of the frame in progress.
    #[inline]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop any partial frame, returning what had been buffered.
    #[inline]
    pub fn reset(&mut self) -> Vec<u8> {
        self.expected = None;
        core::mem::take(&mut self.buffer)
    }

    /// Keep the longest suffix of the buffer that could still begin a header.
    fn resync(&mut self) {
        let skip = (1..=self.buffer.len())
            .find(|&skip| HEADER.starts_with(&self.buffer[skip..]))
            .unwrap_or(self.buffer.len());
        log::debug!(
            "Discarding {:02X?} while looking for a frame header",
            &self.buffer[..skip]
        );
        let _ = self.buffer.drain(..skip);
    }
}

#[cfg(test)]
mod test {
    use {super::*, alloc::vec, quickcheck_macros::quickcheck};

    const PING: [u8; 10] = [0xFF, 0xFF, 0xFD, 0x00, 0x01, 0x03, 0x00, 0x01, 0x19, 0x4E];

    #[test]
    fn byte_by_byte_transitions() {
        let mut detector = FrameDetector::new();
        let kinds: Vec<StatusKind> = PING.iter().map(|&b| detector.push(b).kind()).collect();
        assert_eq!(
            kinds,
            vec![
                StatusKind::Starting,
                StatusKind::Starting,
                StatusKind::InProgress,
                StatusKind::InProgress,
                StatusKind::InProgress,
                StatusKind::InProgress,
                StatusKind::InProgress,
                StatusKind::InProgress,
                StatusKind::InProgress,
                StatusKind::Complete,
            ],
        );
        assert_eq!(detector.status(), Status::Idle);
    }

    #[test]
    fn complete_hands_over_the_frame() {
        let mut detector = FrameDetector::new();
        let (last, init) = PING.split_last().unwrap();
        for &byte in init {
            assert_ne!(detector.push(byte).kind(), StatusKind::Complete);
        }
        assert_eq!(detector.expected_len(), Some(PING.len()));
        assert_eq!(detector.push(*last), Status::Complete(PING.to_vec()));
        assert_eq!(detector.expected_len(), None);
    }

    #[test]
    fn short_of_declared_length_stays_in_progress() {
        let mut detector = FrameDetector::new();
        for &byte in &PING[..PING.len() - 1] {
            let _ = detector.push(byte);
        }
        assert_eq!(detector.status(), Status::InProgress);
        assert_eq!(detector.buffered(), &PING[..PING.len() - 1]);
    }

    #[test]
    fn idle_ignores_noise() {
        let mut detector = FrameDetector::new();
        for byte in [0x00, 0x12, 0xFD, 0x55] {
            assert_eq!(detector.push(byte), Status::Idle);
        }
    }

    #[test]
    fn wrong_third_byte_restarts() {
        let mut detector = FrameDetector::new();
        assert_eq!(detector.push(0xFF), Status::Starting);
        assert_eq!(detector.push(0xFF), Status::Starting);
        assert_eq!(detector.push(0x01), Status::Idle);
        assert!(detector.buffered().is_empty());
    }

    #[test]
    fn wrong_reserved_byte_restarts() {
        let mut detector = FrameDetector::new();
        for &byte in &[0xFF, 0xFF, 0xFD] {
            let _ = detector.push(byte);
        }
        assert_eq!(detector.push(0x01), Status::Idle);
    }

    #[test]
    fn extra_leading_ff_is_tolerated() {
        let mut detector = FrameDetector::new();
        let mut stream = vec![0xFF];
        stream.extend_from_slice(&PING);
        let frames: Vec<Vec<u8>> = detector.feed(&stream).collect();
        assert_eq!(frames, vec![PING.to_vec()]);
    }

    #[test]
    fn back_to_back_frames() {
        let mut detector = FrameDetector::new();
        let stream: Vec<u8> = PING.iter().chain(PING.iter()).copied().collect();
        assert_eq!(detector.feed(&stream).count(), 2);
    }

    #[test]
    fn reset_returns_partial() {
        let mut detector = FrameDetector::new();
        let _ = detector.feed(&PING[..5]).count();
        assert_eq!(detector.reset(), PING[..5].to_vec());
        assert_eq!(detector.status(), Status::Idle);
    }

    #[quickcheck]
    fn finds_frame_after_garbage(garbage: Vec<u8>) -> bool {
        let mut detector = FrameDetector::new();
        // Garbage may end mid-header; flush it with bytes that can't start one.
        let mut stream = garbage;
        stream.extend_from_slice(&[0x00; PREAMBLE_LEN]);
        let _ = detector.feed(&stream).count();
        let _ = detector.reset();
        detector.feed(&PING).collect::<Vec<_>>() == vec![PING.to_vec()]
    }
}
