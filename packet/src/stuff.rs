//! Byte stuffing keeps [`MARKER`] out of a frame body.
//!
//! The encoder scans the instruction byte plus parameters and inserts an extra
//! [`STUFFING`] byte after every `FF FF FD` it sees; the decoder drops it again.
//! The CRC footer is never stuffed.

use {
    crate::constants::{MARKER, STUFFING},
    alloc::vec::Vec,
};

/// How much of [`MARKER`] the bytes seen so far end with.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Window {
    #[default]
    Empty,
    One,
    Two,
}

impl Window {
    /// Advance over one byte; `true` once a whole marker has been seen, after
    /// which the window starts over.
    #[inline]
    fn advance(&mut self, byte: u8) -> bool {
        let (next, matched) = match (*self, byte) {
            (Self::Two, b) if b == MARKER[2] => (Self::Empty, true),
            // `FF FF FF` still ends in `FF FF`
            (Self::One | Self::Two, b) if b == MARKER[1] => (Self::Two, false),
            (Self::Empty, b) if b == MARKER[0] => (Self::One, false),
            _ => (Self::Empty, false),
        };
        *self = next;
        matched
    }
}

/// Escape every marker occurrence in `body`.
#[inline]
pub fn stuff(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + body.len() / 3);
    let mut window = Window::Empty;
    for &byte in body {
        out.push(byte);
        if window.advance(byte) {
            out.push(STUFFING);
        }
    }
    out
}

/// Inverse of [`stuff`].
///
/// A marker that is not followed by the stuffing byte is passed through
/// unchanged; this never fails.
#[inline]
pub fn unstuff(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut window = Window::Empty;
    let mut escaped = false;
    for &byte in body {
        if core::mem::take(&mut escaped) && byte == STUFFING {
            continue;
        }
        out.push(byte);
        escaped = window.advance(byte);
    }
    out
}

/// Number of bytes [`stuff`] would add, without allocating.
#[inline]
pub fn overhead(body: &[u8]) -> usize {
    let mut window = Window::Empty;
    body.iter().filter(|&&byte| window.advance(byte)).count()
}
