//! Everything one bus needs to talk: its frame detector, its correlation cell, and its config.

use {
    crate::{
        config::Config,
        error::{DecodeError, Error},
        field::Fields,
        instruction::Opcode,
        packet::{self, Correlation, Packet},
        parse::{FrameDetector, Status},
    },
    alloc::vec::Vec,
};

/// Codec state for a single logical connection.
///
/// Never share one of these between buses: status frames are decoded
/// against whatever instruction this connection last saw.
#[derive(Clone, Debug, Default)]
pub struct Connection {
    correlation: Correlation,
    detector: FrameDetector,
    config: Config,
}

impl Connection {
    #[inline(always)]
    pub const fn new() -> Self {
        Self::with_config(Config::new())
    }

    #[inline(always)]
    pub const fn with_config(config: Config) -> Self {
        Self {
            correlation: Correlation::new(),
            detector: FrameDetector::new(),
            config,
        }
    }

    #[inline(always)]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[inline(always)]
    pub const fn correlation(&self) -> &Correlation {
        &self.correlation
    }

    #[inline(always)]
    pub const fn detector(&self) -> &FrameDetector {
        &self.detector
    }

    /// See [`packet::assemble`].
    #[inline]
    pub fn assemble(&mut self, name: &str, id: u8, fields: &Fields) -> Result<Vec<u8>, Error> {
        packet::assemble(&mut self.correlation, name, id, fields)
    }

    /// Build an instruction frame without going through its name.
    #[inline]
    pub fn assemble_opcode(
        &mut self,
        opcode: Opcode,
        id: u8,
        fields: &Fields,
    ) -> Result<Vec<u8>, Error> {
        packet::assemble_instruction(&mut self.correlation, opcode, id, fields)
    }

    #[inline]
    pub fn disassemble(&mut self, frame: &[u8]) -> Result<Packet, DecodeError> {
        packet::disassemble(&mut self.correlation, frame, &self.config)
    }

    /// Push one received byte, decoding a packet if it completes a frame.
    ///
    /// A frame announcing more than `max_frame_len` bytes is dropped as soon as its
    /// length is known; the caller sees nothing arrive and times out.
    pub fn push(&mut self, byte: u8) -> Option<Result<Packet, DecodeError>> {
        match self.detector.push(byte) {
            Status::Complete(frame) => Some(self.disassemble(&frame)),
            Status::Idle | Status::Starting | Status::InProgress => {
                if let Some(expected) = self.detector.expected_len() {
                    if expected > self.config.max_frame_len {
                        let dropped = self.detector.reset();
                        log::warn!(
                            "Dropping a frame announcing {expected} bytes (limit {}): {dropped:02X?}",
                            self.config.max_frame_len,
                        );
                    }
                }
                None
            }
        }
    }

    /// Push every byte of `bytes`, yielding each decode attempt in order.
    #[inline]
    pub fn feed<'a>(
        &'a mut self,
        bytes: &'a [u8],
    ) -> impl Iterator<Item = Result<Packet, DecodeError>> + 'a {
        bytes.iter().filter_map(move |&byte| self.push(byte))
    }

    /// Drop a partial frame, returning its bytes. Correlation is kept.
    #[inline]
    pub fn discard_partial(&mut self) -> Vec<u8> {
        self.detector.reset()
    }

    /// Forget any partial frame and the last instruction.
    #[inline]
    pub fn reset(&mut self) {
        let _: Vec<u8> = self.detector.reset();
        self.correlation.reset();
    }
}
