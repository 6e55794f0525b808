//! Whole frames: building them from field values and taking them apart again.

pub mod recv;
pub mod send;

pub use {
    recv::{disassemble, SoftwareError, StatusError},
    send::{assemble, assemble_instruction, assemble_status},
};

use {
    crate::{
        error::Error,
        field::{Fields, Value},
        instruction::Opcode,
    },
    alloc::{format, string::String, vec::Vec},
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// A command, controller to device.
    Instruction,
    /// A reply, device to controller.
    Status,
}

impl Direction {
    #[inline]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Instruction => "instruction",
            Self::Status => "status",
        }
    }

    /// Split `"status_read"` into `(Status, Read)`; a bare name is an instruction.
    pub fn split_name(name: &str) -> Result<(Self, Opcode), Error> {
        for direction in [Self::Instruction, Self::Status] {
            if let Some(rest) = name
                .strip_prefix(direction.prefix())
                .and_then(|rest| rest.strip_prefix('_'))
            {
                return Ok((direction, Opcode::from_name(rest)?));
            }
        }
        Ok((Self::Instruction, Opcode::from_name(name)?))
    }
}

/// The last instruction seen on one connection, used to tell what a status frame answers.
///
/// Status frames all carry the same instruction byte, so their layout depends on
/// what was sent (or received) before them. Keep exactly one of these per bus.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Correlation {
    last_instruction: Option<Opcode>,
}

impl Correlation {
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            last_instruction: None,
        }
    }

    #[inline(always)]
    pub const fn last_instruction(&self) -> Option<Opcode> {
        self.last_instruction
    }

    #[inline]
    pub fn record(&mut self, opcode: Opcode) {
        log::debug!("Correlating status frames with `{}`", opcode.name());
        self.last_instruction = Some(opcode);
    }

    #[inline(always)]
    pub fn reset(&mut self) {
        self.last_instruction = None;
    }
}

/// A decoded frame. Immutable once built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Packet {
    pub(crate) direction: Direction,
    pub(crate) opcode: Opcode,
    pub(crate) id: u8,
    pub(crate) fields: Fields,
    pub(crate) raw: Vec<u8>,
    pub(crate) crc: u16,
}

impl Packet {
    /// `instruction_<name>` or `status_<name>`.
    #[inline]
    pub fn name(&self) -> String {
        format!("{}_{}", self.direction.prefix(), self.opcode.name())
    }

    #[inline(always)]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// The instruction this frame is, or answers.
    #[inline(always)]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    #[inline(always)]
    pub const fn id(&self) -> u8 {
        self.id
    }

    #[inline(always)]
    pub const fn fields(&self) -> &Fields {
        &self.fields
    }

    #[inline]
    pub fn get(&self, name: &str) -> Result<&Value, Error> {
        self.fields.get(name)
    }

    #[inline]
    pub fn integer(&self, name: &str) -> Result<i64, Error> {
        self.fields.integer(name)
    }

    #[inline]
    pub fn bytes(&self, name: &str) -> Result<&[u8], Error> {
        self.fields.bytes(name)
    }

    /// The frame exactly as it was on the wire.
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    #[inline(always)]
    pub const fn crc(&self) -> u16 {
        self.crc
    }

    /// The error byte of a status frame, if it reports anything.
    pub fn status_error(&self) -> Result<Option<StatusError>, Error> {
        if self.direction != Direction::Status {
            return Ok(None);
        }
        let Ok(byte) = self.fields.integer("error") else {
            return Ok(None);
        };
        StatusError::check(byte as u8)
    }
}
