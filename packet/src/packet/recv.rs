use {
    super::{Correlation, Direction, Packet},
    crate::{
        config::{Config, CrcCheck},
        constants::{CRC_LEN, HEADER, INSTRUCTION_OFFSET, LENGTH_OFFSET, MIN_FRAME_LEN, PREAMBLE_LEN, STATUS},
        crc::Crc,
        error::{DecodeError, Error, Malformed},
        field::{self, Fields},
        instruction::Opcode,
        stuff,
    },
    core::fmt,
};

/// What the low seven bits of a status frame's `error` byte can say.
#[repr(u8)]
#[non_exhaustive]
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    strum_macros::FromRepr,
    strum_macros::VariantArray,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SoftwareError {
    ResultFail = 0x01,
    InstructionError = 0x02,
    CrcError = 0x03,
    DataRangeError = 0x04,
    DataLengthError = 0x05,
    DataLimitError = 0x06,
    AccessError = 0x07,
}

impl fmt::Display for SoftwareError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ResultFail => write!(f, "Actuator could not process the packet"),
            Self::InstructionError => write!(f, "Either the actuator did not recognize the instruction byte or it received `Action` without `RegWrite`"),
            Self::CrcError => write!(f, "Actuator disagrees about CRC calculation (likely a corrupted packet)"),
            Self::DataRangeError => write!(f, "Data to be written is too long to fit in the specified range of memory"),
            Self::DataLengthError => write!(f, "Data to be written is too short to fit in the specified range of memory"),
            Self::DataLimitError => write!(f, "Data out of range"),
            Self::AccessError => write!(f, "Couldn't write (either tried to write to EEPROM with torque enabled, tried to write to read-only memory, or tried to read from write-only memory)"),
        }
    }
}

/// A nonzero `error` byte, split into its hardware-alert bit and software code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusError {
    /// The device has a hardware fault; read `hardware_error_status` for details.
    pub alert: bool,
    pub software: Option<SoftwareError>,
}

impl StatusError {
    #[inline]
    pub fn check(byte: u8) -> Result<Option<Self>, Error> {
        if byte == 0 {
            return Ok(None);
        }
        let code = byte & 0x7F;
        let software = match code {
            0x00 => None,
            code => Some(
                SoftwareError::from_repr(code).ok_or(Error::InvalidSoftwareError { code })?,
            ),
        };
        Ok(Some(Self {
            alert: byte & 0x80 != 0,
            software,
        }))
    }
}

impl fmt::Display for StatusError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.software {
            Some(ref software) if self.alert => write!(f, "{software} (hardware alert raised)"),
            Some(ref software) => write!(f, "{software}"),
            None => write!(f, "Hardware alert raised"),
        }
    }
}

/// Take one complete frame apart.
///
/// A status frame is decoded with the layout of whatever instruction `correlation`
/// last saw. An instruction frame is decoded with its own layout and then recorded,
/// so that a device answering it can decode its own reply.
pub fn disassemble(
    correlation: &mut Correlation,
    frame: &[u8],
    config: &Config,
) -> Result<Packet, DecodeError> {
    disassemble_inner(correlation, frame, config).map_err(|kind| {
        log::warn!("Couldn't decode {frame:02X?}: {kind}");
        DecodeError::new(kind, frame)
    })
}

fn disassemble_inner(
    correlation: &mut Correlation,
    frame: &[u8],
    config: &Config,
) -> Result<Packet, Error> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(Malformed::TooShort { len: frame.len() }.into());
    }
    if frame[..HEADER.len()] != HEADER {
        return Err(Malformed::BadHeader {
            actual: [frame[0], frame[1], frame[2], frame[3]],
        }
        .into());
    }
    let declared = u16::from_le_bytes([frame[LENGTH_OFFSET], frame[LENGTH_OFFSET + 1]]);
    let actual = frame.len() - PREAMBLE_LEN;
    if usize::from(declared) != actual {
        return Err(Malformed::LengthMismatch { declared, actual }.into());
    }

    let (covered, footer) = frame.split_at(frame.len() - CRC_LEN);
    let received = u16::from_le_bytes([footer[0], footer[1]]);
    let computed = {
        let mut crc = Crc::new();
        crc.push_all(covered);
        crc.collapse()
    };
    if computed != received {
        match config.crc {
            CrcCheck::Strict => return Err(Malformed::Crc { computed, received }.into()),
            CrcCheck::Lenient => log::warn!(
                "CRC mismatch (computed `x{computed:04X}`, received `x{received:04X}`); decoding anyway"
            ),
        }
    }

    let id = frame[HEADER.len()];
    let instruction = frame[INSTRUCTION_OFFSET];
    let parameters = stuff::unstuff(&covered[INSTRUCTION_OFFSET + 1..]);

    let (direction, opcode) = if instruction == STATUS {
        let opcode = correlation
            .last_instruction()
            .ok_or(Error::NoPriorInstruction)?;
        (Direction::Status, opcode)
    } else {
        (Direction::Instruction, Opcode::from_byte(instruction)?)
    };

    let definition = opcode.definition();
    let fields = match direction {
        Direction::Instruction => field::unpack(&parameters, &definition.outgoing)?,
        Direction::Status => unpack_status(&parameters, opcode)?,
    };

    if direction == Direction::Instruction {
        correlation.record(opcode);
    }

    let packet = Packet {
        direction,
        opcode,
        id,
        fields,
        raw: frame.to_vec(),
        crc: received,
    };
    log::trace!("Decoded `{}` from ID {id}", packet.name());
    Ok(packet)
}

/// A device reporting a software error may cut its reply short after the error byte.
fn unpack_status(parameters: &[u8], opcode: Opcode) -> Result<Fields, Error> {
    let layout = &opcode.definition().incoming;
    match field::unpack(parameters, layout) {
        Ok(fields) => Ok(fields),
        Err(e) => match parameters.first() {
            Some(&byte) if byte & 0x7F != 0 && layout.fields().first().is_some_and(|f| f.name == "error") => {
                log::debug!(
                    "Status `{}` reports error `x{byte:02X}` and doesn't fit its layout ({e}); keeping only `error`",
                    opcode.name(),
                );
                Ok(Fields::new().with("error", byte))
            }
            _ => Err(e),
        },
    }
}
