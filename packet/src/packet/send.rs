use {
    super::{Correlation, Direction},
    crate::{
        constants::{BROADCAST_ID, CRC_LEN, HEADER, MAX_ID, STATUS},
        crc::Crc,
        error::Error,
        field::{self, FieldType, Fields},
        instruction::Opcode,
        stuff,
    },
    alloc::vec::Vec,
};

/// Build a frame from a symbolic name, an ID, and parameter values.
///
/// `name` is `"read"`, `"instruction_read"`, or `"status_read"`. Instruction
/// frames are recorded in `correlation`; status frames (device role) are not.
#[inline]
pub fn assemble(
    correlation: &mut Correlation,
    name: &str,
    id: u8,
    fields: &Fields,
) -> Result<Vec<u8>, Error> {
    match Direction::split_name(name)? {
        (Direction::Instruction, opcode) => assemble_instruction(correlation, opcode, id, fields),
        (Direction::Status, opcode) => assemble_status(opcode, id, fields),
    }
}

#[inline]
pub fn assemble_instruction(
    correlation: &mut Correlation,
    opcode: Opcode,
    id: u8,
    fields: &Fields,
) -> Result<Vec<u8>, Error> {
    let parameters = field::pack(fields, &opcode.definition().outgoing)?;
    let frame = frame(id, opcode.byte(), &parameters)?;
    correlation.record(opcode);
    log::trace!("Assembled `instruction_{}` for ID {id}: {frame:02X?}", opcode.name());
    Ok(frame)
}

/// Build the reply a device would send to `opcode`.
#[inline]
pub fn assemble_status(opcode: Opcode, id: u8, fields: &Fields) -> Result<Vec<u8>, Error> {
    let parameters = field::pack(fields, &opcode.definition().incoming)?;
    let frame = frame(id, STATUS, &parameters)?;
    log::trace!("Assembled `status_{}` for ID {id}: {frame:02X?}", opcode.name());
    Ok(frame)
}

fn frame(id: u8, instruction: u8, parameters: &[u8]) -> Result<Vec<u8>, Error> {
    if id > MAX_ID && id != BROADCAST_ID {
        return Err(Error::OutOfRange {
            name: "id",
            value: id.into(),
            field_type: FieldType::U8,
        });
    }

    // The instruction byte takes part in the stuffing scan.
    let body = {
        let mut body = Vec::with_capacity(1 + parameters.len());
        body.push(instruction);
        body.extend_from_slice(parameters);
        stuff::stuff(&body)
    };
    let length = body.len() + CRC_LEN;
    let Ok(length) = u16::try_from(length) else {
        return Err(Error::OutOfRange {
            name: "length",
            value: i64::try_from(length).unwrap_or(i64::MAX),
            field_type: FieldType::U16,
        });
    };

    let mut frame = Vec::with_capacity(HEADER.len() + 3 + body.len() + CRC_LEN);
    frame.extend_from_slice(&HEADER);
    frame.push(id);
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&body);
    let crc = {
        let mut crc = Crc::new();
        crc.push_all(&frame);
        crc.collapse()
    };
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}
