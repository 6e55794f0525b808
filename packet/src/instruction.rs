//! Instruction registry: opcode, name, and parameter layouts in each direction.

use {
    crate::{
        error::{Error, Unknown},
        field::{Field, FieldType, Layout},
    },
    alloc::borrow::ToOwned,
};

#[repr(u8)]
#[non_exhaustive]
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    strum_macros::EnumString,
    strum_macros::FromRepr,
    strum_macros::IntoStaticStr,
    strum_macros::VariantArray,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
    RegWrite = 0x04,
    Action = 0x05,
    FactoryReset = 0x06,
    Reboot = 0x08,
    Clear = 0x10,
    SyncRead = 0x82,
    SyncWrite = 0x83,
    BulkRead = 0x92,
    BulkWrite = 0x93,
}

impl Opcode {
    #[inline]
    pub fn from_byte(byte: u8) -> Result<Self, Error> {
        Self::from_repr(byte).ok_or(Error::UnknownInstruction(Unknown::Opcode(byte)))
    }

    #[inline]
    pub fn from_name(name: &str) -> Result<Self, Error> {
        name.parse()
            .map_err(|_| Error::UnknownInstruction(Unknown::Name(name.to_owned())))
    }

    #[inline(always)]
    pub fn byte(self) -> u8 {
        self as u8
    }

    #[inline(always)]
    pub fn name(self) -> &'static str {
        self.into()
    }

    #[inline]
    pub fn definition(self) -> &'static Definition {
        match self {
            Self::Ping => &PING,
            Self::Read => &READ,
            Self::Write => &WRITE,
            Self::RegWrite => &REG_WRITE,
            Self::Action => &ACTION,
            Self::FactoryReset => &FACTORY_RESET,
            Self::Reboot => &REBOOT,
            Self::Clear => &CLEAR,
            Self::SyncRead => &SYNC_READ,
            Self::SyncWrite => &SYNC_WRITE,
            Self::BulkRead => &BULK_READ,
            Self::BulkWrite => &BULK_WRITE,
        }
    }
}

/// Parameter layouts of one instruction.
#[derive(Debug, Eq, PartialEq)]
pub struct Definition {
    pub opcode: Opcode,
    /// Parameters of the instruction frame.
    pub outgoing: Layout,
    /// Parameters of the matching status frame, starting with its error byte.
    pub incoming: Layout,
}

impl Definition {
    #[inline(always)]
    pub fn name(&self) -> &'static str {
        self.opcode.name()
    }

    /// Broadcast-only instructions (sync/bulk write) never get a reply.
    #[inline(always)]
    pub fn expects_reply(&self) -> bool {
        !self.incoming.fields().is_empty()
    }
}

const ERROR: Field = Field::new("error", FieldType::U8);
const ADDRESS: Field = Field::new("address", FieldType::U16);
const LENGTH: Field = Field::new("length", FieldType::U16);
const DATA: Field = Field::new("data", FieldType::Greedy);

const ERROR_ONLY: Layout = Layout::checked(&[ERROR]);
const ERROR_AND_DATA: Layout = Layout::checked(&[ERROR, DATA]);

static PING: Definition = Definition {
    opcode: Opcode::Ping,
    outgoing: Layout::EMPTY,
    incoming: Layout::checked(&[
        ERROR,
        Field::new("model_number", FieldType::U16),
        Field::new("firmware_version", FieldType::U8),
    ]),
};

static READ: Definition = Definition {
    opcode: Opcode::Read,
    outgoing: Layout::checked(&[ADDRESS, LENGTH]),
    incoming: ERROR_AND_DATA,
};

static WRITE: Definition = Definition {
    opcode: Opcode::Write,
    outgoing: Layout::checked(&[ADDRESS, DATA]),
    incoming: ERROR_ONLY,
};

static REG_WRITE: Definition = Definition {
    opcode: Opcode::RegWrite,
    outgoing: Layout::checked(&[ADDRESS, DATA]),
    incoming: ERROR_ONLY,
};

static ACTION: Definition = Definition {
    opcode: Opcode::Action,
    outgoing: Layout::EMPTY,
    incoming: ERROR_ONLY,
};

static FACTORY_RESET: Definition = Definition {
    opcode: Opcode::FactoryReset,
    outgoing: Layout::checked(&[Field::new("type", FieldType::U8)]),
    incoming: ERROR_ONLY,
};

static REBOOT: Definition = Definition {
    opcode: Opcode::Reboot,
    outgoing: Layout::EMPTY,
    incoming: ERROR_ONLY,
};

static CLEAR: Definition = Definition {
    opcode: Opcode::Clear,
    outgoing: Layout::checked(&[
        Field::new("type", FieldType::U8),
        Field::new("code", FieldType::U32),
    ]),
    incoming: ERROR_ONLY,
};

static SYNC_READ: Definition = Definition {
    opcode: Opcode::SyncRead,
    outgoing: Layout::checked(&[ADDRESS, LENGTH, Field::new("id_list", FieldType::Greedy)]),
    incoming: ERROR_AND_DATA,
};

static SYNC_WRITE: Definition = Definition {
    opcode: Opcode::SyncWrite,
    outgoing: Layout::checked(&[
        ADDRESS,
        LENGTH,
        Field::new("id_data_list", FieldType::Greedy),
    ]),
    incoming: Layout::EMPTY,
};

static BULK_READ: Definition = Definition {
    opcode: Opcode::BulkRead,
    outgoing: Layout::checked(&[Field::new("id_address_length_list", FieldType::Greedy)]),
    incoming: ERROR_AND_DATA,
};

static BULK_WRITE: Definition = Definition {
    opcode: Opcode::BulkWrite,
    outgoing: Layout::checked(&[Field::new(
        "id_address_length_data_list",
        FieldType::Greedy,
    )]),
    incoming: Layout::EMPTY,
};
