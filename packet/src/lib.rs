//! Dynamixel Protocol 2.0 on the wire: frames, byte stuffing, CRC, the
//! instruction registry, and control-table memory maps.
//!
//! Nothing here does I/O. Feed received bytes to a [`Connection`] and hand
//! the frames it assembles to whatever owns the bus.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod connection;
pub mod constants;
pub mod control_table;
pub mod crc;
pub mod error;
pub mod field;
pub mod instruction;
pub mod packet;
pub mod parse;
pub mod stuff;

pub use {
    config::{Config, CrcCheck},
    connection::Connection,
    control_table::{ControlTable, Family, Region, Register, X_SERIES},
    error::{DecodeError, Error, Malformed, Unknown},
    field::{Field, FieldType, Fields, Layout, Value},
    instruction::{Definition, Opcode},
    packet::{
        assemble, assemble_instruction, assemble_status, disassemble, Correlation, Direction,
        Packet, SoftwareError, StatusError,
    },
    parse::{FrameDetector, Status},
};
