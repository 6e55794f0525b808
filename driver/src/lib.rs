//! Talk to Dynamixel actuators over any half-duplex byte transport.
//!
//! Implement [`Comm`] for your serial port, wrap a [`Bus`] in something that
//! implements [`Mutex`], and hand out [`Actuator`]s.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod actuator;
pub mod bus;
pub mod comm;
pub mod model;
pub mod mutex;

#[cfg(test)]
mod test_util;

pub use {
    actuator::{Actuator, Error as ActuatorError},
    bus::{Bus, BusConfig, Device, Error as BusError},
    comm::Comm,
    model::Model,
    mutex::Mutex,
};
