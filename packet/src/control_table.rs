//! Register memory maps, per servo family.

use {
    crate::{
        error::Error,
        field::{Field, FieldType, Value},
    },
    alloc::{borrow::ToOwned, vec, vec::Vec},
    core::fmt,
};

/// Where a register lives. EEPROM survives power cycles but is locked while torque is on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    Eeprom,
    Ram,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Register {
    pub name: &'static str,
    pub description: &'static str,
    pub address: u16,
    pub ty: FieldType,
    pub writable: bool,
    pub region: Region,
    /// Padding between documented registers. Never shown, never looked up.
    pub reserved: bool,
}

impl Register {
    #[inline(always)]
    const fn rw(
        region: Region,
        address: u16,
        name: &'static str,
        ty: FieldType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            address,
            ty,
            writable: true,
            region,
            reserved: false,
        }
    }

    #[inline(always)]
    const fn ro(
        region: Region,
        address: u16,
        name: &'static str,
        ty: FieldType,
        description: &'static str,
    ) -> Self {
        Self {
            writable: false,
            ..Self::rw(region, address, name, ty, description)
        }
    }

    #[inline(always)]
    const fn reserved(region: Region, address: u16, width: usize) -> Self {
        Self {
            reserved: true,
            ..Self::rw(region, address, "reserved", FieldType::Fixed(width), "Reserved")
        }
    }

    #[inline(always)]
    pub const fn field(&self) -> Field {
        Field::new(self.name, self.ty)
    }

    /// Bytes this register occupies.
    #[inline]
    pub const fn width(&self) -> usize {
        match self.ty.width() {
            Some(width) => width,
            None => 0,
        }
    }

    #[inline]
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(self.width());
        self.field().encode(value, &mut out)?;
        Ok(out)
    }
}

/// The complete memory map of one servo family.
#[derive(Debug, Eq, PartialEq)]
pub struct Family {
    pub name: &'static str,
    /// Bytes from address 0 through the last register.
    pub size: usize,
    registers: &'static [Register],
    /// Older names still accepted by lookups, as `(alias, register name)`.
    aliases: &'static [(&'static str, &'static str)],
}

impl Family {
    /// Registers must tile `0..size` exactly, in address order. A table that
    /// doesn't fails the build.
    pub const fn checked(name: &'static str, size: usize, registers: &'static [Register]) -> Self {
        let mut offset = 0;
        let mut i = 0;
        while i < registers.len() {
            let register = &registers[i];
            assert!(
                register.address as usize == offset,
                "control-table registers must be contiguous",
            );
            let Some(width) = register.ty.width() else {
                panic!("control-table registers must have a fixed width");
            };
            offset += width;
            i += 1;
        }
        assert!(offset == size, "control-table registers must cover the whole table");
        Self {
            name,
            size,
            registers,
            aliases: &[],
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn with_aliases(self, aliases: &'static [(&'static str, &'static str)]) -> Self {
        Self { aliases, ..self }
    }

    /// The register name `name` stands for, following aliases.
    #[inline]
    pub fn canonical<'a>(&self, name: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|&&(alias, _)| alias == name)
            .map_or(name, |&(_, register)| register)
    }

    /// Every register, padding included.
    #[inline(always)]
    pub const fn all_registers(&self) -> &'static [Register] {
        self.registers
    }

    /// Documented registers in address order.
    #[inline]
    pub fn registers(&self) -> impl Iterator<Item = &'static Register> {
        self.registers.iter().filter(|register| !register.reserved)
    }

    #[inline]
    pub fn register(&self, name: &str) -> Result<&'static Register, Error> {
        let canonical = self.canonical(name);
        self.registers()
            .find(|register| register.name == canonical)
            .ok_or_else(|| Error::UnknownField {
                name: name.to_owned(),
            })
    }

    /// Address and bytes for a `write` that sets one register.
    #[inline]
    pub fn encode_field(&self, name: &str, value: impl Into<Value>) -> Result<(u16, Vec<u8>), Error> {
        let register = self.register(name)?;
        if !register.writable {
            return Err(Error::NotWritable {
                name: register.name,
            });
        }
        Ok((register.address, register.encode(&value.into())?))
    }
}

/// A family's registers paired with their last known values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControlTable {
    family: &'static Family,
    /// Parallel to `family.all_registers()`; reserved slots stay `None`.
    values: Vec<Option<Value>>,
}

impl ControlTable {
    /// An empty table, waiting for a read or for selective updates.
    #[inline]
    pub fn new(family: &'static Family) -> Self {
        Self {
            family,
            values: vec![None; family.all_registers().len()],
        }
    }

    #[inline]
    pub fn from_buffer(family: &'static Family, buffer: &[u8]) -> Result<Self, Error> {
        let mut table = Self::new(family);
        table.populate_from_buffer(buffer)?;
        Ok(table)
    }

    #[inline(always)]
    pub const fn family(&self) -> &'static Family {
        self.family
    }

    /// Replace every value with what `buffer` (a dump of the whole table) says.
    pub fn populate_from_buffer(&mut self, buffer: &[u8]) -> Result<(), Error> {
        if buffer.len() != self.family.size {
            return Err(Error::SizeMismatch {
                expected: self.family.size,
                actual: buffer.len(),
            });
        }
        for (register, slot) in self.family.all_registers().iter().zip(&mut self.values) {
            if register.reserved {
                continue;
            }
            let (value, _) = register.field().decode(&buffer[usize::from(register.address)..])?;
            *slot = Some(value);
        }
        Ok(())
    }

    /// `Ok(None)` if the register exists but hasn't been read yet.
    #[inline]
    pub fn get(&self, name: &str) -> Result<Option<&Value>, Error> {
        let index = self.index(name)?;
        Ok(self.values[index].as_ref())
    }

    /// Record a value without touching the device, e.g. after a successful write.
    #[inline]
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let index = self.index(name)?;
        let value = value.into();
        let _: Vec<u8> = self.family.all_registers()[index].encode(&value)?;
        self.values[index] = Some(value);
        Ok(())
    }

    #[inline]
    pub fn encode_field(&self, name: &str, value: impl Into<Value>) -> Result<(u16, Vec<u8>), Error> {
        self.family.encode_field(name, value)
    }

    /// Documented registers with their values, in address order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&'static Register, Option<&Value>)> {
        self.family
            .all_registers()
            .iter()
            .zip(&self.values)
            .filter(|&(register, _)| !register.reserved)
            .map(|(register, value)| (register, value.as_ref()))
    }

    fn index(&self, name: &str) -> Result<usize, Error> {
        let canonical = self.family.canonical(name);
        self.family
            .all_registers()
            .iter()
            .position(|register| !register.reserved && register.name == canonical)
            .ok_or_else(|| Error::UnknownField {
                name: name.to_owned(),
            })
    }
}

impl fmt::Display for ControlTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (register, value)) in self.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            match value {
                Some(value) => write!(f, "{:>22}: {value}", register.name)?,
                None => write!(f, "{:>22}: None", register.name)?,
            }
        }
        Ok(())
    }
}

use {
    FieldType::{I16, I32, I8, U16, U32, U8},
    Region::{Eeprom, Ram},
};

/// X-series (XL430, XM430, XM540, XH430, ...).
pub static X_SERIES: Family = Family::checked(
    "X",
    147,
    &[
        Register::ro(Eeprom, 0, "model_number", U16, "Model Number"),
        Register::ro(Eeprom, 2, "model_information", U32, "Model Information"),
        Register::ro(Eeprom, 6, "firmware_version", U8, "Firmware Version"),
        Register::rw(Eeprom, 7, "id", U8, "ID"),
        Register::rw(Eeprom, 8, "baud_rate", U8, "Baud Rate"),
        Register::rw(Eeprom, 9, "return_delay_time", U8, "Return Delay Time"),
        Register::rw(Eeprom, 10, "drive_mode", U8, "Drive Mode"),
        Register::rw(Eeprom, 11, "operating_mode", U8, "Operating Mode"),
        Register::rw(Eeprom, 12, "secondary_id", U8, "Secondary ID"),
        Register::rw(Eeprom, 13, "protocol_type", U8, "Protocol Type"),
        Register::reserved(Eeprom, 14, 6),
        Register::rw(Eeprom, 20, "homing_offset", I32, "Homing Offset"),
        Register::rw(Eeprom, 24, "moving_threshold", U32, "Moving Threshold"),
        Register::reserved(Eeprom, 28, 3),
        Register::rw(Eeprom, 31, "temperature_limit", U8, "Temperature Limit"),
        Register::rw(Eeprom, 32, "max_voltage_limit", U16, "Max Voltage Limit"),
        Register::rw(Eeprom, 34, "min_voltage_limit", U16, "Min Voltage Limit"),
        Register::rw(Eeprom, 36, "pwm_limit", U16, "PWM Limit"),
        Register::rw(Eeprom, 38, "current_limit", U16, "Current Limit"),
        Register::rw(Eeprom, 40, "acceleration_limit", U32, "Acceleration Limit"),
        Register::rw(Eeprom, 44, "velocity_limit", U32, "Velocity Limit"),
        Register::rw(Eeprom, 48, "max_position_limit", I32, "Max Position Limit"),
        Register::rw(Eeprom, 52, "min_position_limit", I32, "Min Position Limit"),
        Register::reserved(Eeprom, 56, 4),
        Register::rw(Eeprom, 60, "startup_configuration", U8, "Startup Configuration"),
        Register::reserved(Eeprom, 61, 1),
        Register::rw(Eeprom, 62, "pwm_slope", U8, "PWM Slope"),
        Register::rw(Eeprom, 63, "shutdown", U8, "Shutdown"),
        Register::rw(Ram, 64, "torque_enable", U8, "Torque Enable"),
        Register::rw(Ram, 65, "led", U8, "LED"),
        Register::reserved(Ram, 66, 2),
        Register::rw(Ram, 68, "status_return_level", U8, "Status Return Level"),
        Register::ro(Ram, 69, "registered_instruction", U8, "Registered Instruction"),
        Register::ro(Ram, 70, "hardware_error_status", U8, "Hardware Error Status"),
        Register::reserved(Ram, 71, 5),
        Register::rw(Ram, 76, "velocity_i_gain", I16, "Velocity I Gain"),
        Register::rw(Ram, 78, "velocity_p_gain", I16, "Velocity P Gain"),
        Register::rw(Ram, 80, "position_d_gain", I16, "Position D Gain"),
        Register::rw(Ram, 82, "position_i_gain", I16, "Position I Gain"),
        Register::rw(Ram, 84, "position_p_gain", I16, "Position P Gain"),
        Register::reserved(Ram, 86, 2),
        Register::rw(Ram, 88, "feedforward_2nd_gain", I16, "Feedforward Second Gain"),
        Register::rw(Ram, 90, "feedforward_1st_gain", I16, "Feedforward First Gain"),
        Register::reserved(Ram, 92, 6),
        Register::rw(Ram, 98, "bus_watchdog", U8, "Bus Watchdog"),
        Register::reserved(Ram, 99, 1),
        Register::rw(Ram, 100, "goal_pwm", U16, "Goal PWM"),
        Register::rw(Ram, 102, "goal_current", U16, "Goal Current"),
        Register::rw(Ram, 104, "goal_velocity", I32, "Goal Velocity"),
        Register::rw(Ram, 108, "profile_acceleration", I32, "Profile Acceleration"),
        Register::rw(Ram, 112, "profile_velocity", I32, "Profile Velocity"),
        Register::rw(Ram, 116, "goal_position", I32, "Goal Position"),
        Register::ro(Ram, 120, "realtime_tick", U16, "Real-Time Tick"),
        Register::ro(Ram, 122, "moving", U8, "Moving"),
        Register::ro(Ram, 123, "moving_status", U8, "Moving Status"),
        Register::ro(Ram, 124, "present_pwm", U16, "Present PWM"),
        Register::ro(Ram, 126, "present_current", U16, "Present Current"),
        Register::ro(Ram, 128, "present_velocity", I32, "Present Velocity"),
        Register::ro(Ram, 132, "present_position", I32, "Present Position"),
        Register::ro(Ram, 136, "velocity_trajectory", I32, "Velocity Trajectory"),
        Register::ro(Ram, 140, "position_trajectory", I32, "Position Trajectory"),
        Register::ro(Ram, 144, "present_input_voltage", U16, "Present Input Voltage"),
        Register::ro(Ram, 146, "present_temperature", I8, "Present Temperature"),
    ],
)
.with_aliases(&[("protocol_version", "protocol_type")]);
