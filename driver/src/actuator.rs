use {
    crate::{
        bus::{self, Bus, Device},
        comm::Comm,
        mutex::Mutex,
    },
    dynamixel2_packet::{ControlTable, Value, field::FieldType},
    paste::paste,
};

#[derive(Debug, thiserror::Error)]
pub enum Error<E, M> {
    #[error("Mutex error while waiting to use the Dynamixel serial bus: {0}")]
    Mutex(M),
    #[error("Error from the Dynamixel serial bus: {0}")]
    Bus(#[from] bus::Error<E>),
    #[error("Model number {model_number} has no known control table")]
    UnsupportedModel { model_number: u16 },
}

impl<E, M> From<dynamixel2_packet::Error> for Error<E, M> {
    #[inline(always)]
    fn from(e: dynamixel2_packet::Error) -> Self {
        Self::Bus(bus::Error::Codec(e))
    }
}

macro_rules! instruction_method {
    ($id:ident) => {
        #[inline(always)]
        pub async fn $id(&self) -> Result<(), Error<C::Error, M::Error>> {
            Ok(self
                .bus
                .lock()
                .await
                .map_err(Error::Mutex)?
                .$id(self.device.id)
                .await?)
        }
    };
}

macro_rules! register_methods {
    ($($name:ident: $t:ty),+ $(,)?) => {
        paste! {
            $(
                #[inline]
                pub async fn [< read_ $name >](&mut self) -> Result<$t, Error<C::Error, M::Error>> {
                    self.read_integer(stringify!($name)).await
                }

                #[inline]
                pub async fn [< write_ $name >](&mut self, value: $t) -> Result<(), Error<C::Error, M::Error>> {
                    self.update_value(stringify!($name), value).await
                }
            )+
        }
    };
}

macro_rules! read_only_register_methods {
    ($($name:ident: $t:ty),+ $(,)?) => {
        paste! {
            $(
                #[inline]
                pub async fn [< read_ $name >](&mut self) -> Result<$t, Error<C::Error, M::Error>> {
                    self.read_integer(stringify!($name)).await
                }
            )+
        }
    };
}

/// One actuator on a shared bus, with a cached copy of its control table.
pub struct Actuator<'bus, C: Comm, M: Mutex<Item = Bus<C>>> {
    bus: &'bus M,
    device: Device,
    table: ControlTable,
}

impl<'bus, C: Comm, M: Mutex<Item = Bus<C>>> Actuator<'bus, C, M> {
    /// Ping `id` and pick its control table from the model number it reports.
    pub async fn new(bus: &'bus M, id: u8) -> Result<Self, Error<C::Error, M::Error>> {
        let device = bus.lock().await.map_err(Error::Mutex)?.ping(id).await?;
        let Some(family) = device.model().and_then(|model| model.family) else {
            return Err(Error::UnsupportedModel {
                model_number: device.model_number,
            });
        };
        log::debug!("Attached to {device}");
        Ok(Self {
            bus,
            device,
            table: ControlTable::new(family),
        })
    }

    #[inline(always)]
    pub const fn id(&self) -> u8 {
        self.device.id
    }

    #[inline(always)]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Last values read from or written to the device.
    #[inline(always)]
    pub const fn control_table(&self) -> &ControlTable {
        &self.table
    }

    #[inline]
    pub async fn ping(&mut self) -> Result<&Device, Error<C::Error, M::Error>> {
        self.device = self
            .bus
            .lock()
            .await
            .map_err(Error::Mutex)?
            .ping(self.device.id)
            .await?;
        Ok(&self.device)
    }

    /// Read the whole table in one go.
    pub async fn read_control_table(&mut self) -> Result<&ControlTable, Error<C::Error, M::Error>> {
        let size = self.table.family().size;
        let length = u16::try_from(size).map_err(|_| dynamixel2_packet::Error::OutOfRange {
            name: "length",
            value: i64::try_from(size).unwrap_or(i64::MAX),
            field_type: FieldType::U16,
        })?;
        let data = self
            .bus
            .lock()
            .await
            .map_err(Error::Mutex)?
            .read(self.device.id, 0, length)
            .await?;
        self.table.populate_from_buffer(&data)?;
        Ok(&self.table)
    }

    /// Write one register by name and remember the new value.
    pub async fn update_value(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), Error<C::Error, M::Error>> {
        let value = value.into();
        let (address, data) = self.table.encode_field(name, value.clone())?;
        log::debug!("Setting `{name}` to {value} on ID {}", self.device.id);
        self.bus
            .lock()
            .await
            .map_err(Error::Mutex)?
            .write(self.device.id, address, &data)
            .await?;
        self.table.set(name, value)?;
        Ok(())
    }

    /// Read one register by name and remember what it said.
    pub async fn read_value(&mut self, name: &str) -> Result<Value, Error<C::Error, M::Error>> {
        let register = self.table.family().register(name)?;
        let length = u16::try_from(register.width()).map_err(|_| dynamixel2_packet::Error::SizeMismatch {
            expected: usize::from(u16::MAX),
            actual: register.width(),
        })?;
        let data = self
            .bus
            .lock()
            .await
            .map_err(Error::Mutex)?
            .read(self.device.id, register.address, length)
            .await?;
        let (value, _) = register.field().decode(&data)?;
        self.table.set(name, value.clone())?;
        Ok(value)
    }

    async fn read_integer<T: TryFrom<i64>>(
        &mut self,
        name: &'static str,
    ) -> Result<T, Error<C::Error, M::Error>> {
        let field_type = self.table.family().register(name)?.ty;
        let value = self.read_value(name).await?;
        let Some(integer) = value.as_integer() else {
            return Err(dynamixel2_packet::Error::WrongValueType {
                name,
                expected: field_type,
            }
            .into());
        };
        T::try_from(integer).map_err(|_| {
            dynamixel2_packet::Error::OutOfRange {
                name,
                value: integer,
                field_type,
            }
            .into()
        })
    }

    instruction_method!(action);
    instruction_method!(reboot);

    register_methods!(
        operating_mode: u8,
        torque_enable: u8,
        led: u8,
        goal_pwm: u16,
        goal_current: u16,
        goal_velocity: i32,
        profile_acceleration: i32,
        profile_velocity: i32,
        goal_position: i32,
    );

    read_only_register_methods!(
        hardware_error_status: u8,
        moving: u8,
        present_current: u16,
        present_velocity: i32,
        present_position: i32,
        present_input_voltage: u16,
        present_temperature: i8,
    );
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::test_util::{Emulated, XM430},
        core::cell::RefCell,
        dynamixel2_packet::{SoftwareError, StatusError},
        embassy_futures::block_on,
    };

    fn shared(comm: Emulated) -> RefCell<Bus<Emulated>> {
        Mutex::new(Bus::new(comm))
    }

    #[test]
    fn attach_and_read_table() {
        let bus = shared(Emulated::new(&[1, 2]));
        let mut actuator = block_on(Actuator::new(&bus, 2)).unwrap();
        assert_eq!(actuator.id(), 2);
        assert_eq!(actuator.device().model_number, XM430);
        assert_eq!(actuator.control_table().get("id"), Ok(None));

        let table = block_on(actuator.read_control_table()).unwrap();
        assert_eq!(table.get("id"), Ok(Some(&Value::Integer(2))));
        assert_eq!(table.get("model_number"), Ok(Some(&Value::Integer(1030))));
        assert_eq!(table.get("firmware_version"), Ok(Some(&Value::Integer(38))));
    }

    #[test]
    fn unsupported_model() {
        let bus = shared(Emulated::new(&[5]).with_model(5, 12));
        assert!(matches!(
            block_on(Actuator::new(&bus, 5)),
            Err(Error::UnsupportedModel { model_number: 12 }),
        ));
    }

    #[test]
    fn update_and_read_back() {
        let bus = shared(Emulated::new(&[1]));
        let mut actuator = block_on(Actuator::new(&bus, 1)).unwrap();
        block_on(actuator.update_value("goal_position", 2048)).unwrap();
        assert_eq!(&bus.borrow().comm().memory(1)[116..120], &2048_i32.to_le_bytes());
        assert_eq!(
            actuator.control_table().get("goal_position"),
            Ok(Some(&Value::Integer(2048))),
        );

        block_on(actuator.write_goal_position(-512)).unwrap();
        assert_eq!(block_on(actuator.read_goal_position()).unwrap(), -512);
        assert_eq!(
            block_on(actuator.read_value("goal_position")).unwrap(),
            Value::Integer(-512),
        );
    }

    #[test]
    fn read_only_registers() {
        let bus = shared(Emulated::new(&[1]));
        let mut actuator = block_on(Actuator::new(&bus, 1)).unwrap();
        assert!(matches!(
            block_on(actuator.update_value("model_number", 1)),
            Err(Error::Bus(bus::Error::Codec(dynamixel2_packet::Error::NotWritable {
                name: "model_number",
            }))),
        ));
        assert_eq!(block_on(actuator.read_present_temperature()).unwrap(), 0);
        assert!(matches!(
            block_on(actuator.read_value("warp_factor")),
            Err(Error::Bus(bus::Error::Codec(dynamixel2_packet::Error::UnknownField { .. }))),
        ));
    }

    #[test]
    fn eeprom_write_with_torque_on() {
        let bus = shared(Emulated::new(&[1]));
        let mut actuator = block_on(Actuator::new(&bus, 1)).unwrap();
        block_on(actuator.write_torque_enable(1)).unwrap();
        assert!(matches!(
            block_on(actuator.update_value("homing_offset", 100)),
            Err(Error::Bus(bus::Error::Status {
                id: 1,
                error: StatusError {
                    alert: false,
                    software: Some(SoftwareError::AccessError),
                },
            })),
        ));
        assert_eq!(actuator.control_table().get("homing_offset"), Ok(None));
        assert_eq!(
            actuator.control_table().get("torque_enable"),
            Ok(Some(&Value::Integer(1))),
        );
    }

    #[test]
    fn busy_bus() {
        let bus = shared(Emulated::new(&[1]));
        let actuator = block_on(Actuator::new(&bus, 1)).unwrap();
        let _held = bus.borrow_mut();
        assert!(matches!(block_on(actuator.action()), Err(Error::Mutex(_))));
    }
}
