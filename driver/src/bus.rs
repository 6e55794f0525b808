use {
    crate::{comm::Comm, model},
    alloc::{collections::BTreeMap, vec::Vec},
    core::{fmt, time::Duration},
    dynamixel2_packet::{
        Config, Connection, DecodeError, Direction, Fields, Opcode, Packet, StatusError,
        constants::BROADCAST_ID, field::FieldType,
    },
    paste::paste,
};

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("Error sending serial communication: {0}")]
    Send(E),
    #[error("Error receiving serial communication: {0}")]
    Recv(E),
    #[error("Error decoding received serial communication: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Codec(#[from] dynamixel2_packet::Error),
    #[error("Bus went quiet {} bytes into a frame: {partial:02X?}", .partial.len())]
    ReceiveTimeout { partial: Vec<u8> },
    #[error("No response before the timeout")]
    ResponseTimeout,
    #[error("Dynamixel ID {id} reported an error: {error}")]
    Status { id: u8, error: StatusError },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BusConfig {
    pub codec: Config,
    /// Longest silence tolerated in the middle of a frame.
    pub receive_timeout: Duration,
    /// Longest wait for the first byte of a reply.
    pub response_timeout: Duration,
}

impl BusConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            codec: Config::new(),
            receive_timeout: Self::DEFAULT_TIMEOUT,
            response_timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn with_codec(self, codec: Config) -> Self {
        Self { codec, ..self }
    }

    #[inline(always)]
    #[must_use]
    pub const fn with_receive_timeout(self, receive_timeout: Duration) -> Self {
        Self {
            receive_timeout,
            ..self
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn with_response_timeout(self, response_timeout: Duration) -> Self {
        Self {
            response_timeout,
            ..self
        }
    }
}

impl Default for BusConfig {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

/// What a `ping` says about one actuator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Device {
    pub id: u8,
    pub model_number: u16,
    pub firmware_version: u8,
}

impl Device {
    #[inline]
    pub fn model(&self) -> Option<&'static model::Model> {
        model::lookup(self.model_number)
    }

    fn from_status(packet: &Packet) -> Result<Self, dynamixel2_packet::Error> {
        Ok(Self {
            id: packet.id(),
            model_number: narrow(packet, "model_number", FieldType::U16)?,
            firmware_version: narrow(packet, "firmware_version", FieldType::U8)?,
        })
    }
}

impl fmt::Display for Device {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            id,
            model_number,
            firmware_version,
        } = *self;
        match self.model() {
            Some(model) => write!(f, "#{id} ({} @ v{firmware_version})", model.name),
            None => write!(f, "#{id} (model {model_number} @ v{firmware_version})"),
        }
    }
}

fn narrow<T: TryFrom<i64>>(
    packet: &Packet,
    name: &'static str,
    field_type: FieldType,
) -> Result<T, dynamixel2_packet::Error> {
    let value = packet.integer(name)?;
    T::try_from(value).map_err(|_| dynamixel2_packet::Error::OutOfRange {
        name,
        value,
        field_type,
    })
}

fn length_of(data: &[u8]) -> Result<u16, dynamixel2_packet::Error> {
    u16::try_from(data.len()).map_err(|_| dynamixel2_packet::Error::OutOfRange {
        name: "length",
        value: i64::try_from(data.len()).unwrap_or(i64::MAX),
        field_type: FieldType::U16,
    })
}

/// One serial bus and the codec state that goes with it.
pub struct Bus<C: Comm> {
    comm: C,
    connection: Connection,
    config: BusConfig,
}

macro_rules! instruction_method {
    ($id:ident) => {
        paste! {
            #[inline]
            pub async fn $id(&mut self, id: u8) -> Result<(), Error<C::Error>> {
                let _: Packet = self.transact(Opcode::[< $id:camel >], id, &Fields::new()).await?;
                Ok(())
            }
        }
    };
}

impl<C: Comm> Bus<C> {
    #[inline(always)]
    pub const fn new(comm: C) -> Self {
        Self::with_config(comm, BusConfig::new())
    }

    #[inline(always)]
    pub const fn with_config(comm: C, config: BusConfig) -> Self {
        Self {
            comm,
            connection: Connection::with_config(config.codec),
            config,
        }
    }

    #[inline(always)]
    pub const fn config(&self) -> &BusConfig {
        &self.config
    }

    #[inline(always)]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    #[inline(always)]
    pub const fn comm(&self) -> &C {
        &self.comm
    }

    /// Hand back the transport. Codec state is dropped with the bus.
    #[inline(always)]
    pub fn into_comm(self) -> C {
        self.comm
    }

    /// Assemble and transmit an instruction (or, for an emulated device, a status) by name.
    #[inline]
    pub async fn send(&mut self, name: &str, id: u8, fields: &Fields) -> Result<(), Error<C::Error>> {
        let frame = self.connection.assemble(name, id, fields)?;
        self.transmit(&frame).await
    }

    #[inline]
    pub async fn send_opcode(
        &mut self,
        opcode: Opcode,
        id: u8,
        fields: &Fields,
    ) -> Result<(), Error<C::Error>> {
        let frame = self.connection.assemble_opcode(opcode, id, fields)?;
        self.transmit(&frame).await
    }

    async fn transmit(&mut self, frame: &[u8]) -> Result<(), Error<C::Error>> {
        log::trace!("Sending {frame:02X?}");
        self.comm.send(frame).await.map_err(Error::Send)
    }

    /// Wait for the next complete frame and decode it.
    ///
    /// Gives up with [`Error::ResponseTimeout`] once `response_timeout` has
    /// passed, however busy the bus is.
    #[inline]
    pub async fn receive(&mut self) -> Result<Packet, Error<C::Error>> {
        let deadline = self.deadline();
        self.receive_until(deadline).await
    }

    #[inline]
    fn deadline(&self) -> Duration {
        self.comm.now().saturating_add(self.config.response_timeout)
    }

    /// Silence partway through a frame is a [`Error::ReceiveTimeout`] carrying
    /// what arrived. Anything else that runs past `deadline` is a [`Error::ResponseTimeout`].
    async fn receive_until(&mut self, deadline: Duration) -> Result<Packet, Error<C::Error>> {
        loop {
            let remaining = deadline.saturating_sub(self.comm.now());
            if remaining.is_zero() {
                let partial = self.connection.discard_partial();
                if !partial.is_empty() {
                    log::debug!("Deadline passed partway through {partial:02X?}");
                }
                return Err(Error::ResponseTimeout);
            }
            let idle = self.connection.detector().buffered().is_empty();
            let timeout = if idle {
                remaining
            } else {
                remaining.min(self.config.receive_timeout)
            };
            let Some(byte) = self.comm.recv(timeout).await.map_err(Error::Recv)? else {
                if idle {
                    return Err(Error::ResponseTimeout);
                }
                let partial = self.connection.discard_partial();
                log::warn!("Timed out partway through {partial:02X?}");
                return Err(Error::ReceiveTimeout { partial });
            };
            if let Some(decoded) = self.connection.push(byte) {
                let packet = decoded?;
                log::trace!("Received `{}` from ID {}: {:02X?}", packet.name(), packet.id(), packet.raw());
                return Ok(packet);
            }
        }
    }

    /// Wait for a status frame from `id`, skipping anything else on the bus.
    async fn receive_from(&mut self, id: u8, deadline: Duration) -> Result<Packet, Error<C::Error>> {
        loop {
            let packet = self.receive_until(deadline).await?;
            if packet.direction() == Direction::Status && packet.id() == id {
                if let Some(error) = packet.status_error()? {
                    return Err(Error::Status { id, error });
                }
                return Ok(packet);
            }
            log::warn!(
                "Discarding `{}` from ID {} while waiting for ID {id}",
                packet.name(),
                packet.id(),
            );
        }
    }

    /// Send one instruction and wait for its reply.
    ///
    /// A reply reporting a software error or hardware alert comes back as [`Error::Status`].
    pub async fn transact(
        &mut self,
        opcode: Opcode,
        id: u8,
        fields: &Fields,
    ) -> Result<Packet, Error<C::Error>> {
        self.send_opcode(opcode, id, fields).await?;
        let deadline = self.deadline();
        self.receive_from(id, deadline).await
    }

    /// Send one instruction, waiting for a reply only if exactly one is coming.
    ///
    /// Replies to a broadcast stay on the bus; [`Bus::scan`], [`Bus::sync_read`]
    /// and [`Bus::bulk_read`] collect those.
    pub async fn instruct(
        &mut self,
        opcode: Opcode,
        id: u8,
        fields: &Fields,
    ) -> Result<Option<Packet>, Error<C::Error>> {
        if id == BROADCAST_ID || !opcode.definition().expects_reply() {
            self.send_opcode(opcode, id, fields).await?;
            return Ok(None);
        }
        self.transact(opcode, id, fields).await.map(Some)
    }

    /// Broadcast a ping and collect every reply until the bus goes quiet.
    ///
    /// Each new device buys the rest of the bus another `response_timeout`;
    /// noise and repeats do not.
    pub async fn scan(&mut self) -> Result<BTreeMap<u8, Device>, Error<C::Error>> {
        self.send_opcode(Opcode::Ping, BROADCAST_ID, &Fields::new())
            .await?;
        let mut devices = BTreeMap::new();
        let mut deadline = self.deadline();
        loop {
            let packet = match self.receive_until(deadline).await {
                Ok(packet) => packet,
                Err(Error::ResponseTimeout) => break,
                Err(Error::Decode(e)) => {
                    log::warn!("Skipping an undecodable reply during scan: {e}");
                    continue;
                }
                Err(Error::ReceiveTimeout { partial }) => {
                    log::warn!("Skipping a cut-off reply during scan: {partial:02X?}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if packet.direction() != Direction::Status {
                continue;
            }
            let device = match Device::from_status(&packet) {
                Ok(device) => device,
                Err(e) => {
                    log::warn!("Skipping a reply from ID {} during scan: {e}", packet.id());
                    continue;
                }
            };
            log::debug!("Found {device}");
            if devices.insert(device.id, device).is_some() {
                log::warn!("More than one device answered as ID {}", device.id);
            } else {
                deadline = self.deadline();
            }
        }
        Ok(devices)
    }

    #[inline]
    pub async fn ping(&mut self, id: u8) -> Result<Device, Error<C::Error>> {
        let packet = self.transact(Opcode::Ping, id, &Fields::new()).await?;
        Ok(Device::from_status(&packet)?)
    }

    #[inline]
    pub async fn read(&mut self, id: u8, address: u16, length: u16) -> Result<Vec<u8>, Error<C::Error>> {
        let fields = Fields::new().with("address", address).with("length", length);
        let packet = self.transact(Opcode::Read, id, &fields).await?;
        Ok(packet.bytes("data")?.to_vec())
    }

    #[inline]
    pub async fn write(&mut self, id: u8, address: u16, data: &[u8]) -> Result<(), Error<C::Error>> {
        let fields = Fields::new().with("address", address).with("data", data);
        let _: Packet = self.transact(Opcode::Write, id, &fields).await?;
        Ok(())
    }

    /// Stage a write that takes effect on the next `action`.
    #[inline]
    pub async fn reg_write(&mut self, id: u8, address: u16, data: &[u8]) -> Result<(), Error<C::Error>> {
        let fields = Fields::new().with("address", address).with("data", data);
        let _: Packet = self.transact(Opcode::RegWrite, id, &fields).await?;
        Ok(())
    }

    instruction_method!(action);
    instruction_method!(reboot);

    /// `kind`: `0xFF` resets everything, `0x01` keeps the ID, `0x02` keeps ID and baud rate.
    #[inline]
    pub async fn factory_reset(&mut self, id: u8, kind: u8) -> Result<(), Error<C::Error>> {
        let fields = Fields::new().with("type", kind);
        let _: Packet = self.transact(Opcode::FactoryReset, id, &fields).await?;
        Ok(())
    }

    #[inline]
    pub async fn clear(&mut self, id: u8, kind: u8, code: u32) -> Result<(), Error<C::Error>> {
        let fields = Fields::new().with("type", kind).with("code", code);
        let _: Packet = self.transact(Opcode::Clear, id, &fields).await?;
        Ok(())
    }

    /// Read the same range from several actuators with one broadcast.
    pub async fn sync_read(
        &mut self,
        address: u16,
        length: u16,
        ids: &[u8],
    ) -> Result<BTreeMap<u8, Vec<u8>>, Error<C::Error>> {
        let fields = Fields::new()
            .with("address", address)
            .with("length", length)
            .with("id_list", ids);
        self.send_opcode(Opcode::SyncRead, BROADCAST_ID, &fields)
            .await?;
        self.collect_data(ids.iter().copied()).await
    }

    /// Write the same range on several actuators with one broadcast. No replies.
    pub async fn sync_write(
        &mut self,
        address: u16,
        length: u16,
        writes: &[(u8, &[u8])],
    ) -> Result<(), Error<C::Error>> {
        let mut id_data_list = Vec::with_capacity(writes.len() * (1 + usize::from(length)));
        for &(id, data) in writes {
            if data.len() != usize::from(length) {
                return Err(dynamixel2_packet::Error::SizeMismatch {
                    expected: length.into(),
                    actual: data.len(),
                }
                .into());
            }
            id_data_list.push(id);
            id_data_list.extend_from_slice(data);
        }
        let fields = Fields::new()
            .with("address", address)
            .with("length", length)
            .with("id_data_list", id_data_list);
        let _: Option<Packet> = self.instruct(Opcode::SyncWrite, BROADCAST_ID, &fields).await?;
        Ok(())
    }

    /// Read a different `(id, address, length)` range from each actuator.
    pub async fn bulk_read(
        &mut self,
        reads: &[(u8, u16, u16)],
    ) -> Result<BTreeMap<u8, Vec<u8>>, Error<C::Error>> {
        let mut list = Vec::with_capacity(reads.len() * 5);
        for &(id, address, length) in reads {
            list.push(id);
            list.extend_from_slice(&address.to_le_bytes());
            list.extend_from_slice(&length.to_le_bytes());
        }
        let fields = Fields::new().with("id_address_length_list", list);
        self.send_opcode(Opcode::BulkRead, BROADCAST_ID, &fields)
            .await?;
        self.collect_data(reads.iter().map(|&(id, _, _)| id)).await
    }

    /// Write a different `(id, address, data)` range on each actuator. No replies.
    pub async fn bulk_write(&mut self, writes: &[(u8, u16, &[u8])]) -> Result<(), Error<C::Error>> {
        let mut list = Vec::new();
        for &(id, address, data) in writes {
            list.push(id);
            list.extend_from_slice(&address.to_le_bytes());
            list.extend_from_slice(&length_of(data)?.to_le_bytes());
            list.extend_from_slice(data);
        }
        let fields = Fields::new().with("id_address_length_data_list", list);
        let _: Option<Packet> = self.instruct(Opcode::BulkWrite, BROADCAST_ID, &fields).await?;
        Ok(())
    }

    /// Actuators answer a sync/bulk read one after another, in request order.
    async fn collect_data(
        &mut self,
        ids: impl Iterator<Item = u8>,
    ) -> Result<BTreeMap<u8, Vec<u8>>, Error<C::Error>> {
        let mut data = BTreeMap::new();
        for id in ids {
            let deadline = self.deadline();
            let packet = self.receive_from(id, deadline).await?;
            let _: Option<Vec<u8>> = data.insert(id, packet.bytes("data")?.to_vec());
        }
        Ok(data)
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::test_util::{Emulated, XM430},
        alloc::vec,
        core::convert::Infallible,
        dynamixel2_packet::{Malformed, SoftwareError, assemble_status, crc::crc16},
        embassy_futures::block_on,
    };

    /// A bus that never goes quiet: `pattern` over and over, one byte per millisecond.
    struct Chatty {
        pattern: Vec<u8>,
        received: usize,
    }

    impl Comm for Chatty {
        type Error = Infallible;

        async fn send(&mut self, _bytes: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn recv(&mut self, _timeout: Duration) -> Result<Option<u8>, Self::Error> {
            let byte = self.pattern[self.received % self.pattern.len()];
            self.received += 1;
            Ok(Some(byte))
        }

        fn now(&self) -> Duration {
            Duration::from_millis(self.received as u64)
        }
    }

    #[test]
    fn ping_one() {
        let mut bus = Bus::new(Emulated::new(&[1, 3]));
        let device = block_on(bus.ping(3)).unwrap();
        assert_eq!(
            device,
            Device {
                id: 3,
                model_number: XM430,
                firmware_version: 38,
            },
        );
        assert_eq!(device.model().map(|model| model.name), Some("XM430-W210"));
        assert_eq!(
            bus.comm().sent[0],
            vec![0xFF, 0xFF, 0xFD, 0x00, 0x03, 0x03, 0x00, 0x01, 0x1A, 0xE6],
        );
    }

    #[test]
    fn nobody_home() {
        let mut bus = Bus::new(Emulated::new(&[1]));
        assert!(matches!(block_on(bus.ping(2)), Err(Error::ResponseTimeout)));
    }

    #[test]
    fn scan_finds_everyone() {
        let mut bus = Bus::new(Emulated::new(&[7, 1, 3]));
        let devices = block_on(bus.scan()).unwrap();
        assert_eq!(devices.keys().copied().collect::<Vec<_>>(), [1, 3, 7]);
        assert!(devices.values().all(|device| device.model_number == XM430));
    }

    #[test]
    fn chatty_bus_still_times_out() {
        let from_someone_else = assemble_status(
            Opcode::Ping,
            2,
            &Fields::new()
                .with("error", 0_u8)
                .with("model_number", XM430)
                .with("firmware_version", 38_u8),
        )
        .unwrap();
        for pattern in [vec![0x00], vec![0xFF, 0xFF, 0xFD, 0x01], from_someone_else] {
            let mut bus = Bus::new(Chatty {
                pattern,
                received: 0,
            });
            assert!(matches!(block_on(bus.ping(1)), Err(Error::ResponseTimeout)));
            assert_eq!(bus.comm().now(), BusConfig::DEFAULT_TIMEOUT);
            assert!(bus.connection().detector().buffered().is_empty());
        }
    }

    #[test]
    fn chatty_bus_ends_a_scan() {
        let mut bus = Bus::new(Chatty {
            pattern: vec![0x00, 0x12],
            received: 0,
        });
        assert_eq!(block_on(bus.scan()).map_err(|_| ()), Ok(BTreeMap::new()));
        assert_eq!(bus.comm().now(), BusConfig::DEFAULT_TIMEOUT);
    }

    #[test]
    fn scan_survives_a_cut_off_reply() {
        let mut comm = Emulated::new(&[1, 2]);
        comm.truncate_to = Some(14 + 6);
        let mut bus = Bus::new(comm);
        let devices = block_on(bus.scan()).unwrap();
        assert_eq!(devices.keys().copied().collect::<Vec<_>>(), [1]);
        assert!(bus.connection().detector().buffered().is_empty());
    }

    #[test]
    fn scan_skips_a_reply_without_a_model() {
        let mut refusal = vec![0xFF, 0xFF, 0xFD, 0x00, 0x09, 0x04, 0x00, 0x55, 0x01];
        let crc = crc16(0, &refusal);
        refusal.extend_from_slice(&crc.to_le_bytes());
        let mut comm = Emulated::new(&[1]);
        comm.noise = refusal;
        let mut bus = Bus::new(comm);
        let devices = block_on(bus.scan()).unwrap();
        assert_eq!(devices.keys().copied().collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn instruct_waits_only_for_single_replies() {
        let mut bus = Bus::new(Emulated::new(&[1]));
        let reply = block_on(bus.instruct(Opcode::Ping, 1, &Fields::new())).unwrap();
        assert_eq!(reply.map(|packet| packet.id()), Some(1));

        let fields = Fields::new()
            .with("address", 65_u16)
            .with("length", 1_u16)
            .with("id_data_list", vec![1_u8, 1]);
        assert!(block_on(bus.instruct(Opcode::SyncWrite, BROADCAST_ID, &fields))
            .unwrap()
            .is_none());
        assert_eq!(bus.comm().memory(1)[65], 1);
        assert!(block_on(bus.instruct(Opcode::Action, BROADCAST_ID, &Fields::new()))
            .unwrap()
            .is_none());
        assert_eq!(bus.comm().sent.len(), 3);
    }

    #[test]
    fn scan_on_an_empty_bus() {
        let mut bus = Bus::new(Emulated::new(&[]));
        assert_eq!(block_on(bus.scan()).map_err(|_| ()), Ok(BTreeMap::new()));
    }

    #[test]
    fn write_then_read() {
        let mut bus = Bus::new(Emulated::new(&[1]));
        block_on(bus.write(1, 116, &512_i32.to_le_bytes())).unwrap();
        assert_eq!(block_on(bus.read(1, 116, 4)).unwrap(), 512_i32.to_le_bytes());
        assert_eq!(block_on(bus.read(1, 0, 2)).unwrap(), XM430.to_le_bytes());
    }

    #[test]
    fn eeprom_locked_while_torque_is_on() {
        let mut bus = Bus::new(Emulated::new(&[1]));
        block_on(bus.write(1, 64, &[1])).unwrap();
        let err = block_on(bus.write(1, 7, &[2])).unwrap_err();
        assert!(matches!(
            err,
            Error::Status {
                id: 1,
                error: StatusError {
                    alert: false,
                    software: Some(SoftwareError::AccessError),
                },
            },
        ));
    }

    #[test]
    fn other_traffic_is_skipped() {
        let mut comm = Emulated::new(&[1, 2]);
        comm.noise = vec![0x00, 0x12, 0xFF];
        comm.unsolicited_from = Some(2);
        let mut bus = Bus::new(comm);
        assert_eq!(block_on(bus.ping(1)).map(|device| device.id).ok(), Some(1));
    }

    #[test]
    fn truncated_reply() {
        let mut comm = Emulated::new(&[1]);
        comm.truncate_to = Some(6);
        let mut bus = Bus::new(comm);
        let Err(Error::ReceiveTimeout { partial }) = block_on(bus.ping(1)) else {
            panic!("expected a receive timeout");
        };
        assert_eq!(partial, [0xFF, 0xFF, 0xFD, 0x00, 0x01, 0x07]);
        assert!(bus.connection().detector().buffered().is_empty());
    }

    #[test]
    fn corrupted_reply() {
        let mut comm = Emulated::new(&[1]);
        comm.corrupt = true;
        let mut bus = Bus::new(comm);
        let Err(Error::Decode(e)) = block_on(bus.ping(1)) else {
            panic!("expected a decode error");
        };
        assert!(matches!(e.kind, dynamixel2_packet::Error::MalformedFrame(Malformed::Crc { .. })));
        assert_eq!(e.raw.len(), 14);
    }

    #[test]
    fn sync_and_bulk() {
        let mut bus = Bus::new(Emulated::new(&[1, 2, 3]));
        let a = 100_i32.to_le_bytes();
        let b = (-100_i32).to_le_bytes();
        block_on(bus.sync_write(116, 4, &[(1, &a[..]), (3, &b[..])])).unwrap();

        let read = block_on(bus.sync_read(116, 4, &[3, 1])).unwrap();
        assert_eq!(read.get(&1).map(Vec::as_slice), Some(&a[..]));
        assert_eq!(read.get(&3).map(Vec::as_slice), Some(&b[..]));

        block_on(bus.bulk_write(&[(2, 65, &[1][..]), (1, 116, &b[..])])).unwrap();
        let read = block_on(bus.bulk_read(&[(2, 65, 1), (1, 116, 4)])).unwrap();
        assert_eq!(read.get(&2).map(Vec::as_slice), Some(&[1][..]));
        assert_eq!(read.get(&1).map(Vec::as_slice), Some(&b[..]));
    }

    #[test]
    fn sync_write_checks_lengths() {
        let mut bus = Bus::new(Emulated::new(&[1]));
        assert!(matches!(
            block_on(bus.sync_write(116, 4, &[(1, &[0, 0][..])])),
            Err(Error::Codec(dynamixel2_packet::Error::SizeMismatch {
                expected: 4,
                actual: 2,
            })),
        ));
        assert!(bus.comm().sent.is_empty());
    }

    #[test]
    fn simple_instructions() {
        let mut bus = Bus::new(Emulated::new(&[4]));
        block_on(bus.action(4)).unwrap();
        block_on(bus.reboot(4)).unwrap();
        block_on(bus.factory_reset(4, 0x02)).unwrap();
        block_on(bus.clear(4, 0x01, 0x4427_5341)).unwrap();
        block_on(bus.reg_write(4, 116, &[0; 4])).unwrap();
        let opcodes: Vec<u8> = bus.comm().sent.iter().map(|frame| frame[7]).collect();
        assert_eq!(opcodes, [0x05, 0x08, 0x06, 0x10, 0x04]);
    }

    #[test]
    fn send_by_name() {
        let mut bus = Bus::new(Emulated::new(&[1]));
        block_on(bus.send("read", 1, &Fields::new().with("address", 0_u16).with("length", 2_u16)))
            .unwrap();
        let packet = block_on(bus.receive()).unwrap();
        assert_eq!(packet.name(), "status_read");
        assert_eq!(packet.bytes("data"), Ok(&XM430.to_le_bytes()[..]));
    }

    #[test]
    fn device_display() {
        let known = Device {
            id: 1,
            model_number: 1060,
            firmware_version: 45,
        };
        assert_eq!(alloc::format!("{known}"), "#1 (XL430-W250 @ v45)");
        let unknown = Device {
            model_number: 9,
            ..known
        };
        assert_eq!(alloc::format!("{unknown}"), "#1 (model 9 @ v45)");
    }
}
