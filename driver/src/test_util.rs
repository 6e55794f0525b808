//! A bus full of X-series actuators that live in memory.

use {
    crate::comm::Comm,
    alloc::{
        collections::{BTreeMap, VecDeque},
        vec,
        vec::Vec,
    },
    core::{convert::Infallible, time::Duration},
    dynamixel2_packet::{
        Connection, Direction, Fields, Opcode, Packet, assemble_status,
        constants::BROADCAST_ID, control_table::X_SERIES,
    },
};

pub const XM430: u16 = 1030;
const FIRMWARE: u8 = 38;
const TORQUE_ENABLE: usize = 64;

/// One byte at 1 Mbaud, start and stop bits included.
const BYTE_TIME: Duration = Duration::from_micros(10);

const ACCESS_ERROR: u8 = 0x07;
const DATA_RANGE_ERROR: u8 = 0x04;

pub struct Emulated {
    /// Every frame the bus transmitted.
    pub sent: Vec<Vec<u8>>,
    /// Garbage placed ahead of the next batch of replies.
    pub noise: Vec<u8>,
    /// Slip a `status_ping` from this ID in ahead of the next replies.
    pub unsolicited_from: Option<u8>,
    /// Cut the next batch of replies short.
    pub truncate_to: Option<usize>,
    /// Flip a bit in every reply's payload.
    pub corrupt: bool,
    memory: BTreeMap<u8, Vec<u8>>,
    connection: Connection,
    rx: VecDeque<u8>,
    clock: Duration,
}

impl Emulated {
    pub fn new(ids: &[u8]) -> Self {
        let memory = ids
            .iter()
            .map(|&id| {
                let mut memory = vec![0; X_SERIES.size];
                memory[0..2].copy_from_slice(&XM430.to_le_bytes());
                memory[6] = FIRMWARE;
                memory[7] = id;
                (id, memory)
            })
            .collect();
        Self {
            sent: Vec::new(),
            noise: Vec::new(),
            unsolicited_from: None,
            truncate_to: None,
            corrupt: false,
            memory,
            connection: Connection::new(),
            rx: VecDeque::new(),
            clock: Duration::ZERO,
        }
    }

    pub fn with_model(mut self, id: u8, model_number: u16) -> Self {
        self.memory.get_mut(&id).unwrap()[0..2].copy_from_slice(&model_number.to_le_bytes());
        self
    }

    pub fn memory(&self, id: u8) -> &[u8] {
        &self.memory[&id]
    }

    fn ping_reply(&self, id: u8) -> Vec<u8> {
        let memory = &self.memory[&id];
        let fields = Fields::new()
            .with("error", 0_u8)
            .with("model_number", u16::from_le_bytes([memory[0], memory[1]]))
            .with("firmware_version", memory[6]);
        assemble_status(Opcode::Ping, id, &fields).unwrap()
    }

    fn data_reply(&self, opcode: Opcode, id: u8, address: usize, length: usize) -> Vec<u8> {
        let (error, data) = match self.memory[&id].get(address..address + length) {
            Some(data) => (0, data.to_vec()),
            None => (DATA_RANGE_ERROR, Vec::new()),
        };
        let fields = Fields::new().with("error", error).with("data", data);
        assemble_status(opcode, id, &fields).unwrap()
    }

    fn store(&mut self, id: u8, address: usize, data: &[u8]) -> u8 {
        let Some(memory) = self.memory.get_mut(&id) else {
            return 0;
        };
        if address < TORQUE_ENABLE && memory[TORQUE_ENABLE] != 0 {
            return ACCESS_ERROR;
        }
        match memory.get_mut(address..address + data.len()) {
            Some(range) => {
                range.copy_from_slice(data);
                0
            }
            None => DATA_RANGE_ERROR,
        }
    }

    fn ack(opcode: Opcode, id: u8, error: u8) -> Vec<u8> {
        assemble_status(opcode, id, &Fields::new().with("error", error)).unwrap()
    }

    fn handle(&mut self, packet: &Packet) -> Vec<Vec<u8>> {
        let id = packet.id();
        let broadcast = id == BROADCAST_ID;
        if !broadcast && !self.memory.contains_key(&id) {
            return Vec::new();
        }
        let integer = |name: &str| usize::try_from(packet.integer(name).unwrap()).unwrap();
        match packet.opcode() {
            Opcode::Ping if broadcast => self.memory.keys().map(|&id| self.ping_reply(id)).collect(),
            Opcode::Ping => vec![self.ping_reply(id)],
            opcode
                if broadcast
                    && !matches!(
                        opcode,
                        Opcode::SyncRead | Opcode::SyncWrite | Opcode::BulkRead | Opcode::BulkWrite
                    ) =>
            {
                Vec::new()
            }
            Opcode::Read => vec![self.data_reply(Opcode::Read, id, integer("address"), integer("length"))],
            Opcode::Write => {
                let error = self.store(id, integer("address"), packet.bytes("data").unwrap());
                vec![Self::ack(Opcode::Write, id, error)]
            }
            opcode @ (Opcode::RegWrite
            | Opcode::Action
            | Opcode::Reboot
            | Opcode::FactoryReset
            | Opcode::Clear) => vec![Self::ack(opcode, id, 0)],
            Opcode::SyncRead => {
                let (address, length) = (integer("address"), integer("length"));
                packet
                    .bytes("id_list")
                    .unwrap()
                    .iter()
                    .filter(|&&id| self.memory.contains_key(&id))
                    .map(|&id| self.data_reply(Opcode::SyncRead, id, address, length))
                    .collect()
            }
            Opcode::SyncWrite => {
                let (address, length) = (integer("address"), integer("length"));
                let list = packet.bytes("id_data_list").unwrap().to_vec();
                for chunk in list.chunks(1 + length) {
                    let _: u8 = self.store(chunk[0], address, &chunk[1..]);
                }
                Vec::new()
            }
            Opcode::BulkRead => packet
                .bytes("id_address_length_list")
                .unwrap()
                .chunks(5)
                .filter(|chunk| self.memory.contains_key(&chunk[0]))
                .map(|chunk| {
                    let address = u16::from_le_bytes([chunk[1], chunk[2]]);
                    let length = u16::from_le_bytes([chunk[3], chunk[4]]);
                    self.data_reply(Opcode::BulkRead, chunk[0], address.into(), length.into())
                })
                .collect(),
            Opcode::BulkWrite => {
                let list = packet.bytes("id_address_length_data_list").unwrap().to_vec();
                let mut rest = &list[..];
                while let &[id, a0, a1, l0, l1, ref tail @ ..] = rest {
                    let length = usize::from(u16::from_le_bytes([l0, l1]));
                    let address = usize::from(u16::from_le_bytes([a0, a1]));
                    let _: u8 = self.store(id, address, &tail[..length]);
                    rest = &tail[length..];
                }
                Vec::new()
            }
            opcode => panic!("emulated devices don't handle {opcode:?}"),
        }
    }
}

impl Comm for Emulated {
    type Error = Infallible;

    async fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.sent.push(bytes.to_vec());
        let packets: Vec<Packet> = self.connection.feed(bytes).map(Result::unwrap).collect();
        let replies: Vec<Vec<u8>> = packets
            .iter()
            .filter(|packet| packet.direction() == Direction::Instruction)
            .flat_map(|packet| self.handle(packet))
            .collect();
        if replies.is_empty() {
            return Ok(());
        }

        let mut wire = core::mem::take(&mut self.noise);
        if let Some(other) = self.unsolicited_from.take() {
            wire.extend(self.ping_reply(other));
        }
        for mut reply in replies {
            if self.corrupt {
                let last_parameter = reply.len() - 3;
                reply[last_parameter] ^= 0x01;
            }
            wire.extend(reply);
        }
        if let Some(len) = self.truncate_to.take() {
            wire.truncate(len);
        }
        self.rx.extend(wire);
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Option<u8>, Self::Error> {
        let byte = self.rx.pop_front();
        self.clock += if byte.is_some() { BYTE_TIME } else { timeout };
        Ok(byte)
    }

    fn now(&self) -> Duration {
        self.clock
    }
}
