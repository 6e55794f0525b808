//! Fixed bytes and sizes of the Protocol 2.0 wire format.

/// Start-of-frame marker plus the reserved byte.
pub const HEADER: [u8; 4] = [0xFF, 0xFF, 0xFD, 0x00];

/// The three-byte sequence that byte stuffing keeps out of a frame body.
pub const MARKER: [u8; 3] = [0xFF, 0xFF, 0xFD];

/// Byte inserted after every [`MARKER`] occurrence inside a frame body.
pub const STUFFING: u8 = 0xFD;

/// Instruction byte carried by every status (reply) frame.
pub const STATUS: u8 = 0x55;

/// Packet ID addressing every device on the bus at once.
pub const BROADCAST_ID: u8 = 0xFE;

/// Highest ID a single device may be configured with.
pub const MAX_ID: u8 = 252;

/// Header bytes, packet ID, and the two length bytes.
pub const PREAMBLE_LEN: usize = 7;

/// Offset of the little-endian length field.
pub const LENGTH_OFFSET: usize = 5;

/// Offset of the instruction byte.
pub const INSTRUCTION_OFFSET: usize = 7;

/// Bytes of CRC footer.
pub const CRC_LEN: usize = 2;

/// The shortest frame that can exist: preamble, instruction byte, CRC.
pub const MIN_FRAME_LEN: usize = PREAMBLE_LEN + 1 + CRC_LEN;

/// Default cap on a single frame, enforced by whoever feeds the detector.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;
