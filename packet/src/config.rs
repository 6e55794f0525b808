use crate::constants::DEFAULT_MAX_FRAME_LEN;

/// What to do when a received frame's CRC footer disagrees with its contents.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrcCheck {
    /// Reject the frame with [`crate::Malformed::Crc`].
    #[default]
    Strict,
    /// Log a warning and decode anyway.
    Lenient,
}

/// Per-connection codec settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    pub crc: CrcCheck,
    /// Longest frame a receiver should buffer before giving up on it.
    pub max_frame_len: usize,
}

impl Config {
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            crc: CrcCheck::Strict,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn with_crc(self, crc: CrcCheck) -> Self {
        Self { crc, ..self }
    }

    #[inline(always)]
    #[must_use]
    pub const fn with_max_frame_len(self, max_frame_len: usize) -> Self {
        Self {
            max_frame_len,
            ..self
        }
    }
}

impl Default for Config {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}
