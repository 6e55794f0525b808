//! The byte pipe underneath a [`Bus`](crate::bus::Bus).

use core::{fmt, time::Duration};

/// A half-duplex serial link.
///
/// Implementations own the physical channel: direction switching, baud rate,
/// and clocks all live here. The bus only ever sees whole outgoing frames and
/// single incoming bytes.
#[expect(async_fn_in_trait, reason = "bus futures are driven on one executor")]
pub trait Comm {
    type Error: fmt::Debug + fmt::Display;

    /// Transmit one whole frame and return once the line is free to receive.
    async fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Wait at most `timeout` for the next byte; `Ok(None)` if none arrived.
    async fn recv(&mut self, timeout: Duration) -> Result<Option<u8>, Self::Error>;

    /// Monotonic time since any fixed point, used for per-request deadlines.
    fn now(&self) -> Duration;
}
