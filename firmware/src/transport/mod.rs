//! Serial link abstraction consumed by the control loop.
//!
//! The board crate implements [`SerialLink`] over its UART; tests implement it over in-memory
//! queues. A single `read` call is a single frame attempt: no reassembly happens above this trait.

/// Failures reported by the underlying serial peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Receiving from the peripheral failed (framing, overrun, driver error).
    Read,
    /// The peripheral refused or dropped outgoing bytes.
    Write,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinkError::Read => write!(f, "serial read failed"),
            LinkError::Write => write!(f, "serial write failed"),
        }
    }
}

impl core::error::Error for LinkError {}

/// Contract implemented by the point-to-point transport carrying frames to and from the verifier.
pub trait SerialLink {
    /// Read up to `buffer.len()` bytes, waiting at most `timeout_ms` for them.
    ///
    /// Returns the number of bytes stored; `Ok(0)` means the timeout elapsed with nothing received.
    fn read(&mut self, buffer: &mut [u8], timeout_ms: u32) -> Result<usize, LinkError>;

    /// Write the whole buffer.
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError>;
}

impl<T> SerialLink for &mut T
where
    T: SerialLink + ?Sized,
{
    fn read(&mut self, buffer: &mut [u8], timeout_ms: u32) -> Result<usize, LinkError> {
        (**self).read(buffer, timeout_ms)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        (**self).write(bytes)
    }
}
