use std::collections::VecDeque;

use shared::error::SharedError;
use shared::frame::{Command, encode};

use super::DeviceTransport;

/// In-memory transport that records written chunks and replays queued device bytes.
#[derive(Default)]
pub struct MemoryDeviceTransport {
    inbound: VecDeque<u8>,
    pub sent: Vec<Vec<u8>>,
}

impl MemoryDeviceTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes that subsequent reads will return.
    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Queue a well-formed device frame.
    pub fn queue_frame(&mut self, command: Command, payload: &[u8]) {
        let frame = encode(command, payload).expect("encode queued frame");
        self.queue_bytes(&frame);
    }

    pub fn last_sent(&self) -> Option<&Vec<u8>> {
        self.sent.last()
    }
}

impl DeviceTransport for MemoryDeviceTransport {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SharedError> {
        self.sent.push(bytes.to_vec());
        Ok(())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<(), SharedError> {
        let wanted = buffer.len();
        if self.inbound.len() < wanted {
            return Err(SharedError::Transport(
                "memory transport has no queued bytes".into(),
            ));
        }
        for (slot, byte) in buffer.iter_mut().zip(self.inbound.drain(..wanted)) {
            *slot = byte;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_sent_chunks() {
        let mut transport = MemoryDeviceTransport::new();
        transport.write_bytes(b"ping").expect("write");
        assert_eq!(transport.last_sent().map(Vec::as_slice), Some(&b"ping"[..]));
    }

    #[test]
    fn replays_queued_frames() {
        let mut transport = MemoryDeviceTransport::new();
        transport.queue_frame(Command::Ready, &[]);
        let (command, payload) = transport.read_frame().expect("frame");
        assert_eq!(command, Command::Ready);
        assert!(payload.is_empty());
        assert!(transport.read_frame().is_err());
    }
}
