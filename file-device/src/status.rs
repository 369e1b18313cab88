//! The per-device status buffer consumed on channel 15.

use bus_engine::config::STATUS_BUFFER_LEN;

use crate::application::Application;

#[derive(Clone, Copy)]
pub(crate) struct StatusBuffer {
    bytes: [u8; STATUS_BUFFER_LEN],
    len: u8,
    pos: u8,
}

impl Default for StatusBuffer {
    fn default() -> Self {
        Self {
            bytes: [0; STATUS_BUFFER_LEN],
            len: 0,
            pos: 0,
        }
    }
}

impl StatusBuffer {
    pub(crate) fn reset(&mut self) {
        *self = StatusBuffer::default();
    }

    /// Application-initiated `setStatus`: push a fresh message,
    /// skipping the next automatic `get_status` call.
    pub(crate) fn set(&mut self, data: &[u8]) {
        let n = data.len().min(STATUS_BUFFER_LEN);
        self.bytes[..n].copy_from_slice(&data[..n]);
        self.len = n as u8;
        self.pos = 0;
    }

    /// Application-initiated `clearStatus`: force the next access to call
    /// back into `get_status`.
    pub(crate) fn clear(&mut self) {
        self.len = 0;
        self.pos = 0;
    }

    /// Bytes remaining to be read, refilling via `get_status` exactly once
    /// when the buffer is found empty.
    pub(crate) fn remaining<A: Application>(&mut self, app: &mut A, devnr: u8) -> u8 {
        if self.pos == self.len {
            let n = app.get_status(devnr, &mut self.bytes);
            self.len = n.min(STATUS_BUFFER_LEN) as u8;
            self.pos = 0;
        }
        self.len - self.pos
    }

    pub(crate) fn pop(&mut self) -> u8 {
        let byte = self.bytes[self.pos as usize];
        self.pos += 1;
        byte
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingApp {
        calls: u32,
        reply: &'static [u8],
    }

    impl Application for CountingApp {
        fn open(&mut self, _devnr: u8, _channel: u8, _name: &[u8]) -> bool {
            true
        }
        fn close(&mut self, _devnr: u8, _channel: u8) {}
        fn read(&mut self, _devnr: u8, _channel: u8, _buf: &mut [u8]) -> (usize, bool) {
            (0, true)
        }
        fn write(&mut self, _devnr: u8, _channel: u8, _buf: &[u8], _last_chunk: bool) -> usize {
            0
        }
        fn get_status(&mut self, _devnr: u8, buf: &mut [u8]) -> usize {
            self.calls += 1;
            buf[..self.reply.len()].copy_from_slice(self.reply);
            self.reply.len()
        }
        fn execute(&mut self, _devnr: u8, _cmd: &[u8]) {}
        fn reset(&mut self) {}
    }

    #[test]
    fn refills_exactly_once_when_drained() {
        let mut app = CountingApp { calls: 0, reply: b"00, OK,00,00\r" };
        let mut status = StatusBuffer::default();
        let n = status.remaining(&mut app, 8);
        assert_eq!(n as usize, app.reply.len());
        assert_eq!(app.calls, 1);
        for _ in 0..app.reply.len() {
            status.pop();
        }
        // drained but not yet re-queried
        assert_eq!(status.remaining(&mut app, 8), app.reply.len() as u8);
        assert_eq!(app.calls, 2);
    }

    #[test]
    fn set_bypasses_get_status() {
        let mut app = CountingApp { calls: 0, reply: b"00, OK,00,00\r" };
        let mut status = StatusBuffer::default();
        status.set(b"73,CUSTOM,00,00\r");
        assert_eq!(status.remaining(&mut app, 8), b"73,CUSTOM,00,00\r".len() as u8);
        assert_eq!(app.calls, 0, "set() must not trigger a get_status call");
    }
}
