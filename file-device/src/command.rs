//! Filename/command string assembly for channel 15 and OPEN secondaries.

use bus_engine::config::NAME_BUFFER_LEN;

#[derive(Clone, Copy)]
pub(crate) struct NameBuffer {
    bytes: [u8; NAME_BUFFER_LEN],
    len: u8,
}

impl Default for NameBuffer {
    fn default() -> Self {
        Self {
            bytes: [0; NAME_BUFFER_LEN],
            len: 0,
        }
    }
}

impl NameBuffer {
    pub(crate) fn reset(&mut self) {
        self.len = 0;
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len as usize >= NAME_BUFFER_LEN
    }

    pub(crate) fn push(&mut self, byte: u8) {
        if !self.is_full() {
            self.bytes[self.len as usize] = byte;
            self.len += 1;
        }
    }

    /// Strip a trailing CR and return the finished string.
    pub(crate) fn finish(&mut self) -> &[u8] {
        if self.len > 0 && self.bytes[self.len as usize - 1] == 0x0D {
            self.len -= 1;
        }
        &self.bytes[..self.len as usize]
    }
}

/// DolphinDOS burst-mode commands intercepted on channel 15 before the
/// application ever sees them. Semantics (direction and which engine entry
/// point each maps to) follow the original `IECFileDevice::fileTask`'s
/// `EXEC` handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DolphinCommand {
    /// `XQ`: arm one burst *transmit* (LOAD direction, we're talking).
    BurstTransmitRequest,
    /// `XZ`: arm one burst *receive* (SAVE direction, we're listening).
    BurstReceiveRequest,
    /// `XF+`: enable burst mode for the remainder of the session.
    EnableBurst,
    /// `XF-`: disable burst mode.
    DisableBurst,
}

pub(crate) fn classify_dolphin(cmd: &[u8]) -> Option<DolphinCommand> {
    match cmd {
        b"XQ" => Some(DolphinCommand::BurstTransmitRequest),
        b"XZ" => Some(DolphinCommand::BurstReceiveRequest),
        b"XF+" => Some(DolphinCommand::EnableBurst),
        b"XF-" => Some(DolphinCommand::DisableBurst),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_buffer_strips_trailing_cr() {
        let mut buf = NameBuffer::default();
        for &b in b"TESTFILE\r" {
            buf.push(b);
        }
        assert_eq!(buf.finish(), b"TESTFILE");
    }

    #[test]
    fn name_buffer_leaves_non_cr_alone() {
        let mut buf = NameBuffer::default();
        for &b in b"TESTFILE" {
            buf.push(b);
        }
        assert_eq!(buf.finish(), b"TESTFILE");
    }

    #[test]
    fn name_buffer_saturates_instead_of_overflowing() {
        let mut buf = NameBuffer::default();
        for _ in 0..(NAME_BUFFER_LEN + 10) {
            buf.push(b'X');
        }
        assert!(buf.is_full());
        assert_eq!(buf.finish().len(), NAME_BUFFER_LEN);
    }

    #[test]
    fn dolphin_commands_classified_exactly() {
        assert_eq!(classify_dolphin(b"XQ"), Some(DolphinCommand::BurstTransmitRequest));
        assert_eq!(classify_dolphin(b"XZ"), Some(DolphinCommand::BurstReceiveRequest));
        assert_eq!(classify_dolphin(b"XF+"), Some(DolphinCommand::EnableBurst));
        assert_eq!(classify_dolphin(b"XF-"), Some(DolphinCommand::DisableBurst));
        assert_eq!(classify_dolphin(b"I0"), None);
    }
}
