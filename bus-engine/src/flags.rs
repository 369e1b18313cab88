//! Bitfields tracking core protocol state and fast-loader status.

use bitflags::bitflags;

bitflags! {
    /// Core protocol state flags.
    #[derive(Default)]
    pub struct Flags: u8 {
        const UNDER_ATN  = 0b0000_0001;
        const LISTENING  = 0b0000_0010;
        const TALKING    = 0b0000_0100;
        const DONE       = 0b0000_1000;
        const RESET_SEEN = 0b0001_0000;
    }
}

bitflags! {
    /// Fast-loader detection/arming flags.
    #[derive(Default)]
    pub struct FastFlags: u16 {
        const JIFFY_ENABLED            = 1 << 0;
        const JIFFY_DETECTED           = 1 << 1;
        const JIFFY_BLOCK              = 1 << 2;
        const DOLPHIN_ENABLED          = 1 << 3;
        const DOLPHIN_DETECTED         = 1 << 4;
        const DOLPHIN_BURST_ENABLED    = 1 << 5;
        const DOLPHIN_BURST_TX_REQUEST = 1 << 6;
        const DOLPHIN_BURST_RX_REQUEST = 1 << 7;
        const EPYX_ENABLED             = 1 << 8;
        const EPYX_ARMED               = 1 << 9;
    }
}

impl FastFlags {
    /// Flags that must be cleared on every ATN assertion.
    pub fn detected_mask() -> FastFlags {
        FastFlags::JIFFY_DETECTED | FastFlags::DOLPHIN_DETECTED
    }
}
