//! Named timing constants for the standard handshake and the fast protocols.
//!
//! Every number here comes straight from the IEC protocol's documented
//! timing tables. Keeping them in one place means call sites read as prose
//! instead of magic numbers.

/// How long we hold the ATN-settling timer after asserting DATA on ATN fall.
pub const ATN_SETTLE_US: u32 = 100;

/// Delay before the first byte of a talker role reversal.
pub const TALK_ROLE_REVERSAL_DELAY_US: u32 = 80;

/// How long `receiveByte` waits for the talker to pull CLK low before
/// concluding that EOI is being signalled instead.
pub const RECEIVE_CLK_WAIT_US: u32 = 200;

/// Duration of the DATA pulse a listener holds to acknowledge EOI.
///
/// Reference implementations use anywhere from 60 to 100us; 80us (what the
/// original source uses) is what we hold here.
pub const EOI_ACK_PULSE_US: u32 = 80;

/// Per-bit CLK-low "data not valid" setup time during standard transmit.
pub const TRANSMIT_BIT_SETUP_US: u32 = 80;

/// Per-bit CLK-high hold time during standard transmit.
pub const TRANSMIT_BIT_HOLD_US: u32 = 60;

/// How long a talker waits for the listener's final acknowledgement pulse.
pub const TRANSMIT_ACK_TIMEOUT_US: u32 = 1000;

/// Delay threshold used to detect JiffyDOS support while reading the primary
/// byte under ATN: if CLK rise is delayed past this, we advertise support.
pub const JIFFY_DETECT_DELAY_US: u32 = 200;

/// Duration of the DATA pulse used to acknowledge JiffyDOS detection.
pub const JIFFY_DETECT_ACK_US: u32 = 80;

/// JiffyDOS per-byte bit-sampling offsets, measured from the CLK release
/// that starts the byte.
pub mod jiffy_offsets {
    pub const BITS_4_5: u32 = 14;
    pub const BITS_6_7: u32 = 27;
    pub const BITS_3_1: u32 = 38;
    pub const BITS_2_0: u32 = 51;
    pub const EOI: u32 = 64;
    pub const ACK: u32 = 83;
}

/// Per-bit hold time inside a JiffyDOS block-mode transfer, tighter than the
/// ordinary per-byte window since a whole block rides on one DATA-release
/// handshake instead of one per byte.
pub const JIFFY_BLOCK_BIT_US: u32 = 40;

/// Largest number of bytes streamed in one JiffyDOS block before the talker
/// waits for the receiver to release DATA again.
pub const JIFFY_BLOCK_MAX_LEN: usize = 254;

/// Upper bound on claimed device numbers (0..=30 are valid IEC addresses).
pub const MAX_DEVNR: u8 = 30;

/// Compile-time cap on how many device numbers a single engine may claim.
pub const MAX_DEVICES: usize = 16;

/// Minimum scratch buffer the fast-protocol paths need.
pub const SCRATCH_BUFFER_MIN: usize = 128;

/// Minimum scratch buffer size when Epyx sector operations are enabled.
pub const SCRATCH_BUFFER_EPYX: usize = 256;

/// Size of the per-device status buffer.
pub const STATUS_BUFFER_LEN: usize = 32;

/// Size of the per-transaction filename/command buffer.
pub const NAME_BUFFER_LEN: usize = 40;
