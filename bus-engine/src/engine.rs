//! The standard IEC handshake state machine.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace, warn};

use crate::client::BusClient;
use crate::config;
use crate::error::ClaimError;
use crate::flags::{FastFlags, Flags};
use crate::gpio::{elapsed_since, BusPins, Clock};
use crate::dolphin;
use crate::epyx;
use crate::jiffy;

/// Coarse top-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    UnderAtn,
    Listening,
    Talking,
}

/// What happened during the most recent [`BusEngine::task`] call. Purely
/// informational — callers that don't care can ignore the return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Nothing to do; bus is idle.
    Idle,
    /// Still inside an ATN frame, or just left one.
    UnderAtn,
    /// A byte was received while listening.
    ByteReceived { byte: u8, eoi: bool },
    /// A byte was transmitted while talking.
    ByteSent { byte: u8, eoi: bool },
    /// Waiting on the upward `can_write`/`can_read` callback; call `task`
    /// again later.
    Stalled,
    /// A bounded wait elapsed without the expected edge; the current byte
    /// was abandoned.
    Timeout,
    /// ATN fell mid-transfer; whatever was in flight was discarded.
    Preempted,
    /// RESET fell; engine and caller should both reset.
    Reset,
}

/// Which role the most recent ATN frame assigned us, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingRole {
    None,
    Listen(u8),
    Talk(u8),
}

/// Tracks a stalled upward callback across `task()` calls so we don't lose
/// the byte we were about to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stall {
    None,
    CanWrite,
    CanRead,
}

/// The standard-protocol IEC bus engine.
///
/// Generic over the GPIO contract (`P`) and the microsecond clock (`C`) so
/// embedded targets pay no indirection cost; hosted tests substitute the
/// software models in `iec-sim`.
///
/// `'a` is the lifetime of the caller-supplied scratch buffer the fast
/// protocols borrow; the engine
/// never allocates one itself.
pub struct BusEngine<'a, P, C> {
    pins: P,
    clock: C,
    scratch: &'a mut [u8],

    state: State,
    flags: Flags,
    sflags: FastFlags,

    claimed: u32, // bitmask over devnr 0..=30
    active_devnr: u8,
    channel: u8,

    primary: u8,
    secondary: u8,
    pending_role: PendingRole,
    stall: Stall,
    pending_hard_error: bool,

    prev_reset: bool,
    atn_pending: AtomicBool,

    timeout_start_us: u32,
    timeout_duration_us: u32,
}

impl<'a, P: BusPins, C: Clock> BusEngine<'a, P, C> {
    /// Create a new engine over `pins`/`clock`. `scratch` must be at least
    /// [`config::SCRATCH_BUFFER_MIN`] bytes (or
    /// [`config::SCRATCH_BUFFER_EPYX`] if Epyx sector ops are enabled by the
    /// application); it is borrowed for the engine's lifetime and never
    /// reallocated.
    pub fn new(pins: P, clock: C, scratch: &'a mut [u8]) -> Self {
        let mut pins = pins;
        pins.drive_clk(true);
        pins.drive_data(true);
        pins.drive_ctrl(false);
        Self {
            pins,
            clock,
            scratch,
            state: State::Idle,
            flags: Flags::empty(),
            sflags: FastFlags::empty(),
            claimed: 0,
            active_devnr: 0,
            channel: 0,
            primary: 0,
            secondary: 0,
            pending_role: PendingRole::None,
            stall: Stall::None,
            pending_hard_error: false,
            prev_reset: true,
            atn_pending: AtomicBool::new(false),
            timeout_start_us: 0,
            timeout_duration_us: 0,
        }
    }

    /// Claim a device number. May be called multiple
    /// times before the first [`task`](Self::task) call to listen on several
    /// addresses with one engine instance.
    pub fn claim(&mut self, devnr: u8) -> Result<(), ClaimError> {
        if devnr > config::MAX_DEVNR {
            return Err(ClaimError::OutOfRange(devnr));
        }
        if (self.claimed.count_ones() as usize) >= config::MAX_DEVICES
            && self.claimed & (1 << devnr) == 0
        {
            return Err(ClaimError::TooManyDevices);
        }
        self.claimed |= 1 << devnr;
        Ok(())
    }

    fn claims(&self, devnr: u8) -> bool {
        devnr <= config::MAX_DEVNR && self.claimed & (1 << devnr) != 0
    }

    /// Enable JiffyDOS fast-loader detection.
    pub fn enable_jiffy(&mut self) {
        self.sflags.insert(FastFlags::JIFFY_ENABLED);
    }

    /// Enable DolphinDOS parallel burst detection.
    pub fn enable_dolphin(&mut self) {
        self.sflags.insert(FastFlags::DOLPHIN_ENABLED);
    }

    /// Enable Epyx FastLoad cartridge detection.
    pub fn enable_epyx(&mut self) {
        self.sflags.insert(FastFlags::EPYX_ENABLED);
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn fast_flags(&self) -> FastFlags {
        self.sflags
    }

    /// Callable from an ATN falling-edge interrupt handler. Sets the pending
    /// flag the main loop's next `task()` call (or the in-progress bounded
    /// wait) will observe; does not touch any state that isn't safe to touch
    /// from interrupt context.
    pub fn notify_atn_fell(&self) {
        self.atn_pending.store(true, Ordering::Release);
    }

    /// Borrow the scratch buffer fast-protocol paths use. Exposed so a
    /// higher layer (e.g. the file-device's Epyx snooper) can stage bytes
    /// into it before arming a fast mode.
    pub fn scratch_mut(&mut self) -> &mut [u8] {
        self.scratch
    }

    /// `XQ`/`XZ`: enable or disable Dolphin burst transfers for the
    /// remainder of this session. A higher layer intercepts these commands
    /// on channel 15 before they reach the application.
    pub fn set_dolphin_burst_enabled(&mut self, enabled: bool) {
        self.sflags.set(FastFlags::DOLPHIN_BURST_ENABLED, enabled);
    }

    /// `XF+`: arm one burst receive (next `task()` on the listening path
    /// uses the parallel cable instead of bit-banging).
    pub fn arm_dolphin_burst_rx(&mut self) {
        if self.sflags.contains(FastFlags::DOLPHIN_BURST_ENABLED) {
            self.sflags.insert(FastFlags::DOLPHIN_BURST_RX_REQUEST);
        }
    }

    /// `XF-`: arm one burst transmit.
    pub fn arm_dolphin_burst_tx(&mut self) {
        if self.sflags.contains(FastFlags::DOLPHIN_BURST_ENABLED) {
            self.sflags.insert(FastFlags::DOLPHIN_BURST_TX_REQUEST);
        }
    }

    /// Invoked once a file-device layer's `M-W`/`M-E` snooper has matched a
    /// known Epyx FastLoad cartridge upload. Arms Epyx sector-transfer
    /// mode for the data phase that follows.
    pub fn arm_epyx(&mut self) {
        if self.sflags.contains(FastFlags::EPYX_ENABLED) {
            self.sflags.insert(FastFlags::EPYX_ARMED);
        }
    }

    /// Leave Epyx sector-transfer mode once the application's sector op
    /// completes.
    pub fn disarm_epyx(&mut self) {
        self.sflags.remove(FastFlags::EPYX_ARMED);
    }

    // ---- main entry point -------------------------------------------------

    /// Advance the state machine by one unit of work (an ATN phase step, one
    /// byte, or a reset), then return. Must be called at least every 1ms if
    /// ATN is not wired to an interrupt.
    pub fn task(&mut self, client: &mut dyn BusClient) -> Event {
        if self.check_reset(client) {
            return Event::Reset;
        }
        if self.atn_fell() {
            self.on_atn_fell(client);
        }
        match self.state {
            State::Idle => Event::Idle,
            State::UnderAtn => self.run_under_atn(client),
            State::Listening => self.run_listening(client),
            State::Talking => self.run_talking(client),
        }
    }

    fn atn_fell(&self) -> bool {
        self.atn_pending.load(Ordering::Acquire) || !self.pins.read_atn()
    }

    fn check_reset(&mut self, client: &mut dyn BusClient) -> bool {
        let released = self.pins.read_reset();
        let falling = self.prev_reset && !released;
        self.prev_reset = released;
        if falling {
            debug!("reset line fell, resetting engine");
            self.flags = Flags::empty();
            self.sflags = FastFlags::empty();
            self.pending_role = PendingRole::None;
            self.stall = Stall::None;
            self.state = State::Idle;
            self.pins.drive_clk(true);
            self.pins.drive_data(true);
            self.pins.drive_ctrl(false);
            client.reset();
        }
        falling
    }

    // ---- ATN framing --------------------------------------------------

    fn on_atn_fell(&mut self, client: &mut dyn BusClient) {
        if self.flags.contains(Flags::UNDER_ATN) {
            // already processing this ATN assertion
            self.drain_atn_bytes(client);
            return;
        }
        self.atn_pending.store(false, Ordering::Release);
        trace!("ATN fell");
        self.pins.drive_clk(true);
        self.pins.drive_data(false);
        self.pins.drive_ctrl(true);
        self.sflags.remove(FastFlags::detected_mask());
        self.flags.insert(Flags::UNDER_ATN);
        self.primary = 0;
        self.secondary = 0;
        self.pending_role = PendingRole::None;
        self.state = State::UnderAtn;
        self.start_timeout(config::ATN_SETTLE_US);
    }

    fn run_under_atn(&mut self, client: &mut dyn BusClient) -> Event {
        if self.pins.read_atn() && !self.atn_pending.load(Ordering::Acquire) {
            self.on_atn_rose(client);
            return Event::UnderAtn;
        }
        self.drain_atn_bytes(client)
    }

    fn drain_atn_bytes(&mut self, client: &mut dyn BusClient) -> Event {
        match self.recv_bits_under_atn() {
            None => Event::UnderAtn,
            Some(byte) => {
                let is_primary = matches!(byte, 0x20..=0x5E);
                let matched = self.classify_atn_byte(byte, client);
                self.ack_byte(matched);
                if matched && is_primary && self.jiffy_candidate() {
                    jiffy::maybe_detect(&mut self.pins, &self.clock, &mut self.sflags);
                }
                if matched
                    && !is_primary
                    && self.sflags.contains(FastFlags::DOLPHIN_ENABLED)
                    && !self.sflags.contains(FastFlags::DOLPHIN_DETECTED)
                {
                    dolphin::maybe_detect(&mut self.pins, &self.clock, &mut self.sflags);
                }
                Event::UnderAtn
            }
        }
    }

    fn on_atn_rose(&mut self, client: &mut dyn BusClient) {
        trace!("ATN rose, pending_role={:?}", self.pending_role);
        self.flags.remove(Flags::UNDER_ATN);
        self.pins.drive_ctrl(false);
        match self.pending_role {
            PendingRole::Listen(devnr) => {
                self.active_devnr = devnr;
                self.flags.insert(Flags::LISTENING);
                self.flags.remove(Flags::TALKING);
                self.pins.drive_data(false);
                self.state = State::Listening;
            }
            PendingRole::Talk(devnr) => {
                self.active_devnr = devnr;
                self.flags.insert(Flags::TALKING);
                self.flags.remove(Flags::LISTENING);
                // wait for master to release CLK, then role reversal
                while !self.pins.read_clk() {
                    if self.atn_fell() {
                        self.on_atn_fell(client);
                        return;
                    }
                }
                self.pins.drive_clk(false);
                self.pins.drive_data(true);
                self.start_timeout(config::TALK_ROLE_REVERSAL_DELAY_US);
                self.clock.busy_wait_until(self.deadline());
                self.state = State::Talking;
            }
            PendingRole::None => {
                self.state = if self.flags.contains(Flags::LISTENING) {
                    self.pins.drive_data(false);
                    State::Listening
                } else if self.flags.contains(Flags::TALKING) {
                    State::Talking
                } else {
                    self.pins.drive_data(true);
                    State::Idle
                };
            }
        }
        self.pending_role = PendingRole::None;
    }

    /// Classify one byte received under ATN, returning whether it should be
    /// acknowledged on the wire (unmatched device numbers are never
    /// acked).
    fn classify_atn_byte(&mut self, byte: u8, client: &mut dyn BusClient) -> bool {
        match byte {
            0x3F => {
                if self.flags.contains(Flags::LISTENING) {
                    client.unlisten(self.active_devnr);
                }
                self.flags.remove(Flags::LISTENING);
                self.pending_role = PendingRole::None;
                self.primary = byte;
                true
            }
            0x5F => {
                if self.flags.contains(Flags::TALKING) {
                    client.untalk(self.active_devnr);
                }
                self.flags.remove(Flags::TALKING);
                self.pending_role = PendingRole::None;
                self.primary = byte;
                true
            }
            0x20..=0x3E => {
                let devnr = byte & 0x1F;
                self.primary = byte;
                let matched = self.claims(devnr);
                self.pending_role = if matched {
                    PendingRole::Listen(devnr)
                } else {
                    PendingRole::None
                };
                matched
            }
            0x40..=0x5E => {
                let devnr = byte & 0x1F;
                self.primary = byte;
                let matched = self.claims(devnr);
                self.pending_role = if matched {
                    PendingRole::Talk(devnr)
                } else {
                    PendingRole::None
                };
                matched
            }
            secondary => {
                self.secondary = secondary;
                let channel = secondary & 0x0F;
                match self.pending_role {
                    PendingRole::Listen(devnr) => {
                        self.channel = channel;
                        match secondary & 0xF0 {
                            0xF0 => client.open(devnr, channel),
                            0xE0 => client.close(devnr, channel),
                            _ => client.listen(devnr, channel),
                        }
                        true
                    }
                    PendingRole::Talk(devnr) => {
                        self.channel = channel;
                        client.talk(devnr, channel);
                        true
                    }
                    PendingRole::None => false,
                }
            }
        }
    }

    fn jiffy_candidate(&self) -> bool {
        self.sflags.contains(FastFlags::JIFFY_ENABLED)
    }

    // ---- listening / talking -------------------------------------------

    fn run_listening(&mut self, client: &mut dyn BusClient) -> Event {
        // can_write is re-asked every call, including retries after a prior
        // Stalled return — a stall only means "not yet", not "permission
        // already granted for when you come back".
        let cw = client.can_write(self.active_devnr, self.channel);
        if cw < 0 {
            self.stall = Stall::CanWrite;
            return Event::Stalled;
        }
        self.pending_hard_error = cw == 0;
        self.stall = Stall::None;

        let received = if self.sflags.contains(FastFlags::EPYX_ARMED) {
            epyx::recv_byte(&mut self.pins, &self.clock).map(|b| (b, false))
        } else if self.sflags.contains(FastFlags::DOLPHIN_BURST_RX_REQUEST) {
            self.sflags.remove(FastFlags::DOLPHIN_BURST_RX_REQUEST);
            dolphin::recv_byte(&mut self.pins, &self.clock).map(|b| (b, false))
        } else if self.sflags.contains(FastFlags::JIFFY_DETECTED) {
            jiffy::recv_byte(&mut self.pins, &self.clock)
        } else {
            self.recv_bits_standard()
        };

        match received {
            None => {
                if self.atn_fell() {
                    Event::Preempted
                } else {
                    Event::Timeout
                }
            }
            Some((byte, eoi)) => {
                let ok = !self.pending_hard_error;
                self.ack_byte(ok);
                if ok {
                    client.write(self.active_devnr, self.channel, byte, eoi);
                } else {
                    warn!("can_write denied byte on ch{}", self.channel);
                }
                Event::ByteReceived { byte, eoi }
            }
        }
    }

    fn run_talking(&mut self, client: &mut dyn BusClient) -> Event {
        if self.sflags.contains(FastFlags::JIFFY_DETECTED) && self.channel == 1 {
            return self.run_talking_jiffy_block(client);
        }
        // Same re-ask-every-call rule as run_listening.
        let cr = client.can_read(self.active_devnr, self.channel);
        if cr < 0 {
            self.stall = Stall::CanRead;
            return Event::Stalled;
        }
        if cr == 0 {
            // "cannot produce" - signal EOI-with-no-data immediately.
            self.pins.drive_clk(false);
            self.clock.busy_wait_until(self.deadline_from_now(config::RECEIVE_CLK_WAIT_US));
            return Event::Timeout;
        }
        self.stall = Stall::None;

        let byte = client.read(self.active_devnr, self.channel);
        let eoi = client.can_read(self.active_devnr, self.channel) <= 0;
        let ok = if self.sflags.contains(FastFlags::EPYX_ARMED) {
            epyx::send_byte(&mut self.pins, &self.clock, byte)
        } else if self.sflags.contains(FastFlags::DOLPHIN_BURST_TX_REQUEST) {
            self.sflags.remove(FastFlags::DOLPHIN_BURST_TX_REQUEST);
            dolphin::send_byte(&mut self.pins, &self.clock, byte)
        } else if self.sflags.contains(FastFlags::JIFFY_DETECTED) {
            jiffy::send_byte(&mut self.pins, &self.clock, byte, eoi)
        } else {
            self.send_bits_standard(byte, eoi)
        };
        if ok {
            Event::ByteSent { byte, eoi }
        } else if self.atn_fell() {
            Event::Preempted
        } else {
            Event::Timeout
        }
    }

    /// JiffyDOS block-mode TALK on secondary `0x61`: gathers up to a
    /// scratch-buffer's worth of bytes from the application, then streams
    /// them as one block. Unlike the per-byte paths this does not honour a
    /// negative (stall) `can_read`; a block that can't be filled yet is
    /// simply sent short, with a fully-drained application producing the
    /// empty end-of-file block.
    fn run_talking_jiffy_block(&mut self, client: &mut dyn BusClient) -> Event {
        let cap = self.scratch.len().min(config::JIFFY_BLOCK_MAX_LEN);
        let mut n = 0usize;
        while n < cap {
            let cr = client.can_read(self.active_devnr, self.channel);
            if cr <= 0 {
                break;
            }
            self.scratch[n] = client.read(self.active_devnr, self.channel);
            n += 1;
        }
        let eof = n == 0;
        if jiffy::send_block(&mut self.pins, &self.clock, &self.scratch[..n]) {
            Event::ByteSent { byte: n as u8, eoi: eof }
        } else if self.atn_fell() {
            Event::Preempted
        } else {
            Event::Timeout
        }
    }

    // ---- standard receive/transmit bit-banging -------------------------

    /// Receive one byte under ATN. EOI is
    /// never signalled in this phase; a stalled CLK just means "not yet".
    fn recv_bits_under_atn(&mut self) -> Option<u8> {
        self.start_timeout(config::RECEIVE_CLK_WAIT_US);
        self.pins.drive_data(true);
        while self.pins.read_clk() {
            if self.atn_fell() {
                return None;
            }
        }
        let mut value: u8 = 0;
        for bit in 0..8 {
            self.wait_clk(true, true)?;
            if self.pins.read_data() {
                value |= 1 << bit;
            }
            self.wait_clk(false, true)?;
        }
        Some(value)
    }

    /// Implements `receiveByte` outside ATN: a CLK release delayed
    /// past [`config::RECEIVE_CLK_WAIT_US`] is EOI, acknowledged with a
    /// DATA pulse before the byte itself is clocked in.
    fn recv_bits_standard(&mut self) -> Option<(u8, bool)> {
        self.pins.drive_data(true);
        self.start_timeout(config::RECEIVE_CLK_WAIT_US);
        let mut eoi = false;
        while self.pins.read_clk() {
            if self.atn_fell() {
                return None;
            }
            if self.timed_out() {
                eoi = true;
                self.pins.drive_data(false);
                self.start_timeout(config::EOI_ACK_PULSE_US);
                self.clock.busy_wait_until(self.deadline());
                self.pins.drive_data(true);
                while self.pins.read_clk() {
                    if self.atn_fell() {
                        return None;
                    }
                }
                break;
            }
        }
        let mut value: u8 = 0;
        for bit in 0..8 {
            self.wait_clk(true, false)?;
            if self.pins.read_data() {
                value |= 1 << bit;
            }
            self.wait_clk(false, false)?;
        }
        Some((value, eoi))
    }

    fn wait_clk(&mut self, want_high: bool, under_atn: bool) -> Option<()> {
        self.start_timeout(config::RECEIVE_CLK_WAIT_US);
        loop {
            if self.pins.read_clk() == want_high {
                return Some(());
            }
            if self.atn_fell() && !under_atn {
                return None;
            }
            if self.timed_out() {
                return None;
            }
        }
    }

    fn ack_byte(&mut self, ok: bool) {
        self.pins.drive_data(!ok);
    }

    /// Implements `transmitByte`. Listener-held DATA after the "ready
    /// to send" CLK release means "stop, no listener present"; we just give
    /// up on the transfer the same as any other ack timeout.
    fn send_bits_standard(&mut self, byte: u8, eoi: bool) -> bool {
        self.pins.drive_clk(true);
        self.start_timeout(config::TRANSMIT_ACK_TIMEOUT_US);
        while !self.pins.read_data() {
            if self.atn_fell() {
                return false;
            }
            if self.timed_out() {
                return false;
            }
        }
        if eoi {
            self.start_timeout(config::RECEIVE_CLK_WAIT_US);
            while self.pins.read_data() {
                if self.atn_fell() {
                    return false;
                }
            }
            while !self.pins.read_data() {
                if self.atn_fell() {
                    return false;
                }
            }
        }
        self.pins.drive_clk(false);
        for bit in 0..8 {
            self.pins.drive_clk(false);
            self.pins.drive_data((byte >> bit) & 1 != 0);
            self.start_timeout(config::TRANSMIT_BIT_SETUP_US);
            self.clock.busy_wait_until(self.deadline());
            self.pins.drive_clk(true);
            self.start_timeout(config::TRANSMIT_BIT_HOLD_US);
            self.clock.busy_wait_until(self.deadline());
        }
        self.pins.drive_data(true);
        self.pins.drive_clk(false);
        self.start_timeout(config::TRANSMIT_ACK_TIMEOUT_US);
        while self.pins.read_data() {
            if self.atn_fell() {
                return false;
            }
            if self.timed_out() {
                warn!("transmit ack timed out");
                return false;
            }
        }
        true
    }

    // ---- reset/timeout bookkeeping --------------------------------------

    fn start_timeout(&mut self, duration_us: u32) {
        self.timeout_start_us = self.clock.micros();
        self.timeout_duration_us = duration_us;
    }

    fn deadline(&self) -> u32 {
        self.timeout_start_us.wrapping_add(self.timeout_duration_us)
    }

    fn deadline_from_now(&self, duration_us: u32) -> u32 {
        self.clock.micros().wrapping_add(duration_us)
    }

    fn timed_out(&self) -> bool {
        elapsed_since(self.deadline(), self.clock.micros()) >= 0
    }
}
