//! Composition root: a [`FileDevice`] owns a [`BusEngine`] and an
//! [`Application`], and bridges between them.
//!
//! The bridge is a short-lived [`Callbacks`] adapter constructed fresh on
//! every [`FileDevice::task`] call. It implements [`BusClient`] by borrowing
//! the two *disjoint* fields it needs (`slots`, `app`) straight out of
//! `FileDevice`, which is what lets it hand `&mut self.app` to the
//! application while the bus engine itself remains borrowed for the
//! duration of `engine.task(&mut cb)` — `Callbacks` never touches the engine
//! field at all. Anything it needs the engine to *do* (arm a fast protocol)
//! is recorded in `PendingActions` and applied once the engine borrow ends.

use bus_engine::client::BusClient;
use bus_engine::config::MAX_DEVICES;
use bus_engine::epyx::{EpyxSnoop, MatchResult};
use bus_engine::error::ClaimError;
use bus_engine::gpio::{BusPins, Clock};
use bus_engine::{BusEngine, Event};

use crate::application::Application;
use crate::command::{classify_dolphin, DolphinCommand, NameBuffer};
use crate::lookahead::Lookahead;
use crate::status::StatusBuffer;

struct DeviceSlot {
    devnr: u8,
    current_channel: Option<u8>,
    opening: bool,
    name: NameBuffer,
    status: StatusBuffer,
    lookahead: [Lookahead; 16],
    epyx: EpyxSnoop,
}

impl DeviceSlot {
    fn new(devnr: u8) -> Self {
        Self {
            devnr,
            current_channel: None,
            opening: false,
            name: NameBuffer::default(),
            status: StatusBuffer::default(),
            lookahead: [Lookahead::default(); 16],
            epyx: EpyxSnoop::new(),
        }
    }
}

#[derive(Default, Clone, Copy)]
struct PendingActions {
    arm_epyx: bool,
    set_dolphin_burst: Option<bool>,
    arm_dolphin_rx: bool,
    arm_dolphin_tx: bool,
}

fn find_slot<'s>(
    slots: &'s mut [Option<DeviceSlot>; MAX_DEVICES],
    devnr: u8,
) -> Option<&'s mut DeviceSlot> {
    slots
        .iter_mut()
        .flatten()
        .find(|slot| slot.devnr == devnr)
}

/// Resolve and apply a completed channel-15 command string: DolphinDOS burst
/// commands are swallowed and turn into a [`PendingActions`] bit; Epyx
/// `M-W`/`M-E` signature steps are swallowed via [`EpyxSnoop`]; anything else
/// reaches the application's `execute`.
fn dispatch_command<A: Application>(
    slot: &mut DeviceSlot,
    app: &mut A,
    pending: &mut PendingActions,
    devnr: u8,
) {
    let DeviceSlot {
        name, epyx, status, ..
    } = slot;
    let cmd = name.finish();
    if let Some(dc) = classify_dolphin(cmd) {
        match dc {
            DolphinCommand::BurstTransmitRequest => pending.arm_dolphin_tx = true,
            DolphinCommand::BurstReceiveRequest => pending.arm_dolphin_rx = true,
            DolphinCommand::EnableBurst => {
                pending.set_dolphin_burst = Some(true);
                status.clear();
            }
            DolphinCommand::DisableBurst => {
                pending.set_dolphin_burst = Some(false);
                status.clear();
            }
        }
        return;
    }
    match epyx.feed_command(cmd) {
        MatchResult::Complete => pending.arm_epyx = true,
        MatchResult::Partial => {}
        MatchResult::NoMatch => app.execute(devnr, cmd),
    }
}

struct Callbacks<'s, A> {
    slots: &'s mut [Option<DeviceSlot>; MAX_DEVICES],
    app: &'s mut A,
    pending: PendingActions,
}

impl<'s, A: Application> BusClient for Callbacks<'s, A> {
    fn open(&mut self, devnr: u8, channel: u8) {
        if let Some(slot) = find_slot(self.slots, devnr) {
            slot.current_channel = Some(channel);
            slot.opening = true;
            slot.name.reset();
        }
    }

    fn close(&mut self, devnr: u8, channel: u8) {
        if let Some(slot) = find_slot(self.slots, devnr) {
            slot.lookahead[channel as usize].reset();
            if channel == 15 {
                slot.name.reset();
            }
            if slot.current_channel == Some(channel) {
                slot.current_channel = None;
                slot.opening = false;
            }
        }
        self.app.close(devnr, channel);
    }

    fn listen(&mut self, devnr: u8, channel: u8) {
        if let Some(slot) = find_slot(self.slots, devnr) {
            slot.current_channel = Some(channel);
            slot.opening = false;
            if channel == 15 {
                slot.name.reset();
            }
        }
        self.app.listen(devnr, channel);
    }

    fn talk(&mut self, devnr: u8, channel: u8) {
        if let Some(slot) = find_slot(self.slots, devnr) {
            slot.current_channel = Some(channel);
        }
        self.app.talk(devnr, channel);
    }

    fn untalk(&mut self, devnr: u8) {
        self.app.untalk(devnr);
    }

    fn unlisten(&mut self, devnr: u8) {
        if let Some(slot) = find_slot(self.slots, devnr) {
            if let Some(channel) = slot.current_channel {
                if slot.opening {
                    slot.opening = false;
                    if channel == 15 {
                        dispatch_command(slot, self.app, &mut self.pending, devnr);
                    } else {
                        let DeviceSlot { name, .. } = slot;
                        let opened = self.app.open(devnr, channel, name.finish());
                        slot.lookahead[channel as usize].reset();
                        let _ = opened; // failure surfaces via the app's own `read` returning 0
                    }
                } else if channel == 15 {
                    let has_cmd = {
                        let DeviceSlot { name, .. } = &mut *slot;
                        !name.finish().is_empty()
                    };
                    if has_cmd {
                        dispatch_command(slot, self.app, &mut self.pending, devnr);
                    } else {
                        // UNLISTEN with an empty command buffer is itself a
                        // close of the command channel ("Command-channel
                        // framing").
                        self.app.close(devnr, 15);
                    }
                }
            }
            slot.current_channel = None;
        }
        self.app.unlisten(devnr);
    }

    fn can_write(&mut self, devnr: u8, channel: u8) -> i8 {
        match find_slot(self.slots, devnr) {
            None => 0,
            Some(slot) => {
                if channel == 15 || slot.opening {
                    if slot.name.is_full() {
                        0
                    } else {
                        1
                    }
                } else {
                    1
                }
            }
        }
    }

    fn can_read(&mut self, devnr: u8, channel: u8) -> i8 {
        let slot = match find_slot(self.slots, devnr) {
            None => return 0,
            Some(slot) => slot,
        };
        let n = if channel == 15 {
            slot.status.remaining(self.app, devnr)
        } else {
            slot.lookahead[channel as usize].count(self.app, devnr, channel)
        };
        n as i8
    }

    fn write(&mut self, devnr: u8, channel: u8, data: u8, eoi: bool) {
        let opening = find_slot(self.slots, devnr)
            .map(|slot| slot.opening)
            .unwrap_or(false);
        if channel == 15 || opening {
            if let Some(slot) = find_slot(self.slots, devnr) {
                slot.name.push(data);
            }
        } else {
            self.app.write(devnr, channel, &[data], eoi);
        }
    }

    fn read(&mut self, devnr: u8, channel: u8) -> u8 {
        match find_slot(self.slots, devnr) {
            None => 0,
            Some(slot) => {
                if channel == 15 {
                    slot.status.pop()
                } else {
                    slot.lookahead[channel as usize].pop(self.app, devnr, channel)
                }
            }
        }
    }

    fn reset(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.current_channel = None;
            slot.opening = false;
            slot.name.reset();
            slot.status.reset();
            for la in slot.lookahead.iter_mut() {
                la.reset();
            }
            slot.epyx = EpyxSnoop::new();
        }
        self.app.reset();
    }
}

/// The file-operation framing layer. Owns a
/// [`BusEngine`] and an [`Application`]; translates between the raw byte
/// stream the former drives and the framed file operations the latter
/// implements.
pub struct FileDevice<'a, P, C, A> {
    engine: BusEngine<'a, P, C>,
    slots: [Option<DeviceSlot>; MAX_DEVICES],
    app: A,
}

impl<'a, P: BusPins, C: Clock, A: Application> FileDevice<'a, P, C, A> {
    pub fn new(pins: P, clock: C, scratch: &'a mut [u8], app: A) -> Self {
        Self {
            engine: BusEngine::new(pins, clock, scratch),
            slots: Default::default(),
            app,
        }
    }

    /// Claim a device number both on the engine and in our per-device
    /// bookkeeping.
    pub fn claim(&mut self, devnr: u8) -> Result<(), ClaimError> {
        self.engine.claim(devnr)?;
        if find_slot(&mut self.slots, devnr).is_none() {
            let free = self
                .slots
                .iter_mut()
                .find(|slot| slot.is_none())
                .ok_or(ClaimError::TooManyDevices)?;
            *free = Some(DeviceSlot::new(devnr));
        }
        Ok(())
    }

    pub fn enable_jiffy(&mut self) {
        self.engine.enable_jiffy();
    }

    pub fn enable_dolphin(&mut self) {
        self.engine.enable_dolphin();
    }

    pub fn enable_epyx(&mut self) {
        self.engine.enable_epyx();
    }

    pub fn engine(&self) -> &BusEngine<'a, P, C> {
        &self.engine
    }

    pub fn application(&mut self) -> &mut A {
        &mut self.app
    }

    /// Push a status line directly, bypassing `Application::get_status`
    /// (mirroring the original's "setStatus" for the application).
    pub fn set_status(&mut self, devnr: u8, data: &[u8]) {
        if let Some(slot) = find_slot(&mut self.slots, devnr) {
            slot.status.set(data);
        }
    }

    /// Force the next channel-15 read to call back into
    /// `Application::get_status`.
    pub fn clear_status(&mut self, devnr: u8) {
        if let Some(slot) = find_slot(&mut self.slots, devnr) {
            slot.status.clear();
        }
    }

    /// Advance both layers by one unit of work. Must be called at the
    /// same cadence `BusEngine::task` requires.
    pub fn task(&mut self) -> Event {
        let Self { engine, slots, app } = self;
        let mut cb = Callbacks {
            slots,
            app,
            pending: PendingActions::default(),
        };
        let event = engine.task(&mut cb);
        let pending = cb.pending;
        if let Some(enable) = pending.set_dolphin_burst {
            self.engine.set_dolphin_burst_enabled(enable);
        }
        if pending.arm_dolphin_rx {
            self.engine.arm_dolphin_burst_rx();
        }
        if pending.arm_dolphin_tx {
            self.engine.arm_dolphin_burst_tx();
        }
        if pending.arm_epyx {
            self.engine.arm_epyx();
        }
        event
    }
}
