//! Uinput-backed virtual bus. Each attached pad is a uinput device node
//! with the Xbox 360 key set, axis ranges, and FF_RUMBLE capability. Host
//! applications see an ordinary kernel gamepad; rumble effects they upload
//! are read back off the node and surfaced as [FeedbackEvent]s.
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicU8, Ordering};

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, EventSummary, EventType, FFEffectCode,
    FFEffectData, FFEffectKind, FFStatusCode, InputEvent, InputId, KeyCode, SynchronizationCode,
    SynchronizationEvent, UInputCode, UinputAbsSetup,
};
use nix::fcntl::{FcntlArg, OFlag};

use super::{BusDevice, BusError, FeedbackEvent, VirtualBus};
use crate::config::DeviceDescriptor;
use crate::report::{xusb::XusbReport, X360Button};

/// Path of the uinput control node
const UINPUT_PATH: &str = "/dev/uinput";

/// Maximum number of force feedback effects a pad can hold at once
const FF_EFFECTS_MAX: u16 = 16;

/// A connection to the kernel uinput facility
pub struct UinputBus {
    next_slot: AtomicU8,
}

impl UinputBus {
    /// Opens the uinput control node to verify the driver is present and
    /// accessible. Devices are not created until [VirtualBus::attach].
    pub fn open() -> Result<Self, BusError> {
        if let Err(e) = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(UINPUT_PATH)
        {
            return Err(BusError::DriverUnavailable(format!("{UINPUT_PATH}: {e}")));
        }
        log::debug!("Opened uinput bus at {UINPUT_PATH}");
        Ok(Self {
            next_slot: AtomicU8::new(1),
        })
    }
}

impl VirtualBus for UinputBus {
    fn name(&self) -> &'static str {
        "uinput"
    }

    fn attach(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn BusDevice>, BusError> {
        let device = create_virtual_device(descriptor)
            .map_err(|e| BusError::ConnectionRefused(e.to_string()))?;
        let slot = self.next_slot.fetch_add(1, Ordering::SeqCst);
        log::debug!("Attached virtual pad '{}' in slot {slot}", descriptor.name);
        Ok(Box::new(UinputPad {
            device,
            slot,
            effects: HashMap::new(),
            free_effect_ids: (0..FF_EFFECTS_MAX as i16).collect(),
        }))
    }
}

/// One virtual pad backed by a uinput device node
pub struct UinputPad {
    device: VirtualDevice,
    slot: u8,
    /// Effects uploaded by the host, by effect id
    effects: HashMap<i16, FFEffectData>,
    free_effect_ids: BTreeSet<i16>,
}

impl BusDevice for UinputPad {
    fn slot(&self) -> u8 {
        self.slot
    }

    fn write_report(&mut self, report: &XusbReport) -> Result<(), BusError> {
        let events = translate_report(report);
        self.device.emit(events.as_slice())?;
        self.device
            .emit(&[SynchronizationEvent::new(SynchronizationCode::SYN_REPORT, 0).into()])?;
        Ok(())
    }

    fn poll_feedback(&mut self) -> Result<Vec<FeedbackEvent>, BusError> {
        let events = match self.device.fetch_events() {
            Ok(events) => events.collect(),
            Err(err) => match err.kind() {
                // Do nothing if this would block
                io::ErrorKind::WouldBlock => vec![],
                _ => return Err(err.into()),
            },
        };

        const STOPPED: i32 = FFStatusCode::FF_STATUS_STOPPED.0 as i32;
        const PLAYING: i32 = FFStatusCode::FF_STATUS_PLAYING.0 as i32;

        let mut feedback = Vec::new();
        for event in events {
            match event.destructure() {
                EventSummary::UInput(event, UInputCode::UI_FF_UPLOAD, ..) => {
                    let mut event = self.device.process_ff_upload(event)?;
                    let Some(id) = self.free_effect_ids.iter().next().copied() else {
                        log::warn!("No free effect slots for FF upload");
                        event.set_retval(-1);
                        continue;
                    };
                    self.free_effect_ids.remove(&id);
                    log::debug!("Upload effect: {:?} with id {id}", event.effect());
                    self.effects.insert(id, event.effect());
                    event.set_effect_id(id);
                    event.set_retval(0);
                }
                EventSummary::UInput(event, UInputCode::UI_FF_ERASE, ..) => {
                    let event = self.device.process_ff_erase(event)?;
                    let id = event.effect_id() as i16;
                    log::debug!("Erase effect: {id}");
                    self.effects.remove(&id);
                    self.free_effect_ids.insert(id);
                }
                EventSummary::ForceFeedback(.., effect_id, PLAYING) => {
                    log::debug!("Playing effect ID: {}", effect_id.0);
                    if let Some(event) = self.rumble_feedback(effect_id) {
                        feedback.push(event);
                    }
                }
                EventSummary::ForceFeedback(.., effect_id, STOPPED) => {
                    log::debug!("Stopped effect ID: {}", effect_id.0);
                    feedback.push(FeedbackEvent {
                        large_motor: 0,
                        small_motor: 0,
                        led_number: self.slot,
                    });
                }
                _ => {
                    log::trace!("Unhandled event: {event:?}");
                }
            }
        }

        Ok(feedback)
    }

    fn detach(&mut self) -> Result<(), BusError> {
        // The device node is destroyed when the uinput handle drops.
        log::debug!("Detached virtual pad in slot {}", self.slot);
        self.effects.clear();
        Ok(())
    }
}

impl UinputPad {
    /// Translates a playing rumble effect into motor intensities
    fn rumble_feedback(&self, effect_id: FFEffectCode) -> Option<FeedbackEvent> {
        let Some(effect) = self.effects.get(&(effect_id.0 as i16)) else {
            log::debug!("Play request for unknown effect ID: {}", effect_id.0);
            return None;
        };
        match effect.kind {
            FFEffectKind::Rumble {
                strong_magnitude,
                weak_magnitude,
            } => Some(FeedbackEvent {
                large_motor: (strong_magnitude >> 8) as u8,
                small_motor: (weak_magnitude >> 8) as u8,
                led_number: self.slot,
            }),
            _ => {
                log::debug!("Ignoring non-rumble effect ID: {}", effect_id.0);
                None
            }
        }
    }
}

/// Creates the uinput device that emulates the pad
fn create_virtual_device(descriptor: &DeviceDescriptor) -> io::Result<VirtualDevice> {
    // Setup Key inputs
    let mut keys = AttributeSet::<KeyCode>::new();
    keys.insert(KeyCode::BTN_SOUTH);
    keys.insert(KeyCode::BTN_EAST);
    keys.insert(KeyCode::BTN_NORTH);
    keys.insert(KeyCode::BTN_WEST);
    keys.insert(KeyCode::BTN_TL);
    keys.insert(KeyCode::BTN_TR);
    keys.insert(KeyCode::BTN_SELECT);
    keys.insert(KeyCode::BTN_START);
    keys.insert(KeyCode::BTN_MODE);
    keys.insert(KeyCode::BTN_THUMBL);
    keys.insert(KeyCode::BTN_THUMBR);

    // Setup ABS inputs
    let joystick_setup = AbsInfo::new(0, -32768, 32767, 16, 128, 1);
    let abs_x = UinputAbsSetup::new(AbsoluteAxisCode::ABS_X, joystick_setup);
    let abs_y = UinputAbsSetup::new(AbsoluteAxisCode::ABS_Y, joystick_setup);
    let abs_rx = UinputAbsSetup::new(AbsoluteAxisCode::ABS_RX, joystick_setup);
    let abs_ry = UinputAbsSetup::new(AbsoluteAxisCode::ABS_RY, joystick_setup);
    let triggers_setup = AbsInfo::new(0, 0, 255, 0, 0, 1);
    let abs_z = UinputAbsSetup::new(AbsoluteAxisCode::ABS_Z, triggers_setup);
    let abs_rz = UinputAbsSetup::new(AbsoluteAxisCode::ABS_RZ, triggers_setup);
    let dpad_setup = AbsInfo::new(0, -1, 1, 0, 0, 1);
    let abs_hat0x = UinputAbsSetup::new(AbsoluteAxisCode::ABS_HAT0X, dpad_setup);
    let abs_hat0y = UinputAbsSetup::new(AbsoluteAxisCode::ABS_HAT0Y, dpad_setup);

    // Setup Force Feedback
    let mut ff = AttributeSet::<FFEffectCode>::new();
    ff.insert(FFEffectCode::FF_RUMBLE);

    // Identify to the kernel as a USB gamepad
    let id = InputId::new(
        BusType(3),
        descriptor.vendor_id,
        descriptor.product_id,
        descriptor.version,
    );

    // Build the device
    let device = VirtualDeviceBuilder::new()?
        .name(descriptor.name.as_str())
        .input_id(id)
        .with_keys(&keys)?
        .with_absolute_axis(&abs_x)?
        .with_absolute_axis(&abs_y)?
        .with_absolute_axis(&abs_rx)?
        .with_absolute_axis(&abs_ry)?
        .with_absolute_axis(&abs_z)?
        .with_absolute_axis(&abs_rz)?
        .with_absolute_axis(&abs_hat0x)?
        .with_absolute_axis(&abs_hat0y)?
        .with_ff(&ff)?
        .with_ff_effects_max(FF_EFFECTS_MAX.into())
        .build()?;

    // Set the device to do non-blocking reads
    let raw_fd = device.as_raw_fd();
    nix::fcntl::fcntl(raw_fd, FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).map_err(io::Error::from)?;

    Ok(device)
}

/// Translates the full report state into evdev key/abs events. The report
/// is absolute state, so every field is emitted on every write.
fn translate_report(report: &XusbReport) -> Vec<InputEvent> {
    let buttons = X360Button::from_bits_truncate(report.buttons);
    let key = |code: KeyCode, flag: X360Button| {
        InputEvent::new(EventType::KEY.0, code.0, buttons.contains(flag) as i32)
    };
    let abs = |code: AbsoluteAxisCode, value: i32| {
        InputEvent::new(EventType::ABSOLUTE.0, code.0, value)
    };

    let hat0x = if buttons.contains(X360Button::DPAD_LEFT) {
        -1
    } else if buttons.contains(X360Button::DPAD_RIGHT) {
        1
    } else {
        0
    };
    let hat0y = if buttons.contains(X360Button::DPAD_UP) {
        -1
    } else if buttons.contains(X360Button::DPAD_DOWN) {
        1
    } else {
        0
    };

    vec![
        key(KeyCode::BTN_SOUTH, X360Button::A),
        key(KeyCode::BTN_EAST, X360Button::B),
        key(KeyCode::BTN_NORTH, X360Button::X),
        key(KeyCode::BTN_WEST, X360Button::Y),
        key(KeyCode::BTN_TL, X360Button::LEFT_SHOULDER),
        key(KeyCode::BTN_TR, X360Button::RIGHT_SHOULDER),
        key(KeyCode::BTN_SELECT, X360Button::BACK),
        key(KeyCode::BTN_START, X360Button::START),
        key(KeyCode::BTN_MODE, X360Button::GUIDE),
        key(KeyCode::BTN_THUMBL, X360Button::LEFT_THUMB),
        key(KeyCode::BTN_THUMBR, X360Button::RIGHT_THUMB),
        abs(AbsoluteAxisCode::ABS_X, report.thumb_lx as i32),
        // The kernel convention points stick Y down; XUSB points it up
        abs(AbsoluteAxisCode::ABS_Y, (!report.thumb_ly) as i32),
        abs(AbsoluteAxisCode::ABS_RX, report.thumb_rx as i32),
        abs(AbsoluteAxisCode::ABS_RY, (!report.thumb_ry) as i32),
        abs(AbsoluteAxisCode::ABS_Z, report.left_trigger as i32),
        abs(AbsoluteAxisCode::ABS_RZ, report.right_trigger as i32),
        abs(AbsoluteAxisCode::ABS_HAT0X, hat0x),
        abs(AbsoluteAxisCode::ABS_HAT0Y, hat0y),
    ]
}
