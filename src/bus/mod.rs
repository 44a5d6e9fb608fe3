//! The virtual bus boundary. A [VirtualBus] registers emulated pads with a
//! driver backend and hands back a [BusDevice] for report I/O. The
//! production backend is [uinput::UinputBus]; [mock::MockBus] keeps
//! everything in memory for tests and environments without uinput access.

use std::io;

use thiserror::Error;

use crate::config::DeviceDescriptor;
use crate::report::xusb::XusbReport;

pub mod mock;
pub mod uinput;

/// Possible errors talking to a virtual bus driver
#[derive(Debug, Error)]
pub enum BusError {
    #[error("virtual bus driver unavailable: {0}")]
    DriverUnavailable(String),
    #[error("bus driver refused device registration: {0}")]
    ConnectionRefused(String),
    #[error("bus i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Rumble and LED state pushed from the driver back to the client. Events
/// are constructed by the bus backend on receipt of host-side feedback and
/// handed to the registered callback; they are not retained after delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackEvent {
    /// Intensity of the large (low frequency) motor
    pub large_motor: u8,
    /// Intensity of the small (high frequency) motor
    pub small_motor: u8,
    /// Player slot indicated by the LED ring
    pub led_number: u8,
}

/// A connection to a virtual gamepad bus driver. One bus may back any
/// number of devices concurrently.
pub trait VirtualBus: Send + Sync {
    /// Short identifier of the backend, used in log messages
    fn name(&self) -> &'static str;

    /// Registers a new emulated pad with the driver
    fn attach(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn BusDevice>, BusError>;
}

/// One registered pad on a [VirtualBus]
pub trait BusDevice: Send {
    /// Player slot the bus assigned to this device at attach time
    fn slot(&self) -> u8;

    /// Writes one input report as the device's current state. Reports reach
    /// the driver in call order; no batching or coalescing.
    fn write_report(&mut self, report: &XusbReport) -> Result<(), BusError>;

    /// Drains feedback pushed by the driver since the last poll, oldest
    /// first. Returns an empty vec when nothing is pending.
    fn poll_feedback(&mut self) -> Result<Vec<FeedbackEvent>, BusError>;

    /// Unregisters the device from the driver
    fn detach(&mut self) -> Result<(), BusError>;
}
