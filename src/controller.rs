//! Virtual Xbox 360 controller lifecycle and I/O.
//!
//! A controller is constructed against an open [Client] and starts out
//! Disconnected. [connect](Xbox360Controller::connect) registers the device
//! with the bus and spawns a blocking task that polls the bus for feedback
//! pushed by the host, delivering it to the callback registered with
//! [on_feedback](Xbox360Controller::on_feedback). The callback therefore
//! runs concurrently with the caller's own thread.
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;

use tokio::time::Duration;

use crate::bus::{BusDevice, BusError, FeedbackEvent};
use crate::client::Client;
use crate::config::DeviceDescriptor;
use crate::error::Error;
use crate::report::{xusb::XusbReport, X360Report};

/// How long to sleep before polling for feedback events.
const POLL_RATE: Duration = Duration::from_micros(1666);

type FeedbackHandler = Box<dyn FnMut(FeedbackEvent) + Send>;
type SharedDevice = Arc<Mutex<Box<dyn BusDevice>>>;

/// One emulated Xbox 360 pad
pub struct Xbox360Controller {
    client: Client,
    descriptor: DeviceDescriptor,
    device: Option<SharedDevice>,
    handler: Arc<Mutex<Option<FeedbackHandler>>>,
}

impl Xbox360Controller {
    /// Binds a new controller to the given client without touching the
    /// driver. Fails with [Error::InvalidHandle] when the client is closed.
    pub fn new(client: &Client) -> Result<Self, Error> {
        Self::with_descriptor(client, DeviceDescriptor::default())
    }

    /// Binds a new controller that will register with the given identity
    pub fn with_descriptor(client: &Client, descriptor: DeviceDescriptor) -> Result<Self, Error> {
        if !client.is_open() {
            return Err(Error::InvalidHandle);
        }
        Ok(Self {
            client: client.clone(),
            descriptor,
            device: None,
            handler: Arc::new(Mutex::new(None)),
        })
    }

    /// Registers a callback invoked for every [FeedbackEvent] the driver
    /// pushes while the controller is connected. A single callback is held
    /// at a time; registering again replaces the previous one. Delivery is
    /// FIFO per device and happens on a dedicated task, so the callback
    /// must not assume mutual exclusion with the caller's code.
    pub fn on_feedback<F>(&self, callback: F)
    where
        F: FnMut(FeedbackEvent) + Send + 'static,
    {
        let mut handler = self.handler.lock().expect("feedback handler poisoned");
        *handler = Some(Box::new(callback));
    }

    /// Registers the virtual device with the bus, transitioning
    /// Disconnected to Connected, and starts feedback delivery.
    pub async fn connect(&mut self) -> Result<(), Error> {
        if self.device.is_some() {
            return Err(Error::AlreadyConnected);
        }
        let device = self.client.attach(&self.descriptor)?;
        let slot = device.slot();
        log::debug!("Connected '{}' in slot {slot}", self.descriptor.name);

        // The device is shared between the send path and the feedback task
        let device: SharedDevice = Arc::new(Mutex::new(device));
        Self::spawn_feedback_task(device.clone(), self.handler.clone());
        self.device = Some(device);
        Ok(())
    }

    /// Unregisters the device, transitioning Connected to Disconnected.
    /// Idempotent; detach failures are logged rather than surfaced.
    pub async fn disconnect(&mut self) {
        let Some(device) = self.device.take() else {
            log::debug!("Controller is already disconnected");
            return;
        };
        match device.lock() {
            Ok(mut dev) => {
                let slot = dev.slot();
                if let Err(e) = dev.detach() {
                    log::warn!("Failed to detach device in slot {slot}: {e}");
                } else {
                    log::debug!("Disconnected '{}' from slot {slot}", self.descriptor.name);
                }
            }
            Err(e) => log::warn!("Failed to lock device for detach: {e}"),
        };
        // Dropping the last controller-side reference stops the feedback
        // task on its next poll.
    }

    /// Returns whether the controller is currently connected
    pub fn is_connected(&self) -> bool {
        self.device.is_some() && self.client.is_open()
    }

    /// Returns the player slot assigned by the bus while connected
    pub fn slot(&self) -> Option<u8> {
        let device = self.device.as_ref()?;
        let dev = device.lock().ok()?;
        Some(dev.slot())
    }

    /// Transmits one report as the device's current input state. The write
    /// is fire-and-forget; reports reach the bus in call order. Fails with
    /// [Error::NotConnected] unless the controller is connected and its
    /// client handle is still open.
    pub fn send_report(&self, report: &X360Report) -> Result<(), Error> {
        if !self.client.is_open() {
            return Err(Error::NotConnected);
        }
        let Some(device) = &self.device else {
            return Err(Error::NotConnected);
        };
        let wire = XusbReport::from(report);
        log::trace!("Sending report: {wire:?}");
        let mut dev = device.lock().map_err(|e| poisoned(&e))?;
        dev.write_report(&wire)?;
        Ok(())
    }

    /// Spawns the feedback polling task for a connected device
    fn spawn_feedback_task(device: SharedDevice, handler: Arc<Mutex<Option<FeedbackHandler>>>) {
        tokio::task::spawn_blocking(move || {
            loop {
                // Check to see if the controller still has a reference to
                // the device. If it does not, it has disconnected.
                let num_refs = Arc::strong_count(&device);
                if num_refs == 1 {
                    log::debug!("Controller disconnected. Stopping feedback task.");
                    break;
                }

                // Read any pending feedback
                if let Err(e) = Self::deliver_feedback(&device, &handler) {
                    log::warn!("Error processing feedback events: {e}");
                }

                // Sleep for the poll rate interval
                thread::sleep(POLL_RATE);
            }
        });
    }

    /// Drains feedback from the device and hands it to the registered
    /// callback, oldest first.
    fn deliver_feedback(
        device: &SharedDevice,
        handler: &Arc<Mutex<Option<FeedbackHandler>>>,
    ) -> Result<(), Error> {
        // Release the device lock before running the callback so it may
        // call back into the controller.
        let events = {
            let mut dev = device.lock().map_err(|e| poisoned(&e))?;
            dev.poll_feedback()?
        };
        if events.is_empty() {
            return Ok(());
        }

        let mut handler = handler.lock().map_err(|e| poisoned(&e))?;
        let Some(callback) = handler.as_mut() else {
            log::trace!("Dropping {} feedback events with no handler", events.len());
            return Ok(());
        };
        for event in events {
            log::trace!("Delivering feedback: {event:?}");
            callback(event);
        }
        Ok(())
    }
}

fn poisoned<T>(err: &std::sync::PoisonError<T>) -> Error {
    Error::Bus(BusError::Io(io::Error::other(err.to_string())))
}
