//! Process-wide session with a virtual bus driver.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bus::{uinput::UinputBus, BusDevice, VirtualBus};
use crate::config::DeviceDescriptor;
use crate::error::Error;

struct ClientInner {
    bus: Box<dyn VirtualBus>,
    open: AtomicBool,
}

/// A handle onto an open virtual bus session. Controllers are constructed
/// against a [Client] and share ownership of the session state, so the
/// session outlives every controller bound to it. Cloning is cheap.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Opens a session with the default uinput bus. Fails with
    /// [BusError::DriverUnavailable](crate::bus::BusError::DriverUnavailable)
    /// when the uinput driver is missing or inaccessible.
    pub fn open() -> Result<Client, Error> {
        Ok(Self::with_bus(Box::new(UinputBus::open()?)))
    }

    /// Opens a session backed by the given bus implementation
    pub fn with_bus(bus: Box<dyn VirtualBus>) -> Client {
        log::debug!("Opened client on '{}' bus", bus.name());
        Client {
            inner: Arc::new(ClientInner {
                bus,
                open: AtomicBool::new(true),
            }),
        }
    }

    /// Returns whether the session is still open
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Closes the session. Idempotent; safe to call with controllers still
    /// constructed against the handle, which all become invalid.
    pub fn close(&self) {
        if self.inner.open.swap(false, Ordering::SeqCst) {
            log::debug!("Closed client on '{}' bus", self.inner.bus.name());
        }
    }

    /// Registers a device on the underlying bus
    pub(crate) fn attach(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn BusDevice>, Error> {
        if !self.is_open() {
            return Err(Error::InvalidHandle);
        }
        Ok(self.inner.bus.attach(descriptor)?)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("bus", &self.inner.bus.name())
            .field("open", &self.is_open())
            .finish()
    }
}
