//! In-memory virtual bus. Attached pads, written reports, and injected
//! feedback are all observable through a [MockBusHandle], which is what the
//! test suite asserts against in place of a live driver.
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::{BusDevice, BusError, FeedbackEvent, VirtualBus};
use crate::config::DeviceDescriptor;
use crate::report::xusb::XusbReport;

/// Driver-side state of one attached pad
#[derive(Debug, Default)]
struct PadState {
    attached: bool,
    reports: Vec<XusbReport>,
    pending_feedback: VecDeque<FeedbackEvent>,
}

#[derive(Debug, Default)]
struct MockState {
    next_slot: u8,
    pads: HashMap<u8, PadState>,
}

/// A virtual bus that records everything in memory
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
    capacity: usize,
}

impl MockBus {
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Creates a bus that refuses registrations beyond `capacity` attached
    /// devices, mimicking driver resource exhaustion.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            capacity,
        }
    }

    /// Returns a handle for observing and driving the bus state
    pub fn handle(&self) -> MockBusHandle {
        MockBusHandle {
            state: self.state.clone(),
        }
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualBus for MockBus {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn attach(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn BusDevice>, BusError> {
        let mut state = self.state.lock().expect("mock bus state poisoned");
        let attached = state.pads.values().filter(|p| p.attached).count();
        if attached >= self.capacity {
            return Err(BusError::ConnectionRefused(format!(
                "all {} device slots are in use",
                self.capacity
            )));
        }
        state.next_slot += 1;
        let slot = state.next_slot;
        state.pads.insert(
            slot,
            PadState {
                attached: true,
                ..Default::default()
            },
        );
        log::debug!("Attached mock pad '{}' in slot {slot}", descriptor.name);
        Ok(Box::new(MockPad {
            slot,
            state: self.state.clone(),
        }))
    }
}

/// One pad registered on a [MockBus]
pub struct MockPad {
    slot: u8,
    state: Arc<Mutex<MockState>>,
}

impl BusDevice for MockPad {
    fn slot(&self) -> u8 {
        self.slot
    }

    fn write_report(&mut self, report: &XusbReport) -> Result<(), BusError> {
        let mut state = self.state.lock().expect("mock bus state poisoned");
        let pad = state.pads.get_mut(&self.slot).expect("pad state exists");
        pad.reports.push(*report);
        Ok(())
    }

    fn poll_feedback(&mut self) -> Result<Vec<FeedbackEvent>, BusError> {
        let mut state = self.state.lock().expect("mock bus state poisoned");
        let pad = state.pads.get_mut(&self.slot).expect("pad state exists");
        Ok(pad.pending_feedback.drain(..).collect())
    }

    fn detach(&mut self) -> Result<(), BusError> {
        let mut state = self.state.lock().expect("mock bus state poisoned");
        let pad = state.pads.get_mut(&self.slot).expect("pad state exists");
        pad.attached = false;
        pad.pending_feedback.clear();
        Ok(())
    }
}

/// Observer/driver handle onto a [MockBus]
#[derive(Clone)]
pub struct MockBusHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockBusHandle {
    /// Returns whether the pad in the given slot is currently attached
    pub fn is_attached(&self, slot: u8) -> bool {
        let state = self.state.lock().expect("mock bus state poisoned");
        state.pads.get(&slot).map(|p| p.attached).unwrap_or(false)
    }

    /// Returns the most recent report written to the given slot
    pub fn last_report(&self, slot: u8) -> Option<XusbReport> {
        let state = self.state.lock().expect("mock bus state poisoned");
        state.pads.get(&slot).and_then(|p| p.reports.last().copied())
    }

    /// Returns how many reports the given slot has received
    pub fn report_count(&self, slot: u8) -> usize {
        let state = self.state.lock().expect("mock bus state poisoned");
        state.pads.get(&slot).map(|p| p.reports.len()).unwrap_or(0)
    }

    /// Queues a feedback event for delivery to the pad in the given slot,
    /// as the driver would on receipt of a host-side rumble/LED request.
    pub fn push_feedback(&self, slot: u8, event: FeedbackEvent) {
        let mut state = self.state.lock().expect("mock bus state poisoned");
        if let Some(pad) = state.pads.get_mut(&slot) {
            pad.pending_feedback.push_back(event);
        }
    }
}
