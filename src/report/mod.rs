//! Input report construction for the virtual Xbox 360 pad.
//!
//! An [X360Report] holds one frame of controller state. Callers mutate it
//! through the setter methods and hand it to
//! [Xbox360Controller::send_report](crate::controller::Xbox360Controller::send_report),
//! which packs it into the fixed-layout [xusb::XusbReport] wire structure.

use bitflags::bitflags;
use thiserror::Error;

pub mod xusb;
#[cfg(test)]
pub mod xusb_test;

bitflags! {
    /// Button bitmask of the Xbox 360 pad, in XUSB bit order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct X360Button: u16 {
        const DPAD_UP = 0x0001;
        const DPAD_DOWN = 0x0002;
        const DPAD_LEFT = 0x0004;
        const DPAD_RIGHT = 0x0008;
        const START = 0x0010;
        const BACK = 0x0020;
        const LEFT_THUMB = 0x0040;
        const RIGHT_THUMB = 0x0080;
        const LEFT_SHOULDER = 0x0100;
        const RIGHT_SHOULDER = 0x0200;
        const GUIDE = 0x0400;
        const A = 0x1000;
        const B = 0x2000;
        const X = 0x4000;
        const Y = 0x8000;
    }
}

/// Analog fields of the report that can be written with [X360Report::set_axis]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    LeftThumbX,
    LeftThumbY,
    RightThumbX,
    RightThumbY,
    LeftTrigger,
    RightTrigger,
}

impl Axis {
    /// Returns the declared (min, max) range of the axis field
    pub fn range(&self) -> (i32, i32) {
        match self {
            Axis::LeftThumbX | Axis::LeftThumbY | Axis::RightThumbX | Axis::RightThumbY => {
                (i16::MIN as i32, i16::MAX as i32)
            }
            Axis::LeftTrigger | Axis::RightTrigger => (0, u8::MAX as i32),
        }
    }
}

/// Possible errors building a report
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("value {value} for {axis:?} is outside the axis range {min}..={max}")]
    OutOfRange {
        axis: Axis,
        value: i32,
        min: i32,
        max: i32,
    },
}

/// One frame of input state for a virtual Xbox 360 pad. All fields start
/// out neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct X360Report {
    buttons: X360Button,
    thumb_lx: i16,
    thumb_ly: i16,
    thumb_rx: i16,
    thumb_ry: i16,
    left_trigger: u8,
    right_trigger: u8,
}

impl X360Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// ORs the given flags into the button bitmask. Previously set flags
    /// stay set until [X360Report::clear_buttons] is called.
    pub fn set_buttons(&mut self, buttons: X360Button) {
        self.buttons |= buttons;
    }

    /// Resets the button bitmask to all-released
    pub fn clear_buttons(&mut self) {
        self.buttons = X360Button::empty();
    }

    /// Returns the current button bitmask
    pub fn buttons(&self) -> X360Button {
        self.buttons
    }

    /// Writes one analog field. The value must fit the declared bit width
    /// and signedness of the axis; out-of-range values are rejected and
    /// leave the field unchanged.
    pub fn set_axis(&mut self, axis: Axis, value: i32) -> Result<(), ReportError> {
        let (min, max) = axis.range();
        if value < min || value > max {
            return Err(ReportError::OutOfRange {
                axis,
                value,
                min,
                max,
            });
        }
        match axis {
            Axis::LeftThumbX => self.thumb_lx = value as i16,
            Axis::LeftThumbY => self.thumb_ly = value as i16,
            Axis::RightThumbX => self.thumb_rx = value as i16,
            Axis::RightThumbY => self.thumb_ry = value as i16,
            Axis::LeftTrigger => self.left_trigger = value as u8,
            Axis::RightTrigger => self.right_trigger = value as u8,
        }
        Ok(())
    }

    /// Reads back one analog field
    pub fn axis(&self, axis: Axis) -> i32 {
        match axis {
            Axis::LeftThumbX => self.thumb_lx as i32,
            Axis::LeftThumbY => self.thumb_ly as i32,
            Axis::RightThumbX => self.thumb_rx as i32,
            Axis::RightThumbY => self.thumb_ry as i32,
            Axis::LeftTrigger => self.left_trigger as i32,
            Axis::RightTrigger => self.right_trigger as i32,
        }
    }
}
