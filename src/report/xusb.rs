//! Fixed-layout XUSB input report, the structure handed across the bus
//! boundary. The layout matches the XINPUT_GAMEPAD structure exposed by
//! Xbox 360 class drivers.
use packed_struct::prelude::*;

use super::{Axis, X360Report};

/// Size of a packed [XusbReport] in bytes
pub const XUSB_REPORT_SIZE: usize = 12;

//No input
//buttons: 0x0000 | lt:   0 | rt:   0 | lx:      0 | ly:      0 | rx:      0 | ry:      0
//00 00 00 00 00 00 00 00 00 00 00 00

//A + B, both triggers held
//buttons: 0x3000 | lt: 255 | rt: 255 | lx:      0 | ly:      0 | rx:      0 | ry:      0
//00 30 ff ff 00 00 00 00 00 00 00 00

/// XUSB input data report
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct XusbReport {
    // BYTES 0-1
    #[packed_field(bytes = "0..=1", endian = "lsb")]
    pub buttons: u16,
    // BYTE 2
    #[packed_field(bytes = "2")]
    pub left_trigger: u8,
    // BYTE 3
    #[packed_field(bytes = "3")]
    pub right_trigger: u8,

    // Axes
    // BYTES 4-5
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub thumb_lx: i16,
    // BYTES 6-7
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub thumb_ly: i16,
    // BYTES 8-9
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub thumb_rx: i16,
    // BYTES 10-11
    #[packed_field(bytes = "10..=11", endian = "lsb")]
    pub thumb_ry: i16,
}

impl Default for XusbReport {
    fn default() -> Self {
        Self {
            buttons: Default::default(),
            left_trigger: Default::default(),
            right_trigger: Default::default(),
            thumb_lx: Default::default(),
            thumb_ly: Default::default(),
            thumb_rx: Default::default(),
            thumb_ry: Default::default(),
        }
    }
}

impl From<&X360Report> for XusbReport {
    fn from(report: &X360Report) -> Self {
        Self {
            buttons: report.buttons().bits(),
            left_trigger: report.axis(Axis::LeftTrigger) as u8,
            right_trigger: report.axis(Axis::RightTrigger) as u8,
            thumb_lx: report.axis(Axis::LeftThumbX) as i16,
            thumb_ly: report.axis(Axis::LeftThumbY) as i16,
            thumb_rx: report.axis(Axis::RightThumbX) as i16,
            thumb_ry: report.axis(Axis::RightThumbY) as i16,
        }
    }
}
