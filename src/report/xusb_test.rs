use packed_struct::prelude::*;

use crate::report::xusb::{XusbReport, XUSB_REPORT_SIZE};
use crate::report::{Axis, X360Button, X360Report};

#[test]
fn test_pack_neutral_report() {
    let report = XusbReport::default();
    let buf = report.pack().expect("should pack the report");
    assert_eq!(buf.len(), XUSB_REPORT_SIZE);
    assert_eq!(buf, [0u8; XUSB_REPORT_SIZE], "neutral report is all zeroes");
}

#[test]
fn test_pack_layout() {
    let report = XusbReport {
        buttons: (X360Button::A | X360Button::B).bits(),
        left_trigger: 0xFF,
        right_trigger: 0x7F,
        thumb_lx: -32768,
        thumb_ly: 32767,
        thumb_rx: 0x0102,
        thumb_ry: -2,
    };
    let buf = report.pack().expect("should pack the report");

    // Buttons are little-endian: A | B = 0x3000
    assert_eq!(&buf[0..2], &[0x00, 0x30]);
    assert_eq!(buf[2], 0xFF, "left trigger");
    assert_eq!(buf[3], 0x7F, "right trigger");
    assert_eq!(&buf[4..6], &[0x00, 0x80], "thumb_lx -32768");
    assert_eq!(&buf[6..8], &[0xFF, 0x7F], "thumb_ly 32767");
    assert_eq!(&buf[8..10], &[0x02, 0x01], "thumb_rx 0x0102");
    assert_eq!(&buf[10..12], &[0xFE, 0xFF], "thumb_ry -2");
}

#[test]
fn test_unpack_round_trip() {
    let report = XusbReport {
        buttons: X360Button::DPAD_LEFT.bits() | X360Button::START.bits(),
        left_trigger: 12,
        right_trigger: 200,
        thumb_lx: -1234,
        thumb_ly: 5678,
        thumb_rx: -32000,
        thumb_ry: 31000,
    };
    let buf = report.pack().expect("should pack the report");
    let decoded = XusbReport::unpack(&buf).expect("should unpack the report");
    assert_eq!(decoded, report);
}

#[test]
fn test_from_builder_report() {
    let mut report = X360Report::new();
    report.set_buttons(X360Button::A | X360Button::B);
    report
        .set_axis(Axis::LeftTrigger, 0xFF)
        .expect("value is in range");
    report
        .set_axis(Axis::RightTrigger, 0xFF)
        .expect("value is in range");

    let wire = XusbReport::from(&report);
    assert_eq!(wire.buttons, (X360Button::A | X360Button::B).bits());
    assert_eq!(wire.left_trigger, 0xFF);
    assert_eq!(wire.right_trigger, 0xFF);
    assert_eq!(wire.thumb_lx, 0);
    assert_eq!(wire.thumb_ly, 0);
    assert_eq!(wire.thumb_rx, 0);
    assert_eq!(wire.thumb_ry, 0);
}
