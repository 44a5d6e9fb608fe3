//! padbus emulates Xbox 360 gamepads on Linux. A [Client] session opens a
//! virtual bus (uinput in production), controllers register against it, and
//! input reports built with [X360Report] are pushed to the host while
//! rumble/LED feedback flows back through a registered callback.
//!
//! ```no_run
//! use padbus::{Client, X360Button, X360Report, Xbox360Controller};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::open()?;
//! let mut pad = Xbox360Controller::new(&client)?;
//! pad.on_feedback(|fb| println!("LM: {}, SM: {}", fb.large_motor, fb.small_motor));
//! pad.connect().await?;
//!
//! let mut report = X360Report::new();
//! report.set_buttons(X360Button::A | X360Button::B);
//! pad.send_report(&report)?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod report;

pub use bus::FeedbackEvent;
pub use client::Client;
pub use config::DeviceDescriptor;
pub use controller::Xbox360Controller;
pub use error::Error;
pub use report::{Axis, ReportError, X360Button, X360Report};
