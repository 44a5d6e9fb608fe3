use std::env;
use std::error::Error;

use padbus::report::Axis;
use padbus::{Client, DeviceDescriptor, X360Button, X360Report, Xbox360Controller};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::info!("Starting padbus v{}", VERSION);

    // Use the default Xbox 360 identity unless a descriptor file was given
    let descriptor = match env::var("PADBUS_DEVICE_CONFIG") {
        Ok(path) => {
            log::info!("Loading device descriptor from {path}");
            DeviceDescriptor::from_yaml_file(path)?
        }
        Err(_) => DeviceDescriptor::default(),
    };

    let client = Client::open()?;
    let mut pad = Xbox360Controller::with_descriptor(&client, descriptor)?;

    pad.on_feedback(|feedback| {
        println!(
            "LM: {}, SM: {}, LED: {}",
            feedback.large_motor, feedback.small_motor, feedback.led_number
        );
    });

    pad.connect().await?;
    log::info!("Controller connected in slot {:?}", pad.slot());

    let mut report = X360Report::new();
    report.set_buttons(X360Button::A | X360Button::B);
    report.set_axis(Axis::LeftTrigger, 0xFF)?;
    report.set_axis(Axis::RightTrigger, 0xFF)?;

    pad.send_report(&report)?;
    log::info!("Sent one report; waiting for feedback from the host");

    println!("Press ENTER to exit");
    let wait_for_enter = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
    });
    tokio::select! {
        _ = wait_for_enter => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received interrupt");
        }
    }

    pad.disconnect().await;
    client.close();
    log::info!("padbus stopped");

    Ok(())
}
