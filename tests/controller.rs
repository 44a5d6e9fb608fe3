use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::time::{sleep, Duration};

use padbus::bus::mock::MockBus;
use padbus::bus::BusError;
use padbus::report::Axis;
use padbus::{Client, FeedbackEvent, X360Button, X360Report, Xbox360Controller};

fn mock_client() -> (Client, padbus::bus::mock::MockBusHandle) {
    let bus = MockBus::new();
    let handle = bus.handle();
    (Client::with_bus(Box::new(bus)), handle)
}

#[tokio::test]
async fn test_send_before_connect_fails() -> Result<(), Box<dyn Error>> {
    let (client, handle) = mock_client();
    let pad = Xbox360Controller::new(&client)?;

    let result = pad.send_report(&X360Report::new());
    assert!(
        matches!(result, Err(padbus::Error::NotConnected)),
        "send before connect should fail NotConnected, got {result:?}"
    );
    assert_eq!(
        handle.report_count(1),
        0,
        "nothing should reach the bus before connect"
    );

    Ok(())
}

#[tokio::test]
async fn test_connect_twice_fails() -> Result<(), Box<dyn Error>> {
    let (client, _handle) = mock_client();
    let mut pad = Xbox360Controller::new(&client)?;

    pad.connect().await?;
    let result = pad.connect().await;
    assert!(
        matches!(result, Err(padbus::Error::AlreadyConnected)),
        "second connect should fail AlreadyConnected, got {result:?}"
    );
    assert!(pad.is_connected(), "controller should stay connected");
    pad.send_report(&X360Report::new())
        .expect("should still send after the failed connect");

    Ok(())
}

#[tokio::test]
async fn test_disconnect_is_idempotent() -> Result<(), Box<dyn Error>> {
    let (client, handle) = mock_client();
    let mut pad = Xbox360Controller::new(&client)?;

    // Disconnecting a never-connected controller is a no-op
    pad.disconnect().await;

    pad.connect().await?;
    assert!(handle.is_attached(1));

    pad.disconnect().await;
    assert!(!handle.is_attached(1));
    pad.disconnect().await;

    let result = pad.send_report(&X360Report::new());
    assert!(
        matches!(result, Err(padbus::Error::NotConnected)),
        "send after disconnect should fail NotConnected, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn test_report_reaches_bus() -> Result<(), Box<dyn Error>> {
    let (client, handle) = mock_client();
    let mut pad = Xbox360Controller::new(&client)?;
    pad.connect().await?;

    let mut report = X360Report::new();
    report.set_buttons(X360Button::A | X360Button::B);
    report.set_axis(Axis::LeftTrigger, 0xFF)?;
    report.set_axis(Axis::RightTrigger, 0xFF)?;
    pad.send_report(&report)?;

    let observed = handle.last_report(1).expect("bus should observe the report");
    assert_eq!(observed.buttons, (X360Button::A | X360Button::B).bits());
    assert_eq!(observed.left_trigger, 0xFF);
    assert_eq!(observed.right_trigger, 0xFF);
    assert_eq!(observed.thumb_lx, 0, "untouched fields stay neutral");
    assert_eq!(observed.thumb_ly, 0);
    assert_eq!(observed.thumb_rx, 0);
    assert_eq!(observed.thumb_ry, 0);

    Ok(())
}

#[tokio::test]
async fn test_reports_arrive_in_order() -> Result<(), Box<dyn Error>> {
    let (client, handle) = mock_client();
    let mut pad = Xbox360Controller::new(&client)?;
    pad.connect().await?;

    for value in 0..=10 {
        let mut report = X360Report::new();
        report.set_axis(Axis::LeftTrigger, value)?;
        pad.send_report(&report)?;
    }

    assert_eq!(handle.report_count(1), 11);
    let last = handle.last_report(1).expect("bus should observe reports");
    assert_eq!(last.left_trigger, 10, "reports should arrive in call order");

    Ok(())
}

#[tokio::test]
async fn test_feedback_delivery_is_fifo() -> Result<(), Box<dyn Error>> {
    let (client, handle) = mock_client();
    let mut pad = Xbox360Controller::new(&client)?;

    let received: Arc<Mutex<Vec<FeedbackEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    pad.on_feedback(move |event| {
        sink.lock().expect("collector poisoned").push(event);
    });

    pad.connect().await?;
    let slot = pad.slot().expect("connected controller has a slot");

    let events = [
        FeedbackEvent {
            large_motor: 255,
            small_motor: 0,
            led_number: slot,
        },
        FeedbackEvent {
            large_motor: 128,
            small_motor: 64,
            led_number: slot,
        },
        FeedbackEvent {
            large_motor: 0,
            small_motor: 0,
            led_number: slot,
        },
    ];
    for event in events {
        handle.push_feedback(slot, event);
    }

    // The poller task delivers asynchronously; wait for it to catch up
    let deadline = Instant::now() + std::time::Duration::from_secs(2);
    loop {
        if received.lock().expect("collector poisoned").len() >= events.len() {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "feedback was not delivered in time"
        );
        sleep(Duration::from_millis(5)).await;
    }
    let delivered = received.lock().expect("collector poisoned").clone();
    assert_eq!(
        delivered,
        events.to_vec(),
        "feedback should be delivered in FIFO order"
    );

    // No delivery once disconnected
    pad.disconnect().await;
    handle.push_feedback(
        slot,
        FeedbackEvent {
            large_motor: 1,
            small_motor: 1,
            led_number: slot,
        },
    );
    sleep(Duration::from_millis(50)).await;
    assert_eq!(
        received.lock().expect("collector poisoned").len(),
        events.len(),
        "no feedback should be delivered after disconnect"
    );

    Ok(())
}

#[tokio::test]
async fn test_bus_capacity_refuses_registration() -> Result<(), Box<dyn Error>> {
    let bus = MockBus::with_capacity(1);
    let client = Client::with_bus(Box::new(bus));

    let mut first = Xbox360Controller::new(&client)?;
    first.connect().await?;

    let mut second = Xbox360Controller::new(&client)?;
    let result = second.connect().await;
    assert!(
        matches!(
            result,
            Err(padbus::Error::Bus(BusError::ConnectionRefused(_)))
        ),
        "attach beyond capacity should be refused, got {result:?}"
    );

    // Freeing the slot lets the next registration through
    first.disconnect().await;
    second.connect().await?;

    Ok(())
}

#[tokio::test]
async fn test_closed_client_invalidates_controllers() -> Result<(), Box<dyn Error>> {
    let (client, _handle) = mock_client();
    let mut pad = Xbox360Controller::new(&client)?;
    pad.connect().await?;

    client.close();
    client.close();

    let result = pad.send_report(&X360Report::new());
    assert!(
        matches!(result, Err(padbus::Error::NotConnected)),
        "send on a closed client should fail, got {result:?}"
    );

    let result = Xbox360Controller::new(&client);
    assert!(
        matches!(result, Err(padbus::Error::InvalidHandle)),
        "construct on a closed client should fail InvalidHandle"
    );

    Ok(())
}
