use thiserror::Error;

use crate::bus::BusError;

/// Possible errors operating a client or controller. Every error is
/// terminal to the operation that raised it; nothing is retried
/// internally.
#[derive(Debug, Error)]
pub enum Error {
    /// The client handle backing the controller has been closed
    #[error("client handle is closed")]
    InvalidHandle,
    /// The controller is already connected to the bus
    #[error("controller is already connected")]
    AlreadyConnected,
    /// The operation requires a connected controller
    #[error("controller is not connected")]
    NotConnected,
    /// The bus driver reported a failure
    #[error(transparent)]
    Bus(#[from] BusError),
}
