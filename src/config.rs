//! Identity of the emulated pad as presented to the host.
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Possible errors loading a [DeviceDescriptor]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// Describes the device a [VirtualBus](crate::bus::VirtualBus) registers
/// with the host. Defaults to the identity of an Xbox 360 wireless pad.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "snake_case", default)]
pub struct DeviceDescriptor {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
}

impl Default for DeviceDescriptor {
    fn default() -> Self {
        Self {
            name: "Xbox 360 Wireless Receiver (XBOX)".to_string(),
            vendor_id: 0x045e,
            product_id: 0x028e,
            version: 0x0110,
        }
    }
}

impl DeviceDescriptor {
    /// Load a [DeviceDescriptor] from the given YAML string
    pub fn from_yaml(content: String) -> Result<DeviceDescriptor, LoadError> {
        let descriptor: DeviceDescriptor = serde_yaml::from_str(content.as_str())?;
        Ok(descriptor)
    }

    /// Load a [DeviceDescriptor] from the given YAML file
    pub fn from_yaml_file(path: String) -> Result<DeviceDescriptor, LoadError> {
        let file = std::fs::File::open(path)?;
        let descriptor: DeviceDescriptor = serde_yaml::from_reader(file)?;
        Ok(descriptor)
    }
}
