// ============================================================
// Layer 6 — Devices and Device Maps
// ============================================================
// Where the model runs. Devices are written as strings in the
// configuration so they survive a round trip through JSON:
//
//   "cpu", "cpu:0"         → Device::Cpu
//   "gpu:1", "cuda:1"      → Device::Gpu(1)
//   "gpu", "cuda"          → Device::Gpu(0)
//
// A device map says where each part of the model lives:
//
//   "auto"                       → let the backend pick
//   "cpu"                        → everything on one device
//   {"encoder": "gpu:0", ...}    → per-module placement
//
// The burn backends used here run a model on a single device,
// so a multi-entry map is resolved to its first entry.
//
// Reference: Rust Book §10 (Traits: FromStr, Display)

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::ReaderError;

/// A single compute device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    #[default]
    Cpu,
    Gpu(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu        => write!(f, "cpu"),
            Device::Gpu(index) => write!(f, "gpu:{index}"),
        }
    }
}

impl FromStr for Device {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let (kind, index) = match s.split_once(':') {
            Some((kind, index)) => {
                let index = index.parse::<usize>().map_err(|_| {
                    ReaderError::InvalidConfig(format!("invalid device index in '{s}'"))
                })?;
                (kind.to_string(), index)
            }
            None => (s.clone(), 0),
        };

        match kind.as_str() {
            "cpu"          => Ok(Device::Cpu),
            "gpu" | "cuda" => Ok(Device::Gpu(index)),
            _ => Err(ReaderError::InvalidConfig(format!(
                "unknown device '{s}', expected cpu, gpu:N or cuda:N"
            ))),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = ReaderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

/// Module name → device
pub type DeviceMap = BTreeMap<String, Device>;

/// The `device_map` model argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum DeviceMapSetting {
    Auto,
    Single(Device),
    Map(DeviceMap),
}

impl DeviceMapSetting {
    /// The device to run on; None means the backend default
    pub fn first_device(&self) -> Option<Device> {
        match self {
            DeviceMapSetting::Auto        => None,
            DeviceMapSetting::Single(d)   => Some(*d),
            DeviceMapSetting::Map(map)    => map.values().next().copied(),
        }
    }
}

impl TryFrom<Value> for DeviceMapSetting {
    type Error = ReaderError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) if s.eq_ignore_ascii_case("auto") => Ok(DeviceMapSetting::Auto),
            Value::String(s) => Ok(DeviceMapSetting::Single(s.parse()?)),
            Value::Object(entries) => {
                let mut map = DeviceMap::new();
                for (name, device) in entries {
                    let device = device.as_str().ok_or_else(|| {
                        ReaderError::InvalidConfig(format!("device for '{name}' must be a string"))
                    })?;
                    map.insert(name, device.parse()?);
                }
                Ok(DeviceMapSetting::Map(map))
            }
            other => Err(ReaderError::InvalidConfig(format!(
                "device_map must be \"auto\", a device string or an object, got {other}"
            ))),
        }
    }
}

impl From<DeviceMapSetting> for Value {
    fn from(setting: DeviceMapSetting) -> Self {
        match setting {
            DeviceMapSetting::Auto      => Value::String("auto".to_string()),
            DeviceMapSetting::Single(d) => Value::String(d.to_string()),
            DeviceMapSetting::Map(map)  => Value::Object(
                map.into_iter()
                    .map(|(name, device)| (name, Value::String(device.to_string())))
                    .collect(),
            ),
        }
    }
}
