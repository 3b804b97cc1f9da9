use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Number of layers requested from llama.cpp when offloading everything.
/// llama.cpp clamps it to the model's real layer count.
pub const ALL_LAYERS: u32 = 999;

/// Where inference runs.
///
/// Written as a plain string in config files: `cpu`, `cuda`, `cuda:1`, `metal`
/// or `auto`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceTarget {
    Cpu,
    /// CUDA device by ordinal.
    Cuda(u32),
    Metal,
    /// Let llama.cpp pick whatever accelerator it was built with.
    Auto,
}

impl Default for DeviceTarget {
    fn default() -> Self {
        DeviceTarget::Cuda(0)
    }
}

impl DeviceTarget {
    pub fn is_gpu(&self) -> bool {
        !matches!(self, DeviceTarget::Cpu)
    }

    /// Value for llama.cpp's `--n-gpu-layers`.
    pub fn gpu_layers(&self) -> u32 {
        match self {
            DeviceTarget::Cpu => 0,
            DeviceTarget::Cuda(_) | DeviceTarget::Metal | DeviceTarget::Auto => ALL_LAYERS,
        }
    }

    /// Value for `CUDA_VISIBLE_DEVICES`, if this target pins a CUDA device.
    pub fn cuda_visible_devices(&self) -> Option<String> {
        match self {
            DeviceTarget::Cuda(ordinal) => Some(ordinal.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device `{0}`; expected cpu, cuda, cuda:<ordinal>, metal or auto")]
pub struct DeviceParseError(pub String);

impl FromStr for DeviceTarget {
    type Err = DeviceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "cpu" => Ok(DeviceTarget::Cpu),
            "cuda" | "gpu" => Ok(DeviceTarget::Cuda(0)),
            "metal" | "mps" => Ok(DeviceTarget::Metal),
            "auto" => Ok(DeviceTarget::Auto),
            other => match other.strip_prefix("cuda:") {
                Some(ordinal) => ordinal
                    .parse::<u32>()
                    .map(DeviceTarget::Cuda)
                    .map_err(|_| DeviceParseError(s.to_owned())),
                None => Err(DeviceParseError(s.to_owned())),
            },
        }
    }
}

impl TryFrom<String> for DeviceTarget {
    type Error = DeviceParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceTarget> for String {
    fn from(value: DeviceTarget) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTarget::Cpu => write!(f, "cpu"),
            DeviceTarget::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
            DeviceTarget::Metal => write!(f, "metal"),
            DeviceTarget::Auto => write!(f, "auto"),
        }
    }
}
