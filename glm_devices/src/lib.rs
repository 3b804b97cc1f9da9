//! # glm_devices: Logging and device targets for local GLM inference
//!
//! The glm_devices crate is a workspace member shared by the session, model and
//! llama.cpp crates.
//!
//! ## Features
//!
//! * Device targets (`cpu`, `cuda`, `cuda:N`, `metal`, `auto`) and their mapping
//!   onto llama.cpp layer offload
//! * Logging tools: rolling file logs plus a compact terminal layer

// Internal modules
mod device;
mod logging;

// Internal imports
#[allow(unused_imports)]
use anyhow::{anyhow, bail, Error, Result};
#[allow(unused_imports)]
use tracing::{debug, error, info, span, trace, warn, Level};

// Public exports
pub use self::{
    device::{DeviceParseError, DeviceTarget},
    logging::{LoggingConfig, LoggingConfigTrait},
};
