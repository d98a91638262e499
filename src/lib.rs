//! Translates the state of an XInput-style game controller into the view
//! expected by applications written against an older generic gamepad API:
//! caller-described data packets, capability and object queries, per-axis
//! range/deadzone/saturation properties, immediate state snapshots, and a
//! buffered event stream.
//!
//! The crate is the translation core only. A platform wrapper forwards
//! legacy API calls into [controller::virtual_device::VirtualController];
//! anything that can poll a controller and queue change events implements
//! [xinput::XInputSource].

pub mod config;
pub mod controller;
pub mod dataformat;
pub mod xinput;

pub use controller::mapper::{Mapper, MapperKind};
pub use controller::virtual_device::VirtualController;
pub use controller::DeviceError;
