//! Modbus TCP Fleet Polling Library
//!
//! This library polls a fleet of remote measurement devices over Modbus TCP,
//! decodes raw register words into typed engineering values, and tracks
//! per-device/per-point health across poll cycles. Wire framing and transport
//! are delegated to the protocol client; the core here is read sequencing,
//! error classification and value decoding.

pub mod config;
pub mod modbus;
pub mod poller;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, Endian, MeterConfig, PointConfig, RegisterKind, ValueType};
pub use modbus::{decode_registers, encode_value, RegisterSession, SessionFactory, TcpSessionFactory};
pub use poller::{
    progress_string, CancelFlag, DeviceResult, ErrorKey, FleetPoller, PollState, ProgressSink,
};
pub use utils::error::PollError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
