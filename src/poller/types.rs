use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{MeterConfig, PointConfig};
use crate::utils::error::PollError;

/// Cooperative cancellation signal. Writers call [`CancelFlag::cancel`];
/// the poll loop only reads it, at device and point boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Key of one fleet error table entry.
///
/// Point reads fail under their composite key; failures that take down a
/// whole device for the cycle (connect refused, descriptor defect) are
/// recorded once under the device's address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKey {
    Point {
        uuid: String,
        address: String,
        point: String,
        register: u16,
    },
    Device {
        address: String,
    },
}

impl ErrorKey {
    pub fn point(meter: &MeterConfig, point: &PointConfig) -> Self {
        ErrorKey::Point {
            uuid: meter.uuid.clone(),
            address: meter.address.clone(),
            point: point.name.clone(),
            register: point.register,
        }
    }

    pub fn device(address: &str) -> Self {
        ErrorKey::Device {
            address: address.to_string(),
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKey::Point {
                uuid,
                address,
                point,
                register,
            } => write!(f, "{} {} {} {}", uuid, address, point, register),
            ErrorKey::Device { address } => write!(f, "{}", address),
        }
    }
}

/// One recorded read failure.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFailure {
    pub key: ErrorKey,
    pub error: PollError,
}

/// Decoded values of one device for one cycle. Points whose read or decode
/// failed are absent, never zero-filled.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceResult {
    pub uuid: String,
    pub measure_name: String,
    pub timestamp: DateTime<Utc>,
    pub points: HashMap<String, f64>,
}

impl DeviceResult {
    pub(crate) fn new(uuid: &str, measure_name: &str) -> Self {
        Self {
            uuid: uuid.to_string(),
            measure_name: measure_name.to_string(),
            timestamp: Utc::now(),
            points: HashMap::new(),
        }
    }
}

/// Outcome of reading one device: the values that decoded cleanly plus
/// every failure recorded along the way.
#[derive(Debug)]
pub struct DeviceRead {
    pub result: DeviceResult,
    pub failures: Vec<PointFailure>,
}
