use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

use crate::utils::error::PollError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Monitoring settings
    #[serde(default = "default_update_interval")]
    pub update_interval_seconds: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    // Fleet configuration
    pub meters: Vec<MeterConfig>,
}

/// One remote measurement device reachable over Modbus TCP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    pub uuid: String,                   // Device UUID, unique across the fleet
    pub address: String,                // host[:port], port defaults to 502
    pub slave_id: u8,                   // Modbus unit id behind the connection
    pub measure_name: String,           // Measurement class, e.g. "energy"
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub points: Vec<PointConfig>,       // Read in list order
}

/// One register read request and the recipe to decode its reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointConfig {
    pub name: String,
    pub register_type: RegisterKind,
    pub register: u16,
    pub size: u16,                      // Register words per read request
    #[serde(default = "default_scale")]
    pub scale: f64,
    pub data_type: ValueType,
    #[serde(default)]
    pub byte_order: Endian,
    #[serde(default)]
    pub word_order: Endian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterKind {
    Holding,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// Closed set of decodable register value types. Unknown tags are rejected
/// when the configuration is parsed, before any device is contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(rename = "16float")]
    Float16,
    #[serde(rename = "16int")]
    Int16,
    #[serde(rename = "16uint")]
    UInt16,
    #[serde(rename = "32float")]
    Float32,
    #[serde(rename = "32int")]
    Int32,
    #[serde(rename = "32uint")]
    UInt32,
    #[serde(rename = "64float")]
    Float64,
    #[serde(rename = "64int")]
    Int64,
    #[serde(rename = "64uint")]
    UInt64,
}

impl ValueType {
    /// Number of 16-bit register words the type occupies on the wire.
    pub fn word_count(self) -> u16 {
        match self {
            ValueType::Float16 | ValueType::Int16 | ValueType::UInt16 => 1,
            ValueType::Float32 | ValueType::Int32 | ValueType::UInt32 => 2,
            ValueType::Float64 | ValueType::Int64 | ValueType::UInt64 => 4,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ValueType::Float16 => "16float",
            ValueType::Int16 => "16int",
            ValueType::UInt16 => "16uint",
            ValueType::Float32 => "32float",
            ValueType::Int32 => "32int",
            ValueType::UInt32 => "32uint",
            ValueType::Float64 => "64float",
            ValueType::Int64 => "64int",
            ValueType::UInt64 => "64uint",
        };
        write!(f, "{}", tag)
    }
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterKind::Holding => write!(f, "holding"),
            RegisterKind::Input => write!(f, "input"),
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endian::Big => write!(f, "big"),
            Endian::Little => write!(f, "little"),
        }
    }
}

fn default_update_interval() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    2000
}

fn default_scale() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        let meters = vec![
            // Device 1: grid feed energy meter
            MeterConfig {
                uuid: Uuid::new_v4().to_string(),
                address: "192.168.1.50:502".to_string(),
                slave_id: 1,
                measure_name: "energy".to_string(),
                enabled: true,
                points: vec![
                    PointConfig {
                        name: "voltage_l1".to_string(),
                        register_type: RegisterKind::Holding,
                        register: 0,
                        size: 2,
                        scale: 1.0,
                        data_type: ValueType::Float32,
                        byte_order: Endian::Big,
                        word_order: Endian::Big,
                    },
                    PointConfig {
                        name: "current_l1".to_string(),
                        register_type: RegisterKind::Holding,
                        register: 6,
                        size: 2,
                        scale: 1.0,
                        data_type: ValueType::Float32,
                        byte_order: Endian::Big,
                        word_order: Endian::Big,
                    },
                    PointConfig {
                        name: "frequency".to_string(),
                        register_type: RegisterKind::Holding,
                        register: 70,
                        size: 1,
                        scale: 0.01,
                        data_type: ValueType::UInt16,
                        byte_order: Endian::Big,
                        word_order: Endian::Big,
                    },
                    PointConfig {
                        name: "energy_active_total".to_string(),
                        register_type: RegisterKind::Holding,
                        register: 342,
                        size: 4,
                        scale: 0.001,
                        data_type: ValueType::UInt64,
                        byte_order: Endian::Big,
                        word_order: Endian::Little,
                    },
                ],
            },
            // Device 2: pump skid flow meter
            MeterConfig {
                uuid: Uuid::new_v4().to_string(),
                address: "192.168.1.60".to_string(),
                slave_id: 3,
                measure_name: "flow".to_string(),
                enabled: true,
                points: vec![
                    PointConfig {
                        name: "mass_flow_rate".to_string(),
                        register_type: RegisterKind::Input,
                        register: 245,
                        size: 2,
                        scale: 1.0,
                        data_type: ValueType::Float32,
                        byte_order: Endian::Big,
                        word_order: Endian::Big,
                    },
                    PointConfig {
                        name: "temperature".to_string(),
                        register_type: RegisterKind::Input,
                        register: 249,
                        size: 2,
                        scale: 1.0,
                        data_type: ValueType::Float32,
                        byte_order: Endian::Big,
                        word_order: Endian::Big,
                    },
                    PointConfig {
                        name: "volume_total".to_string(),
                        register_type: RegisterKind::Input,
                        register: 260,
                        size: 4,
                        scale: 1.0,
                        data_type: ValueType::Float64,
                        byte_order: Endian::Big,
                        word_order: Endian::Little,
                    },
                ],
            },
        ];

        Self {
            update_interval_seconds: default_update_interval(),
            connect_timeout_ms: default_connect_timeout(),
            meters,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PollError> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            PollError::Config(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PollError> {
        // Create directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PollError::Config(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content).map_err(|e| {
            PollError::Config(format!(
                "cannot write {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(())
    }

    // Get list of enabled meters
    pub fn enabled_meters(&self) -> Vec<&MeterConfig> {
        self.meters.iter().filter(|m| m.enabled).collect()
    }

    // Get meter by UUID
    pub fn get_meter_by_uuid(&self, uuid: &str) -> Option<&MeterConfig> {
        self.meters.iter().find(|m| m.uuid == uuid)
    }
}
