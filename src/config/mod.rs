pub mod settings;

pub use settings::{Config, Endian, MeterConfig, PointConfig, RegisterKind, ValueType};
