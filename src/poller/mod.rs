pub mod fleet;
pub mod progress;
pub mod reader;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use fleet::{FleetPoller, PollState};
pub use progress::{progress_string, ProgressSink, PROGRESS_BAR_WIDTH};
pub use reader::read_device;
pub use types::{CancelFlag, DeviceRead, DeviceResult, ErrorKey, PointFailure};
