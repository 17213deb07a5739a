use async_trait::async_trait;

use crate::utils::error::PollError;

/// One open connection to a remote device.
///
/// Errors come back pre-classified: `Io` for transport failures,
/// `InvalidParameter` for requests the device rejects, `NoSuchSlave` when
/// the addressed unit is absent, `Protocol` for everything else the
/// protocol layer reports.
#[async_trait]
pub trait RegisterSession: Send {
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        slave_id: u8,
    ) -> Result<Vec<u16>, PollError>;

    async fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
        slave_id: u8,
    ) -> Result<Vec<u16>, PollError>;

    /// Releases the connection. Called exactly once per session, on every
    /// exit path of a device read.
    async fn close(&mut self);
}

/// Opens sessions by device address. The poller core depends only on this
/// contract, not on any specific transport. A session that cannot be
/// established is reported as a `Connection` error.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn connect(&self, address: &str) -> Result<Box<dyn RegisterSession>, PollError>;
}
