//! Modbus TCP session adapter.
//!
//! Wire framing and transport live in `tokio-modbus`; this module only
//! opens connections and classifies the collaborator's errors into the
//! crate taxonomy.

use async_trait::async_trait;
use log::{debug, info};
use std::net::SocketAddr;
use tokio::time::{timeout, Duration};
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tokio_modbus::Exception;

use super::session::{RegisterSession, SessionFactory};
use crate::utils::error::PollError;

const MODBUS_TCP_PORT: u16 = 502;

pub struct TcpSessionFactory {
    connect_timeout: Duration,
}

impl TcpSessionFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl SessionFactory for TcpSessionFactory {
    async fn connect(&self, address: &str) -> Result<Box<dyn RegisterSession>, PollError> {
        let socket = resolve(address).await?;
        let ctx = timeout(self.connect_timeout, tcp::connect(socket))
            .await
            .map_err(|_| PollError::Connection(format!("{}: connect timed out", address)))?
            .map_err(|e| PollError::Connection(format!("{}: {}", address, e)))?;

        info!("🔌 Connected to {}", address);
        Ok(Box::new(TcpSession {
            address: address.to_string(),
            ctx,
        }))
    }
}

struct TcpSession {
    address: String,
    ctx: Context,
}

#[async_trait]
impl RegisterSession for TcpSession {
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        slave_id: u8,
    ) -> Result<Vec<u16>, PollError> {
        debug!(
            "📊 {} slave {}: reading {} holding register(s) at {}",
            self.address, slave_id, count, address
        );
        self.ctx.set_slave(Slave(slave_id));
        classify_response(self.ctx.read_holding_registers(address, count).await, slave_id)
    }

    async fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
        slave_id: u8,
    ) -> Result<Vec<u16>, PollError> {
        debug!(
            "📊 {} slave {}: reading {} input register(s) at {}",
            self.address, slave_id, count, address
        );
        self.ctx.set_slave(Slave(slave_id));
        classify_response(self.ctx.read_input_registers(address, count).await, slave_id)
    }

    async fn close(&mut self) {
        let _ = self.ctx.disconnect().await;
        debug!("🔌 Disconnected from {}", self.address);
    }
}

async fn resolve(address: &str) -> Result<SocketAddr, PollError> {
    let target = if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, MODBUS_TCP_PORT)
    };
    let mut candidates = tokio::net::lookup_host(&target)
        .await
        .map_err(|e| PollError::Connection(format!("cannot resolve {}: {}", target, e)))?;
    candidates
        .next()
        .ok_or_else(|| PollError::Connection(format!("no usable address for {}", target)))
}

fn classify_response(
    response: tokio_modbus::Result<Vec<u16>>,
    slave_id: u8,
) -> Result<Vec<u16>, PollError> {
    match response {
        Ok(Ok(words)) => Ok(words),
        Ok(Err(exception)) => Err(classify_exception(exception, slave_id)),
        Err(e) => Err(PollError::Io(e.to_string())),
    }
}

fn classify_exception(exception: Exception, slave_id: u8) -> PollError {
    match exception {
        Exception::IllegalFunction
        | Exception::IllegalDataAddress
        | Exception::IllegalDataValue => PollError::InvalidParameter(exception.to_string()),
        Exception::GatewayPathUnavailable | Exception::GatewayTargetDevice => {
            PollError::NoSuchSlave(slave_id)
        }
        _ => PollError::Protocol(exception.to_string()),
    }
}
