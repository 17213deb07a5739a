//! Scripted session factory for reader and poller tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::modbus::session::{RegisterSession, SessionFactory};
use crate::utils::error::PollError;

/// Scripted behavior of one device, keyed by register address.
#[derive(Debug, Default, Clone)]
pub struct MockPlan {
    pub refuse_connect: bool,
    pub holding: HashMap<u16, Result<Vec<u16>, PollError>>,
    pub input: HashMap<u16, Result<Vec<u16>, PollError>>,
}

/// Devices without a plan refuse the connection.
#[derive(Default)]
pub struct MockFactory {
    plans: Mutex<HashMap<String, MockPlan>>,
    pub reads: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_plan(&self, address: &str, plan: MockPlan) {
        self.plans.lock().unwrap().insert(address.to_string(), plan);
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    async fn connect(&self, address: &str) -> Result<Box<dyn RegisterSession>, PollError> {
        let plan = self.plans.lock().unwrap().get(address).cloned();
        let plan = match plan {
            Some(plan) if !plan.refuse_connect => plan,
            _ => {
                return Err(PollError::Connection(format!(
                    "{}: connection refused",
                    address
                )))
            }
        };
        Ok(Box::new(MockSession {
            plan,
            reads: Arc::clone(&self.reads),
            closes: Arc::clone(&self.closes),
        }))
    }
}

struct MockSession {
    plan: MockPlan,
    reads: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MockSession {
    fn lookup(
        table: &HashMap<u16, Result<Vec<u16>, PollError>>,
        address: u16,
    ) -> Result<Vec<u16>, PollError> {
        table.get(&address).cloned().unwrap_or_else(|| {
            Err(PollError::Protocol(format!(
                "no register mapping at {}",
                address
            )))
        })
    }
}

#[async_trait]
impl RegisterSession for MockSession {
    async fn read_holding_registers(
        &mut self,
        address: u16,
        _count: u16,
        _slave_id: u8,
    ) -> Result<Vec<u16>, PollError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Self::lookup(&self.plan.holding, address)
    }

    async fn read_input_registers(
        &mut self,
        address: u16,
        _count: u16,
        _slave_id: u8,
    ) -> Result<Vec<u16>, PollError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Self::lookup(&self.plan.input, address)
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
