use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use super::progress::{progress_string, ProgressSink, PROGRESS_BAR_WIDTH};
use super::reader::read_device;
use super::types::{CancelFlag, DeviceResult, ErrorKey};
use crate::config::MeterConfig;
use crate::modbus::session::SessionFactory;
use crate::utils::error::PollError;

/// Lifecycle of one fleet pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Drives one read pass over the configured fleet and carries the error
/// table and health score across cycles.
pub struct FleetPoller {
    factory: Arc<dyn SessionFactory>,
    errors: HashMap<ErrorKey, PollError>,
    health: usize,
    state: PollState,
}

impl FleetPoller {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            errors: HashMap::new(),
            health: 0,
            state: PollState::Idle,
        }
    }

    /// Poll every device in order and return the decoded values keyed by
    /// device UUID. Devices left unread by cancellation are simply not
    /// attempted; results of already-processed devices are kept.
    pub async fn poll_fleet(
        &mut self,
        meters: &[MeterConfig],
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> HashMap<String, DeviceResult> {
        self.state = PollState::Running;
        let mut results = HashMap::new();
        let total = meters.len();

        for (index, meter) in meters.iter().enumerate() {
            if cancel.is_cancelled() {
                self.state = PollState::Cancelled;
                break;
            }

            let percent = index * 100 / total;
            progress.notify(format!(
                "m|{}",
                progress_string(percent, PROGRESS_BAR_WIDTH, "Reading")
            ));

            let read = read_device(meter, self.factory.as_ref(), cancel).await;

            // Upsert this cycle's failures, then heal the keys that read
            // cleanly this time around
            for failure in &read.failures {
                self.errors
                    .insert(failure.key.clone(), failure.error.clone());
            }
            let device_ok = !read
                .failures
                .iter()
                .any(|f| matches!(f.key, ErrorKey::Device { .. }));
            for point in &meter.points {
                if read.result.points.contains_key(&point.name) {
                    self.errors.remove(&ErrorKey::point(meter, point));
                }
            }
            if device_ok {
                self.errors.remove(&ErrorKey::device(&meter.address));
            }

            if cancel.is_cancelled() {
                // Partial values of a device interrupted mid-read are
                // discarded; its recorded failures stand
                self.state = PollState::Cancelled;
                break;
            }

            debug!(
                "📡 {} [{}]: {} point(s) read, {} failure(s)",
                meter.address,
                meter.uuid,
                read.result.points.len(),
                read.failures.len()
            );
            results.insert(read.result.uuid.clone(), read.result);
        }

        if self.state != PollState::Cancelled {
            self.state = PollState::Completed;
        }
        self.health = self.errors.len();
        info!(
            "✅ Poll cycle {:?}: {} device(s) read, health {}",
            self.state,
            results.len(),
            self.health
        );
        results
    }

    /// Number of currently failing read points across the fleet.
    /// Recomputed from the error table at the end of every cycle.
    pub fn health(&self) -> usize {
        self.health
    }

    pub fn error_table(&self) -> &HashMap<ErrorKey, PollError> {
        &self.errors
    }

    pub fn state(&self) -> PollState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endian, PointConfig, RegisterKind, ValueType};
    use crate::poller::mock::{MockFactory, MockPlan};
    use std::sync::atomic::Ordering;
    use tokio::sync::mpsc;

    fn meter(address: &str, register: u16) -> MeterConfig {
        MeterConfig {
            uuid: format!("uuid-{}", address),
            address: address.to_string(),
            slave_id: 1,
            measure_name: "energy".to_string(),
            enabled: true,
            points: vec![PointConfig {
                name: "power".to_string(),
                register_type: RegisterKind::Holding,
                register,
                size: 2,
                scale: 1.0,
                data_type: ValueType::Float32,
                byte_order: Endian::Big,
                word_order: Endian::Big,
            }],
        }
    }

    fn ok_plan(register: u16) -> MockPlan {
        let mut plan = MockPlan::default();
        plan.holding.insert(register, Ok(vec![0x4048, 0x0000]));
        plan
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn test_progress_sequence_for_four_devices() {
        let factory = Arc::new(MockFactory::new());
        let mut poller = FleetPoller::new(factory);
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Read outcomes do not matter for the progress sequence: all four
        // connections are refused here
        let meters: Vec<_> = (1..=4).map(|i| meter(&format!("10.0.1.{}", i), 0)).collect();
        poller.poll_fleet(&meters, &tx, &CancelFlag::new()).await;

        let messages = drain(&mut rx);
        let expected: Vec<String> = [0usize, 25, 50, 75]
            .iter()
            .map(|p| format!("m|{}", progress_string(*p, PROGRESS_BAR_WIDTH, "Reading")))
            .collect();
        assert_eq!(messages, expected);
    }

    #[tokio::test]
    async fn test_connection_failure_keeps_device_out_of_results() {
        let factory = Arc::new(MockFactory::new());
        let mut poller = FleetPoller::new(factory);
        let (tx, _rx) = mpsc::unbounded_channel();

        let meters = vec![meter("10.0.2.1", 0)];
        let results = poller.poll_fleet(&meters, &tx, &CancelFlag::new()).await;

        assert!(results.is_empty());
        assert_eq!(poller.health(), 1);
        assert_eq!(poller.error_table().len(), 1);
        assert!(poller
            .error_table()
            .contains_key(&ErrorKey::device("10.0.2.1")));
        assert_eq!(poller.state(), PollState::Completed);
    }

    #[tokio::test]
    async fn test_error_table_heals_on_successful_reread() {
        let factory = Arc::new(MockFactory::new());
        let mut plan = MockPlan::default();
        plan.holding
            .insert(0, Err(PollError::Protocol("device busy".to_string())));
        factory.set_plan("10.0.3.1", plan);

        let mut poller = FleetPoller::new(factory.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        let meters = vec![meter("10.0.3.1", 0)];
        let key = ErrorKey::point(&meters[0], &meters[0].points[0]);

        let results = poller.poll_fleet(&meters, &tx, &CancelFlag::new()).await;
        assert!(results["uuid-10.0.3.1"].points.is_empty());
        assert_eq!(poller.health(), 1);
        assert_eq!(
            poller.error_table()[&key],
            PollError::Protocol("device busy".to_string())
        );

        // Device recovers, the stale entry must disappear
        factory.set_plan("10.0.3.1", ok_plan(0));
        let results = poller.poll_fleet(&meters, &tx, &CancelFlag::new()).await;
        assert!((results["uuid-10.0.3.1"].points["power"] - 3.125).abs() < 1e-9);
        assert_eq!(poller.health(), 0);
        assert!(poller.error_table().is_empty());
    }

    #[tokio::test]
    async fn test_device_key_heals_after_reconnect() {
        let factory = Arc::new(MockFactory::new());
        let mut poller = FleetPoller::new(factory.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        let meters = vec![meter("10.0.4.1", 0)];

        poller.poll_fleet(&meters, &tx, &CancelFlag::new()).await;
        assert_eq!(poller.health(), 1);

        factory.set_plan("10.0.4.1", ok_plan(0));
        poller.poll_fleet(&meters, &tx, &CancelFlag::new()).await;
        assert_eq!(poller.health(), 0);
        assert!(poller.error_table().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_start_is_a_no_op() {
        let factory = Arc::new(MockFactory::new());
        let mut poller = FleetPoller::new(factory.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let meters = vec![meter("10.0.5.1", 0), meter("10.0.5.2", 0)];

        // Seed the table with a failing cycle first
        poller.poll_fleet(&meters, &tx, &CancelFlag::new()).await;
        let health_before = poller.health();
        let table_before = poller.error_table().clone();
        drain(&mut rx);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let results = poller.poll_fleet(&meters, &tx, &cancel).await;

        assert!(results.is_empty());
        assert_eq!(poller.health(), health_before);
        assert_eq!(poller.error_table(), &table_before);
        assert_eq!(poller.state(), PollState::Cancelled);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(factory.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_observed_at_device_boundary() {
        struct CancellingSink(CancelFlag);
        impl ProgressSink for CancellingSink {
            fn notify(&self, _message: String) {
                self.0.cancel();
            }
        }

        let factory = Arc::new(MockFactory::new());
        factory.set_plan("10.0.6.1", ok_plan(0));
        factory.set_plan("10.0.6.2", ok_plan(0));

        let mut poller = FleetPoller::new(factory.clone());
        let cancel = CancelFlag::new();
        let sink = CancellingSink(cancel.clone());
        let meters = vec![meter("10.0.6.1", 0), meter("10.0.6.2", 0)];

        let results = poller.poll_fleet(&meters, &sink, &cancel).await;

        // Cancellation arrived while the first device was being handled:
        // its points were never read and its partial result is discarded
        assert!(results.is_empty());
        assert_eq!(factory.reads.load(Ordering::SeqCst), 0);
        assert_eq!(poller.state(), PollState::Cancelled);
    }

    #[tokio::test]
    async fn test_two_healthy_devices_aggregate() {
        let factory = Arc::new(MockFactory::new());
        factory.set_plan("10.0.7.1", ok_plan(0));
        factory.set_plan("10.0.7.2", ok_plan(0));

        let mut poller = FleetPoller::new(factory);
        let (tx, _rx) = mpsc::unbounded_channel();
        let meters = vec![meter("10.0.7.1", 0), meter("10.0.7.2", 0)];

        let results = poller.poll_fleet(&meters, &tx, &CancelFlag::new()).await;

        assert_eq!(results.len(), 2);
        assert!(results.contains_key("uuid-10.0.7.1"));
        assert!(results.contains_key("uuid-10.0.7.2"));
        assert_eq!(results["uuid-10.0.7.1"].measure_name, "energy");
        assert_eq!(poller.health(), 0);
        assert_eq!(poller.state(), PollState::Completed);
    }
}
