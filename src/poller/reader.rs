use log::{debug, warn};

use super::types::{CancelFlag, DeviceRead, DeviceResult, ErrorKey, PointFailure};
use crate::config::{MeterConfig, RegisterKind};
use crate::modbus::codec;
use crate::modbus::session::SessionFactory;
use crate::utils::error::PollError;

/// Read every configured point of one device through a fresh session.
///
/// Protocol errors are recorded per point and the remaining points are
/// still attempted. A decode failure is treated as a defect of the device
/// descriptor and cuts off all later points of this device for the cycle,
/// leaving a single failure keyed by the device's address.
pub async fn read_device(
    meter: &MeterConfig,
    factory: &dyn SessionFactory,
    cancel: &CancelFlag,
) -> DeviceRead {
    let mut result = DeviceResult::new(&meter.uuid, &meter.measure_name);
    let mut failures = Vec::new();

    let mut session = match factory.connect(&meter.address).await {
        Ok(session) => session,
        Err(error) => {
            warn!("❌ {} [{}]: {}", meter.address, meter.uuid, error);
            failures.push(PointFailure {
                key: ErrorKey::device(&meter.address),
                error,
            });
            return DeviceRead { result, failures };
        }
    };

    for point in &meter.points {
        if cancel.is_cancelled() {
            break;
        }

        let response = match point.register_type {
            RegisterKind::Holding => {
                session
                    .read_holding_registers(point.register, point.size, meter.slave_id)
                    .await
            }
            RegisterKind::Input => {
                session
                    .read_input_registers(point.register, point.size, meter.slave_id)
                    .await
            }
        };

        match response {
            Err(error) => {
                let key = ErrorKey::point(meter, point);
                warn!("📛 {}: {}", key, error);
                failures.push(PointFailure { key, error });
            }
            Ok(words) => match codec::decode_registers(
                &words,
                point.data_type,
                point.byte_order,
                point.word_order,
            ) {
                Ok(raw) => {
                    let value = raw * point.scale;
                    debug!("📈 {} {} = {}", meter.address, point.name, value);
                    result.points.insert(point.name.clone(), value);
                }
                Err(error) => {
                    // Descriptor defect or malformed payload: give up on the
                    // rest of this device for the cycle
                    let error = PollError::Unexpected(format!(
                        "point '{}': {}",
                        point.name, error
                    ));
                    warn!("❌ {} [{}]: {}", meter.address, meter.uuid, error);
                    failures.push(PointFailure {
                        key: ErrorKey::device(&meter.address),
                        error,
                    });
                    break;
                }
            },
        }
    }

    session.close().await;
    DeviceRead { result, failures }
}
