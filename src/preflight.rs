//! Preflight readiness checks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::notify::{DeliveryContext, Publisher};
use crate::types::{HealthState, PreflightCheck, PreflightReport, VehicleState};

/// Battery floors below which the vehicle is not ready to fly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreflightPolicy {
    pub min_battery_voltage: f32,
    pub min_battery_percent: i32,
}

impl Default for PreflightPolicy {
    fn default() -> Self {
        Self { min_battery_voltage: 10.5, min_battery_percent: 20 }
    }
}

/// Run every check against one snapshot, in display order.
pub fn evaluate_checks(
    state: &VehicleState,
    health: &HealthState,
    policy: &PreflightPolicy,
) -> Vec<PreflightCheck> {
    let check = |ok: bool, name, reason| {
        if ok { PreflightCheck::passed(name) } else { PreflightCheck::failed(name, reason) }
    };

    let battery = match &state.battery {
        None => PreflightCheck::unknown("Battery", "No battery data"),
        Some(b) if b.voltage < policy.min_battery_voltage => {
            PreflightCheck::failed("Battery", "Voltage too low")
        }
        Some(b) if b.remaining_known() && (b.remaining_percent as i32) < policy.min_battery_percent => {
            PreflightCheck::failed("Battery", "Battery level too low")
        }
        Some(_) => PreflightCheck::passed("Battery"),
    };

    vec![
        check(health.link_alive, "Link", "No connection"),
        check(health.attitude_fresh, "Attitude", "No fresh attitude data"),
        check(health.position_fresh, "Position", "No fresh position data"),
        battery,
    ]
}

/// Publishes a [`PreflightReport`] when the outcome of any check changes.
#[derive(Debug)]
pub struct PreflightEvaluator {
    policy: PreflightPolicy,
    publisher: Publisher<PreflightReport>,
}

impl PreflightEvaluator {
    pub fn new(policy: PreflightPolicy, context: Arc<dyn DeliveryContext>) -> Self {
        Self { policy, publisher: Publisher::new(PreflightReport::empty(Instant::now()), context) }
    }

    pub fn current(&self) -> PreflightReport {
        self.publisher.current()
    }

    pub fn publisher(&self) -> &Publisher<PreflightReport> {
        &self.publisher
    }

    pub fn evaluate(
        &self,
        state: &VehicleState,
        health: &HealthState,
        now: Instant,
    ) -> Option<PreflightReport> {
        let checks = evaluate_checks(state, health, &self.policy);
        let published = self.publisher.update(|current| {
            (current.checks != checks).then(|| PreflightReport { checks, evaluated_at: now })
        });
        if let Some(report) = &published {
            debug!(ready = report.all_passed(), "Preflight status changed");
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Immediate;
    use crate::types::{BatteryState, PreflightCheckStatus};

    fn healthy(at: Instant) -> HealthState {
        HealthState { link_alive: true, attitude_fresh: true, position_fresh: true, evaluated_at: at }
    }

    fn battery(voltage: f32, remaining_percent: i8) -> BatteryState {
        BatteryState { voltage, current: 1.0, remaining_percent, received_at: Instant::now() }
    }

    fn battery_check(state: &VehicleState) -> PreflightCheck {
        let checks = evaluate_checks(state, &healthy(Instant::now()), &PreflightPolicy::default());
        checks.into_iter().find(|c| c.name == "Battery").expect("battery check")
    }

    #[test]
    fn check_order_and_health_failures() {
        let checks = evaluate_checks(
            &VehicleState::default(),
            &HealthState::unhealthy(Instant::now()),
            &PreflightPolicy::default(),
        );
        let names: Vec<_> = checks.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Link", "Attitude", "Position", "Battery"]);
        assert_eq!(checks[0].reason, Some("No connection"));
        assert_eq!(checks[1].reason, Some("No fresh attitude data"));
        assert_eq!(checks[2].reason, Some("No fresh position data"));
        assert_eq!(checks[3].status, PreflightCheckStatus::Unknown);
        assert_eq!(checks[3].reason, Some("No battery data"));
    }

    #[test]
    fn battery_rules() {
        let low_voltage = VehicleState { battery: Some(battery(10.0, 90)), ..Default::default() };
        assert_eq!(battery_check(&low_voltage).reason, Some("Voltage too low"));

        let low_percent = VehicleState { battery: Some(battery(12.0, 19)), ..Default::default() };
        let check = battery_check(&low_percent);
        assert_eq!(check.status, PreflightCheckStatus::Failed);
        assert_eq!(check.reason, Some("Battery level too low"));

        let unknown_percent = VehicleState { battery: Some(battery(12.0, -1)), ..Default::default() };
        assert_eq!(battery_check(&unknown_percent).status, PreflightCheckStatus::Passed);

        let at_floor = VehicleState { battery: Some(battery(12.0, 20)), ..Default::default() };
        assert_eq!(battery_check(&at_floor).status, PreflightCheckStatus::Passed);
    }

    #[test]
    fn publishes_only_when_checks_change() {
        let evaluator = PreflightEvaluator::new(PreflightPolicy::default(), Arc::new(Immediate));
        let now = Instant::now();
        let state = VehicleState { battery: Some(battery(12.5, 70)), ..Default::default() };

        let report = evaluator.evaluate(&state, &healthy(now), now).expect("first report");
        assert!(report.all_passed());
        assert!(evaluator.evaluate(&state, &healthy(now), now).is_none());

        let report = evaluator
            .evaluate(&state, &HealthState::unhealthy(now), now)
            .expect("link failure changes report");
        assert!(!report.all_passed());
        assert_eq!(report.check("Link").and_then(|c| c.reason), Some("No connection"));
    }
}
