//! Operator alerts derived from health transitions.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::warn;

use crate::notify::{DeliveryContext, Publisher};
use crate::types::{AlertSeverity, AlertState, AlertType, HealthState};

/// Severity assigned to each alert kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPolicy {
    pub link_lost_severity: AlertSeverity,
    pub attitude_stale_severity: AlertSeverity,
    pub position_stale_severity: AlertSeverity,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            link_lost_severity: AlertSeverity::Critical,
            attitude_stale_severity: AlertSeverity::Warning,
            position_stale_severity: AlertSeverity::Warning,
        }
    }
}

impl AlertPolicy {
    pub fn severity(&self, alert: AlertType) -> AlertSeverity {
        match alert {
            AlertType::LinkLost => self.link_lost_severity,
            AlertType::AttitudeStale => self.attitude_stale_severity,
            AlertType::PositionStale => self.position_stale_severity,
        }
    }
}

/// Keeps one [`AlertState`] per [`AlertType`] and publishes the full set whenever an
/// entry appears or flips. Re-asserting an unchanged condition publishes nothing.
#[derive(Debug)]
pub struct AlertEngine {
    policy: AlertPolicy,
    alerts: Mutex<BTreeMap<AlertType, AlertState>>,
    publisher: Publisher<Vec<AlertState>>,
}

impl AlertEngine {
    pub fn new(policy: AlertPolicy, context: Arc<dyn DeliveryContext>) -> Self {
        Self { policy, alerts: Mutex::new(BTreeMap::new()), publisher: Publisher::new(Vec::new(), context) }
    }

    pub fn current(&self) -> Vec<AlertState> {
        self.publisher.current()
    }

    pub fn active(&self) -> Vec<AlertState> {
        self.current().into_iter().filter(|a| a.active).collect()
    }

    pub fn publisher(&self) -> &Publisher<Vec<AlertState>> {
        &self.publisher
    }

    /// Fold a health update in. Returns the published set if anything changed.
    pub fn on_health(&self, health: &HealthState, now: Instant) -> Option<Vec<AlertState>> {
        let mut alerts = self.alerts.lock();
        let mut changed = false;
        for (alert_type, active) in [
            (AlertType::LinkLost, !health.link_alive),
            (AlertType::AttitudeStale, !health.attitude_fresh),
            (AlertType::PositionStale, !health.position_fresh),
        ] {
            changed |= self.evaluate(&mut alerts, alert_type, active, now);
        }
        if !changed {
            return None;
        }
        let snapshot: Vec<AlertState> = alerts.values().copied().collect();
        self.publisher.publish(snapshot.clone());
        Some(snapshot)
    }

    fn evaluate(
        &self,
        alerts: &mut BTreeMap<AlertType, AlertState>,
        alert_type: AlertType,
        active: bool,
        now: Instant,
    ) -> bool {
        let severity = self.policy.severity(alert_type);
        match alerts.get_mut(&alert_type) {
            Some(existing) if existing.active == active => false,
            Some(existing) => {
                existing.active = active;
                existing.changed_at = now;
                if active {
                    warn!(alert = alert_type.description(), ?severity, "Alert raised");
                }
                true
            }
            None => {
                alerts.insert(alert_type, AlertState { alert_type, severity, active, changed_at: now });
                true
            }
        }
    }
}
