//! Resource - a bounded value with an optional pending change

use crate::event::EventId;
use crate::types::{ResourceKey, EPSILON};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A bounded quantity: mana, a gauge, a buff's stacks or a binary lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub key: ResourceKey,
    max_value: f64,
    current_value: f64,
    enabled: bool,
    /// Event that will next change this resource (expiry, lock release)
    pending: Option<EventId>,
    /// Simulation time at which the value last dropped to zero
    last_expiration_time: Option<f64>,
}

impl Resource {
    /// Create a resource holding `initial` out of `max_value`
    pub fn new(key: ResourceKey, max_value: f64, initial: f64) -> Self {
        Resource {
            key,
            max_value,
            current_value: initial.clamp(0.0, max_value),
            enabled: true,
            pending: None,
            last_expiration_time: None,
        }
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    /// Current amount; a disabled resource reports zero
    pub fn available_amount(&self) -> f64 {
        if self.enabled {
            self.current_value
        } else {
            0.0
        }
    }

    /// Raw stored amount, ignoring the enabled flag
    pub fn current_value(&self) -> f64 {
        self.current_value
    }

    /// Whether at least `amount` is available
    pub fn available(&self, amount: f64) -> bool {
        self.available_amount() + EPSILON >= amount
    }

    /// Add to the value, clamped at the maximum
    pub fn gain(&mut self, amount: f64) {
        self.current_value = (self.current_value + amount).min(self.max_value);
    }

    /// Subtract from the value
    ///
    /// Consuming more than is available is a caller bug: it trips a debug
    /// assertion and is clamped to zero in release builds.
    pub fn consume(&mut self, amount: f64, now: f64) {
        if !self.available(amount) {
            warn!(
                resource = %self.key,
                requested = amount,
                available = self.available_amount(),
                "consuming more than available"
            );
        }
        debug_assert!(
            self.current_value + EPSILON >= amount,
            "consumed {} of {} with only {}",
            amount,
            self.key,
            self.current_value
        );
        self.set_value(self.current_value - amount, now);
    }

    /// Drop the value to zero
    pub fn consume_all(&mut self, now: f64) {
        self.set_value(0.0, now);
    }

    /// Replace the stored value outright
    pub fn override_current_value(&mut self, value: f64, now: f64) {
        self.set_value(value, now);
    }

    fn set_value(&mut self, value: f64, now: f64) {
        let was_positive = self.current_value > EPSILON;
        self.current_value = value.clamp(0.0, self.max_value);
        if self.current_value <= EPSILON {
            self.current_value = 0.0;
            if was_positive {
                self.last_expiration_time = Some(now);
            }
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn pending_change(&self) -> Option<EventId> {
        self.pending
    }

    pub(crate) fn set_pending_change(&mut self, event: Option<EventId>) {
        self.pending = event;
    }

    pub fn last_expiration_time(&self) -> Option<f64> {
        self.last_expiration_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gauge(max: f64, initial: f64) -> Resource {
        Resource::new(ResourceKey::job("demo", "heat"), max, initial)
    }

    #[test]
    fn test_gain_clamps_to_max() {
        let mut rsc = gauge(100.0, 90.0);
        rsc.gain(50.0);
        assert!((rsc.available_amount() - 100.0).abs() < EPSILON);
    }

    #[test]
    fn test_available_within_epsilon() {
        let rsc = gauge(1.0, 1.0 - 1e-9);
        assert!(rsc.available(1.0));
        assert!(!gauge(1.0, 0.5).available(1.0));
    }

    #[test]
    fn test_disabled_reports_zero() {
        let mut rsc = gauge(1.0, 1.0);
        rsc.set_enabled(false);
        assert_eq!(rsc.available_amount(), 0.0);
        assert!(!rsc.available(1.0));
        assert!((rsc.current_value() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_expiration_time_tracked() {
        let mut rsc = gauge(1.0, 1.0);
        assert!(rsc.last_expiration_time().is_none());
        rsc.consume(1.0, 12.5);
        assert_eq!(rsc.last_expiration_time(), Some(12.5));

        // Already empty: no new expiration
        rsc.consume_all(20.0);
        assert_eq!(rsc.last_expiration_time(), Some(12.5));
    }
}
