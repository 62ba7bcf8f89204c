//! Pending event storage and ordering

use super::EventEffect;
use crate::types::EPSILON;
use serde::{Deserialize, Serialize};

/// Identifier handed out by [`EventQueue::push`]
pub type EventId = u64;

/// A scheduled future effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Human readable label used in logs
    pub name: String,
    /// Seconds until this event fires
    pub time_till_event: f64,
    pub effect: EventEffect,
    /// Whether firing this event is worth a debug log line
    pub should_log: bool,
    /// Canceled events stay queued and are skipped when they come due
    pub canceled: bool,
}

/// Pending events in enqueue order
///
/// The queue is a plain vector that is stable-sorted before each step of
/// the clock, so events due at the same instant keep their enqueue order.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<Event>,
    next_id: EventId,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        EventQueue {
            events: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule an effect `delay` seconds from now
    pub fn push(&mut self, name: impl Into<String>, delay: f64, effect: EventEffect) -> EventId {
        self.push_with_logging(name, delay, effect, true)
    }

    /// Schedule an effect, choosing whether it is logged when it fires
    pub fn push_with_logging(
        &mut self,
        name: impl Into<String>,
        delay: f64,
        effect: EventEffect,
        should_log: bool,
    ) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push(Event {
            id,
            name: name.into(),
            time_till_event: delay.max(0.0),
            effect,
            should_log,
            canceled: false,
        });
        id
    }

    /// Mark an event canceled. Returns false if it is no longer queued.
    pub fn cancel(&mut self, id: EventId) -> bool {
        match self.events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                event.canceled = true;
                true
            }
            None => false,
        }
    }

    /// Look up a queued event
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Remaining time of a live (not canceled) event
    pub fn time_till(&self, id: EventId) -> Option<f64> {
        self.get(id)
            .filter(|e| !e.canceled)
            .map(|e| e.time_till_event)
    }

    /// Reschedule a queued event to fire `delay` seconds from now
    pub fn reschedule(&mut self, id: EventId, delay: f64) -> bool {
        match self.events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                event.time_till_event = delay.max(0.0);
                true
            }
            None => false,
        }
    }

    /// Stable sort by remaining time; ties keep enqueue order
    pub fn sort(&mut self) {
        self.events
            .sort_by(|a, b| a.time_till_event.total_cmp(&b.time_till_event));
    }

    /// Remaining time of the earliest event. Call [`EventQueue::sort`] first.
    pub fn earliest(&self) -> Option<f64> {
        self.events.first().map(|e| e.time_till_event)
    }

    /// Count down every queued event
    pub fn advance(&mut self, step: f64) {
        for event in &mut self.events {
            event.time_till_event -= step;
        }
    }

    /// Remove every event that has come due, in queue order
    ///
    /// Canceled events are dropped here without being returned.
    pub fn take_due(&mut self) -> Vec<Event> {
        let (due, pending): (Vec<Event>, Vec<Event>) = std::mem::take(&mut self.events)
            .into_iter()
            .partition(|e| e.time_till_event <= EPSILON);
        self.events = pending;
        due.into_iter().filter(|e| !e.canceled).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}
