//! Per-session resource and cooldown tables

use super::{CoolDown, Resource};
use crate::error::EngineError;
use crate::event::{EventEffect, EventId, EventQueue};
use crate::types::ResourceKey;
use std::collections::BTreeMap;
use tracing::warn;

fn unknown(key: &ResourceKey) -> EngineError {
    EngineError::UnknownResource(key.to_string())
}

/// Every resource of one session, keyed by namespaced name
#[derive(Debug, Clone, Default)]
pub struct ResourceState {
    map: BTreeMap<ResourceKey, Resource>,
}

impl ResourceState {
    pub fn new() -> Self {
        ResourceState {
            map: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, resource: Resource) {
        self.map.insert(resource.key.clone(), resource);
    }

    pub fn get(&self, key: &ResourceKey) -> Result<&Resource, EngineError> {
        self.map.get(key).ok_or_else(|| unknown(key))
    }

    pub fn get_mut(&mut self, key: &ResourceKey) -> Result<&mut Resource, EngineError> {
        self.map.get_mut(key).ok_or_else(|| unknown(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.map.values()
    }

    /// Remaining time on the resource's pending change, or 0
    pub fn time_till_ready(&self, key: &ResourceKey, events: &EventQueue) -> Result<f64, EngineError> {
        let rsc = self.get(key)?;
        Ok(rsc
            .pending_change()
            .and_then(|id| events.time_till(id))
            .unwrap_or(0.0))
    }

    /// Schedule a change to a resource and register it as the pending one
    pub fn add_resource_event(
        &mut self,
        events: &mut EventQueue,
        key: &ResourceKey,
        name: impl Into<String>,
        delay: f64,
        effect: EventEffect,
    ) -> Result<EventId, EngineError> {
        let rsc = self.get_mut(key)?;
        let id = events.push(name, delay, effect);
        rsc.set_pending_change(Some(id));
        Ok(id)
    }

    /// Restart the pending change so it fires `delay` seconds from now
    pub fn override_timer(
        &mut self,
        events: &mut EventQueue,
        key: &ResourceKey,
        delay: f64,
    ) -> Result<(), EngineError> {
        let rsc = self.get(key)?;
        match rsc.pending_change() {
            Some(id) if events.reschedule(id, delay) => Ok(()),
            _ => {
                warn!(resource = %key, "overriding a timer that is not running");
                Ok(())
            }
        }
    }

    /// Cancel the pending change, if any
    pub fn remove_timer(&mut self, events: &mut EventQueue, key: &ResourceKey) -> Result<(), EngineError> {
        let rsc = self.get_mut(key)?;
        if let Some(id) = rsc.pending_change() {
            events.cancel(id);
            rsc.set_pending_change(None);
        }
        Ok(())
    }

    /// Forget the pending change once its event has fired
    pub fn clear_pending(&mut self, key: &ResourceKey, fired: EventId) {
        if let Some(rsc) = self.map.get_mut(key) {
            if rsc.pending_change() == Some(fired) {
                rsc.set_pending_change(None);
            }
        }
    }

    /// Take one unit of a binary lock and give it back after `delay`
    pub fn take_resource_lock(
        &mut self,
        events: &mut EventQueue,
        key: &ResourceKey,
        delay: f64,
        now: f64,
    ) -> Result<(), EngineError> {
        self.remove_timer(events, key)?;
        let rsc = self.get_mut(key)?;
        let held = rsc.available_amount().min(1.0);
        rsc.consume(held, now);
        self.add_resource_event(
            events,
            key,
            format!("[resource ready] {}", key),
            delay,
            EventEffect::GainResource {
                resource: key.clone(),
                amount: 1.0,
            },
        )?;
        Ok(())
    }
}

/// Every cooldown of one session
#[derive(Debug, Clone, Default)]
pub struct CooldownState {
    map: BTreeMap<ResourceKey, CoolDown>,
}

impl CooldownState {
    pub fn new() -> Self {
        CooldownState {
            map: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, cooldown: CoolDown) {
        self.map.insert(cooldown.key.clone(), cooldown);
    }

    pub fn get(&self, key: &ResourceKey) -> Result<&CoolDown, EngineError> {
        self.map.get(key).ok_or_else(|| unknown(key))
    }

    pub fn get_mut(&mut self, key: &ResourceKey) -> Result<&mut CoolDown, EngineError> {
        self.map.get_mut(key).ok_or_else(|| unknown(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoolDown> {
        self.map.values()
    }

    /// Advance every recast timer
    pub fn tick(&mut self, delta_time: f64) {
        for cd in self.map.values_mut() {
            cd.restore(delta_time);
        }
    }

    pub fn time_till_next_stack_available(&self, key: &ResourceKey) -> Result<f64, EngineError> {
        Ok(self.get(key)?.time_till_next_stack_available())
    }

    pub fn time_till_any_stack_available(&self, key: &ResourceKey) -> Result<f64, EngineError> {
        Ok(self.get(key)?.time_till_any_stack_available())
    }
}
