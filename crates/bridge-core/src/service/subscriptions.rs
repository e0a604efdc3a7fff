//! # Subscription Manager
//!
//! Reconciles a node's declared services and slots with live transport
//! subscriptions.
//!
//! - Services are keyed by topic; adding an existing topic replaces its
//!   subscription.
//! - Slots are keyed by (topic, path, group); re-adding a key replaces the
//!   subscription in place.
//! - Removing a slot without a path removes every slot on its topic.
//! - Batch operations apply in order, stop at the first error and do not roll
//!   back.
//!
//! While a node is stopped, additions are recorded as declared intent and
//! become live on the next start.

use crate::domain::{Service, ServiceMap, Slot};
use crate::error::ProxyError;
use crate::ports::{SubscribeOptions, SubscriptionHandle, Transport};
use crate::service::bridge::MessageBridge;
use crate::service::node::{Binding, Node, NodeState};
use std::sync::Arc;
use tracing::{debug, warn};

impl Node {
    /// Subscribe `service` on `topic`, replacing any previous binding.
    ///
    /// # Errors
    ///
    /// `SubscriptionFailure` if the transport rejects the subscription; the
    /// declared services are left untouched.
    pub fn add_service(&self, topic: &str, service: Service) -> Result<(), ProxyError> {
        let transport = self.transport()?;
        let mut state = self.state.lock();

        let handle = if state.running {
            Some(self.subscribe_service(transport, topic, &service)?)
        } else {
            None
        };

        let previous = state.services.insert(
            topic.to_string(),
            Binding {
                declared: service,
                handle,
            },
        );
        if let Some(old) = previous.and_then(|b| b.handle) {
            release(transport.unsubscribe_reply(topic, old), topic);
        }

        debug!(node_id = %self.id(), topic = topic, live = handle.is_some(), "Service added");
        Ok(())
    }

    /// Add each service in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// The first error from [`Node::add_service`].
    pub fn add_services(&self, services: ServiceMap) -> Result<(), ProxyError> {
        for (topic, service) in services {
            self.add_service(&topic, service)?;
        }
        Ok(())
    }

    /// Drop the service on `topic`. The declared entry is removed even if the
    /// transport fails to unsubscribe. Returns `false` if no service was bound.
    pub fn remove_service(&self, topic: &str) -> bool {
        let mut state = self.state.lock();
        let Some(binding) = state.services.remove(topic) else {
            return false;
        };

        if let (Some(handle), Some(transport)) = (binding.handle, self.transport().ok()) {
            release(transport.unsubscribe_reply(topic, handle), topic);
        }
        debug!(node_id = %self.id(), topic = topic, "Service removed");
        true
    }

    /// Drop every topic named in `services`. Returns how many were bound.
    pub fn remove_services(&self, services: &ServiceMap) -> usize {
        services
            .keys()
            .filter(|topic| self.remove_service(topic))
            .count()
    }

    /// Subscribe `slot`, replacing the handle of an existing slot with the
    /// same key.
    ///
    /// # Errors
    ///
    /// `SubscriptionFailure` if the transport rejects the subscription.
    pub fn add_slot(&self, slot: Slot) -> Result<(), ProxyError> {
        let transport = self.transport()?;
        let mut state = self.state.lock();

        let handle = if state.running {
            Some(self.subscribe_slot(transport, &slot)?)
        } else {
            None
        };

        let topic = slot.topic.clone();
        match state.slots.iter().position(|b| b.declared.same_key(&slot)) {
            Some(pos) => {
                let previous =
                    std::mem::replace(&mut state.slots[pos], Binding { declared: slot, handle });
                if let Some(old) = previous.handle {
                    release(transport.unsubscribe_slot(&topic, old), &topic);
                }
            }
            None => state.slots.push(Binding { declared: slot, handle }),
        }

        debug!(node_id = %self.id(), topic = %topic, live = handle.is_some(), "Slot added");
        Ok(())
    }

    /// Add each slot in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// The first error from [`Node::add_slot`].
    pub fn add_slots(&self, slots: Vec<Slot>) -> Result<(), ProxyError> {
        for slot in slots {
            self.add_slot(slot)?;
        }
        Ok(())
    }

    /// Remove slots on `slot.topic`.
    ///
    /// With a path, removes the single slot bound at that path. Without one,
    /// removes every slot on the topic. Returns the number removed.
    ///
    /// # Errors
    ///
    /// `SubscriptionFailure` if an unsubscribe fails; that slot and any after
    /// it stay declared, earlier removals stand.
    pub fn remove_slot(&self, slot: &Slot) -> Result<usize, ProxyError> {
        let mut state = self.state.lock();
        let mut removed = 0;

        if slot.path.is_empty() {
            while let Some(pos) = state.slots.iter().position(|b| b.declared.topic == slot.topic) {
                self.unsubscribe_slot_at(&mut state, pos)?;
                removed += 1;
            }
        } else if let Some(pos) = state
            .slots
            .iter()
            .position(|b| b.declared.matches_path(&slot.topic, &slot.path))
        {
            self.unsubscribe_slot_at(&mut state, pos)?;
            removed = 1;
        }

        debug!(node_id = %self.id(), topic = %slot.topic, removed, "Slots removed");
        Ok(removed)
    }

    /// Declared services.
    pub fn services(&self) -> ServiceMap {
        self.state
            .lock()
            .services
            .iter()
            .map(|(topic, b)| (topic.clone(), b.declared.clone()))
            .collect()
    }

    /// Declared slots.
    pub fn slots(&self) -> Vec<Slot> {
        self.state.lock().slots.iter().map(|b| b.declared.clone()).collect()
    }

    /// Activate every declared binding, replacing any live handle.
    pub(crate) fn activate_all(
        &self,
        transport: &Arc<dyn Transport>,
        state: &mut NodeState,
    ) -> Result<(), ProxyError> {
        for (topic, binding) in &mut state.services {
            let handle = self.subscribe_service(transport, topic, &binding.declared)?;
            if let Some(old) = binding.handle.replace(handle) {
                release(transport.unsubscribe_reply(topic, old), topic);
            }
        }
        for binding in &mut state.slots {
            let handle = self.subscribe_slot(transport, &binding.declared)?;
            if let Some(old) = binding.handle.replace(handle) {
                release(transport.unsubscribe_slot(&binding.declared.topic, old), &binding.declared.topic);
            }
        }
        Ok(())
    }

    fn subscribe_service(
        &self,
        transport: &Arc<dyn Transport>,
        topic: &str,
        service: &Service,
    ) -> Result<SubscriptionHandle, ProxyError> {
        let bridge = MessageBridge::service(self.port(), &service.path, self.forwarder.clone());
        transport
            .reply_to(
                topic,
                Arc::new(bridge),
                SubscribeOptions::new(&service.group, service.timeout),
            )
            .map_err(|source| ProxyError::SubscriptionFailure {
                topic: topic.to_string(),
                source,
            })
    }

    fn subscribe_slot(
        &self,
        transport: &Arc<dyn Transport>,
        slot: &Slot,
    ) -> Result<SubscriptionHandle, ProxyError> {
        let bridge = MessageBridge::slot(self.port(), &slot.path, self.forwarder.clone());
        transport
            .slot(
                &slot.topic,
                Arc::new(bridge),
                SubscribeOptions::new(&slot.group, slot.timeout),
            )
            .map_err(|source| ProxyError::SubscriptionFailure {
                topic: slot.topic.clone(),
                source,
            })
    }

    fn unsubscribe_slot_at(&self, state: &mut NodeState, pos: usize) -> Result<(), ProxyError> {
        if let Some(handle) = state.slots[pos].handle {
            let topic = &state.slots[pos].declared.topic;
            self.transport()?
                .unsubscribe_slot(topic, handle)
                .map_err(|source| ProxyError::SubscriptionFailure {
                    topic: topic.clone(),
                    source,
                })?;
        }
        state.slots.remove(pos);
        Ok(())
    }
}

/// Log a failed unsubscribe; the caller drops the binding regardless.
fn release(result: Result<(), crate::error::TransportError>, topic: &str) {
    if let Err(e) = result {
        warn!(topic = topic, error = %e, "Unsubscribe failed");
    }
}
