//! The broadcast hub: a single task that owns the [`SpaceRegistry`] and
//! applies join, leave, and broadcast requests in arrival order.
//!
//! Callers talk to it through a cloneable [`HubHandle`]. Every request is
//! fire-and-forget; only [`HubHandle::members`] waits for an answer.

use std::collections::VecDeque;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::connection::{ConnectionKey, ConnectionRecord};
use super::events::{Event, EventType};
use super::registry::SpaceRegistry;

enum Command {
    Join(ConnectionRecord),
    Leave(ConnectionKey),
    Broadcast(Event),
    Members {
        space_id: String,
        reply: oneshot::Sender<Vec<String>>,
    },
}

/// The hub's coordination loop. Create one per process with [`Hub::spawn`].
pub struct Hub {
    registry: SpaceRegistry,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Hub {
    pub fn new() -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Self {
            registry: SpaceRegistry::new(),
            commands: rx,
        };
        (hub, HubHandle { commands: tx })
    }

    /// Start the hub on the current tokio runtime.
    pub fn spawn() -> HubHandle {
        let (hub, handle) = Self::new();
        tokio::spawn(hub.run());
        handle
    }

    /// Process requests until every [`HubHandle`] has been dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.apply(command);
        }
        tracing::info!(spaces = self.registry.space_count(), "hub stopped");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Join(record) => {
                let key = record.key().clone();
                if let Some(displaced) = self.registry.join(record) {
                    tracing::info!(
                        space_id = %key.space_id,
                        user_id = %key.user_id,
                        displaced = %displaced.key().connection_id,
                        "connection replaced by a newer one"
                    );
                }
                tracing::debug!(
                    space_id = %key.space_id,
                    user_id = %key.user_id,
                    connection_id = %key.connection_id,
                    members = self.registry.member_count(&key.space_id),
                    "connection joined"
                );
            }
            Command::Leave(key) => match self.registry.leave(&key) {
                Some(record) => {
                    drop(record);
                    tracing::debug!(
                        space_id = %key.space_id,
                        user_id = %key.user_id,
                        connection_id = %key.connection_id,
                        "connection left"
                    );
                    self.fan_out(Event::user_left(&key.space_id, &key.user_id));
                }
                None => {
                    tracing::trace!(connection_id = %key.connection_id, "leave for unregistered connection");
                }
            },
            Command::Broadcast(event) => self.fan_out(event),
            Command::Members { space_id, reply } => {
                let _ = reply.send(self.registry.members(&space_id));
            }
        }
    }

    /// Deliver `event`, then a `user_left` for every connection the delivery
    /// evicted, until no more evictions happen.
    fn fan_out(&mut self, event: Event) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let frame = match event.to_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::error!(?err, kind = %event.kind, "failed to encode event");
                    continue;
                }
            };

            let result = self.registry.fan_out(&event.space_id, &frame);
            tracing::trace!(
                space_id = %event.space_id,
                kind = %event.kind,
                attempted = result.attempted,
                evicted = result.evicted.len(),
                "event fanned out"
            );

            for record in result.evicted {
                pending.push_back(Event::user_left(&event.space_id, record.user_id()));
            }
        }
    }
}

/// Cloneable handle to the hub. Store in `AppState`.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl HubHandle {
    /// Register a connection. The returned [`Membership`] leaves the hub
    /// when dropped.
    #[must_use = "dropping the membership leaves the space immediately"]
    pub fn join(&self, record: ConnectionRecord) -> Membership {
        let key = record.key().clone();
        self.send(Command::Join(record));
        Membership {
            hub: self.clone(),
            key,
        }
    }

    /// Remove a connection and close its transport. No-op if it is not
    /// registered.
    pub fn leave(&self, key: &ConnectionKey) {
        self.send(Command::Leave(key.clone()));
    }

    /// Fan an event out to every connection currently joined to `space_id`.
    ///
    /// Best effort: delivery failures evict the failing connection and are
    /// never reported to the caller.
    pub fn broadcast(&self, space_id: &str, kind: EventType, payload: Value) {
        self.publish(Event::new(space_id, kind, payload));
    }

    /// Fan out an already-built event to its space. Same guarantees as
    /// [`HubHandle::broadcast`].
    pub fn publish(&self, event: Event) {
        self.send(Command::Broadcast(event));
    }

    /// User ids currently joined to `space_id`, sorted.
    ///
    /// Answered after every request sent before it has been applied.
    pub async fn members(&self, space_id: &str) -> Vec<String> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Members {
            space_id: space_id.to_string(),
            reply,
        });
        rx.await.unwrap_or_default()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("hub is not running, request dropped");
        }
    }
}

/// A registered connection. Leaves the hub exactly once, when dropped.
pub struct Membership {
    hub: HubHandle,
    key: ConnectionKey,
}

impl Membership {
    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    pub fn space_id(&self) -> &str {
        &self.key.space_id
    }

    pub fn user_id(&self) -> &str {
        &self.key.user_id
    }

    /// Publish an event, forcing it into this membership's space.
    pub fn publish(&self, mut event: Event) {
        event.space_id.clone_from(&self.key.space_id);
        self.hub.publish(event);
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.hub.leave(&self.key);
    }
}
