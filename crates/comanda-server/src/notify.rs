//! WebSocket fan-out: one global broadcast channel plus per-tracking-code
//! rooms.
//!
//! Delivery is best-effort. A closed or lagging subscriber is dropped
//! silently; publishing never blocks a request handler and never fails it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// OrderEvent
// ---------------------------------------------------------------------------

/// Server→client events, tagged by `type` on the wire.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    #[serde(rename = "order-created")]
    OrderCreated {
        #[serde(rename = "pedido")]
        order: Value,
    },
    #[serde(rename = "order-updated")]
    OrderUpdated {
        #[serde(rename = "pedido")]
        order: Value,
    },
    #[serde(rename = "order-line-updated")]
    OrderLineUpdated {
        #[serde(rename = "pedido")]
        order: Value,
        #[serde(rename = "lineas")]
        lines: Value,
    },
    #[serde(rename = "product-created")]
    ProductCreated {
        #[serde(rename = "producto")]
        product: Value,
    },
}

impl OrderEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated { .. } => "order-created",
            OrderEvent::OrderUpdated { .. } => "order-updated",
            OrderEvent::OrderLineUpdated { .. } => "order-line-updated",
            OrderEvent::ProductCreated { .. } => "product-created",
        }
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

type Rooms = HashMap<String, HashMap<Uuid, mpsc::UnboundedSender<OrderEvent>>>;

/// Handle for publishing events and managing room membership.
#[derive(Clone)]
pub struct Notifier {
    global: broadcast::Sender<OrderEvent>,
    rooms: Arc<RwLock<Rooms>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (global, _rx) = broadcast::channel::<OrderEvent>(1024);
        Self {
            global,
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Subscribe to the global channel (every event, all rooms).
    pub fn subscribe_global(&self) -> broadcast::Receiver<OrderEvent> {
        self.global.subscribe()
    }

    /// Join a tracking room. The returned id identifies this membership
    /// for [`leave`]; the receiver yields room-scoped events.
    pub async fn join(&self, code: &str) -> (Uuid, mpsc::UnboundedReceiver<OrderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.join_as(code, id, tx).await;
        (id, rx)
    }

    /// Join with a caller-owned sender, so one socket connection can sit
    /// in several rooms behind a single receive loop.
    pub async fn join_as(&self, code: &str, id: Uuid, tx: mpsc::UnboundedSender<OrderEvent>) {
        let mut rooms = self.rooms.write().await;
        rooms.entry(code.to_string()).or_default().insert(id, tx);
    }

    /// Leave one room. Empty rooms are removed from the registry.
    pub async fn leave(&self, code: &str, id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(code) {
            members.remove(&id);
            if members.is_empty() {
                rooms.remove(code);
            }
        }
    }

    /// Drop a subscriber from every room (socket closed).
    pub async fn disconnect(&self, id: Uuid) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
    }

    /// Publish on the global channel only.
    pub fn publish_global(&self, event: OrderEvent) {
        if self.global.send(event.clone()).is_err() {
            tracing::debug!(kind = event.kind(), "no global subscribers");
        }
    }

    /// Publish to one tracking room and to the global channel.
    pub async fn publish_room(&self, code: &str, event: OrderEvent) {
        {
            let rooms = self.rooms.read().await;
            if let Some(members) = rooms.get(code) {
                for tx in members.values() {
                    let _ = tx.send(event.clone());
                }
            }
        }
        self.publish_global(event);
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> OrderEvent {
        OrderEvent::OrderUpdated {
            order: json!({"id": 1, "estado": "Ready"}),
        }
    }

    #[tokio::test]
    async fn room_members_receive_room_events() {
        let notifier = Notifier::new();
        let (_id, mut rx) = notifier.join("AB12C").await;

        notifier.publish_room("AB12C", event()).await;

        let got = rx.recv().await.expect("room event");
        assert_eq!(got.kind(), "order-updated");
    }

    #[tokio::test]
    async fn other_rooms_do_not_receive_room_events() {
        let notifier = Notifier::new();
        let (_id, mut rx) = notifier.join("ZZZZZ").await;

        notifier.publish_room("AB12C", event()).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn global_subscribers_see_room_scoped_events() {
        let notifier = Notifier::new();
        let mut global = notifier.subscribe_global();

        notifier.publish_room("AB12C", event()).await;

        let got = global.recv().await.expect("global event");
        assert_eq!(got.kind(), "order-updated");
    }

    #[tokio::test]
    async fn leave_then_publish_delivers_nothing() {
        let notifier = Notifier::new();
        let (id, mut rx) = notifier.join("AB12C").await;
        notifier.leave("AB12C", id).await;

        notifier.publish_room("AB12C", event()).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(notifier.room_count().await, 0);
    }

    #[tokio::test]
    async fn disconnect_clears_every_room_membership() {
        let notifier = Notifier::new();
        let (id, _rx_a) = notifier.join("AAAAA").await;
        let mut rooms = notifier.rooms.write().await;
        rooms
            .entry("BBBBB".to_string())
            .or_default()
            .insert(id, mpsc::unbounded_channel().0);
        drop(rooms);

        notifier.disconnect(id).await;
        assert_eq!(notifier.room_count().await, 0);
    }

    #[test]
    fn events_serialize_with_kebab_type_tag() {
        let json = serde_json::to_value(OrderEvent::ProductCreated {
            product: json!({"id": 3}),
        })
        .unwrap();
        assert_eq!(json["type"], "product-created");
        assert_eq!(json["producto"]["id"], 3);
    }
}
