//! Typed, synchronous event bus.
//!
//! Handlers subscribe per event type with a priority; dispatch delivers the
//! event to handlers in priority order (highest first, registration order
//! within a priority). Events are passed by mutable reference so listeners
//! can accumulate state on them (the sitemap populate flow relies on this).

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type Handler = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

struct Registration {
    priority: i32,
    seq: u64,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<TypeId, Vec<Registration>>>,
    seq: RwLock<u64>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler for events of type `E` with the given priority.
    pub fn listen<E, F>(&self, priority: i32, handler: F)
    where
        E: Any,
        F: Fn(&mut E) + Send + Sync + 'static,
    {
        let seq = {
            let mut s = self.seq.write();
            *s += 1;
            *s
        };

        let erased: Handler = Arc::new(move |event: &mut dyn Any| {
            if let Some(event) = event.downcast_mut::<E>() {
                handler(event);
            }
        });

        let mut w = self.handlers.write();
        let registrations = w.entry(TypeId::of::<E>()).or_default();
        registrations.push(Registration {
            priority,
            seq,
            handler: erased,
        });
        registrations.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
    }

    /// Deliver the event to all handlers of its type; returns how many ran.
    ///
    /// The handler list is snapshotted before delivery, so handlers may
    /// subscribe new listeners without deadlocking (they take effect on the
    /// next dispatch).
    pub fn dispatch<E: Any>(&self, event: &mut E) -> usize {
        let snapshot: Vec<Handler> = {
            let r = self.handlers.read();
            r.get(&TypeId::of::<E>())
                .map(|regs| regs.iter().map(|r| r.handler.clone()).collect())
                .unwrap_or_default()
        };

        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }
}
