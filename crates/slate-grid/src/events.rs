use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;

type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, String, Listener)>,
}

/// Path-keyed change notifications.
///
/// Listeners are registered against an exact path (`"filter"`,
/// `"filter.status"`, `"update"`) and stay registered for as long as the
/// returned [`Subscription`] is alive.
#[derive(Clone, Default)]
pub struct Emitter {
    inner: Arc<Mutex<Listeners>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, path: impl Into<String>, listener: impl Fn(&Value) + Send + Sync + 'static) -> Subscription {
        let mut listeners = lock(&self.inner);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners
            .entries
            .push((id, path.into(), Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.inner),
        }
    }

    pub fn emit(&self, path: &str, value: &Value) {
        // Snapshot first so listeners may subscribe or unsubscribe re-entrantly.
        let matching: Vec<Listener> = lock(&self.inner)
            .entries
            .iter()
            .filter(|(_, p, _)| p == path)
            .map(|(_, _, l)| Arc::clone(l))
            .collect();
        for listener in matching {
            listener(value);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).entries.len()
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Unregisters its listener when dropped.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.listeners.upgrade() {
            lock(&inner).entries.retain(|(id, _, _)| *id != self.id);
        }
    }
}

fn lock(inner: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emits_only_to_matching_path() {
        let emitter = Emitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = emitter.on("page", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit("page", &json!(2));
        emitter.emit("limit", &json!(10));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let emitter = Emitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = emitter.on("update", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        emitter.emit("update", &Value::Null);
        drop(sub);
        emitter.emit("update", &Value::Null);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn subscription_outliving_emitter_is_harmless() {
        let emitter = Emitter::new();
        let sub = emitter.on("page", |_| {});
        drop(emitter);
        sub.unsubscribe();
    }
}
