use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

/// Handler invoked with the payload of an event.
pub type Listener = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Token returned by registration, used to remove the handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event name to ordered list of handlers.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    topics: HashMap<String, Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    pub fn add(&mut self, event: &str, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.topics
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Removes a handler. Returns `false` if it was not registered for
    /// `event`.
    pub fn remove(&mut self, event: &str, id: ListenerId) -> bool {
        let Some(listeners) = self.topics.get_mut(event) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.topics.remove(event);
        }
        removed
    }

    /// Handlers of `event` in registration order.
    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.topics
            .get(event)
            .map(|listeners| listeners.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.topics.clear();
    }
}

/// Invokes every handler of `event` in registration order.
///
/// The registry lock is released before the first handler runs, so handlers
/// may register or remove listeners. A handler that returns an error or
/// panics is logged and skipped; the remaining handlers still run. Returns
/// the number of handlers that failed.
pub(crate) fn dispatch(registry: &Mutex<ListenerRegistry>, event: &str, payload: &Value) -> usize {
    let listeners = registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .listeners(event);

    let mut failures = 0;
    for listener in listeners {
        match catch_unwind(AssertUnwindSafe(|| listener(payload))) {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                failures += 1;
                log::error!("Error in event listener for {event}: {error:#}");
            }
            Err(_) => {
                failures += 1;
                log::error!("Event listener for {event} panicked");
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Listener {
        let log = log.clone();
        Arc::new(move |payload: &Value| -> anyhow::Result<()> {
            log.lock().unwrap().push(format!("{name}:{payload}"));
            Ok(())
        })
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Mutex::new(ListenerRegistry::default());
        {
            let mut guard = registry.lock().unwrap();
            guard.add("alert", recorder(&log, "first"));
            guard.add("alert", recorder(&log, "second"));
            guard.add("other", recorder(&log, "unrelated"));
        }

        dispatch(&registry, "alert", &json!(1));
        assert_eq!(*log.lock().unwrap(), vec!["first:1", "second:1"]);
    }

    #[test]
    fn failing_handlers_do_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Mutex::new(ListenerRegistry::default());
        {
            let mut guard = registry.lock().unwrap();
            guard.add(
                "alert",
                Arc::new(|_: &Value| -> anyhow::Result<()> { anyhow::bail!("broken handler") }),
            );
            guard.add(
                "alert",
                Arc::new(|_: &Value| -> anyhow::Result<()> { panic!("handler panicked") }),
            );
            guard.add("alert", recorder(&log, "survivor"));
        }

        let failures = dispatch(&registry, "alert", &json!("x"));
        assert_eq!(failures, 2);
        assert_eq!(*log.lock().unwrap(), vec!["survivor:\"x\""]);
    }

    #[test]
    fn removed_handlers_are_not_called() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Mutex::new(ListenerRegistry::default());
        let id = registry
            .lock()
            .unwrap()
            .add("alert", recorder(&log, "gone"));
        assert!(registry.lock().unwrap().remove("alert", id));
        assert!(!registry.lock().unwrap().remove("alert", id));

        dispatch(&registry, "alert", &json!(null));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(registry.lock().unwrap().listeners("alert").len(), 0);
    }

    #[test]
    fn handlers_may_register_listeners_while_dispatching() {
        let registry = Arc::new(Mutex::new(ListenerRegistry::default()));
        let inner = registry.clone();
        registry.lock().unwrap().add(
            "alert",
            Arc::new(move |_: &Value| -> anyhow::Result<()> {
                inner
                    .lock()
                    .unwrap()
                    .add("alert", Arc::new(|_: &Value| -> anyhow::Result<()> { Ok(()) }));
                Ok(())
            }),
        );

        assert_eq!(dispatch(&registry, "alert", &json!(null)), 0);
        assert_eq!(registry.lock().unwrap().listeners("alert").len(), 2);
    }
}
