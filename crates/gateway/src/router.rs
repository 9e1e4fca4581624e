use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::tasks::TaskTracker;

/// Error returned by a failing listener. Logged, never propagated.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by a listener.
pub type ListenerFuture = Pin<Box<dyn Future<Output = Result<(), ListenerError>> + Send>>;

/// Listener invoked with the raw dispatch payload.
pub type EventHandler = Arc<dyn Fn(serde_json::Value) -> ListenerFuture + Send + Sync>;

/// Wraps an async closure as an [`EventHandler`].
pub fn handler<F, Fut>(f: F) -> EventHandler
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
{
    Arc::new(move |data| Box::pin(f(data)))
}

/// Routes dispatch events to the listeners registered for their name
pub struct EventRouter {
    /// event name -> listeners
    listeners: DashMap<String, Vec<EventHandler>>,
    tasks: TaskTracker,
}

impl EventRouter {
    /// Creates a router that spawns listener invocations on `tasks`.
    pub fn new(tasks: TaskTracker) -> Self {
        Self {
            listeners: DashMap::new(),
            tasks,
        }
    }

    /// Register a listener for `event`
    pub fn register(&self, event: impl Into<String>, listener: EventHandler) {
        let event = event.into();
        debug!("Registering listener for: {event}");
        self.listeners.entry(event).or_default().push(listener);
    }

    /// Runs every listener for `event` concurrently with its own copy of `data`.
    /// Returns how many were started; the caller never waits on them.
    pub fn dispatch(&self, event: &str, data: serde_json::Value) -> usize {
        let listeners = match self.listeners.get(event) {
            Some(list) => list.clone(),
            None => {
                trace!("No listeners for: {event}");
                return 0;
            }
        };

        for listener in &listeners {
            let listener = listener.clone();
            let data = data.clone();
            let event = event.to_string();
            self.tasks.spawn(async move {
                if let Err(e) = listener(data).await {
                    warn!(%event, "Listener failed: {e}");
                }
            });
        }
        listeners.len()
    }

    /// Number of listeners for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, |list| list.len())
    }

    /// Tracker shared with the listener tasks.
    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }
}
