use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::events::{Event, EventKind};

/// What a handler reports back; errors go to the error hook
pub type HandlerResult = anyhow::Result<()>;

type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

trait EventHandler: Send + Sync {
    fn call(&self, event: Event) -> HandlerFuture;
}

impl<F, Fut> EventHandler for F
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, event: Event) -> HandlerFuture {
        Box::pin(self(event))
    }
}

type ErrorHook = Arc<dyn Fn(&Event, &anyhow::Error) + Send + Sync>;

struct PendingListener {
    predicate: Box<dyn Fn(&Event) -> bool + Send + Sync>,
    sender: Option<oneshot::Sender<Event>>,
}

/// Routes decoded events to registered handlers and one-shot waiters
#[derive(Default)]
pub struct Dispatcher {
    handlers: DashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
    waiters: DashMap<Uuid, PendingListener>,
    error_hook: parking_lot::RwLock<Option<ErrorHook>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind; handlers stack, they never replace
    pub fn on<F, Fut>(&self, kind: EventKind, handler: F)
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handlers.entry(kind).or_default().push(Arc::new(handler));
    }

    /// Install a callback for handler errors; replaces any previous hook
    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: Fn(&Event, &anyhow::Error) + Send + Sync + 'static,
    {
        *self.error_hook.write() = Some(Arc::new(hook));
    }

    /// Fan one event out to handlers and waiters
    ///
    /// Never blocks on handler completion. Each handler runs in its own
    /// spawned task; a panic or error in one is contained there.
    pub fn dispatch(&self, event: Event) {
        self.resolve_waiters(&event);

        let Some(handlers) = self.handlers.get(&event.kind()) else {
            return;
        };
        for handler in handlers.iter() {
            let handler = Arc::clone(handler);
            let event = event.clone();
            let hook = self.error_hook.read().clone();
            tokio::spawn(async move {
                let name = event.name().to_string();
                let task = tokio::spawn(handler.call(event.clone()));
                match task.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => match hook {
                        Some(hook) => hook(&event, &e),
                        None => tracing::error!(event = %name, error = %e, "event handler failed"),
                    },
                    Err(join_err) if join_err.is_panic() => {
                        tracing::error!(event = %name, "event handler panicked");
                    }
                    Err(_) => {}
                }
            });
        }
    }

    /// Wait for the first event matching `predicate`
    ///
    /// Returns `None` when `timeout` elapses first. The listener is removed
    /// either way; several concurrent waiters may match the same event.
    pub async fn wait_for<F>(&self, predicate: F, timeout: Duration) -> Option<Event>
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let id = Uuid::new_v4();
        self.waiters.insert(
            id,
            PendingListener {
                predicate: Box::new(predicate),
                sender: Some(sender),
            },
        );

        let result = tokio::time::timeout(timeout, receiver).await;
        self.waiters.remove(&id);
        match result {
            Ok(Ok(event)) => Some(event),
            _ => None,
        }
    }

    fn resolve_waiters(&self, event: &Event) {
        if self.waiters.is_empty() {
            return;
        }
        for mut entry in self.waiters.iter_mut() {
            let listener = entry.value_mut();
            if listener.sender.is_some() && (listener.predicate)(event) {
                if let Some(sender) = listener.sender.take() {
                    // receiver may have timed out already; that is fine
                    let _ = sender.send(event.clone());
                }
            }
        }
        self.waiters.retain(|_, listener| listener.sender.is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn resumed() -> Event {
        Event::Resumed
    }

    #[tokio::test]
    async fn test_handlers_stack_for_one_kind() {
        let dispatcher = Dispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let count = Arc::clone(&count);
            dispatcher.on(EventKind::Resumed, move |_| {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }

        dispatcher.dispatch(resumed());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_stop_others() {
        let dispatcher = Dispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));

        dispatcher.on(EventKind::Resumed, |_| async { panic!("handler bug") });
        let counter = Arc::clone(&count);
        dispatcher.on(EventKind::Resumed, move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        dispatcher.dispatch(resumed());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_hook_sees_handler_errors() {
        let dispatcher = Dispatcher::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let hook_seen = Arc::clone(&seen);
        dispatcher.set_error_hook(move |_, _| {
            hook_seen.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.on(EventKind::Resumed, |_| async {
            Err(anyhow::anyhow!("boom"))
        });

        dispatcher.dispatch(resumed());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out() {
        let dispatcher = Dispatcher::new();
        let result = dispatcher
            .wait_for(|_| true, Duration::from_secs(1))
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_wait_for_resolves_on_match() {
        let dispatcher = Arc::new(Dispatcher::new());
        let waiter = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher
                    .wait_for(
                        |e| e.kind() == EventKind::Resumed,
                        Duration::from_secs(5),
                    )
                    .await
            })
        };
        tokio::task::yield_now().await;

        dispatcher.dispatch(Event::GatewayConnected); // no match
        dispatcher.dispatch(resumed());

        let event = waiter.await.unwrap();
        assert!(matches!(event, Some(Event::Resumed)));
    }

    #[tokio::test]
    async fn test_multiple_waiters_match_one_event() {
        let dispatcher = Arc::new(Dispatcher::new());
        let mut waiters = Vec::new();
        for _ in 0..3 {
            let dispatcher = Arc::clone(&dispatcher);
            waiters.push(tokio::spawn(async move {
                dispatcher.wait_for(|_| true, Duration::from_secs(5)).await
            }));
        }
        tokio::task::yield_now().await;

        dispatcher.dispatch(resumed());
        for waiter in waiters {
            assert!(waiter.await.unwrap().is_some());
        }
    }
}
