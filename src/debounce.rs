use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Duration;

type Handler<T> = Arc<dyn Fn(T) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

struct Pending<T> {
    generation: u64,
    value: Option<T>,
}

/// Trailing-edge coalescing: calls within `window` of each other collapse
/// into one run of the handler with the last call's value.
pub struct Debouncer<T> {
    window: Duration,
    handler: Handler<T>,
    pending: Arc<Mutex<Pending<T>>>,
}

fn lock<T>(pending: &Mutex<Pending<T>>) -> MutexGuard<'_, Pending<T>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(window: Duration, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            window,
            handler: Arc::new(move |value| -> Pin<Box<dyn Future<Output = ()> + Send>> {
                Box::pin(handler(value))
            }),
            pending: Arc::new(Mutex::new(Pending {
                generation: 0,
                value: None,
            })),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `value`; any earlier call still inside the window is dropped.
    ///
    /// The returned handle completes once the window elapsed and, if this
    /// call was the last one, once the handler finished.
    pub fn call(&self, value: T) -> JoinHandle<()> {
        let generation = {
            let mut pending = lock(&self.pending);
            pending.generation += 1;
            pending.value = Some(value);
            pending.generation
        };

        let pending = Arc::clone(&self.pending);
        let handler = Arc::clone(&self.handler);
        let window = self.window;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let value = {
                let mut pending = lock(&pending);
                if pending.generation != generation {
                    return;
                }
                pending.value.take()
            };
            if let Some(value) = value {
                handler(value).await;
            }
        })
    }
}
