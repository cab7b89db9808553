use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::collaborators::{AlarmScheduler, Clock};

/// One-shot named timers on the tokio runtime.
///
/// Fired alarm names are delivered on the receiver returned by [`TokioAlarms::new`].
/// Delays are measured against the same [`Clock`] the automation uses.
pub struct TokioAlarms {
    pending: Mutex<HashMap<String, JoinHandle<()>>>,
    fired: mpsc::UnboundedSender<String>,
    clock: Arc<dyn Clock>,
}

impl TokioAlarms {
    pub fn new(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (fired, rx) = mpsc::unbounded_channel();
        let alarms = Self {
            pending: Mutex::new(HashMap::new()),
            fired,
            clock,
        };
        (alarms, rx)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.get(name).is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }
}

impl AlarmScheduler for TokioAlarms {
    fn arm_once(&self, name: &str, when: DateTime<Utc>) {
        let delay = (when - self.clock.now()).to_std().unwrap_or(Duration::ZERO);
        let tx = self.fired.clone();
        let alarm = name.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            log::debug!("[Alarm] '{}' fired", alarm);
            let _ = tx.send(alarm);
        });

        log::debug!("[Alarm] '{}' armed for {} (in {:?})", name, when, delay);
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.insert(name.to_string(), handle) {
                previous.abort();
            }
        }
    }

    fn cancel(&self, name: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.remove(name) {
                log::debug!("[Alarm] '{}' cancelled", name);
                previous.abort();
            }
        }
    }
}
