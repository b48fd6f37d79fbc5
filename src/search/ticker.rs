//! Re-arming poll timer
//!
//! Drives a consumer callback on a fixed period, the way a UI loop polls the
//! search queue. The timer stops re-arming when the callback breaks, when
//! [`Ticker::stop`] is called, or when the handle is dropped.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Default polling period for search results
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to a running poll timer
pub struct Ticker {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Start calling `on_tick` every `period` on the tokio runtime.
    ///
    /// Must be called from within a runtime.
    pub fn start<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        debug!("Ticker stopped by owner");
                        break;
                    }
                    _ = interval.tick() => {
                        if on_tick().is_break() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Whether the timer is still re-arming
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait until the callback breaks out of the loop (or the ticker is stopped)
    pub async fn wait(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.await {
                debug!("Ticker task ended abnormally: {}", e);
            }
            self.handle = None;
        }
    }

    /// Stop re-arming and wait for the task to exit
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        self.wait().await;
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}
