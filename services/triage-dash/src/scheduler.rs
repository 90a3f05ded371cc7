// services/triage-dash/src/scheduler.rs
//
// Fixed-period poller driving background refresh cycles

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::app::AppEvent;
use crate::store::StateStore;

pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    /// Start polling. The first tick fires immediately and provides the
    /// initial load. A tick that lands while a cycle is in flight is skipped.
    pub fn spawn(store: Arc<StateStore>, period: Duration, tx: UnboundedSender<AppEvent>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Polling every {:?}", period);

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                match store.try_refresh().await {
                    Some(outcome) => {
                        if tx.send(AppEvent::Refreshed(outcome)).is_err() {
                            break;
                        }
                    }
                    None => debug!("Poll tick skipped: refresh already in flight"),
                }
            }
            info!("Poller stopped");
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}
