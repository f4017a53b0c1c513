use std::time::Duration;

use intake_core::RuntimeAction;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Delayed and periodic runtime actions fed back into the controller.
///
/// One-shot work hangs off a child token so it can be cancelled on its own;
/// dropping the scheduler stops everything, the auto-save loop included.
#[derive(Debug)]
pub struct DeferredTasks {
    root: CancellationToken,
    pending: CancellationToken,
    sender: UnboundedSender<RuntimeAction>,
}

impl DeferredTasks {
    pub fn new(sender: UnboundedSender<RuntimeAction>) -> Self {
        let root = CancellationToken::new();
        let pending = root.child_token();
        Self {
            root,
            pending,
            sender,
        }
    }

    pub fn schedule_after(&self, delay: Duration, action: RuntimeAction) {
        let token = self.pending.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = sender.send(action);
                }
            }
        });
    }

    /// Sends an [`RuntimeAction::AutoSaveTick`] every `interval`, first one
    /// after a full interval.
    pub fn start_autosave(&self, interval: Duration) {
        let token = self.root.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if sender.send(RuntimeAction::AutoSaveTick).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    pub fn cancel_pending(&mut self) {
        self.pending.cancel();
        self.pending = self.root.child_token();
    }

    pub fn shutdown(&self) {
        self.root.cancel();
    }
}

impl Drop for DeferredTasks {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
