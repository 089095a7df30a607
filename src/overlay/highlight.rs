use std::sync::PoisonError;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::overlay::scene::SharedScene;

/// Delays clearing the hover highlight after the pointer leaves.
///
/// At most one clear is pending; a new leave replaces it and a new hover
/// cancels it.
pub struct HoverDebouncer {
    delay: Duration,
    pending: Option<CancellationToken>,
}

impl HoverDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|token| !token.is_cancelled())
    }

    pub fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// Clear `scene.hovered` after the delay unless cancelled first.
    /// Must be called inside a tokio runtime.
    pub fn schedule_clear(&mut self, scene: SharedScene) {
        self.cancel_pending();
        let token = CancellationToken::new();
        self.pending = Some(token.clone());
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let mut scene = scene.lock().unwrap_or_else(PoisonError::into_inner);
                    // A hover may have cancelled us while we waited for the lock
                    if !token.is_cancelled() {
                        scene.hovered = None;
                        token.cancel();
                        debug!("Hover highlight cleared");
                    }
                }
            }
        });
    }
}

impl Drop for HoverDebouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
