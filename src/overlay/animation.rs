//! Self-rearming repaint task for the overlay.
//!
//! The loop paints a frame every tick while the scene reports
//! [`OverlayScene::is_animated`](crate::overlay::scene::OverlayScene::is_animated).
//! The first frame after the scene goes still is painted (clearing the
//! overlay) and the task ends. It is restarted on demand by
//! [`AnimationLoop::ensure_running`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::overlay::renderer::OverlayRenderer;
use crate::overlay::scene::SharedScene;
use crate::overlay::surface::OverlaySurface;

pub type SharedRenderer<S> = Arc<Mutex<OverlayRenderer<S>>>;

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    /// Cleared by the task under the scene lock when it decides to exit
    alive: Arc<AtomicBool>,
}

/// Handle to the single running repaint task, if any
pub struct AnimationLoop {
    epoch: Instant,
    running: Option<RunningTask>,
}

impl Default for AnimationLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationLoop {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|task| task.alive.load(Ordering::SeqCst) && !task.handle.is_finished())
    }

    /// Start the task unless one is already running. Must be called inside a
    /// tokio runtime. Returns whether a new task was spawned.
    pub fn ensure_running<S>(
        &mut self,
        scene: SharedScene,
        renderer: SharedRenderer<S>,
        interval: Duration,
    ) -> bool
    where
        S: OverlaySurface + 'static,
    {
        if self.is_running() {
            return false;
        }
        let cancel = CancellationToken::new();
        let alive = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(run(
            scene,
            renderer,
            interval,
            self.epoch,
            cancel.clone(),
            alive.clone(),
        ));
        self.running = Some(RunningTask {
            cancel,
            handle,
            alive,
        });
        debug!("Animation loop started");
        true
    }

    /// Signal the task to stop without waiting for it
    pub fn cancel(&self) {
        if let Some(task) = &self.running {
            task.cancel.cancel();
        }
    }

    /// Cancel the task and wait for it to finish
    pub async fn stop(&mut self) {
        let Some(task) = self.running.take() else {
            return;
        };
        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            warn!("Animation loop ended abnormally: {}", e);
        }
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run<S: OverlaySurface>(
    scene: SharedScene,
    renderer: SharedRenderer<S>,
    interval: Duration,
    epoch: Instant,
    cancel: CancellationToken,
    alive: Arc<AtomicBool>,
) {
    loop {
        let now_ms = epoch.elapsed().as_secs_f64() * 1000.0;
        let animated = {
            let scene = scene.lock().unwrap_or_else(PoisonError::into_inner);
            let mut renderer = renderer.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = renderer.render(&scene, now_ms) {
                warn!("Overlay frame failed: {}", e);
            }
            let animated = scene.is_animated();
            if !animated {
                alive.store(false, Ordering::SeqCst);
            }
            animated
        };

        if !animated {
            debug!("Scene is still, animation loop exiting");
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                alive.store(false, Ordering::SeqCst);
                debug!("Animation loop cancelled");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
