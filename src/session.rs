//! Glue between analysis results, the calibrator and the overlay.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::calibration::{PointerEvent, ScaleCalibration, ScaleCalibrator, Unit};
use crate::config::{BaseImage, OverlayConfig};
use crate::detection::{classify, combine, AggregatedEntity, Category};
use crate::error::CalibrationError;
use crate::models::AnalysisResult;
use crate::overlay::scene::shared;
use crate::overlay::{
    AnimationLoop, HighlightTarget, HoverDebouncer, OverlayRenderer, OverlayScene, OverlaySurface,
    SharedRenderer, SharedScene,
};

/// Entities and categories derived from the current result list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultsView {
    pub entities: Vec<AggregatedEntity>,
    pub categories: Vec<Category>,
}

impl ResultsView {
    pub fn derive(results: &[AnalysisResult]) -> Self {
        let entities = combine(results);
        let categories = classify(&entities);
        Self {
            entities,
            categories,
        }
    }

    pub fn entity(&self, canonical_name: &str) -> Option<&AggregatedEntity> {
        self.entities
            .iter()
            .find(|entity| entity.canonical_name == canonical_name)
    }

    /// Highlight for the `index`-th instance of a class
    pub fn target(&self, canonical_name: &str, index: usize) -> Option<HighlightTarget> {
        let entity = self.entity(canonical_name)?;
        let instance = entity.instances.get(index)?;
        Some(HighlightTarget::from_instance(&entity.canonical_name, instance))
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Interactive state of one results page.
///
/// Methods that may start background work (hover, pointer, leave) must be
/// called inside a tokio runtime.
pub struct OverlaySession<S> {
    scene: SharedScene,
    renderer: SharedRenderer<S>,
    calibrator: ScaleCalibrator,
    debouncer: HoverDebouncer,
    animation: AnimationLoop,
    config: OverlayConfig,
    results: Vec<AnalysisResult>,
    view: ResultsView,
}

impl<S: OverlaySurface + 'static> OverlaySession<S> {
    pub fn new(surface: S, calibrator: ScaleCalibrator, config: OverlayConfig) -> Self {
        let scene = OverlayScene::new(calibrator.natural_size());
        let renderer = OverlayRenderer::standard(surface, config.clone());
        Self {
            scene: shared(scene),
            renderer: Arc::new(Mutex::new(renderer)),
            calibrator,
            debouncer: HoverDebouncer::new(config.hover_clear_delay()),
            animation: AnimationLoop::new(),
            config,
            results: Vec::new(),
            view: ResultsView::default(),
        }
    }

    pub fn scene(&self) -> SharedScene {
        self.scene.clone()
    }

    pub fn renderer(&self) -> SharedRenderer<S> {
        self.renderer.clone()
    }

    pub fn calibrator(&self) -> &ScaleCalibrator {
        &self.calibrator
    }

    pub fn view(&self) -> &ResultsView {
        &self.view
    }

    pub fn results(&self) -> &[AnalysisResult] {
        &self.results
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_running()
    }

    /// Replace the result list and rebuild the derived view.
    /// Any highlight taken from the old list is dropped.
    pub fn set_results(&mut self, results: Vec<AnalysisResult>) {
        self.debouncer.cancel_pending();
        self.lock_scene().hovered = None;
        self.view = ResultsView::derive(&results);
        self.results = results;
        debug!(
            "Results view rebuilt: {} entities in {} categories",
            self.view.entities.len(),
            self.view.categories.len()
        );
    }

    /// The displayed image changed or finished loading
    pub fn set_image(&mut self, natural_size: Option<(u32, u32)>) {
        self.calibrator.set_natural_size(natural_size);
        self.lock_scene().natural_size = natural_size;
        self.refresh();
    }

    pub fn set_base_image(&mut self, base: BaseImage) {
        self.lock_scene().base = base;
        self.refresh();
    }

    /// Load any calibration stored for this session
    pub fn restore_calibration(&mut self) -> Result<Option<ScaleCalibration>, CalibrationError> {
        let restored = self.calibrator.restore()?.cloned();
        self.refresh();
        Ok(restored)
    }

    pub fn set_drawing_mode(&mut self, enabled: bool) {
        self.calibrator.set_drawing_mode(enabled);
        self.refresh();
    }

    pub fn drawing_mode(&self) -> bool {
        self.calibrator.drawing_mode()
    }

    pub fn is_modal_open(&self) -> bool {
        self.calibrator.is_modal_open()
    }

    pub fn pointer_down(&mut self, event: &PointerEvent) -> bool {
        let consumed = self.calibrator.pointer_down(event);
        if consumed {
            self.refresh();
        }
        consumed
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) -> bool {
        let consumed = self.calibrator.pointer_move(event);
        if consumed {
            self.refresh();
        }
        consumed
    }

    pub fn pointer_up(&mut self, event: &PointerEvent) -> bool {
        let consumed = self.calibrator.pointer_up(event);
        if consumed {
            self.refresh();
        }
        consumed
    }

    pub fn commit_scale(
        &mut self,
        length: &str,
        unit: Unit,
    ) -> Result<ScaleCalibration, CalibrationError> {
        let calibration = self.calibrator.commit(length, unit)?.clone();
        self.refresh();
        Ok(calibration)
    }

    pub fn cancel_scale(&mut self) -> bool {
        let cancelled = self.calibrator.cancel();
        self.refresh();
        cancelled
    }

    pub fn clear_scale(&mut self) -> Result<(), CalibrationError> {
        self.calibrator.clear()?;
        self.refresh();
        Ok(())
    }

    /// Highlight a detection. Cancels any pending clear and leaves drawing mode.
    pub fn hover(&mut self, target: HighlightTarget) {
        self.debouncer.cancel_pending();
        self.calibrator.set_drawing_mode(false);
        debug!("Hovering {}", target.canonical_name);
        self.lock_scene().hovered = Some(target);
        self.refresh();
    }

    /// Highlight the `index`-th instance of a class in the current view
    pub fn hover_instance(&mut self, canonical_name: &str, index: usize) -> bool {
        match self.view.target(canonical_name, index) {
            Some(target) => {
                self.hover(target);
                true
            }
            None => false,
        }
    }

    /// Pointer left the detection; the highlight is cleared after the debounce delay
    pub fn leave(&mut self) {
        self.debouncer.schedule_clear(self.scene.clone());
    }

    pub fn hovered(&self) -> Option<HighlightTarget> {
        self.lock_scene().hovered.clone()
    }

    /// Paint a single frame now, outside the animation loop
    pub fn render_now(&self, now_ms: f64) -> Result<bool, crate::error::RenderError> {
        let scene = self.lock_scene();
        let mut renderer = self.renderer.lock().unwrap_or_else(PoisonError::into_inner);
        renderer.render(&scene, now_ms)
    }

    /// Stop background work and wait for it
    pub async fn shutdown(&mut self) {
        self.debouncer.cancel_pending();
        self.animation.stop().await;
    }

    fn lock_scene(&self) -> std::sync::MutexGuard<'_, OverlayScene> {
        self.scene.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy calibrator state into the scene and make sure animated scenes repaint
    fn refresh(&mut self) {
        let animated = {
            let mut scene = self.lock_scene();
            scene.scale_line = self.calibrator.active().cloned();
            scene.preview = self.calibrator.preview();
            scene.is_animated()
        };
        if animated {
            self.animation.ensure_running(
                self.scene.clone(),
                self.renderer.clone(),
                self.config.frame_interval(),
            );
        }
    }
}
