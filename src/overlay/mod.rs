//! Overlay drawn over the floor plan in native image pixels.

pub mod animation;
pub mod highlight;
pub mod layers;
pub mod raster;
pub mod renderer;
pub mod scene;
pub mod surface;

pub use animation::{AnimationLoop, SharedRenderer};
pub use highlight::HoverDebouncer;
pub use layers::{pulse, FrameContext, HighlightLayer, OverlayLayer, PreviewLayer, ScaleLineLayer};
pub use raster::RasterSurface;
pub use renderer::OverlayRenderer;
pub use scene::{HighlightTarget, OverlayScene, SharedScene};
pub use surface::{DisplayList, DrawCommand, OverlaySurface, Stroke};
