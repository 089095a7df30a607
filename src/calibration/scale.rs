use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calibration::geometry::PointerEvent;
use crate::calibration::store::{CalibrationStore, SessionToken};
use crate::error::{CalibrationError, ConfigError};
use crate::models::Point;

/// Real-world length unit of a scale reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Meters,
    Feet,
    Inches,
    Centimeters,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Meters => "meters",
            Unit::Feet => "feet",
            Unit::Inches => "inches",
            Unit::Centimeters => "centimeters",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "meter" | "meters" => Ok(Unit::Meters),
            "ft" | "foot" | "feet" => Ok(Unit::Feet),
            "in" | "inch" | "inches" => Ok(Unit::Inches),
            "cm" | "centimeter" | "centimeters" => Ok(Unit::Centimeters),
            _ => Err(ConfigError::InvalidValue {
                key: "unit",
                value: s.to_string(),
            }),
        }
    }
}

/// A confirmed scale reference line in native image pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleCalibration {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    pub real_world_length: f64,
    pub unit: Unit,
    pub pixels_per_unit: f64,
}

impl ScaleCalibration {
    pub fn start(&self) -> Point {
        Point::new(self.start_x, self.start_y)
    }

    pub fn end(&self) -> Point {
        Point::new(self.end_x, self.end_y)
    }

    pub fn pixel_length(&self) -> f64 {
        self.start().distance_to(&self.end())
    }

    /// Text drawn at the line's midpoint, e.g. `5 meters`
    pub fn label(&self) -> String {
        format!("{} {}", self.real_world_length, self.unit)
    }
}

/// Persisted record for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCalibration {
    pub scale_line: ScaleCalibration,
    pub pixels_per_unit: f64,
}

/// Where the two-point draw gesture currently is
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Drawing { start: Point, current: Point },
    /// Line finished; the confirmation modal is open
    PendingConfirm { start: Point, end: Point },
}

/// Two-point scale line gesture plus the active calibration of a session
pub struct ScaleCalibrator {
    session: SessionToken,
    store: Box<dyn CalibrationStore>,
    natural_size: Option<(u32, u32)>,
    drawing_mode: bool,
    gesture: Gesture,
    active: Option<ScaleCalibration>,
}

impl ScaleCalibrator {
    pub fn new(session: SessionToken, store: Box<dyn CalibrationStore>) -> Self {
        Self {
            session,
            store,
            natural_size: None,
            drawing_mode: false,
            gesture: Gesture::Idle,
            active: None,
        }
    }

    /// Natural pixel size of the image being calibrated; `None` until it loads
    pub fn set_natural_size(&mut self, size: Option<(u32, u32)>) {
        self.natural_size = size;
    }

    pub fn natural_size(&self) -> Option<(u32, u32)> {
        self.natural_size
    }

    pub fn drawing_mode(&self) -> bool {
        self.drawing_mode
    }

    /// Toggle drawing mode. Turning it off abandons a line still being drawn.
    pub fn set_drawing_mode(&mut self, enabled: bool) {
        self.drawing_mode = enabled;
        if !enabled && matches!(self.gesture, Gesture::Drawing { .. }) {
            debug!("Drawing mode disabled mid-gesture, dropping line");
            self.gesture = Gesture::Idle;
        }
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn is_modal_open(&self) -> bool {
        matches!(self.gesture, Gesture::PendingConfirm { .. })
    }

    /// Line to draw as the in-progress preview
    pub fn preview(&self) -> Option<(Point, Point)> {
        match self.gesture {
            Gesture::Idle => None,
            Gesture::Drawing { start, current } => Some((start, current)),
            Gesture::PendingConfirm { start, end } => Some((start, end)),
        }
    }

    pub fn active(&self) -> Option<&ScaleCalibration> {
        self.active.as_ref()
    }

    fn convert(&self, event: &PointerEvent) -> Option<Point> {
        let point = event.to_natural(self.natural_size);
        if point.is_none() {
            warn!("Ignoring pointer event, natural image size unknown or invalid");
        }
        point
    }

    /// Start a line. Returns whether the event was consumed.
    pub fn pointer_down(&mut self, event: &PointerEvent) -> bool {
        if !self.drawing_mode || self.gesture != Gesture::Idle {
            return false;
        }
        let Some(start) = self.convert(event) else {
            return false;
        };
        debug!("Scale line started at ({:.1}, {:.1})", start.x, start.y);
        self.gesture = Gesture::Drawing {
            start,
            current: start,
        };
        true
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) -> bool {
        let Gesture::Drawing { start, .. } = self.gesture else {
            return false;
        };
        let Some(current) = self.convert(event) else {
            return false;
        };
        self.gesture = Gesture::Drawing { start, current };
        true
    }

    /// Finish the line and open the confirmation modal
    pub fn pointer_up(&mut self, event: &PointerEvent) -> bool {
        let Gesture::Drawing { start, .. } = self.gesture else {
            return false;
        };
        let Some(end) = self.convert(event) else {
            return false;
        };
        debug!("Scale line finished at ({:.1}, {:.1})", end.x, end.y);
        self.gesture = Gesture::PendingConfirm { start, end };
        self.drawing_mode = false;
        true
    }

    /// Confirm the pending line with its real-world length.
    ///
    /// On an invalid length nothing changes, so the user can retry.
    pub fn commit(
        &mut self,
        length: &str,
        unit: Unit,
    ) -> Result<&ScaleCalibration, CalibrationError> {
        let Gesture::PendingConfirm { start, end } = self.gesture else {
            return Err(CalibrationError::NothingPending);
        };
        let real_world_length = length
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .ok_or_else(|| CalibrationError::InvalidLength(length.to_string()))?;

        let pixel_length = start.distance_to(&end);
        let pixels_per_unit = pixel_length / real_world_length;
        let calibration = ScaleCalibration {
            start_x: start.x,
            start_y: start.y,
            end_x: end.x,
            end_y: end.y,
            real_world_length,
            unit,
            pixels_per_unit,
        };

        let stored = StoredCalibration {
            scale_line: calibration.clone(),
            pixels_per_unit,
        };
        let json = serde_json::to_string(&stored).map_err(crate::error::StoreError::from)?;
        self.store.set(&self.session.calibration_key(), &json)?;

        info!(
            "Scale calibrated: {:.1} px = {} ({:.3} px/{})",
            pixel_length,
            calibration.label(),
            pixels_per_unit,
            unit
        );
        self.gesture = Gesture::Idle;
        self.drawing_mode = false;
        Ok(self.active.insert(calibration))
    }

    /// Close the modal without saving. Returns whether anything was pending.
    pub fn cancel(&mut self) -> bool {
        if !self.is_modal_open() {
            return false;
        }
        debug!("Scale line discarded");
        self.gesture = Gesture::Idle;
        self.drawing_mode = false;
        true
    }

    /// Remove the active calibration and its stored record
    pub fn clear(&mut self) -> Result<(), CalibrationError> {
        self.store.clear(&self.session.calibration_key())?;
        if self.active.take().is_some() {
            info!("Scale calibration cleared for session {}", self.session);
        }
        Ok(())
    }

    /// Load a previously stored calibration for this session
    pub fn restore(&mut self) -> Result<Option<&ScaleCalibration>, CalibrationError> {
        let Some(json) = self.store.get(&self.session.calibration_key())? else {
            return Ok(None);
        };
        let stored: StoredCalibration =
            serde_json::from_str(&json).map_err(crate::error::StoreError::from)?;
        debug!("Restored scale calibration for session {}", self.session);
        Ok(Some(self.active.insert(stored.scale_line)))
    }
}
