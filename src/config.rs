use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::model::DayWindow;

/// Geometry of the rendered day grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayoutConfigFields")]
pub struct LayoutConfig {
    pub window: DayWindow,
    /// Vertical units per hour of wall-clock time.
    pub unit_per_hour: f64,
    /// Visibility floor for short items.
    pub min_height: f64,
    pub lane_origin_x: f64,
    pub available_width: f64,
    pub gutter: f64,
}

/// Wire shape of `LayoutConfig`, checked before it becomes one.
#[derive(Deserialize)]
struct LayoutConfigFields {
    window: DayWindow,
    unit_per_hour: f64,
    min_height: f64,
    lane_origin_x: f64,
    available_width: f64,
    gutter: f64,
}

impl TryFrom<LayoutConfigFields> for LayoutConfig {
    type Error = EngineError;

    fn try_from(f: LayoutConfigFields) -> Result<Self, Self::Error> {
        Self {
            window: f.window,
            unit_per_hour: f.unit_per_hour,
            min_height: f.min_height,
            lane_origin_x: f.lane_origin_x,
            available_width: f.available_width,
            gutter: f.gutter,
        }
        .validated()
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            window: DayWindow::default(),
            unit_per_hour: 60.0,
            min_height: 20.0,
            lane_origin_x: 0.0,
            available_width: 300.0,
            gutter: 2.0,
        }
    }
}

impl LayoutConfig {
    /// Read `DAYPLAN_*` overrides from the environment; unset or unparseable
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let d = Self::default();
        let num = |key: &str, default: f64| -> f64 {
            lookup(key).and_then(|s| s.parse().ok()).unwrap_or(default)
        };
        let hour = |key: &str, default: u32| -> u32 {
            lookup(key).and_then(|s| s.parse().ok()).unwrap_or(default)
        };

        let window = DayWindow::new(
            hour("DAYPLAN_START_HOUR", d.window.start_hour),
            hour("DAYPLAN_END_HOUR", d.window.end_hour),
        )?;
        Self {
            window,
            unit_per_hour: num("DAYPLAN_UNIT_PER_HOUR", d.unit_per_hour),
            min_height: num("DAYPLAN_MIN_HEIGHT", d.min_height),
            lane_origin_x: num("DAYPLAN_LANE_ORIGIN_X", d.lane_origin_x),
            available_width: num("DAYPLAN_AVAILABLE_WIDTH", d.available_width),
            gutter: num("DAYPLAN_GUTTER", d.gutter),
        }
        .validated()
    }

    fn validated(self) -> Result<Self, EngineError> {
        if self.unit_per_hour <= 0.0 || self.available_width <= 0.0 {
            return Err(EngineError::InvalidInput("unit height and width must be positive"));
        }
        Ok(self)
    }
}
