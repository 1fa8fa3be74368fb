//! Environment needed to resolve relative units while composing values.

use serde::{Deserialize, Serialize};

use crate::value::LengthUnit;

const CSS_PX_PER_IN: f32 = 96.0;

/// Per-target environment: font metrics, viewport and `currentColor`.
///
/// Hosts build one of these for each animated target; operators that need to
/// mix units (e.g. `1em` to `20px`) resolve both sides to user units first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueContext {
    pub font_size: f32,
    pub x_height: f32,
    /// Viewport width and height in user units.
    pub viewport: [f32; 2],
    pub current_color: [f32; 4],
    /// Which viewport axis percentages resolve against.
    #[serde(default)]
    pub percent_axis: PercentAxis,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PercentAxis {
    X,
    Y,
    #[default]
    Diagonal,
}

impl Default for ValueContext {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            x_height: 8.0,
            viewport: [100.0, 100.0],
            current_color: [0.0, 0.0, 0.0, 255.0],
            percent_axis: PercentAxis::Diagonal,
        }
    }
}

impl ValueContext {
    /// Convert a length to user units.
    pub fn to_user_units(&self, value: f32, unit: LengthUnit) -> f32 {
        match unit {
            LengthUnit::Number | LengthUnit::Px => value,
            LengthUnit::Em => value * self.font_size,
            LengthUnit::Ex => value * self.x_height,
            LengthUnit::Percent => value * self.percent_base() / 100.0,
            LengthUnit::In => value * CSS_PX_PER_IN,
            LengthUnit::Cm => value * CSS_PX_PER_IN / 2.54,
            LengthUnit::Mm => value * CSS_PX_PER_IN / 25.4,
            LengthUnit::Pt => value * CSS_PX_PER_IN / 72.0,
            LengthUnit::Pc => value * CSS_PX_PER_IN / 6.0,
        }
    }

    /// Convert user units back into `unit`.
    pub fn from_user_units(&self, user: f32, unit: LengthUnit) -> f32 {
        let one = self.to_user_units(1.0, unit);
        if one == 0.0 {
            0.0
        } else {
            user / one
        }
    }

    fn percent_base(&self) -> f32 {
        let [w, h] = self.viewport;
        match self.percent_axis {
            PercentAxis::X => w,
            PercentAxis::Y => h,
            PercentAxis::Diagonal => ((w * w + h * h) / 2.0).sqrt(),
        }
    }
}
