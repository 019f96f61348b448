//! Value mappings between source literals and what a control displays.

use serde::Serialize;

/// How a 2D pad maps onto a point parameter pair, chosen from the X
/// parameter's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointMapping {
    /// Default 0.5: offsets around the middle of the frame.
    Centered,
    /// Default 1: repeat counts and multipliers.
    Extended,
    Normal,
}

impl PointMapping {
    pub fn from_default(default: Option<f64>) -> Self {
        match default {
            Some(d) if (d - 0.5).abs() < f64::EPSILON => PointMapping::Centered,
            Some(d) if (d - 1.0).abs() < f64::EPSILON => PointMapping::Extended,
            _ => PointMapping::Normal,
        }
    }

    /// Display range `(min, max)` of the pad on both axes.
    pub fn range(self) -> (f64, f64) {
        match self {
            PointMapping::Centered => (-0.5, 0.5),
            PointMapping::Extended => (0.0, 30.0),
            PointMapping::Normal => (0.0, 1.0),
        }
    }

    pub fn to_display(self, value: f64) -> f64 {
        match self {
            PointMapping::Centered => value * 2.0 - 0.5,
            PointMapping::Extended | PointMapping::Normal => value,
        }
    }

    pub fn from_display(self, display: f64) -> f64 {
        match self {
            PointMapping::Centered => (display + 0.5) / 2.0,
            PointMapping::Extended | PointMapping::Normal => display,
        }
    }
}

/// Range and step of a plain number field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumberRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl NumberRange {
    /// Pick a range from the magnitude of the literal.
    pub fn for_value(value: f64) -> Self {
        let magnitude = value.abs();
        if magnitude > 0.0 && magnitude < 1.0 {
            NumberRange {
                min: 0.0,
                max: 1.0,
                step: 0.01,
            }
        } else if (1.0..10.0).contains(&magnitude) {
            NumberRange {
                min: -10.0,
                max: 10.0,
                step: 0.1,
            }
        } else {
            NumberRange {
                min: -100.0,
                max: 100.0,
                step: 1.0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_from_default() {
        assert_eq!(PointMapping::from_default(Some(0.5)), PointMapping::Centered);
        assert_eq!(PointMapping::from_default(Some(1.0)), PointMapping::Extended);
        assert_eq!(PointMapping::from_default(Some(3.0)), PointMapping::Normal);
        assert_eq!(PointMapping::from_default(None), PointMapping::Normal);
    }

    #[test]
    fn centered_mapping_round_trips() {
        let m = PointMapping::Centered;
        assert_eq!(m.range(), (-0.5, 0.5));
        assert_eq!(m.to_display(0.5), 0.5);
        assert_eq!(m.to_display(0.25), 0.0);
        assert_eq!(m.from_display(0.0), 0.25);
        for v in [0.0, 0.1, 0.5, 0.75, 1.0] {
            assert!((m.from_display(m.to_display(v)) - v).abs() < 1e-12);
        }
    }

    #[test]
    fn extended_and_normal_are_identity() {
        assert_eq!(PointMapping::Extended.range(), (0.0, 30.0));
        assert_eq!(PointMapping::Extended.to_display(4.0), 4.0);
        assert_eq!(PointMapping::Normal.range(), (0.0, 1.0));
        assert_eq!(PointMapping::Normal.from_display(0.3), 0.3);
    }

    #[test]
    fn number_ranges_by_magnitude() {
        assert_eq!(NumberRange::for_value(0.3).max, 1.0);
        assert_eq!(NumberRange::for_value(-0.3).step, 0.01);
        assert_eq!(NumberRange::for_value(1.0).min, -10.0);
        assert_eq!(NumberRange::for_value(9.99).step, 0.1);
        assert_eq!(NumberRange::for_value(10.0).max, 100.0);
        assert_eq!(NumberRange::for_value(0.0).step, 1.0);
    }
}
