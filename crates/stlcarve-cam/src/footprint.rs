//! Conservative surface sampling under a circular tool footprint.
//!
//! A flat end mill of radius R touches the surface anywhere inside its
//! footprint, not just below its axis. Lowering the tool to the center
//! height would gouge sloped material, so the cutting height is the
//! maximum of a nine-point stencil: the center, four axis points at
//! distance R and four diagonal points at (±R/√2, ±R/√2).

use crate::HeightField;
use std::f64::consts::FRAC_1_SQRT_2;

/// Stencil offsets in units of the tool radius.
const STENCIL: [(f64, f64); 9] = [
    (0.0, 0.0),
    (-1.0, 0.0),
    (1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
    (FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    (-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    (FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
];

/// Highest elevation the tool can contact when centered at (x, y).
pub fn effective_height<H: HeightField + ?Sized>(field: &H, x: f64, y: f64, radius: f64) -> f64 {
    STENCIL
        .iter()
        .map(|&(sx, sy)| field.elevation(x + sx * radius, y + sy * radius))
        .fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Flat(f64);

    impl HeightField for Flat {
        fn elevation(&self, _x: f64, _y: f64) -> f64 {
            self.0
        }

        fn bounds(&self) -> [f64; 4] {
            [0.0, 0.0, 1.0, 1.0]
        }
    }

    /// A single spike of height `h` at the origin on a zero background.
    struct Spike(f64);

    impl HeightField for Spike {
        fn elevation(&self, x: f64, y: f64) -> f64 {
            if x.abs() < 1e-9 && y.abs() < 1e-9 {
                self.0
            } else {
                0.0
            }
        }

        fn bounds(&self) -> [f64; 4] {
            [-1.0, -1.0, 1.0, 1.0]
        }
    }

    /// Records every query and returns a fixed slope.
    struct Probe {
        calls: Cell<usize>,
    }

    impl HeightField for Probe {
        fn elevation(&self, x: f64, _y: f64) -> f64 {
            self.calls.set(self.calls.get() + 1);
            x
        }

        fn bounds(&self) -> [f64; 4] {
            [0.0, 0.0, 1.0, 1.0]
        }
    }

    #[test]
    fn test_flat_field_is_constant() {
        for radius in [0.0, 0.5, 1.5, 12.0] {
            assert_eq!(effective_height(&Flat(3.25), 7.0, -2.0, radius), 3.25);
        }
    }

    #[test]
    fn test_spike_inside_footprint() {
        assert_eq!(effective_height(&Spike(4.0), 0.0, 0.0, 1.5), 4.0);
    }

    #[test]
    fn test_spike_outside_footprint() {
        let r = 1.5;
        assert_eq!(effective_height(&Spike(4.0), 2.0 * r, 2.0 * r, r), 0.0);
    }

    #[test]
    fn test_spike_under_axis_point() {
        // Tool centered R to the right of the spike reaches it with its -X point
        assert_eq!(effective_height(&Spike(4.0), 2.0, 0.0, 2.0), 4.0);
    }

    #[test]
    fn test_slope_reports_uphill_edge() {
        let probe = Probe {
            calls: Cell::new(0),
        };
        let z = effective_height(&probe, 10.0, 0.0, 3.0);
        assert!((z - 13.0).abs() < 1e-12);
        assert_eq!(probe.calls.get(), 9);
    }
}
