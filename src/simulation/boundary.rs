use crate::{floating_type_mod::FT, V2};

/// Rectangular domain with a seabed that ramps up past `seabed_start_x`.
///
/// The y-axis points downwards (screen coordinates), so the seabed is the
/// *maximum* allowed y and the ramp lowers it as x grows past the threshold.
#[derive(Debug, Clone, Copy)]
pub struct DomainBounds {
    pub width: FT,
    pub height: FT,
    pub seabed_gradient: FT,
    pub seabed_start_x: FT,
}

impl DomainBounds {
    /// Height the seabed has risen above the flat floor at horizontal position `x`.
    /// Zero everywhere before `seabed_start_x`.
    pub fn seabed_rise(&self, x: FT) -> FT {
        ((x - self.seabed_start_x) * self.seabed_gradient).max(0.)
    }

    /// Maximum allowed y at horizontal position `x`.
    pub fn floor_y(&self, x: FT) -> FT {
        self.height - self.seabed_rise(x)
    }

    /// Clamp a tentative position into the domain. The x-range is applied
    /// first so the seabed height is evaluated at the clamped x.
    pub fn clamp(&self, p: &mut V2) {
        if p.x < 0. {
            p.x = 0.;
        }
        if p.x > self.width {
            p.x = self.width;
        }
        if p.y < 0. {
            p.y = 0.;
        }
        let floor_y = self.floor_y(p.x);
        if p.y > floor_y {
            p.y = floor_y;
        }
    }
}

#[cfg(test)]
fn test_bounds() -> DomainBounds {
    DomainBounds {
        width: 1920.,
        height: 980.,
        seabed_gradient: 0.05,
        seabed_start_x: 800.,
    }
}

#[test]
fn clamp_to_seabed_past_slope_start() {
    use crate::vec2f;

    let bounds = test_bounds();
    let mut p = vec2f(900., 10000.);
    bounds.clamp(&mut p);
    assert_eq!(p, vec2f(900., 980. - 5.));
}

#[test]
fn clamp_to_flat_floor_before_slope_start() {
    use crate::vec2f;

    let bounds = test_bounds();
    let mut p = vec2f(500., 10000.);
    bounds.clamp(&mut p);
    assert_eq!(p, vec2f(500., 980.));
}

#[test]
fn clamp_into_x_range_and_ceiling() {
    use crate::vec2f;

    let bounds = test_bounds();

    let mut p = vec2f(-3., -7.);
    bounds.clamp(&mut p);
    assert_eq!(p, vec2f(0., 0.));

    let mut p = vec2f(2500., 400.);
    bounds.clamp(&mut p);
    assert_eq!(p, vec2f(1920., 400.));
}

#[test]
fn seabed_evaluated_at_clamped_x() {
    use crate::vec2f;

    let bounds = test_bounds();

    // x is clamped to width=1920 first, so the seabed rise is
    // (1920 - 800) * 0.05 = 56 even though the raw x is far larger
    let mut p = vec2f(1e6, 1e6);
    bounds.clamp(&mut p);
    assert_eq!(p, vec2f(1920., 980. - 56.));
}

#[test]
fn interior_position_is_untouched() {
    use crate::vec2f;

    let bounds = test_bounds();
    let mut p = vec2f(100., 100.);
    bounds.clamp(&mut p);
    assert_eq!(p, vec2f(100., 100.));
}
