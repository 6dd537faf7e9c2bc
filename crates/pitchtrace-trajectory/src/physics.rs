//! Closed-form projectile model.
//!
//! All functions are pure. The vertical axis is `z`, measured from the ground plane
//! at `z == 0`. Drag is approximated by a multiplicative correction on the horizontal
//! displacement rather than integrated over time, and spin adds a lateral offset
//! that grows quadratically with time.

use std::f64::consts::PI;

use pitchtrace_core::{PhysicsSettings, Vector3};

/// Solve `z0 + vz*t - g*t²/2 = 0` for the positive root.
///
/// Returns `None` when the discriminant is negative (release below the ground) or
/// when the root is not strictly positive, eg. a ball at rest on the ground.
pub fn flight_time(p0: &Vector3, v0: &Vector3, settings: &PhysicsSettings) -> Option<f64> {
    let g = settings.gravity;
    if g <= 0.0 {
        return None;
    }
    let discriminant = v0.z * v0.z + 2.0 * g * p0.z;
    if discriminant < 0.0 {
        return None;
    }
    let t = (v0.z + discriminant.sqrt()) / g;
    if t > 0.0 && t.is_finite() {
        Some(t)
    } else {
        None
    }
}

/// Multiplicative drag correction for horizontal displacement after `t` seconds.
///
/// `1 - (Cd·ρ·π·r²·t) / (2m)`, clamped to `[0, 1]`.
pub fn drag_factor(t: f64, settings: &PhysicsSettings) -> f64 {
    let area = PI * settings.ball_radius * settings.ball_radius;
    let loss = settings.drag_coefficient * settings.air_density * area * t
        / (2.0 * settings.ball_mass);
    (1.0 - loss).clamp(0.0, 1.0)
}

/// Lateral offset caused by spin after `t` seconds: `k·s·t²`.
pub fn magnus_deflection(spin_rate: f64, t: f64, settings: &PhysicsSettings) -> f64 {
    settings.magnus_k * spin_rate * t * t
}

/// Apex height of the flight.
///
/// A ball released with a non-positive vertical velocity never rises above its
/// release height.
pub fn max_height(p0: &Vector3, v0: &Vector3, settings: &PhysicsSettings) -> f64 {
    if v0.z > 0.0 {
        p0.z + v0.z * v0.z / (2.0 * settings.gravity)
    } else {
        p0.z
    }
}

/// Position of the ball at time `t` without spin.
pub fn position_at(p0: &Vector3, v0: &Vector3, t: f64, settings: &PhysicsSettings) -> Vector3 {
    let df = drag_factor(t, settings);
    Vector3::new(
        p0.x + v0.x * t * df,
        p0.y + v0.y * t * df,
        p0.z + v0.z * t - 0.5 * settings.gravity * t * t,
    )
}

/// Position of the ball at time `t`, including the spin deflection on `y`.
pub fn spin_position_at(
    p0: &Vector3,
    v0: &Vector3,
    spin_rate: f64,
    t: f64,
    settings: &PhysicsSettings,
) -> Vector3 {
    let mut p = position_at(p0, v0, t, settings);
    p.y += magnus_deflection(spin_rate, t, settings);
    p
}

/// Where the ball meets the ground after a flight of `t` seconds.
pub fn landing_point(
    p0: &Vector3,
    v0: &Vector3,
    spin_rate: f64,
    t: f64,
    settings: &PhysicsSettings,
) -> Vector3 {
    let df = drag_factor(t, settings);
    Vector3::new(
        p0.x + v0.x * t * df,
        p0.y + v0.y * t * df + magnus_deflection(spin_rate, t, settings),
        0.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn reference() -> (Vector3, Vector3) {
        (Vector3::new(0.0, 1.2, 18.4), Vector3::new(35.0, -12.0, 25.0))
    }

    #[test]
    fn test_reference_flight_time() {
        let settings = PhysicsSettings::default();
        let (p0, v0) = reference();
        let t = flight_time(&p0, &v0, &settings).unwrap();
        let expected = (25.0 + (25.0f64 * 25.0 + 2.0 * 9.81 * 18.4).sqrt()) / 9.81;
        assert_relative_eq!(t, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(t, 5.749, epsilon = 0.01);
    }

    #[test]
    fn test_reference_max_height() {
        let settings = PhysicsSettings::default();
        let (p0, v0) = reference();
        let h = max_height(&p0, &v0, &settings);
        assert_relative_eq!(h, 18.4 + 25.0 * 25.0 / (2.0 * 9.81), epsilon = 1e-12);
        assert_abs_diff_eq!(h, 50.26, epsilon = 0.01);
    }

    #[test]
    fn test_ball_at_rest_on_ground_is_degenerate() {
        let settings = PhysicsSettings::default();
        let t = flight_time(
            &Vector3::new(0.0, 0.0, 0.0),
            &Vector3::new(30.0, 0.0, 0.0),
            &settings,
        );
        assert!(t.is_none());
    }

    #[test]
    fn test_below_ground_release_is_degenerate() {
        let settings = PhysicsSettings::default();
        let t = flight_time(
            &Vector3::new(0.0, 0.0, -1.0),
            &Vector3::new(30.0, 0.0, 1.0),
            &settings,
        );
        assert!(t.is_none());
    }

    #[test]
    fn test_drag_factor() {
        let settings = PhysicsSettings::default();
        assert_eq!(drag_factor(0.0, &settings), 1.0);
        let df = drag_factor(1.0, &settings);
        let area = PI * 0.0366 * 0.0366;
        assert_relative_eq!(df, 1.0 - 0.3 * 1.225 * area / 0.29, epsilon = 1e-12);
        // Never reverses direction
        assert_eq!(drag_factor(1e6, &settings), 0.0);
    }

    #[test]
    fn test_zero_spin_has_no_deflection() {
        let settings = PhysicsSettings::default();
        assert_eq!(magnus_deflection(0.0, 3.0, &settings), 0.0);
        assert_relative_eq!(
            magnus_deflection(2000.0, 2.0, &settings),
            1e-5 * 2000.0 * 4.0
        );
    }

    #[test]
    fn test_position_at_endpoints() {
        let settings = PhysicsSettings::default();
        let (p0, v0) = reference();
        assert_eq!(position_at(&p0, &v0, 0.0, &settings), p0);

        let t = flight_time(&p0, &v0, &settings).unwrap();
        let end = spin_position_at(&p0, &v0, 2400.0, t, &settings);
        let landing = landing_point(&p0, &v0, 2400.0, t, &settings);
        assert_abs_diff_eq!(end.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(end.x, landing.x, epsilon = 1e-12);
        assert_relative_eq!(end.y, landing.y, epsilon = 1e-12);
    }

    #[test]
    fn test_falling_ball_apex_is_release_height() {
        let settings = PhysicsSettings::default();
        let h = max_height(
            &Vector3::new(0.0, 0.0, 1.8),
            &Vector3::new(38.0, 0.0, -2.0),
            &settings,
        );
        assert_eq!(h, 1.8);
    }
}
