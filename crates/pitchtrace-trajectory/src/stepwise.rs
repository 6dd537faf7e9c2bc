use std::f64::consts::PI;

use pitchtrace_core::{PhysicsSettings, PredictedTrajectory, TrackingSample, Vector3};

use crate::physics;

/// Upper bound on the simulated time, as a multiple of the vacuum flight time
const MAX_TIME_FACTOR: f64 = 20.0;

/// Integrate the flight with explicit Euler steps and resample it to `num_points`
/// points uniformly spaced in time.
///
/// Forces are gravity, quadratic drag `½·ρ·Cd·A·|v|·v` and a constant lateral
/// Magnus acceleration `2·k·s`, which reproduces the closed-form `k·s·t²` offset in
/// the absence of drag. `vacuum_time` is the closed-form flight time and sets the
/// step size.
pub(crate) fn integrate(
    sample: &TrackingSample,
    vacuum_time: f64,
    num_points: usize,
    substeps: u32,
    settings: &PhysicsSettings,
) -> PredictedTrajectory {
    let dt = vacuum_time / ((num_points - 1) as f64 * substeps as f64);
    let area = PI * settings.ball_radius * settings.ball_radius;
    let drag_k = 0.5 * settings.air_density * settings.drag_coefficient * area / settings.ball_mass;
    let magnus_acc = 2.0 * settings.magnus_k * sample.spin_rate;
    let max_steps = ((MAX_TIME_FACTOR * vacuum_time) / dt).ceil() as usize;

    let mut pos = sample.position;
    let mut vel = sample.velocity;
    let mut apex = pos.z;
    let mut trace = vec![pos];
    let mut end_time = None;

    for step in 0..max_steps {
        let acc = Vector3::new(0.0, magnus_acc, -settings.gravity) - vel * (drag_k * vel.norm());
        let next_pos = pos + vel * dt;
        let next_vel = vel + acc * dt;

        if next_pos.z <= 0.0 && pos.z > 0.0 {
            let frac = pos.z / (pos.z - next_pos.z);
            let mut crossing = pos + (next_pos - pos) * frac;
            crossing.z = 0.0;
            trace.push(crossing);
            end_time = Some((step as f64 + frac) * dt);
            break;
        }

        pos = next_pos;
        vel = next_vel;
        apex = apex.max(pos.z);
        trace.push(pos);
    }

    let end_time = end_time.unwrap_or_else(|| {
        log::warn!(
            "Stepwise integration did not reach the ground within {} steps",
            max_steps
        );
        (trace.len() - 1) as f64 * dt
    });

    let points = resample(&trace, dt, end_time, num_points);
    let landing_point = trace.last().copied().unwrap_or(sample.position);

    PredictedTrajectory {
        points,
        flight_time: end_time,
        landing_point,
        max_height: apex,
        lateral_deflection: physics::magnus_deflection(sample.spin_rate, end_time, settings),
        degenerate: false,
    }
}

/// Resample a trace recorded every `dt` seconds, whose last entry is at `end_time`.
fn resample(trace: &[Vector3], dt: f64, end_time: f64, num_points: usize) -> Vec<Vector3> {
    let last = trace.len() - 1;
    let time_of = |j: usize| if j == last { end_time } else { j as f64 * dt };

    let mut points = Vec::with_capacity(num_points);
    for i in 0..num_points {
        if i == 0 || last == 0 {
            points.push(trace[0]);
            continue;
        }
        if i == num_points - 1 {
            points.push(trace[last]);
            continue;
        }
        let t = end_time * i as f64 / (num_points - 1) as f64;
        let j = ((t / dt).floor() as usize).min(last - 1);
        let (t0, t1) = (time_of(j), time_of(j + 1));
        let frac = if t1 > t0 {
            ((t - t0) / (t1 - t0)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        points.push(trace[j] + (trace[j + 1] - trace[j]) * frac);
    }
    points
}
