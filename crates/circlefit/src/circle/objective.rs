//! Least-squares objective and its gradient with respect to the center.
//!
//! The radius is not a free variable here: callers keep it equal to the mean
//! point distance, so only the center moves the cost.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::types::{Circle, FitError, FitStage};

/// Σ (‖p − center‖ − radius)².
pub fn cost(points: &[[f64; 2]], center: &Vector2<f64>, radius: f64) -> f64 {
    points
        .iter()
        .map(|p| {
            let r = (Vector2::new(p[0], p[1]) - center).norm() - radius;
            r * r
        })
        .sum()
}

/// Which gradient drives the conjugate-gradient directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescentGradient {
    /// `2 Σ (center − p) (d − R) / d`, the exact derivative of the cost with
    /// the radius tied to the mean distance.
    #[default]
    Analytic,
    /// `2 Σ (center − p) (d − R)`: each term carries an extra factor `d`
    /// relative to the analytic derivative.
    DistanceWeighted,
}

/// Distance-weighted descent gradient of [`cost`] with respect to the center:
/// `2 Σ (center − p) (‖p − center‖ − radius)`.
///
/// Near the circle this is roughly `radius` times the analytic gradient, but
/// it does not vanish exactly at the least-squares optimum of noisy data.
pub fn gradient(
    points: &[[f64; 2]],
    center: &Vector2<f64>,
    radius: f64,
    singularity_epsilon: f64,
) -> Result<Vector2<f64>, FitError> {
    accumulate_gradient(points, center, radius, singularity_epsilon, |_| 1.0)
}

/// Exact gradient of [`cost`] with respect to the center:
/// `2 Σ (center − p) (‖p − center‖ − radius) / ‖p − center‖`.
///
/// The radius term drops out because residuals around the mean distance sum
/// to zero.
pub fn analytic_gradient(
    points: &[[f64; 2]],
    center: &Vector2<f64>,
    radius: f64,
    singularity_epsilon: f64,
) -> Result<Vector2<f64>, FitError> {
    accumulate_gradient(points, center, radius, singularity_epsilon, |dist| 1.0 / dist)
}

/// Gradient of the selected form.
pub fn descent_gradient(
    form: DescentGradient,
    points: &[[f64; 2]],
    center: &Vector2<f64>,
    radius: f64,
    singularity_epsilon: f64,
) -> Result<Vector2<f64>, FitError> {
    match form {
        DescentGradient::DistanceWeighted => gradient(points, center, radius, singularity_epsilon),
        DescentGradient::Analytic => {
            analytic_gradient(points, center, radius, singularity_epsilon)
        }
    }
}

fn accumulate_gradient(
    points: &[[f64; 2]],
    center: &Vector2<f64>,
    radius: f64,
    singularity_epsilon: f64,
    weight: impl Fn(f64) -> f64,
) -> Result<Vector2<f64>, FitError> {
    let singular = FitError::NumericalSingularity {
        stage: FitStage::Gradient,
    };

    let mut g = Vector2::<f64>::zeros();
    for p in points {
        let offset = center - Vector2::new(p[0], p[1]);
        let dist = offset.norm();
        if dist <= singularity_epsilon {
            tracing::warn!(
                "gradient: point ({}, {}) coincides with center ({}, {})",
                p[0],
                p[1],
                center.x,
                center.y
            );
            return Err(singular);
        }
        g += offset * ((dist - radius) * weight(dist));
    }
    g *= 2.0;

    if !g.x.is_finite() || !g.y.is_finite() {
        tracing::warn!("gradient is not finite at center ({}, {})", center.x, center.y);
        return Err(singular);
    }
    Ok(g)
}

/// RMS of the radial residuals of `points` against `circle`.
pub fn rms_residual(circle: &Circle, points: &[[f64; 2]]) -> f64 {
    if points.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = points
        .iter()
        .map(|&p| {
            let e = circle.residual(p);
            e * e
        })
        .sum();
    (sum / points.len() as f64).sqrt()
}

/// Largest absolute radial residual of `points` against `circle`.
pub fn max_abs_residual(circle: &Circle, points: &[[f64; 2]]) -> f64 {
    points
        .iter()
        .map(|&p| circle.residual(p).abs())
        .fold(0.0, f64::max)
}
