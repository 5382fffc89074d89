//! Step length along a search direction.

use nalgebra::Vector2;

use super::estimate::mean_radius;
use super::objective::cost;
use super::types::{FitError, FitStage};

/// Quadratic model of the cost along a search direction `u`.
///
/// With the radius tied to the mean distance, the cost along `u` behaves like
/// `cost + 2·slope·λ + curvature·λ²` near `λ = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineModel {
    /// `Σ c1 (d − R)`, half the directional derivative.
    pub slope: f64,
    /// `‖u‖² Σ (d − R)/d − (Σ c1)² / n + R Σ c1²/d`, half the second
    /// directional derivative.
    pub curvature: f64,
}

impl LineModel {
    /// Cost decrease the model predicts at its minimizer.
    ///
    /// Zero when the slope vanishes; infinite when the model is not convex
    /// and so has no minimizer.
    pub fn predicted_decrease(&self) -> f64 {
        if self.slope == 0.0 {
            0.0
        } else if self.curvature > 0.0 {
            self.slope * self.slope / self.curvature
        } else {
            f64::INFINITY
        }
    }
}

/// Fit the [`LineModel`] of the cost at `center` along `u`.
///
/// With `d = ‖center − p‖` and `c1 = (center − p)·u / d`, both derivatives
/// reduce to per-point partial sums.
pub fn line_model(
    points: &[[f64; 2]],
    center: &Vector2<f64>,
    radius: f64,
    u: &Vector2<f64>,
    singularity_epsilon: f64,
) -> Result<LineModel, FitError> {
    let singular = FitError::NumericalSingularity {
        stage: FitStage::LineSearch,
    };

    let mut sum1 = 0.0;
    let mut sum2 = 0.0;
    let mut sum_fac = 0.0;
    let mut sum_fac_dr = 0.0;
    for p in points {
        let offset = center - Vector2::new(p[0], p[1]);
        let dist = offset.norm();
        if !dist.is_finite() || dist <= singularity_epsilon {
            tracing::warn!(
                "line search: point ({}, {}) coincides with center ({}, {})",
                p[0],
                p[1],
                center.x,
                center.y
            );
            return Err(singular);
        }
        let c1 = offset.dot(u) / dist;
        let c2 = dist - radius;
        sum1 += c1 * c2;
        sum2 += c2 / dist;
        sum_fac += c1;
        sum_fac_dr += c1 * c1 / dist;
    }

    let n = points.len() as f64;
    Ok(LineModel {
        slope: sum1,
        curvature: u.norm_squared() * sum2 - sum_fac * sum_fac / n + radius * sum_fac_dr,
    })
}

/// One Newton step on the directional derivative of the cost along `u`:
///
/// ```text
/// λ = −Σ c1 (d − R) / (‖u‖² Σ (d − R)/d − (Σ c1)² / n + R Σ c1²/d)
/// ```
///
/// Where the cost is concave along `u` the result points uphill; see
/// [`guarded_step`].
pub fn newton_step(
    points: &[[f64; 2]],
    center: &Vector2<f64>,
    radius: f64,
    u: &Vector2<f64>,
    singularity_epsilon: f64,
) -> Result<f64, FitError> {
    let model = line_model(points, center, radius, u, singularity_epsilon)?;
    let lambda = -model.slope / model.curvature;
    if !model.curvature.is_finite() || model.curvature == 0.0 || !lambda.is_finite() {
        tracing::warn!(
            "line search: no finite Newton step (slope {:.3e}, curvature {:.3e})",
            model.slope,
            model.curvature
        );
        return Err(FitError::NumericalSingularity {
            stage: FitStage::LineSearch,
        });
    }
    Ok(lambda)
}

/// Outcome of a guarded step along the search direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Whether the step was taken. A rejected step leaves the estimate
    /// unchanged.
    pub accepted: bool,
    /// Step length actually taken (0 when rejected).
    pub lambda: f64,
    /// Center after the step.
    pub center: Vector2<f64>,
    /// Mean-distance radius at the new center.
    pub radius: f64,
    /// Cost at the new center and radius.
    pub cost: f64,
    /// Number of times the initial step was halved.
    pub halvings: usize,
}

impl Step {
    fn rejected(center: &Vector2<f64>, radius: f64, current_cost: f64, halvings: usize) -> Self {
        Self {
            accepted: false,
            lambda: 0.0,
            center: *center,
            radius,
            cost: current_cost,
            halvings,
        }
    }
}

/// Step along `u` without raising the cost.
///
/// Starts from the Newton step where the cost is convex along `u`. Otherwise
/// the Newton step would point uphill, so the first trial instead goes
/// downhill far enough to zero a linear model of the cost. The trial is
/// halved while it raises `current_cost`, at most `max_halvings` times,
/// after which the step is rejected.
///
/// `max_halvings == 0` takes the raw Newton step unconditionally.
pub fn guarded_step(
    points: &[[f64; 2]],
    center: &Vector2<f64>,
    radius: f64,
    current_cost: f64,
    u: &Vector2<f64>,
    singularity_epsilon: f64,
    max_halvings: usize,
) -> Result<Step, FitError> {
    if max_halvings == 0 {
        let lambda = newton_step(points, center, radius, u, singularity_epsilon)?;
        let trial_center = center + u * lambda;
        let trial_radius = mean_radius(points, &trial_center)?;
        return Ok(Step {
            accepted: true,
            lambda,
            center: trial_center,
            radius: trial_radius,
            cost: cost(points, &trial_center, trial_radius),
            halvings: 0,
        });
    }

    let model = line_model(points, center, radius, u, singularity_epsilon)?;
    let mut lambda = if model.curvature > 0.0 {
        -model.slope / model.curvature
    } else if model.slope != 0.0 {
        -current_cost / (2.0 * model.slope)
    } else {
        f64::NAN
    };
    if !lambda.is_finite() {
        tracing::trace!("no descent along direction (slope {:.3e})", model.slope);
        return Ok(Step::rejected(center, radius, current_cost, 0));
    }

    for halvings in 0..=max_halvings {
        let trial_center = center + u * lambda;
        let trial_radius = mean_radius(points, &trial_center)?;
        let trial_cost = cost(points, &trial_center, trial_radius);
        if trial_cost <= current_cost {
            return Ok(Step {
                accepted: true,
                lambda,
                center: trial_center,
                radius: trial_radius,
                cost: trial_cost,
                halvings,
            });
        }
        lambda *= 0.5;
    }

    tracing::trace!("step rejected after {} halvings", max_halvings);
    Ok(Step::rejected(center, radius, current_cost, max_halvings))
}
