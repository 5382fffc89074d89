//! Polak–Ribière conjugate-gradient refinement of the circle center.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::estimate::mean_radius;
use super::line_search::{guarded_step, line_model};
use super::objective::{analytic_gradient, cost, descent_gradient};
use super::types::FitError;
use crate::config::FitConfig;

/// Why the refinement stopped successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Cost fell below `cost_tolerance`: the points lie on the circle.
    ExactFit,
    /// Gradient norm fell below `gradient_tolerance`.
    StationaryGradient,
    /// Relative cost change of an outer iteration fell below
    /// `outer_tolerance`, confirmed along the exact steepest-descent
    /// direction.
    CostSettled,
}

/// Center/radius estimate mutated in place by the refinement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Current center.
    pub center: Vector2<f64>,
    /// Mean distance from the points to `center`.
    pub radius: f64,
    /// Cost at `center` and `radius`.
    pub cost: f64,
}

impl Estimate {
    /// Tie radius and cost to `center`.
    pub fn at(points: &[[f64; 2]], center: Vector2<f64>) -> Result<Self, FitError> {
        let radius = mean_radius(points, &center)?;
        Ok(Self {
            center,
            radius,
            cost: cost(points, &center, radius),
        })
    }
}

/// Successful refinement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refinement {
    /// Final estimate, equal to the refined one.
    pub estimate: Estimate,
    /// Outer iterations performed before stopping.
    pub iterations: usize,
    /// Which convergence test ended the refinement.
    pub stop_reason: StopReason,
}

/// Search direction carried between outer iterations.
#[derive(Debug, Clone, Copy)]
struct Conjugate {
    gradient: Vector2<f64>,
    direction: Vector2<f64>,
}

fn relative_change(before: f64, after: f64) -> f64 {
    if after == 0.0 {
        return 0.0;
    }
    (after - before).abs() / after
}

/// Polak–Ribière direction: `−g + β u_prev` with
/// `β = g·(g − g_prev) / ‖g_prev‖²`. Falls back to steepest descent when the
/// result does not point downhill.
fn conjugate_direction(g: &Vector2<f64>, previous: Option<&Conjugate>) -> Vector2<f64> {
    let steepest = -g;
    let Some(prev) = previous else {
        return steepest;
    };
    let denom = prev.gradient.norm_squared();
    if denom == 0.0 {
        return steepest;
    }
    let beta = g.dot(&(g - prev.gradient)) / denom;
    let u = steepest + prev.direction * beta;
    if !u.x.is_finite() || !u.y.is_finite() || u.dot(g) >= 0.0 {
        tracing::trace!("conjugate direction restarted (beta = {:.3e})", beta);
        return steepest;
    }
    u
}

/// Take up to `max_inner_iterations` guarded sub-steps along `u`.
///
/// Returns whether any step was accepted.
fn search_along(
    points: &[[f64; 2]],
    estimate: &mut Estimate,
    u: &Vector2<f64>,
    config: &FitConfig,
) -> Result<bool, FitError> {
    let mut moved = false;
    for _ in 0..config.max_inner_iterations {
        let before = estimate.cost;
        let step = guarded_step(
            points,
            &estimate.center,
            estimate.radius,
            estimate.cost,
            u,
            config.singularity_epsilon,
            config.max_step_halvings,
        )?;
        if !step.accepted {
            break;
        }
        moved = true;
        estimate.center = step.center;
        estimate.radius = step.radius;
        estimate.cost = step.cost;

        if estimate.cost < config.cost_tolerance
            || relative_change(before, estimate.cost) <= config.inner_tolerance
        {
            break;
        }
    }
    Ok(moved)
}

/// Whether a line search along the exact steepest-descent direction could
/// still lower the cost by more than `outer_tolerance` relative.
fn can_improve(
    points: &[[f64; 2]],
    estimate: &Estimate,
    config: &FitConfig,
) -> Result<bool, FitError> {
    let steepest = -analytic_gradient(
        points,
        &estimate.center,
        estimate.radius,
        config.singularity_epsilon,
    )?;
    let model = line_model(
        points,
        &estimate.center,
        estimate.radius,
        &steepest,
        config.singularity_epsilon,
    )?;
    Ok(model.predicted_decrease() > config.outer_tolerance * estimate.cost)
}

/// Refine `estimate` in place until the cost settles or the outer budget runs
/// out.
///
/// Each outer iteration recomputes the gradient, forms a conjugate direction
/// and then takes up to `max_inner_iterations` guarded line-search sub-steps
/// along it. When no step along the conjugate direction lowers the cost, the
/// iteration restarts along the exact steepest-descent direction.
///
/// A settled cost only ends the refinement once a steepest-descent iteration
/// has also settled and the quadratic model along that direction predicts
/// no further gain. Failing to make progress while such a gain remains is
/// reported as [`FitError::NonConvergence`].
pub fn refine(
    points: &[[f64; 2]],
    estimate: &mut Estimate,
    config: &FitConfig,
) -> Result<Refinement, FitError> {
    let mut previous: Option<Conjugate> = None;
    let mut confirm = false;

    for iteration in 0..config.max_outer_iterations {
        let g = descent_gradient(
            config.descent_gradient,
            points,
            &estimate.center,
            estimate.radius,
            config.singularity_epsilon,
        )?;
        if estimate.cost < config.cost_tolerance {
            return Ok(done(*estimate, iteration, StopReason::ExactFit));
        }
        if g.norm() < config.gradient_tolerance {
            return Ok(done(*estimate, iteration, StopReason::StationaryGradient));
        }

        let steepest = -analytic_gradient(
            points,
            &estimate.center,
            estimate.radius,
            config.singularity_epsilon,
        )?;
        let mut u = if confirm {
            steepest
        } else {
            conjugate_direction(&g, previous.as_ref())
        };

        let cost_at_start = estimate.cost;
        let mut moved = search_along(points, estimate, &u, config)?;
        if !moved && u != steepest {
            tracing::trace!(
                "iteration {}: no progress, restarting along steepest descent",
                iteration
            );
            u = steepest;
            moved = search_along(points, estimate, &u, config)?;
        }
        previous = Some(Conjugate {
            gradient: g,
            direction: u,
        });

        tracing::trace!(
            "iteration {}: center=({:.6}, {:.6}) radius={:.6} cost={:.6e}",
            iteration,
            estimate.center.x,
            estimate.center.y,
            estimate.radius,
            estimate.cost
        );

        if !moved {
            if !can_improve(points, estimate, config)? {
                return Ok(done(*estimate, iteration + 1, StopReason::CostSettled));
            }
            tracing::warn!(
                "circle refinement stalled at iteration {} (cost {:.3e})",
                iteration,
                estimate.cost
            );
            return Err(FitError::NonConvergence {
                iterations: iteration + 1,
                cost: estimate.cost,
            });
        }
        if estimate.cost < config.cost_tolerance {
            return Ok(done(*estimate, iteration + 1, StopReason::ExactFit));
        }
        confirm = relative_change(cost_at_start, estimate.cost) < config.outer_tolerance;
        if confirm && u == steepest && !can_improve(points, estimate, config)? {
            return Ok(done(*estimate, iteration + 1, StopReason::CostSettled));
        }
    }

    tracing::warn!(
        "circle refinement exhausted {} iterations (cost {:.3e})",
        config.max_outer_iterations,
        estimate.cost
    );
    Err(FitError::NonConvergence {
        iterations: config.max_outer_iterations,
        cost: estimate.cost,
    })
}

fn done(estimate: Estimate, iterations: usize, stop_reason: StopReason) -> Refinement {
    Refinement {
        estimate,
        iterations,
        stop_reason,
    }
}
