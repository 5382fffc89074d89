//! circlefit: geometric least-squares circle fitting.
//!
//! Given a handful of 2D points lying near a circle, finds the center and
//! radius minimizing Σ (‖p − center‖ − radius)². The stages are:
//!
//! 1. **Estimate** – average of the circumcenters of every point triplet;
//!    any collinear triplet rejects the input.
//! 2. **Radius** – mean distance from the points to the current center.
//! 3. **Refine** – Polak–Ribière conjugate gradient over the center, with a
//!    guarded Newton step length along each direction and a steepest-descent
//!    restart whenever a direction makes no progress.
//!
//! # Public API
//! - [`CircleFitter`] and [`fit_circle`] as entry points
//! - [`FitConfig`] for tolerances and iteration budgets
//! - [`CircleFit`] / [`FitError`] as the outcome
//!
//! The triplet estimate is O(n³); the fitter targets sets of tens of points.

mod circle;
mod config;
mod fitter;

pub use circle::{
    analytic_gradient, circumcenter, cost, descent_gradient, gradient, guarded_step,
    initial_center, line_model, max_abs_residual, mean_radius, newton_step, refine, rms_residual,
    Circle, DescentGradient, Estimate, FitError, FitStage, LineModel, Refinement, Step,
    StopReason,
};
pub use config::{ConfigError, FitConfig};
pub use fitter::{fit_circle, CircleFit, CircleFitter, MIN_POINTS};

/// Circle parameters for serialization.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CircleParams {
    /// Center (x, y).
    pub center_xy: [f64; 2],
    /// Radius.
    pub radius: f64,
}

impl From<Circle> for CircleParams {
    fn from(c: Circle) -> Self {
        Self {
            center_xy: c.center,
            radius: c.radius,
        }
    }
}

impl From<&Circle> for CircleParams {
    fn from(c: &Circle) -> Self {
        Self::from(*c)
    }
}

impl From<CircleParams> for Circle {
    fn from(p: CircleParams) -> Self {
        Self {
            center: p.center_xy,
            radius: p.radius.abs(),
        }
    }
}

/// Serializable summary of a fit, as written by the command-line tool.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FitOutput {
    /// Fitted circle.
    pub circle: CircleParams,
    /// Conjugate-gradient iterations performed.
    pub iterations: usize,
    /// Cost at the initial estimate.
    pub initial_cost: f64,
    /// Cost at the fitted circle.
    pub final_cost: f64,
    /// RMS radial residual.
    pub rms_residual: f64,
    /// Why refinement stopped.
    pub stop_reason: StopReason,
}

impl From<&CircleFit> for FitOutput {
    fn from(fit: &CircleFit) -> Self {
        Self {
            circle: fit.circle.into(),
            iterations: fit.iterations,
            initial_cost: fit.initial_cost,
            final_cost: fit.final_cost,
            rms_residual: fit.rms_residual,
            stop_reason: fit.stop_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_params_flip_negative_radius() {
        let c: Circle = CircleParams {
            center_xy: [1.0, 2.0],
            radius: -3.0,
        }
        .into();
        assert_eq!(c, Circle::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn fit_output_json_shape() {
        let fit = fit_circle(&[[10.0, 0.0], [0.0, 10.0], [-10.0, 0.0], [0.0, -10.0]])
            .expect("fit");
        let json = serde_json::to_value(FitOutput::from(&fit)).expect("serialize");
        assert_eq!(json["stop_reason"], "exact_fit");
        assert_eq!(json["iterations"], 0);
        let r = json["circle"]["radius"].as_f64().expect("radius");
        assert!((r - 10.0).abs() < 1e-9);
        assert_eq!(json["circle"]["center_xy"].as_array().map(Vec::len), Some(2));
    }
}
