//! Circle fitting primitives.
//!
//! Implements the geometric least-squares fit described by L. Maisonobe,
//! "Finding the circle that best fits a set of points" (2007):
//! - Closed-form start: mean of the circumcenters of all point triplets.
//! - Cost and descent gradients with the radius tied to the mean distance.
//! - Newton line search along a search direction.
//! - Polak–Ribière conjugate-gradient refinement.

mod estimate;
mod line_search;
mod objective;
mod solver;
mod types;

pub use estimate::{circumcenter, initial_center, mean_radius};
pub use line_search::{guarded_step, line_model, newton_step, LineModel, Step};
pub use objective::{
    analytic_gradient, cost, descent_gradient, gradient, max_abs_residual, rms_residual,
    DescentGradient,
};
pub use solver::{refine, Estimate, Refinement, StopReason};
pub use types::{Circle, FitError, FitStage};
