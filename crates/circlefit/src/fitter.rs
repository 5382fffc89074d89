//! Top-level circle fitter: initial estimate followed by refinement.

use serde::{Deserialize, Serialize};

use crate::circle::{
    initial_center, refine, rms_residual, Circle, Estimate, FitError, StopReason,
};
use crate::config::FitConfig;

/// Minimum number of points for a circle fit.
pub const MIN_POINTS: usize = 3;

/// A successful circle fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleFit {
    /// Fitted circle.
    pub circle: Circle,
    /// Conjugate-gradient iterations performed.
    pub iterations: usize,
    /// Cost at the averaged-circumcenter estimate.
    pub initial_cost: f64,
    /// Cost at the fitted circle. Never above `initial_cost` unless step
    /// halving is disabled.
    pub final_cost: f64,
    /// RMS radial residual of the input points.
    pub rms_residual: f64,
    /// Why refinement stopped.
    pub stop_reason: StopReason,
}

/// Fits a circle to a fixed point set.
///
/// The fitter only reads its points; every call to [`CircleFitter::fit`]
/// starts from scratch, so repeated calls return identical results.
#[derive(Debug, Clone)]
pub struct CircleFitter {
    points: Vec<[f64; 2]>,
    config: FitConfig,
}

impl CircleFitter {
    /// Fitter with the default configuration.
    pub fn new(points: Vec<[f64; 2]>) -> Result<Self, FitError> {
        Self::with_config(points, FitConfig::default())
    }

    /// Fitter with an explicit configuration.
    ///
    /// Rejects an invalid configuration, fewer than [`MIN_POINTS`] points and
    /// non-finite coordinates before any computation.
    pub fn with_config(points: Vec<[f64; 2]>, config: FitConfig) -> Result<Self, FitError> {
        config.validate()?;
        if points.len() < MIN_POINTS {
            return Err(FitError::TooFewPoints {
                needed: MIN_POINTS,
                got: points.len(),
            });
        }
        if let Some(index) = points
            .iter()
            .position(|p| !p[0].is_finite() || !p[1].is_finite())
        {
            return Err(FitError::NonFinitePoint { index });
        }
        Ok(Self { points, config })
    }

    /// Fitter over integer grid coordinates.
    pub fn from_integer_points(points: &[[i32; 2]]) -> Result<Self, FitError> {
        Self::new(
            points
                .iter()
                .map(|p| [f64::from(p[0]), f64::from(p[1])])
                .collect(),
        )
    }

    /// Input points.
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Active configuration.
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Run the fit.
    ///
    /// Fails fast with [`FitError::DegenerateInput`] when any point triplet
    /// is collinear, before refinement starts.
    pub fn fit(&self) -> Result<CircleFit, FitError> {
        let points = self.points.as_slice();
        let start = initial_center(points, self.config.degeneracy_epsilon)?;
        let mut estimate = Estimate::at(points, start)?;
        let initial_cost = estimate.cost;

        tracing::debug!(
            "initial estimate: center=({:.6}, {:.6}) radius={:.6} cost={:.6e}",
            estimate.center.x,
            estimate.center.y,
            estimate.radius,
            initial_cost
        );

        let refinement = refine(points, &mut estimate, &self.config)?;

        let circle = Circle::new(estimate.center.x, estimate.center.y, estimate.radius);
        let fit = CircleFit {
            circle,
            iterations: refinement.iterations,
            initial_cost,
            final_cost: estimate.cost,
            rms_residual: rms_residual(&circle, points),
            stop_reason: refinement.stop_reason,
        };

        tracing::debug!(
            "fitted circle: center=({:.6}, {:.6}) radius={:.6} after {} iterations ({:?})",
            circle.center[0],
            circle.center[1],
            circle.radius,
            fit.iterations,
            fit.stop_reason
        );
        Ok(fit)
    }
}

/// Fit a circle to `points` with the default configuration.
pub fn fit_circle(points: &[[f64; 2]]) -> Result<CircleFit, FitError> {
    CircleFitter::new(points.to_vec())?.fit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::DescentGradient;
    use crate::config::ConfigError;
    use approx::assert_abs_diff_eq;
    use rand::prelude::*;

    fn noisy_circle(cx: f64, cy: f64, r: f64, n: usize, noise: f64, seed: u64) -> Vec<[f64; 2]> {
        let mut rng = StdRng::seed_from_u64(seed);
        Circle::new(cx, cy, r)
            .sample_points(n)
            .into_iter()
            .map(|[x, y]| {
                [
                    x + rng.gen_range(-noise..noise),
                    y + rng.gen_range(-noise..noise),
                ]
            })
            .collect()
    }

    #[test]
    fn exact_cross_fits_unit_scenario() {
        let fit = fit_circle(&[[10.0, 0.0], [0.0, 10.0], [-10.0, 0.0], [0.0, -10.0]])
            .expect("fit");
        assert_abs_diff_eq!(fit.circle.center[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.circle.center[1], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.circle.radius, 10.0, epsilon = 1e-6);
        assert_eq!(fit.stop_reason, StopReason::ExactFit);
    }

    #[test]
    fn perturbed_cross_stays_near_circle() {
        let fit = fit_circle(&[[10.0, 0.1], [0.0, 10.0], [-10.0, -0.1], [0.0, -10.0]])
            .expect("fit");
        // Perturbation is 0.1; the fit may move by at most that order.
        assert_abs_diff_eq!(fit.circle.center[0], 0.0, epsilon = 0.1);
        assert_abs_diff_eq!(fit.circle.center[1], 0.0, epsilon = 0.1);
        assert_abs_diff_eq!(fit.circle.radius, 10.0, epsilon = 0.1);
        assert!(fit.final_cost <= fit.initial_cost);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        for pts in [
            vec![[0.0, 0.0], [5.0, 0.0], [10.0, 0.0]],
            vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]],
        ] {
            assert_eq!(
                fit_circle(&pts),
                Err(FitError::DegenerateInput { triplet: [0, 1, 2] })
            );
        }
    }

    #[test]
    fn one_collinear_triplet_fails_the_whole_fit() {
        let pts = [[0.0, 0.0], [4.0, 4.0], [8.0, 8.0], [0.0, 8.0], [8.0, 0.0]];
        assert!(matches!(
            fit_circle(&pts),
            Err(FitError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn too_few_points_rejected_up_front() {
        assert_eq!(
            CircleFitter::new(vec![[0.0, 0.0], [1.0, 0.0]]).map(|_| ()),
            Err(FitError::TooFewPoints { needed: 3, got: 2 })
        );
        assert_eq!(
            fit_circle(&[]),
            Err(FitError::TooFewPoints { needed: 3, got: 0 })
        );
    }

    #[test]
    fn non_finite_point_rejected() {
        let err = CircleFitter::new(vec![[0.0, 0.0], [1.0, f64::NAN], [2.0, 5.0]])
            .expect_err("nan");
        assert_eq!(err, FitError::NonFinitePoint { index: 1 });
    }

    #[test]
    fn repeated_fits_are_identical() {
        let fitter = CircleFitter::new(noisy_circle(3.0, -2.0, 7.0, 12, 0.2, 11)).expect("fitter");
        let first = fitter.fit().expect("fit");
        let second = fitter.fit().expect("fit");
        assert_eq!(first, second);

        let other = CircleFitter::new(fitter.points().to_vec()).expect("fitter");
        assert_eq!(other.fit().expect("fit"), first);
    }

    #[test]
    fn refinement_does_not_raise_cost() {
        for seed in 0..20 {
            let pts = noisy_circle(-15.0, 40.0, 25.0, 10, 1.0, seed);
            let fit = fit_circle(&pts).expect("fit");
            assert!(
                fit.final_cost <= fit.initial_cost,
                "seed {seed}: {} > {}",
                fit.final_cost,
                fit.initial_cost
            );
            assert!(fit.circle.is_valid());
        }
    }

    #[test]
    fn integer_points_match_float_points() {
        let ints = [[120, 200], [200, 120], [280, 200], [200, 320], [160, 280]];
        let floats: Vec<[f64; 2]> = ints.iter().map(|p| [p[0] as f64, p[1] as f64]).collect();
        let a = CircleFitter::from_integer_points(&ints)
            .expect("fitter")
            .fit()
            .expect("fit");
        let b = fit_circle(&floats).expect("fit");
        assert_eq!(a, b);
    }

    #[test]
    fn scattered_integer_points_reach_minimum() {
        let fit = CircleFitter::from_integer_points(&[
            [89, 1],
            [19, 51],
            [43, 13],
            [78, 97],
            [88, 37],
            [10, 23],
        ])
        .expect("fitter")
        .fit()
        .expect("fit");
        assert_eq!(fit.stop_reason, StopReason::CostSettled);
        assert!(fit.initial_cost > 3000.0);
        assert_abs_diff_eq!(fit.final_cost, 512.18236, epsilon = 1e-4);
        assert_abs_diff_eq!(fit.circle.center[0], 57.2257, epsilon = 1e-3);
        assert_abs_diff_eq!(fit.circle.center[1], 50.4223, epsilon = 1e-3);
        assert_abs_diff_eq!(fit.circle.radius, 46.0341, epsilon = 1e-3);
    }

    #[test]
    fn invalid_config_rejected_up_front() {
        let pts = vec![[10.0, 0.0], [0.0, 10.0], [-10.0, 0.0]];
        let zero_budget = FitConfig {
            max_outer_iterations: 0,
            ..FitConfig::default()
        };
        assert_eq!(
            CircleFitter::with_config(pts.clone(), zero_budget).map(|_| ()),
            Err(FitError::InvalidConfig(ConfigError::ZeroBudget {
                field: "max_outer_iterations"
            }))
        );

        let nan_tolerance = FitConfig {
            cost_tolerance: f64::NAN,
            ..FitConfig::default()
        };
        let err = CircleFitter::with_config(pts, nan_tolerance).expect_err("nan tolerance");
        assert!(matches!(
            err,
            FitError::InvalidConfig(ConfigError::InvalidTolerance {
                field: "cost_tolerance",
                ..
            })
        ));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn distance_weighted_gradient_fits_noisy_circle() {
        let pts = noisy_circle(50.0, 50.0, 20.0, 16, 0.5, 3);
        let config = FitConfig {
            descent_gradient: DescentGradient::DistanceWeighted,
            ..FitConfig::default()
        };
        let fit = CircleFitter::with_config(pts, config)
            .expect("fitter")
            .fit()
            .expect("fit");
        assert_abs_diff_eq!(fit.circle.center[0], 50.0, epsilon = 0.5);
        assert_abs_diff_eq!(fit.circle.center[1], 50.0, epsilon = 0.5);
        assert_abs_diff_eq!(fit.circle.radius, 20.0, epsilon = 0.5);
        assert!(fit.rms_residual < 0.5);
    }

    #[test]
    fn fitter_shared_across_threads() {
        let fitter = CircleFitter::new(noisy_circle(0.0, 0.0, 5.0, 9, 0.1, 5)).expect("fitter");
        let expected = fitter.fit().expect("fit");
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| fitter.fit())).collect();
            for h in handles {
                assert_eq!(h.join().expect("thread").expect("fit"), expected);
            }
        });
    }
}
