use serde::{Deserialize, Serialize};

use crate::circle::DescentGradient;

/// Errors reported by [`FitConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// An iteration budget was set to zero.
    ZeroBudget {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A tolerance was negative, NaN or infinite.
    InvalidTolerance {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroBudget { field } => write!(f, "{} must be at least 1", field),
            Self::InvalidTolerance { field, value } => {
                write!(f, "{} must be finite and non-negative, got {}", field, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Tolerances and iteration budgets for circle fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Maximum conjugate-gradient (outer) iterations.
    pub max_outer_iterations: usize,
    /// Maximum line-search sub-steps per outer iteration.
    pub max_inner_iterations: usize,
    /// Sub-steps stop once a step changes the cost by at most this fraction.
    pub inner_tolerance: f64,
    /// Converged once an outer iteration changes the cost by less than this
    /// fraction.
    pub outer_tolerance: f64,
    /// A cost below this value is treated as an exact fit.
    pub cost_tolerance: f64,
    /// A gradient norm below this value is treated as a stationary point.
    pub gradient_tolerance: f64,
    /// Triplets whose edge cross product is below this magnitude are
    /// rejected as collinear.
    pub degeneracy_epsilon: f64,
    /// Points closer than this to the center estimate are singular.
    pub singularity_epsilon: f64,
    /// How many times a cost-increasing Newton step may be halved before the
    /// step is rejected. `0` keeps the raw Newton step.
    pub max_step_halvings: usize,
    /// Gradient form used to build search directions.
    pub descent_gradient: DescentGradient,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_outer_iterations: 100,
            max_inner_iterations: 10,
            inner_tolerance: 0.1,
            outer_tolerance: 1e-12,
            cost_tolerance: 1e-10,
            gradient_tolerance: 1e-10,
            degeneracy_epsilon: 1e-10,
            singularity_epsilon: 1e-12,
            max_step_halvings: 20,
            descent_gradient: DescentGradient::Analytic,
        }
    }
}

impl FitConfig {
    /// Check budgets and tolerances for values the solver cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_outer_iterations == 0 {
            return Err(ConfigError::ZeroBudget {
                field: "max_outer_iterations",
            });
        }
        if self.max_inner_iterations == 0 {
            return Err(ConfigError::ZeroBudget {
                field: "max_inner_iterations",
            });
        }
        let tolerances = [
            ("inner_tolerance", self.inner_tolerance),
            ("outer_tolerance", self.outer_tolerance),
            ("cost_tolerance", self.cost_tolerance),
            ("gradient_tolerance", self.gradient_tolerance),
            ("degeneracy_epsilon", self.degeneracy_epsilon),
            ("singularity_epsilon", self.singularity_epsilon),
        ];
        for (field, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTolerance { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(FitConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_outer_budget_rejected() {
        let cfg = FitConfig {
            max_outer_iterations: 0,
            ..FitConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroBudget {
                field: "max_outer_iterations"
            })
        );
    }

    #[test]
    fn nan_tolerance_rejected() {
        let cfg = FitConfig {
            gradient_tolerance: f64::NAN,
            ..FitConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidTolerance {
                field: "gradient_tolerance",
                ..
            })
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: FitConfig =
            serde_json::from_str(r#"{ "max_outer_iterations": 7 }"#).expect("parse config");
        assert_eq!(cfg.max_outer_iterations, 7);
        assert_eq!(cfg.max_inner_iterations, 10);
        assert_eq!(cfg.outer_tolerance, 1e-12);
        assert_eq!(cfg.descent_gradient, DescentGradient::Analytic);
    }

    #[test]
    fn gradient_form_uses_snake_case() {
        let cfg: FitConfig = serde_json::from_str(r#"{ "descent_gradient": "distance_weighted" }"#)
            .expect("parse config");
        assert_eq!(cfg.descent_gradient, DescentGradient::DistanceWeighted);
    }

    #[test]
    fn json_roundtrip_preserves_config() {
        let cfg = FitConfig {
            max_step_halvings: 0,
            inner_tolerance: 0.05,
            descent_gradient: DescentGradient::DistanceWeighted,
            ..FitConfig::default()
        };
        let json = serde_json::to_string(&cfg).expect("serialize config");
        let back: FitConfig = serde_json::from_str(&json).expect("parse config");
        assert_eq!(cfg, back);
    }
}
