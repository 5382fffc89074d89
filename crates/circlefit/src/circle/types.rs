//! Core circle type and fitting errors.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

// ── Error type ─────────────────────────────────────────────────────────────

/// Stage of the refinement in which a numerical singularity was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStage {
    /// Mean-distance radius recomputation.
    Radius,
    /// Cost gradient evaluation.
    Gradient,
    /// Newton step-length solve.
    LineSearch,
}

impl std::fmt::Display for FitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Radius => "radius estimate",
            Self::Gradient => "gradient",
            Self::LineSearch => "line search",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while fitting a circle.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Too few points for the requested operation.
    TooFewPoints {
        /// Required minimum number of points.
        needed: usize,
        /// Provided number of points.
        got: usize,
    },
    /// A point has a NaN or infinite coordinate.
    NonFinitePoint {
        /// Index of the offending point in the input.
        index: usize,
    },
    /// Some triplet of points is collinear or contains coincident points.
    DegenerateInput {
        /// Indices of the first degenerate triplet found.
        triplet: [usize; 3],
    },
    /// The fit configuration failed validation.
    InvalidConfig(ConfigError),
    /// The iteration budget ran out, or refinement could no longer lower the
    /// cost, before the cost settled.
    NonConvergence {
        /// Outer iterations performed.
        iterations: usize,
        /// Cost at the last estimate (not a valid fit).
        cost: f64,
    },
    /// A point coincided with the center estimate, or the Newton step had
    /// no finite solution.
    NumericalSingularity {
        /// Where the singularity was detected.
        stage: FitStage,
    },
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few points: need {}, got {}", needed, got)
            }
            Self::NonFinitePoint { index } => {
                write!(f, "point {} has a non-finite coordinate", index)
            }
            Self::DegenerateInput { triplet } => write!(
                f,
                "degenerate input: points {}, {}, {} are collinear or coincident",
                triplet[0], triplet[1], triplet[2]
            ),
            Self::InvalidConfig(err) => write!(f, "invalid fit configuration: {}", err),
            Self::NonConvergence { iterations, cost } => write!(
                f,
                "no convergence after {} iterations (cost {:.3e})",
                iterations, cost
            ),
            Self::NumericalSingularity { stage } => {
                write!(f, "numerical singularity during {}", stage)
            }
        }
    }
}

impl std::error::Error for FitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for FitError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err)
    }
}

// ── Types ──────────────────────────────────────────────────────────────────

/// Geometric circle parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Center (x, y).
    pub center: [f64; 2],
    /// Radius, non-negative.
    pub radius: f64,
}

impl Circle {
    /// Build a circle from center coordinates and radius.
    pub fn new(cx: f64, cy: f64, radius: f64) -> Self {
        Self {
            center: [cx, cy],
            radius,
        }
    }

    /// Check basic validity: finite center, finite non-negative radius.
    pub fn is_valid(&self) -> bool {
        self.center[0].is_finite()
            && self.center[1].is_finite()
            && self.radius.is_finite()
            && self.radius >= 0.0
    }

    /// Euclidean distance from the center to `p`.
    pub fn distance_to(&self, p: [f64; 2]) -> f64 {
        let dx = p[0] - self.center[0];
        let dy = p[1] - self.center[1];
        (dx * dx + dy * dy).sqrt()
    }

    /// Signed radial residual: positive outside the circle, negative inside.
    pub fn residual(&self, p: [f64; 2]) -> f64 {
        self.distance_to(p) - self.radius
    }

    /// Sample `n` points uniformly spaced in angle along the circle.
    pub fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        self.sample_arc(n, 0.0, 2.0 * std::f64::consts::PI)
    }

    /// Sample `n` points on the arc starting at `start` radians and
    /// spanning `span` radians. A full-turn span does not repeat the start.
    pub fn sample_arc(&self, n: usize, start: f64, span: f64) -> Vec<[f64; 2]> {
        let full_turn = (span.abs() - 2.0 * std::f64::consts::PI).abs() < 1e-12;
        let steps = if full_turn || n < 2 { n } else { n - 1 };
        (0..n)
            .map(|i| {
                let t = if steps == 0 {
                    start
                } else {
                    start + span * i as f64 / steps as f64
                };
                [
                    self.center[0] + self.radius * t.cos(),
                    self.center[1] + self.radius * t.sin(),
                ]
            })
            .collect()
    }
}
