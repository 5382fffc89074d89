//! Closed-form starting point: averaged triplet circumcenters and the
//! mean-distance radius.

use nalgebra::Vector2;

use super::types::{FitError, FitStage};

/// Circumcenter of the triangle `(pi, pj, pk)`, or `None` when the edge cross
/// product is below `epsilon` (collinear or coincident points).
pub fn circumcenter(pi: [f64; 2], pj: [f64; 2], pk: [f64; 2], epsilon: f64) -> Option<[f64; 2]> {
    let ij = [pj[0] - pi[0], pj[1] - pi[1]];
    let jk = [pk[0] - pj[0], pk[1] - pj[1]];
    let ki = [pi[0] - pk[0], pi[1] - pk[1]];

    let delta = jk[0] * ij[1] - ij[0] * jk[1];
    if !delta.is_finite() || delta.abs() < epsilon {
        return None;
    }

    let sq_i = pi[0] * pi[0] + pi[1] * pi[1];
    let sq_j = pj[0] * pj[0] + pj[1] * pj[1];
    let sq_k = pk[0] * pk[0] + pk[1] * pk[1];

    let x = (sq_i * jk[1] + sq_j * ki[1] + sq_k * ij[1]) / (2.0 * delta);
    let y = -(sq_i * jk[0] + sq_j * ki[0] + sq_k * ij[0]) / (2.0 * delta);
    Some([x, y])
}

/// Average the circumcenters of every unordered point triplet.
///
/// A single degenerate triplet fails the whole estimate. Cost is O(n³) in the
/// number of points, so this is meant for sets of tens of points.
pub fn initial_center(points: &[[f64; 2]], epsilon: f64) -> Result<Vector2<f64>, FitError> {
    let n = points.len();
    if n < 3 {
        return Err(FitError::TooFewPoints { needed: 3, got: n });
    }

    let mut sum = Vector2::<f64>::zeros();
    let mut count = 0usize;
    for i in 0..n - 2 {
        for j in i + 1..n - 1 {
            for k in j + 1..n {
                let Some([x, y]) = circumcenter(points[i], points[j], points[k], epsilon) else {
                    return Err(FitError::DegenerateInput { triplet: [i, j, k] });
                };
                sum += Vector2::new(x, y);
                count += 1;
            }
        }
    }

    tracing::debug!("initial center averaged over {} triplets", count);
    Ok(sum / count as f64)
}

/// Mean Euclidean distance from every point to `center`.
pub fn mean_radius(points: &[[f64; 2]], center: &Vector2<f64>) -> Result<f64, FitError> {
    let sum: f64 = points
        .iter()
        .map(|p| (Vector2::new(p[0], p[1]) - center).norm())
        .sum();
    let radius = sum / points.len() as f64;
    if !radius.is_finite() {
        tracing::warn!("mean radius is not finite at center ({}, {})", center.x, center.y);
        return Err(FitError::NumericalSingularity {
            stage: FitStage::Radius,
        });
    }
    Ok(radius)
}
