//! Dense linear algebra helpers built directly on `ndarray`.
//!
//! The models in this crate only ever decompose small symmetric matrices
//! (feature covariances and latent-space precisions), so plain Jacobi
//! rotations and Gauss-Jordan elimination are accurate enough and keep the
//! crate free of a LAPACK backend.

use crate::error::{LatentError, Result};
use crate::{Matrix, Vector};
use ndarray::Axis;
use std::cmp::Ordering;

const MAX_SWEEPS: usize = 100;
const PIVOT_EPS: f64 = 1e-12;

fn ensure_square(a: &Matrix) -> Result<usize> {
    if a.nrows() != a.ncols() {
        return Err(LatentError::NotSquare {
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    Ok(a.nrows())
}

/// Eigendecomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues in descending order and the matching unit
/// eigenvectors as the columns of the second matrix.
pub fn symmetric_eigen(matrix: &Matrix) -> Result<(Vector, Matrix)> {
    let n = ensure_square(matrix)?;
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(LatentError::NonFinite("matrix"));
    }

    let mut a = matrix.clone();
    let mut v = Matrix::eye(n);
    let scale = a.mapv(|x| x * x).sum().sqrt().max(f64::MIN_POSITIVE);

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        if off.sqrt() <= 1e-15 * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    // Sort by eigenvalues (descending)
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].partial_cmp(&a[[i, i]]).unwrap_or(Ordering::Equal));

    let eigenvalues: Vector = order.iter().map(|&i| a[[i, i]]).collect();
    let mut eigenvectors = Matrix::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        eigenvectors.column_mut(dst).assign(&v.column(src));
    }

    Ok((eigenvalues, eigenvectors))
}

/// Inverse of a square matrix by Gauss-Jordan elimination with partial pivoting.
pub fn inverse(matrix: &Matrix) -> Result<Matrix> {
    let n = ensure_square(matrix)?;
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(LatentError::NonFinite("matrix"));
    }

    let mut a = matrix.clone();
    let mut inv = Matrix::eye(n);
    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(f64::MIN_POSITIVE);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| {
                a[[i, col]]
                    .abs()
                    .partial_cmp(&a[[j, col]].abs())
                    .unwrap_or(Ordering::Equal)
            })
            .unwrap_or(col);

        if a[[pivot_row, col]].abs() <= PIVOT_EPS * scale {
            return Err(LatentError::Singular);
        }

        if pivot_row != col {
            for k in 0..n {
                a.swap([col, k], [pivot_row, k]);
                inv.swap([col, k], [pivot_row, k]);
            }
        }

        let pivot = a[[col, col]];
        a.row_mut(col).mapv_inplace(|x| x / pivot);
        inv.row_mut(col).mapv_inplace(|x| x / pivot);

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[[row, k]] -= factor * a[[col, k]];
                inv[[row, k]] -= factor * inv[[col, k]];
            }
        }
    }

    Ok(inv)
}

/// Lower-triangular Cholesky factor `L` with `L Lᵀ = A`.
pub fn cholesky(matrix: &Matrix) -> Result<Matrix> {
    let n = ensure_square(matrix)?;
    let mut l = Matrix::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if !(sum > 0.0) {
                    return Err(LatentError::NotPositiveDefinite);
                }
                l[[i, j]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    Ok(l)
}

/// Log-determinant of a symmetric positive definite matrix.
pub fn log_det_spd(matrix: &Matrix) -> Result<f64> {
    let l = cholesky(matrix)?;
    Ok(2.0 * l.diag().mapv(f64::ln).sum())
}

/// Orthonormal basis for the column space (modified Gram-Schmidt).
pub fn orthonormalize(matrix: &Matrix) -> Result<Matrix> {
    let mut q = matrix.clone();
    let scale = matrix.mapv(|x| x * x).sum().sqrt().max(f64::MIN_POSITIVE);

    for j in 0..q.ncols() {
        for i in 0..j {
            let proj = q.column(i).dot(&q.column(j));
            let qi = q.column(i).to_owned();
            q.column_mut(j).scaled_add(-proj, &qi);
        }
        let norm = q.column(j).dot(&q.column(j)).sqrt();
        if norm <= PIVOT_EPS * scale {
            return Err(LatentError::Singular);
        }
        q.column_mut(j).mapv_inplace(|x| x / norm);
    }

    Ok(q)
}

/// Subtracts the column means; returns the centred data and the means.
pub fn center(x: &Matrix) -> Result<(Matrix, Vector)> {
    let mean = x.mean_axis(Axis(0)).ok_or(LatentError::EmptyInput)?;
    let centered = x - &mean.view().insert_axis(Axis(0));
    Ok((centered, mean))
}

/// Maximum-likelihood covariance (normalised by `n`) of already centred data.
pub fn covariance(x_centered: &Matrix) -> Matrix {
    let n = x_centered.nrows().max(1) as f64;
    x_centered.t().dot(x_centered) / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_symmetric_eigen_diagonal() {
        let a = array![[1.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 2.0]];
        let (values, vectors) = symmetric_eigen(&a).unwrap();

        assert_abs_diff_eq!(values, array![3.0, 2.0, 1.0], epsilon = 1e-12);
        assert_abs_diff_eq!(vectors[[1, 0]].abs(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(vectors[[2, 1]].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_eigen_reconstructs_matrix() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, -0.7], [0.5, -0.7, 2.0]];
        let (values, vectors) = symmetric_eigen(&a).unwrap();

        let rebuilt = vectors.dot(&Matrix::from_diag(&values)).dot(&vectors.t());
        assert_abs_diff_eq!(rebuilt, a, epsilon = 1e-10);

        let gram = vectors.t().dot(&vectors);
        assert_abs_diff_eq!(gram, Matrix::eye(3), epsilon = 1e-10);
    }

    #[test]
    fn test_symmetric_eigen_rejects_non_square() {
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        assert_eq!(
            symmetric_eigen(&a).unwrap_err(),
            LatentError::NotSquare { rows: 2, cols: 3 }
        );
    }

    #[test]
    fn test_inverse() {
        let a = array![[0.0, 2.0], [1.0, 1.0]];
        let inv = inverse(&a).unwrap();
        assert_abs_diff_eq!(a.dot(&inv), Matrix::eye(2), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert_eq!(inverse(&a).unwrap_err(), LatentError::Singular);
    }

    #[test]
    fn test_cholesky_and_log_det() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let l = cholesky(&a).unwrap();
        assert_abs_diff_eq!(l.dot(&l.t()), a, epsilon = 1e-12);
        assert_abs_diff_eq!(log_det_spd(&a).unwrap(), 8.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_not_positive_definite() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        assert_eq!(cholesky(&a).unwrap_err(), LatentError::NotPositiveDefinite);
    }

    #[test]
    fn test_orthonormalize() {
        let a = array![[1.0, 1.0], [1.0, 0.0], [0.0, 1.0]];
        let q = orthonormalize(&a).unwrap();
        assert_abs_diff_eq!(q.t().dot(&q), Matrix::eye(2), epsilon = 1e-12);

        let rank_deficient = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        assert_eq!(orthonormalize(&rank_deficient).unwrap_err(), LatentError::Singular);
    }

    #[test]
    fn test_center_and_covariance() {
        let x = array![[1.0, 2.0], [3.0, 6.0]];
        let (xc, mean) = center(&x).unwrap();
        assert_abs_diff_eq!(mean, array![2.0, 4.0], epsilon = 1e-12);

        let cov = covariance(&xc);
        assert_abs_diff_eq!(cov, array![[1.0, 2.0], [2.0, 4.0]], epsilon = 1e-12);
    }
}
