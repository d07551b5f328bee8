//! Dense vector and small-matrix routines.
//!
//! Matrices are `Vec<Vec<F>>` stored as `a[row][col]`, the same shape
//! objectives return Hessians in.

use crate::float::Float;

/// Compute the dot product of two vectors.
pub fn dot<F: Float>(a: &[F], b: &[F]) -> F {
    debug_assert_eq!(a.len(), b.len());
    let mut s = F::zero();
    for (&x, &y) in a.iter().zip(b) {
        s = s + x * y;
    }
    s
}

/// Compute the L2 norm of a vector.
pub fn norm<F: Float>(v: &[F]) -> F {
    dot(v, v).sqrt()
}

/// `w + alpha * p`.
pub fn axpy<F: Float>(w: &[F], alpha: F, p: &[F]) -> Vec<F> {
    debug_assert_eq!(w.len(), p.len());
    w.iter().zip(p).map(|(&wi, &pi)| wi + alpha * pi).collect()
}

/// `a - b`.
pub fn sub<F: Float>(a: &[F], b: &[F]) -> Vec<F> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| x - y).collect()
}

/// `alpha * v`.
pub fn scale<F: Float>(alpha: F, v: &[F]) -> Vec<F> {
    v.iter().map(|&x| alpha * x).collect()
}

/// `-v`.
pub fn neg<F: Float>(v: &[F]) -> Vec<F> {
    v.iter().map(|&x| -x).collect()
}

/// `a + lambda * I`.
pub fn add_diagonal<F: Float>(a: &[Vec<F>], lambda: F) -> Vec<Vec<F>> {
    let mut out = a.to_vec();
    for (i, row) in out.iter_mut().enumerate() {
        row[i] = row[i] + lambda;
    }
    out
}

/// Result of LU factorization with partial pivoting.
///
/// Stores the combined L/U factors in a single matrix (L below diagonal,
/// U on and above diagonal) plus the row permutation.
pub struct LuFactors<F> {
    lu: Vec<Vec<F>>,
    /// `perm[i]` is the original row index for factored row `i`.
    perm: Vec<usize>,
    n: usize,
}

/// Factorize an `n x n` matrix via LU decomposition with partial pivoting.
///
/// Returns `None` if the matrix is singular (near-zero pivot relative to the
/// largest entry) or contains non-finite values.
// Explicit indexing is clearer for pivoted LU: row/col indices drive pivot search and elimination
#[allow(clippy::needless_range_loop)]
pub fn lu_factor<F: Float>(a: &[Vec<F>]) -> Option<LuFactors<F>> {
    let n = a.len();
    debug_assert!(a.iter().all(|row| row.len() == n));

    let mut lu: Vec<Vec<F>> = a.to_vec();
    let mut perm: Vec<usize> = (0..n).collect();

    let mut scale = F::zero();
    for row in a {
        for &v in row {
            if !v.is_finite() {
                return None;
            }
            scale = scale.max(v.abs());
        }
    }
    let eps = F::constant(1e-12) * scale.max(F::one());

    for col in 0..n {
        let mut max_val = lu[col][col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let v = lu[row][col].abs();
            if v > max_val {
                max_val = v;
                max_row = row;
            }
        }

        if max_val < eps {
            return None;
        }

        if max_row != col {
            lu.swap(col, max_row);
            perm.swap(col, max_row);
        }

        let pivot = lu[col][col];

        for row in (col + 1)..n {
            let factor = lu[row][col] / pivot;
            lu[row][col] = factor;
            for j in (col + 1)..n {
                let val = lu[col][j];
                lu[row][j] = lu[row][j] - factor * val;
            }
        }
    }

    Some(LuFactors { lu, perm, n })
}

/// Solve `A * x = b` using a pre-computed LU factorization.
// Explicit indexing is clearer for forward/back substitution with permuted indices
#[allow(clippy::needless_range_loop)]
pub fn lu_back_solve<F: Float>(factors: &LuFactors<F>, b: &[F]) -> Vec<F> {
    let n = factors.n;
    debug_assert_eq!(b.len(), n);

    let mut y = vec![F::zero(); n];
    for i in 0..n {
        y[i] = b[factors.perm[i]];
    }

    // L has unit diagonal
    for i in 1..n {
        for j in 0..i {
            let l_ij = factors.lu[i][j];
            let y_j = y[j];
            y[i] = y[i] - l_ij * y_j;
        }
    }

    let mut x = vec![F::zero(); n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum = sum - factors.lu[i][j] * x[j];
        }
        x[i] = sum / factors.lu[i][i];
    }

    x
}

/// Solve `A * x = b` via LU factorization with partial pivoting.
pub fn lu_solve<F: Float>(a: &[Vec<F>], b: &[F]) -> Option<Vec<F>> {
    let factors = lu_factor(a)?;
    Some(lu_back_solve(&factors, b))
}

/// Solve `A * x = b` for symmetric positive definite `A` via Cholesky (`A = L L^T`).
///
/// Returns `None` as soon as a non-positive pivot shows `A` is not positive
/// definite.
#[allow(clippy::needless_range_loop)]
pub fn cholesky_solve<F: Float>(a: &[Vec<F>], b: &[F]) -> Option<Vec<F>> {
    let n = a.len();
    debug_assert_eq!(b.len(), n);

    let mut l = vec![vec![F::zero(); n]; n];
    for j in 0..n {
        let mut diag = a[j][j];
        for k in 0..j {
            diag = diag - l[j][k] * l[j][k];
        }
        // `!(x > 0)` also rejects NaN
        if !(diag > F::zero()) || !diag.is_finite() {
            return None;
        }
        let ljj = diag.sqrt();
        l[j][j] = ljj;
        for i in (j + 1)..n {
            let mut sum = a[i][j];
            for k in 0..j {
                sum = sum - l[i][k] * l[j][k];
            }
            l[i][j] = sum / ljj;
        }
    }

    // L y = b
    let mut y = vec![F::zero(); n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum = sum - l[i][k] * y[k];
        }
        y[i] = sum / l[i][i];
    }

    // L^T x = y
    let mut x = vec![F::zero(); n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum = sum - l[k][i] * x[k];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

/// How [`solve_symmetric`] obtained its solution.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub enum SolveMethod<F> {
    /// The matrix was positive definite.
    Cholesky,
    /// Indefinite but nonsingular: pivoted LU.
    Lu,
    /// Singular: LU on `A + shift * I`.
    Regularized {
        #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
        shift: F,
    },
}

/// Solution of a symmetric system and the route taken to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricSolve<F> {
    /// `x` with `A x = b` (or `(A + shift I) x = b` when regularized).
    pub solution: Vec<F>,
    /// Which factorization produced `solution`.
    pub method: SolveMethod<F>,
}

const MAX_REGULARIZATION_ATTEMPTS: usize = 8;

/// Solve `A * x = b` for symmetric `A` without forming `A^{-1}`.
///
/// Tries Cholesky first, then pivoted LU, then LU on `A + tau * I` with `tau`
/// starting at `1e-10 * max(1, max |a_ii|)` and growing tenfold per attempt.
/// Returns `None` if every attempt fails (including non-finite input).
pub fn solve_symmetric<F: Float>(a: &[Vec<F>], b: &[F]) -> Option<SymmetricSolve<F>> {
    if let Some(solution) = cholesky_solve(a, b) {
        return Some(SymmetricSolve {
            solution,
            method: SolveMethod::Cholesky,
        });
    }
    if let Some(solution) = lu_solve(a, b) {
        return Some(SymmetricSolve {
            solution,
            method: SolveMethod::Lu,
        });
    }

    let diag_scale = a
        .iter()
        .enumerate()
        .fold(F::one(), |acc, (i, row)| acc.max(row[i].abs()));
    let ten = F::constant(10.0);
    let mut shift = F::constant(1e-10) * diag_scale;
    for _ in 0..MAX_REGULARIZATION_ATTEMPTS {
        if let Some(solution) = lu_solve(&add_diagonal(a, shift), b) {
            return Some(SymmetricSolve {
                solution,
                method: SolveMethod::Regularized { shift },
            });
        }
        shift = shift * ten;
    }
    None
}

/// Eigenvalues of a symmetric matrix of order 1, 2 or 3, sorted descending.
///
/// Uses closed forms (the trace/discriminant formula for 2x2, the
/// trigonometric solution of the characteristic cubic for 3x3). Returns
/// `None` for larger or empty matrices, or if any entry is non-finite.
pub fn symmetric_eigenvalues<F: Float>(a: &[Vec<F>]) -> Option<Vec<F>> {
    if a.iter().flatten().any(|v| !v.is_finite()) {
        return None;
    }
    let two = F::constant(2.0);
    let mut values = match a.len() {
        1 => vec![a[0][0]],
        2 => {
            let (p, q, d) = (a[0][0], a[0][1], a[1][1]);
            let mid = (p + d) / two;
            let half_gap = (p - d) / two;
            let radius = (half_gap * half_gap + q * q).sqrt();
            vec![mid + radius, mid - radius]
        }
        3 => eigenvalues_3x3(a),
        _ => return None,
    };
    values.sort_by(|x, y| y.partial_cmp(x).unwrap_or(std::cmp::Ordering::Equal));
    Some(values)
}

fn eigenvalues_3x3<F: Float>(a: &[Vec<F>]) -> Vec<F> {
    let off = a[0][1] * a[0][1] + a[0][2] * a[0][2] + a[1][2] * a[1][2];
    if off == F::zero() {
        return vec![a[0][0], a[1][1], a[2][2]];
    }

    let three = F::constant(3.0);
    let six = F::constant(6.0);
    let two = F::constant(2.0);

    let q = (a[0][0] + a[1][1] + a[2][2]) / three;
    let d0 = a[0][0] - q;
    let d1 = a[1][1] - q;
    let d2 = a[2][2] - q;
    let p = ((d0 * d0 + d1 * d1 + d2 * d2 + two * off) / six).sqrt();

    // B = (A - qI) / p; r = det(B) / 2
    let b00 = d0 / p;
    let b11 = d1 / p;
    let b22 = d2 / p;
    let b01 = a[0][1] / p;
    let b02 = a[0][2] / p;
    let b12 = a[1][2] / p;
    let det = b00 * (b11 * b22 - b12 * b12) - b01 * (b01 * b22 - b12 * b02)
        + b02 * (b01 * b12 - b11 * b02);
    let r = (det / two).max(-F::one()).min(F::one());

    let phi = r.acos() / three;
    let third_turn = F::constant(2.0 * std::f64::consts::PI / 3.0);
    let largest = q + two * p * phi.cos();
    let smallest = q + two * p * (phi + third_turn).cos();
    let middle = three * q - largest - smallest;
    vec![largest, middle, smallest]
}

/// `max |lambda| / min |lambda|`; infinite when some eigenvalue is zero.
///
/// For positive definite matrices this is the usual `lambda_max / lambda_min`.
pub fn condition_number<F: Float>(eigenvalues: &[F]) -> F {
    let mut largest = F::zero();
    let mut smallest = F::infinity();
    for &v in eigenvalues {
        largest = largest.max(v.abs());
        smallest = smallest.min(v.abs());
    }
    if smallest == F::zero() {
        F::infinity()
    } else {
        largest / smallest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn vector_ops() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, -5.0, 6.0];
        assert_eq!(dot(&a, &b), 12.0);
        assert_eq!(norm(&[3.0, 4.0]), 5.0);
        assert_eq!(axpy(&a, 2.0, &b), vec![9.0, -8.0, 15.0]);
        assert_eq!(sub(&a, &b), vec![-3.0, 7.0, -3.0]);
        assert_eq!(scale(0.5, &a), vec![0.5, 1.0, 1.5]);
        assert_eq!(neg(&a), vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn lu_solve_2x2() {
        // [2 1] [x0]   [5]
        // [1 3] [x1] = [7]
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = lu_solve(&a, &[5.0, 7.0]).unwrap();
        assert_relative_eq!(x[0], 1.6, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.8, epsilon = 1e-12);
    }

    #[test]
    fn lu_solve_needs_pivoting() {
        // First pivot is zero; requires row swap
        let a = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let x = lu_solve(&a, &[3.0, 7.0]).unwrap();
        assert_relative_eq!(x[0], 7.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn lu_factor_singular_returns_none() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(lu_factor(&a).is_none());
    }

    #[test]
    fn lu_factor_then_back_solve_3x3() {
        let a = vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 0.0],
        ];
        let factors = lu_factor(&a).unwrap();
        // x = (1, 2, 3)
        let x = lu_back_solve(&factors, &[14.0, 32.0, 23.0]);
        for (i, expected) in [1.0, 2.0, 3.0].iter().enumerate() {
            assert_relative_eq!(x[i], *expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn cholesky_matches_lu_on_spd() {
        let a = vec![
            vec![4.0, 1.0, 0.5],
            vec![1.0, 3.0, 0.2],
            vec![0.5, 0.2, 2.0],
        ];
        let b = [1.0, -2.0, 0.5];
        let x = cholesky_solve(&a, &b).unwrap();
        let x_ref = lu_solve(&a, &b).unwrap();
        for i in 0..3 {
            assert_relative_eq!(x[i], x_ref[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn cholesky_rejects_indefinite() {
        let a = vec![vec![2.0, 0.0], vec![0.0, -1.0]];
        assert!(cholesky_solve(&a, &[1.0, 1.0]).is_none());
    }

    #[test]
    fn solve_symmetric_routes() {
        let spd = vec![vec![2.0, 0.0], vec![0.0, 4.0]];
        let s = solve_symmetric(&spd, &[2.0, 4.0]).unwrap();
        assert_eq!(s.method, SolveMethod::Cholesky);
        assert_relative_eq!(s.solution[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.solution[1], 1.0, epsilon = 1e-12);

        let indefinite = vec![vec![2.0, 0.0], vec![0.0, -1.0]];
        let s = solve_symmetric(&indefinite, &[2.0, 1.0]).unwrap();
        assert_eq!(s.method, SolveMethod::Lu);
        assert_relative_eq!(s.solution[1], -1.0, epsilon = 1e-12);

        let singular = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let s = solve_symmetric(&singular, &[1.0, 1.0]).unwrap();
        assert!(matches!(s.method, SolveMethod::Regularized { shift } if shift > 0.0));
        assert!(s.solution.iter().all(|v: &f64| v.is_finite()));
    }

    #[test]
    fn solve_symmetric_gives_up_on_nan() {
        let a = vec![vec![f64::NAN, 0.0], vec![0.0, 1.0]];
        assert!(solve_symmetric(&a, &[1.0, 1.0]).is_none());
    }

    #[test]
    fn eigenvalues_2x2() {
        let ev = symmetric_eigenvalues(&[vec![4.0, 1.0], vec![1.0, 2.0]]).unwrap();
        assert_relative_eq!(ev[0], 3.0 + 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(ev[1], 3.0 - 2f64.sqrt(), epsilon = 1e-12);

        let ev = symmetric_eigenvalues(&[vec![2.0, 0.0], vec![0.0, 200.0]]).unwrap();
        assert_eq!(ev, vec![200.0, 2.0]);
    }

    #[test]
    fn eigenvalues_3x3_diagonal_sorted() {
        let a = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 5.0, 0.0],
            vec![0.0, 0.0, 3.0],
        ];
        assert_eq!(symmetric_eigenvalues(&a).unwrap(), vec![5.0, 3.0, 1.0]);
    }

    #[test]
    fn eigenvalues_3x3_known_spectrum() {
        // [[2,1,0],[1,2,1],[0,1,2]] has eigenvalues 2+sqrt2, 2, 2-sqrt2
        let a = vec![
            vec![2.0, 1.0, 0.0],
            vec![1.0, 2.0, 1.0],
            vec![0.0, 1.0, 2.0],
        ];
        let ev = symmetric_eigenvalues(&a).unwrap();
        assert_relative_eq!(ev[0], 2.0 + 2f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(ev[1], 2.0, epsilon = 1e-10);
        assert_relative_eq!(ev[2], 2.0 - 2f64.sqrt(), epsilon = 1e-10);
    }

    /// Elementary symmetric functions of the spectrum: trace, sum of
    /// principal 2x2 minors, determinant.
    fn invariants(a: &[Vec<f64>]) -> [f64; 3] {
        let n = a.len();
        let trace = (0..n).map(|i| a[i][i]).sum();
        let mut minors = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                minors += a[i][i] * a[j][j] - a[i][j] * a[j][i];
            }
        }
        let det = match n {
            2 => minors,
            _ => {
                a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1])
                    - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
                    + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0])
            }
        };
        if n == 2 {
            [trace, det, det]
        } else {
            [trace, minors, det]
        }
    }

    #[test]
    fn eigenvalues_reproduce_matrix_invariants() {
        let cases = [
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![vec![4.0, 0.0], vec![0.0, 2.0]],
            vec![vec![4.0, 1.0], vec![1.0, 2.0]],
            vec![vec![1e-8, 0.0], vec![0.0, 1.0]],
            vec![vec![2.0, 0.0], vec![0.0, -1.0]],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
            vec![
                vec![2.0, 0.5, 0.3],
                vec![0.5, 2.0, 0.2],
                vec![0.3, 0.2, 1.0],
            ],
            vec![
                vec![1000.0, 1.0, 1.0],
                vec![1.0, 10.0, 1.0],
                vec![1.0, 1.0, 0.01],
            ],
        ];
        for a in cases {
            let ev = symmetric_eigenvalues(&a).unwrap();
            assert!(ev.windows(2).all(|w| w[0] >= w[1]), "{ev:?}");
            let from_spectrum = if ev.len() == 2 {
                [ev[0] + ev[1], ev[0] * ev[1], ev[0] * ev[1]]
            } else {
                [
                    ev[0] + ev[1] + ev[2],
                    ev[0] * ev[1] + ev[0] * ev[2] + ev[1] * ev[2],
                    ev[0] * ev[1] * ev[2],
                ]
            };
            for (&got, &want) in from_spectrum.iter().zip(&invariants(&a)) {
                assert_relative_eq!(got, want, epsilon = 1e-9, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn eigenvalues_none_above_3x3() {
        let a = vec![vec![1.0; 4]; 4];
        assert!(symmetric_eigenvalues(&a).is_none());
    }

    #[test]
    fn condition_number_indefinite_and_singular() {
        assert_eq!(condition_number(&[200.0, 2.0]), 100.0);
        assert_eq!(condition_number(&[2.0, -4.0]), 2.0);
        assert!(condition_number(&[1.0f64, 0.0]).is_infinite());
    }
}
