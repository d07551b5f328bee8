#![allow(dead_code)]

use optitrace::Objective;

// ─── Extended Rosenbrock ───────────────────────────────────────────────────
// f(x) = Σ[(1 - x_i)² + 100·(x_{i+1} - x_i²)²], tridiagonal Hessian.

pub struct Rosenbrock {
    pub n: usize,
}

impl Objective<f64> for Rosenbrock {
    fn dim(&self) -> usize {
        self.n
    }

    fn value(&self, x: &[f64]) -> f64 {
        x.windows(2)
            .map(|w| {
                let t1 = 1.0 - w[0];
                let t2 = w[1] - w[0] * w[0];
                t1 * t1 + 100.0 * t2 * t2
            })
            .sum()
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut g = vec![0.0; x.len()];
        for i in 0..x.len() - 1 {
            let t2 = x[i + 1] - x[i] * x[i];
            g[i] += -2.0 * (1.0 - x[i]) - 400.0 * x[i] * t2;
            g[i + 1] += 200.0 * t2;
        }
        g
    }

    fn hessian(&self, x: &[f64]) -> Option<Vec<Vec<f64>>> {
        let n = x.len();
        let mut h = vec![vec![0.0; n]; n];
        for i in 0..n - 1 {
            h[i][i] += 2.0 - 400.0 * (x[i + 1] - 3.0 * x[i] * x[i]);
            h[i][i + 1] -= 400.0 * x[i];
            h[i + 1][i] -= 400.0 * x[i];
            h[i + 1][i + 1] += 200.0;
        }
        Some(h)
    }

    fn has_hessian(&self) -> bool {
        true
    }
}

pub fn make_input(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.5 + 0.01 * i as f64).collect()
}

/// Symmetric positive definite: `n I` plus a smooth off-diagonal coupling.
pub fn make_spd(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        n as f64 + 1.0
                    } else {
                        1.0 / (1.0 + (i as f64 - j as f64).abs())
                    }
                })
                .collect()
        })
        .collect()
}

/// Symmetric indefinite: alternating-sign diagonal.
pub fn make_indefinite(n: usize) -> Vec<Vec<f64>> {
    let mut a = make_spd(n);
    for (i, row) in a.iter_mut().enumerate() {
        if i % 2 == 1 {
            row[i] = -row[i];
        }
    }
    a
}
