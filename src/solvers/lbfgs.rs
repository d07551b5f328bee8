use tracing::{debug_span, warn};

use crate::error::OptimError;
use crate::float::Float;
use crate::linalg::{dot, neg, norm, sub};
use crate::objective::Objective;
use crate::options::{Algorithm, AlgorithmOptions};
use crate::trace::{
    LbfgsDiagnostics, MemoryPair, MemoryUpdate, OptimizationTrace, TwoLoopDiagnostics,
    TwoLoopStep,
};

use super::{advance, armijo_step, finish, trace_capacity, Counted, Iterate};

/// L-BFGS optimization.
///
/// Minimizes `obj` from `options.initial_point` using the limited-memory BFGS
/// method: the two-loop recursion applies an implicit inverse-Hessian
/// approximation built from at most `options.memory` recent `(s, y)` pairs,
/// and a backtracking Armijo search picks the step. Each iteration costs
/// O(m n), against O(n^3) for a Newton solve.
///
/// Pairs with `s . y <= eps * ||s|| * ||y||` are not stored, since they would
/// break the positive definiteness of the approximation.
pub fn lbfgs<F: Float, O: Objective<F> + ?Sized>(
    obj: &O,
    options: &AlgorithmOptions<F>,
) -> Result<OptimizationTrace<F>, OptimError> {
    options.validate(Algorithm::Lbfgs, obj.dim(), obj.has_hessian())?;
    let _span = debug_span!("lbfgs", dim = obj.dim(), memory = options.memory).entered();

    let obj = Counted::new(obj);
    let criteria = options.criteria();
    let params = options.armijo();
    // No more pairs than iterations can ever be stored.
    let mut memory = MemoryRing::new(options.memory, criteria.max_iter);
    let mut current = Iterate::start(&obj, &options.initial_point);
    let mut iterations = Vec::with_capacity(trace_capacity(criteria.max_iter));

    let termination = loop {
        let snapshot = memory.to_vec();
        let (direction, two_loop) = if memory.is_empty() {
            (neg(&current.gradient), None)
        } else {
            let (r, diagnostics) = two_loop_recursion(&current.gradient, &snapshot);
            (neg(&r), Some(diagnostics))
        };

        let step = armijo_step(&obj, &current, &direction, &params);
        let index = iterations.len();
        let (mut record, stop) = advance(&obj, &criteria, index, &mut current, direction, step);

        let s = sub(&record.w_new, &record.w_old);
        let y = sub(&current.gradient, &record.gradient);
        let sy = dot(&s, &y);
        let update = if sy > F::epsilon() * norm(&s) * norm(&y) {
            memory.push(MemoryPair {
                s,
                y,
                rho: F::one() / sy,
            })
        } else {
            warn!(index, sy = ?sy, "curvature condition failed; pair skipped");
            MemoryUpdate::SkippedCurvature
        };

        record.lbfgs = Some(LbfgsDiagnostics {
            memory: snapshot,
            two_loop,
            update,
        });
        iterations.push(record);
        if let Some(reason) = stop {
            break reason;
        }
    };

    Ok(finish(Algorithm::Lbfgs, iterations, termination, &obj))
}

/// Two-loop recursion: returns `r = H_k g` (the direction is `-r`) and the
/// intermediate values. `pairs` runs oldest to newest and must be non-empty.
fn two_loop_recursion<F: Float>(
    grad: &[F],
    pairs: &[MemoryPair<F>],
) -> (Vec<F>, TwoLoopDiagnostics<F>) {
    let k = pairs.len();
    let mut q: Vec<F> = grad.to_vec();

    // First loop: newest to oldest
    let mut alpha = vec![F::zero(); k];
    let mut backward = Vec::with_capacity(k);
    for i in (0..k).rev() {
        let pair = &pairs[i];
        alpha[i] = pair.rho * dot(&pair.s, &q);
        for (qj, &yj) in q.iter_mut().zip(&pair.y) {
            *qj = *qj - alpha[i] * yj;
        }
        backward.push(TwoLoopStep {
            pair: i,
            coefficient: alpha[i],
            vector: q.clone(),
        });
    }

    // Initial Hessian approximation: H_0 = gamma * I from the newest pair
    let newest = &pairs[k - 1];
    let yy = dot(&newest.y, &newest.y);
    let gamma = if yy > F::zero() {
        dot(&newest.s, &newest.y) / yy
    } else {
        F::one()
    };
    let mut r: Vec<F> = q.iter().map(|&v| gamma * v).collect();

    // Second loop: oldest to newest
    let mut forward = Vec::with_capacity(k);
    for (i, pair) in pairs.iter().enumerate() {
        let beta = pair.rho * dot(&pair.y, &r);
        for (rj, &sj) in r.iter_mut().zip(&pair.s) {
            *rj = *rj + (alpha[i] - beta) * sj;
        }
        forward.push(TwoLoopStep {
            pair: i,
            coefficient: beta,
            vector: r.clone(),
        });
    }

    (
        r,
        TwoLoopDiagnostics {
            backward,
            gamma,
            forward,
        },
    )
}

/// Fixed-capacity FIFO of curvature pairs.
///
/// Slots are reserved up front and, once full, overwritten in place at
/// `head`; the vector never grows past `capacity`.
struct MemoryRing<F> {
    slots: Vec<MemoryPair<F>>,
    /// Slot holding the oldest pair once the ring is full.
    head: usize,
    capacity: usize,
}

impl<F: Float> MemoryRing<F> {
    fn new(capacity: usize, reserve_limit: usize) -> Self {
        MemoryRing {
            slots: Vec::with_capacity(capacity.min(reserve_limit)),
            head: 0,
            capacity,
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn push(&mut self, pair: MemoryPair<F>) -> MemoryUpdate {
        if self.slots.len() < self.capacity {
            self.slots.push(pair);
            return MemoryUpdate::Stored;
        }
        let slot = &mut self.slots[self.head];
        slot.s.copy_from_slice(&pair.s);
        slot.y.copy_from_slice(&pair.y);
        slot.rho = pair.rho;
        self.head = (self.head + 1) % self.capacity;
        MemoryUpdate::StoredEvictingOldest
    }

    /// Pairs oldest to newest.
    fn iter(&self) -> impl Iterator<Item = &MemoryPair<F>> {
        let len = self.len();
        (0..len).map(move |i| &self.slots[(self.head + i) % len])
    }

    fn to_vec(&self) -> Vec<MemoryPair<F>> {
        self.iter().cloned().collect()
    }
}
