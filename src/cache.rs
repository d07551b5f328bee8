//! Memoization of whole runs.
//!
//! Traces are pure functions of (objective, algorithm, options), so a host
//! that re-renders the same configuration can reuse the previous trace. The
//! cache is an explicit value owned by the caller; objectives cannot be
//! compared, so the caller names the problem.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::trace;

use crate::error::OptimError;
use crate::float::Float;
use crate::objective::Objective;
use crate::options::{Algorithm, AlgorithmOptions, LineSearchMode};
use crate::solvers::run;
use crate::trace::OptimizationTrace;

/// Structural fingerprint of one run configuration.
///
/// Floating-point options are compared by bit pattern, so `0.0` and `-0.0`
/// are different keys and NaN options still hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceKey {
    problem: String,
    algorithm: Algorithm,
    options: Vec<u64>,
}

impl TraceKey {
    pub fn new<F: Float>(
        problem: impl Into<String>,
        algorithm: Algorithm,
        options: &AlgorithmOptions<F>,
    ) -> Self {
        let bits = |v: F| v.to_f64().map_or(u64::MAX, f64::to_bits);
        let mut fields = Vec::with_capacity(options.initial_point.len() + 10);
        fields.push(options.max_iter as u64);
        fields.push(options.memory as u64);
        fields.push(options.max_line_search_trials as u64);
        fields.push(match options.line_search {
            LineSearchMode::Armijo => 0,
            LineSearchMode::None => 1,
        });
        fields.push(bits(options.alpha));
        fields.push(bits(options.c1));
        fields.push(bits(options.hessian_damping));
        fields.push(bits(options.termination.gtol));
        fields.push(bits(options.termination.ftol));
        fields.push(bits(options.termination.xtol));
        fields.extend(options.initial_point.iter().map(|&v| bits(v)));
        TraceKey {
            problem: problem.into(),
            algorithm,
            options: fields,
        }
    }
}

/// Least-recently-used cache of traces.
pub struct TraceCache<F> {
    capacity: usize,
    entries: HashMap<TraceKey, Arc<OptimizationTrace<F>>>,
    /// Front is least recently used.
    order: VecDeque<TraceKey>,
}

impl<F: Float> TraceCache<F> {
    /// A cache holding at most `capacity` traces. Capacity 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        TraceCache {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Look up a trace and mark it most recently used.
    pub fn get(&mut self, key: &TraceKey) -> Option<Arc<OptimizationTrace<F>>> {
        let hit = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(hit)
    }

    /// Insert a trace, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: TraceKey, trace: OptimizationTrace<F>) -> Arc<OptimizationTrace<F>> {
        let trace = Arc::new(trace);
        if self.capacity == 0 {
            return trace;
        }
        if self.entries.contains_key(&key) {
            self.touch(&key);
        } else {
            if self.entries.len() == self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.entries.remove(&evicted);
                }
            }
            self.order.push_back(key.clone());
        }
        self.entries.insert(key, Arc::clone(&trace));
        trace
    }

    /// Return the cached trace for this configuration, running it on a miss.
    ///
    /// Input errors are returned and not cached.
    pub fn get_or_run<O: Objective<F> + ?Sized>(
        &mut self,
        problem: &str,
        algorithm: Algorithm,
        obj: &O,
        options: &AlgorithmOptions<F>,
    ) -> Result<Arc<OptimizationTrace<F>>, OptimError> {
        let key = TraceKey::new(problem, algorithm, options);
        if let Some(hit) = self.get(&key) {
            trace!(problem, %algorithm, "trace cache hit");
            return Ok(hit);
        }
        trace!(problem, %algorithm, "trace cache miss");
        let computed = run(algorithm, obj, options)?;
        Ok(self.insert(key, computed))
    }

    fn touch(&mut self, key: &TraceKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}
