use crate::float::Float;

/// Trait for optimization objectives.
///
/// Implementors provide function evaluation and gradient computation, and
/// optionally the Hessian. Methods take `&self`: objectives are expected to be
/// pure and deterministic, since the line search evaluates them repeatedly and
/// traces must be reproducible.
pub trait Objective<F: Float> {
    /// Number of input variables.
    fn dim(&self) -> usize;

    /// Evaluate `f(w)`.
    fn value(&self, w: &[F]) -> F;

    /// Evaluate `∇f(w)`.
    fn gradient(&self, w: &[F]) -> Vec<F>;

    /// Evaluate the Hessian `H[i][j] = ∂²f/∂w_i∂w_j`, if available.
    fn hessian(&self, w: &[F]) -> Option<Vec<Vec<F>>> {
        let _ = w;
        None
    }

    /// Whether [`Objective::hessian`] returns `Some`.
    ///
    /// Checked before a Newton or diagonal-preconditioner run starts.
    fn has_hessian(&self) -> bool {
        false
    }
}

impl<F: Float, O: Objective<F> + ?Sized> Objective<F> for &O {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn value(&self, w: &[F]) -> F {
        (**self).value(w)
    }

    fn gradient(&self, w: &[F]) -> Vec<F> {
        (**self).gradient(w)
    }

    fn hessian(&self, w: &[F]) -> Option<Vec<Vec<F>>> {
        (**self).hessian(w)
    }

    fn has_hessian(&self) -> bool {
        (**self).has_hessian()
    }
}

impl<F: Float, O: Objective<F> + ?Sized> Objective<F> for Box<O> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn value(&self, w: &[F]) -> F {
        (**self).value(w)
    }

    fn gradient(&self, w: &[F]) -> Vec<F> {
        (**self).gradient(w)
    }

    fn hessian(&self, w: &[F]) -> Option<Vec<Vec<F>>> {
        (**self).hessian(w)
    }

    fn has_hessian(&self) -> bool {
        (**self).has_hessian()
    }
}

type ValueFn<F> = Box<dyn Fn(&[F]) -> F + Send + Sync>;
type GradientFn<F> = Box<dyn Fn(&[F]) -> Vec<F> + Send + Sync>;
type HessianFn<F> = Box<dyn Fn(&[F]) -> Vec<Vec<F>> + Send + Sync>;

/// Closure-backed objective: the `(objective, gradient, hessian?)` triple.
///
/// ```
/// use optitrace::ObjectiveFunctions;
///
/// let f = ObjectiveFunctions::new(
///     2,
///     |w: &[f64]| w[0] * w[0] + 100.0 * w[1] * w[1],
///     |w: &[f64]| vec![2.0 * w[0], 200.0 * w[1]],
/// )
/// .with_hessian(|_: &[f64]| vec![vec![2.0, 0.0], vec![0.0, 200.0]]);
/// assert!(optitrace::Objective::has_hessian(&f));
/// ```
pub struct ObjectiveFunctions<F> {
    dim: usize,
    objective: ValueFn<F>,
    gradient: GradientFn<F>,
    hessian: Option<HessianFn<F>>,
}

impl<F: Float> ObjectiveFunctions<F> {
    /// Create a first-order objective of dimension `dim`.
    pub fn new(
        dim: usize,
        objective: impl Fn(&[F]) -> F + Send + Sync + 'static,
        gradient: impl Fn(&[F]) -> Vec<F> + Send + Sync + 'static,
    ) -> Self {
        ObjectiveFunctions {
            dim,
            objective: Box::new(objective),
            gradient: Box::new(gradient),
            hessian: None,
        }
    }

    /// Attach a Hessian callback.
    pub fn with_hessian(
        mut self,
        hessian: impl Fn(&[F]) -> Vec<Vec<F>> + Send + Sync + 'static,
    ) -> Self {
        self.hessian = Some(Box::new(hessian));
        self
    }
}

impl<F: Float> Objective<F> for ObjectiveFunctions<F> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn value(&self, w: &[F]) -> F {
        (self.objective)(w)
    }

    fn gradient(&self, w: &[F]) -> Vec<F> {
        (self.gradient)(w)
    }

    fn hessian(&self, w: &[F]) -> Option<Vec<Vec<F>>> {
        self.hessian.as_ref().map(|h| h(w))
    }

    fn has_hessian(&self) -> bool {
        self.hessian.is_some()
    }
}

impl<F> std::fmt::Debug for ObjectiveFunctions<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectiveFunctions")
            .field("dim", &self.dim)
            .field("hessian", &self.hessian.is_some())
            .finish_non_exhaustive()
    }
}
