use dyn_clone::DynClone;

use crate::linalg::vector::Vector;
use crate::{E, Error, I};

/// The two vector families a problem consumes. A solver varies one family
/// while the other is held fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Args,
    Params,
}

/// Contract exposed by problem plug-ins.
///
/// A problem evaluates a scalar goal function `f(args; params)` and its
/// partial derivatives with respect to either family. Hosts may cache one
/// vector of each family on the problem (`set_args` / `set_params`); the
/// `*_by_args` / `*_by_params` variants evaluate against the cached
/// counterpart.
///
/// Dimension violations report [`Error::VariablesNumberMismatch`].
pub trait Problem: DynClone {
    fn args_dim(&self) -> I;
    fn params_dim(&self) -> I;

    /// Caches a copy of `args` for the `*_by_params` evaluations.
    fn set_args(&mut self, args: &Vector) -> Result<(), Error>;

    /// Caches a copy of `params` for the `*_by_args` evaluations.
    fn set_params(&mut self, params: &Vector) -> Result<(), Error>;

    fn goal_function(&self, args: &Vector, params: &Vector) -> Result<E, Error>;

    fn goal_function_by_args(&self, args: &Vector) -> Result<E, Error>;

    fn goal_function_by_params(&self, params: &Vector) -> Result<E, Error>;

    /// Partial derivative of the goal function.
    ///
    /// `order` 0 is the function value, 1 is `∂f/∂x_idx`, 2 is
    /// `∂²f/∂x_idx²`, and anything higher is zero; `idx` indexes into the
    /// chosen `family` and is range-checked against its dimension.
    fn derivative_goal_function(
        &self,
        order: I,
        idx: I,
        family: Family,
        args: &Vector,
        params: &Vector,
    ) -> Result<E, Error>;

    fn derivative_goal_function_by_args(
        &self,
        order: I,
        idx: I,
        family: Family,
        args: &Vector,
    ) -> Result<E, Error>;

    fn derivative_goal_function_by_params(
        &self,
        order: I,
        idx: I,
        family: Family,
        params: &Vector,
    ) -> Result<E, Error>;
}

dyn_clone::clone_trait_object!(Problem);

/// Samples a one-dimensional slice of the goal function through `point`.
///
/// Coordinate `axis` of the chosen family sweeps `samples` evenly spaced
/// positions over `[lo, hi]` while the remaining coordinates stay at
/// `point`; the fixed counterpart family must already be cached on the
/// problem. Returns `(coordinate, value)` pairs ready for plotting.
pub fn axis_profile(
    problem: &dyn Problem,
    family: Family,
    point: &Vector,
    axis: I,
    range: (E, E),
    samples: I,
) -> Result<Vec<(E, E)>, Error> {
    let dim = match family {
        Family::Args => problem.args_dim(),
        Family::Params => problem.params_dim(),
    };
    if point.dim() != dim {
        tracing::warn!(
            point = point.dim(),
            dim,
            "profile point dimensions mismatch"
        );
        return Err(Error::VariablesNumberMismatch);
    }
    if axis >= dim {
        tracing::warn!(axis, dim, "profile axis out of range");
        return Err(Error::OutOfRange);
    }
    let (lo, hi) = range;
    if samples < 2 || !(lo <= hi) {
        tracing::warn!(samples, lo, hi, "degenerate profile range");
        return Err(Error::WrongArg);
    }

    let mut probe = point.clone();
    let mut profile = Vec::with_capacity(samples);
    let stride = (hi - lo) / (samples - 1) as E;
    for k in 0..samples {
        let coordinate = lo + stride * k as E;
        probe.set(axis, coordinate)?;
        let value = match family {
            Family::Args => problem.goal_function_by_args(&probe)?,
            Family::Params => problem.goal_function_by_params(&probe)?,
        };
        profile.push((coordinate, value));
    }
    Ok(profile)
}

/// Reference problem: a shifted paraboloid in two args and two params,
///
/// ```text
///   f(a; p) = a0² + a1² + p0² − 4·p0 + p1² − 2·p1
/// ```
///
/// with the unique minimizer `(0, 0)` over args and `(2, 1)` over params.
#[derive(Debug, Clone, Default)]
pub struct ShiftedParaboloid {
    args: Option<Vector>,
    params: Option<Vector>,
}

impl ShiftedParaboloid {
    pub const ARGS_DIM: I = 2;
    pub const PARAMS_DIM: I = 2;

    pub fn new() -> Self {
        Self::default()
    }

    fn cached_args(&self) -> Result<&Vector, Error> {
        self.args.as_ref().ok_or_else(|| {
            tracing::warn!("no args cached on the problem");
            Error::WrongArg
        })
    }

    fn cached_params(&self) -> Result<&Vector, Error> {
        self.params.as_ref().ok_or_else(|| {
            tracing::warn!("no params cached on the problem");
            Error::WrongArg
        })
    }

    fn check_family(&self, vec: &Vector, family: Family) -> Result<(), Error> {
        let dim = match family {
            Family::Args => Self::ARGS_DIM,
            Family::Params => Self::PARAMS_DIM,
        };
        if vec.dim() != dim {
            tracing::warn!(given = vec.dim(), dim, "family dimensions mismatch");
            return Err(Error::VariablesNumberMismatch);
        }
        Ok(())
    }
}

impl Problem for ShiftedParaboloid {
    fn args_dim(&self) -> I {
        Self::ARGS_DIM
    }

    fn params_dim(&self) -> I {
        Self::PARAMS_DIM
    }

    fn set_args(&mut self, args: &Vector) -> Result<(), Error> {
        self.check_family(args, Family::Args)?;
        self.args = Some(args.clone());
        Ok(())
    }

    fn set_params(&mut self, params: &Vector) -> Result<(), Error> {
        self.check_family(params, Family::Params)?;
        self.params = Some(params.clone());
        Ok(())
    }

    fn goal_function(&self, args: &Vector, params: &Vector) -> Result<E, Error> {
        self.check_family(args, Family::Args)?;
        self.check_family(params, Family::Params)?;
        let a = args.coords();
        let p = params.coords();
        Ok(a[0] * a[0] + a[1] * a[1] + p[0] * p[0] - 4.0 * p[0] + p[1] * p[1] - 2.0 * p[1])
    }

    fn goal_function_by_args(&self, args: &Vector) -> Result<E, Error> {
        self.goal_function(args, self.cached_params()?)
    }

    fn goal_function_by_params(&self, params: &Vector) -> Result<E, Error> {
        self.goal_function(self.cached_args()?, params)
    }

    fn derivative_goal_function(
        &self,
        order: I,
        idx: I,
        family: Family,
        args: &Vector,
        params: &Vector,
    ) -> Result<E, Error> {
        self.check_family(args, Family::Args)?;
        self.check_family(params, Family::Params)?;
        let dim = match family {
            Family::Args => Self::ARGS_DIM,
            Family::Params => Self::PARAMS_DIM,
        };
        if idx >= dim {
            tracing::warn!(idx, dim, "derivative index out of range");
            return Err(Error::OutOfRange);
        }
        match order {
            0 => self.goal_function(args, params),
            1 => match family {
                Family::Args => Ok(2.0 * args.coords()[idx]),
                Family::Params => match idx {
                    0 => Ok(2.0 * params.coords()[0] - 4.0),
                    _ => Ok(2.0 * params.coords()[1] - 2.0),
                },
            },
            // The Hessian is 2·I in both families.
            2 => Ok(2.0),
            _ => Ok(0.0),
        }
    }

    fn derivative_goal_function_by_args(
        &self,
        order: I,
        idx: I,
        family: Family,
        args: &Vector,
    ) -> Result<E, Error> {
        self.derivative_goal_function(order, idx, family, args, self.cached_params()?)
    }

    fn derivative_goal_function_by_params(
        &self,
        order: I,
        idx: I,
        family: Family,
        params: &Vector,
    ) -> Result<E, Error> {
        self.derivative_goal_function(order, idx, family, self.cached_args()?, params)
    }
}
