//! Plug-in driven numerical minimization over sampled boxes.
//!
//! Problems and solvers are shared modules discovered at runtime through the
//! broker protocol in [`plugin`]; the bundled [`descent::GradientDescent`]
//! minimizes a problem's goal function over a uniformly sampled compact by
//! projected gradient descent.

use derive_more::{Display, Error};

use crate::callback::Callbacks;
use crate::config::SolverConfig;
use crate::linalg::vector::Vector;
use crate::problem::Problem;
use crate::terminators::Terminator;

/// Scalar element type used throughout the crate.
pub type E = f64;
/// Index type for positional access.
pub type I = usize;

pub mod callback;
pub mod config;
pub mod descent;
pub mod grid;
pub mod linalg;
pub mod log;
pub mod plugin;
pub mod problem;
pub mod terminators;

#[cfg(test)]
pub mod tests;

/// Result codes shared by every fallible operation in the crate.
///
/// The set is closed: plug-ins report failures with these values and nothing
/// else, so hosts can match exhaustively. [`Error::code`] gives the stable
/// integer form used across the plug-in boundary.
#[derive(Debug, Display, Error, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    #[display("wrong argument")]
    WrongArg,

    #[display("index out of range")]
    OutOfRange,

    #[display("vector dimensions mismatch")]
    DimensionsMismatch,

    #[display("memory allocation failed")]
    MemoryAllocation,

    #[display("not implemented")]
    NotImplemented,

    #[display("norm not defined")]
    NormNotDefined,

    #[display("failed to open log file")]
    OpenLog,

    #[display("failed to write to log file")]
    WriteToLog,

    #[display("problem rejected by solver")]
    WrongProblem,

    #[display("variables number mismatch")]
    VariablesNumberMismatch,

    #[display("unspecified failure")]
    AnyOther,
}

impl Error {
    /// Stable integer code for the plug-in boundary. `0` is reserved for
    /// success and never produced here.
    pub fn code(self) -> i32 {
        match self {
            Error::WrongArg => 1,
            Error::OutOfRange => 2,
            Error::DimensionsMismatch => 3,
            Error::MemoryAllocation => 4,
            Error::NotImplemented => 5,
            Error::NormNotDefined => 6,
            Error::OpenLog => 7,
            Error::WriteToLog => 8,
            Error::WrongProblem => 9,
            Error::VariablesNumberMismatch => 10,
            Error::AnyOther => 11,
        }
    }

    /// Inverse of [`Error::code`]. `0` (success) and unknown codes map to
    /// `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Error::WrongArg),
            2 => Some(Error::OutOfRange),
            3 => Some(Error::DimensionsMismatch),
            4 => Some(Error::MemoryAllocation),
            5 => Some(Error::NotImplemented),
            6 => Some(Error::NormNotDefined),
            7 => Some(Error::OpenLog),
            8 => Some(Error::WriteToLog),
            9 => Some(Error::WrongProblem),
            10 => Some(Error::VariablesNumberMismatch),
            11 => Some(Error::AnyOther),
            _ => None,
        }
    }
}

/// Status codes for optimization solvers.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Status {
    #[default]
    /// The solver is still running.
    InProgress,
    /// An optimal solution was found.
    Optimal,
    /// The solver stopped due to an iteration limit.
    IterationLimit,
    /// The solver stopped due to a time limit.
    TimeLimit,
}

/// Snapshot of one outer iteration, handed to callbacks and terminators.
#[derive(Debug, Clone, Copy)]
pub struct DescentTrace<'a> {
    /// Outer iteration counter, starting at 0.
    pub nit: I,
    /// Step length accepted by the backoff loop.
    pub alpha: E,
    /// Goal-function value at the current iterate.
    pub objective: E,
    /// Current iterate.
    pub curr: &'a Vector,
    /// Previous iterate, absent before the first accepted step.
    pub prev: Option<&'a Vector>,
}

/// Per-solve hooks: a callback invoked once per outer iteration and an
/// optional extra terminator consulted after the built-in tolerance test.
#[derive(Default)]
pub struct SolverHooks {
    pub callback: Callbacks,
    pub terminator: Option<Box<dyn Terminator>>,
}

/// Contract for iterative solvers loaded through the broker protocol.
///
/// A solver is usable once a problem is bound and a configuration has been
/// applied; `solve` then runs to completion on the calling thread and
/// `solution` copies out the last accepted iterate.
pub trait Solver {
    /// Binds the problem to minimize. Fails with [`Error::WrongProblem`] when
    /// an existing configuration disagrees with the problem's dimensions.
    fn set_problem(&mut self, problem: Box<dyn Problem>) -> Result<(), Error>;

    /// Applies a typed configuration, replacing any previous one atomically.
    fn configure(&mut self, config: &SolverConfig) -> Result<(), Error>;

    /// Parses and applies the textual `key:value` configuration form.
    fn configure_text(&mut self, text: &str) -> Result<(), Error> {
        self.configure(&text.parse::<SolverConfig>()?)
    }

    /// Parses and applies the flat numeric configuration layout.
    fn configure_vector(&mut self, layout: &Vector) -> Result<(), Error> {
        self.configure(&SolverConfig::from_layout(layout)?)
    }

    /// Runs the iteration until a terminator fires or an error propagates.
    fn solve(&mut self) -> Result<Status, Error>;

    /// Copies the current minimizer into `out` (dimensions must match).
    fn solution(&self, out: &mut Vector) -> Result<(), Error>;

    /// URL of the parameter-form asset consumed by host shells. Opaque to
    /// the core.
    fn ui_form(&self) -> &'static str;
}
