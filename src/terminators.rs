//! Terminators for ending a solve with a definite [`Status`].
//!
//! The solver always runs an iterate-tolerance test; extra terminators can
//! be attached through [`crate::SolverHooks`], including:
//! - [`ToleranceTerminator`]: successive iterates agree under L∞.
//! - [`TimeOutTerminator`]: terminates after a specified time limit.
//! - [`MultipleTerminators`]: combines multiple terminators.

use std::time::Instant;

use crate::linalg::vector::Norm;
use crate::{DescentTrace, E, Error, Status};

pub trait Terminator {
    /// Called once before the first iteration.
    fn initialize(&mut self) {}

    /// Returns a final status to stop the solve, or `None` to continue.
    fn terminate(&mut self, trace: &DescentTrace<'_>) -> Result<Option<Status>, Error>;
}

/// Terminates with [`Status::Optimal`] once the current and previous
/// iterates agree to `eps` under the L∞ norm.
pub struct ToleranceTerminator {
    eps: E,
}

impl ToleranceTerminator {
    pub fn new(eps: E) -> Self {
        Self { eps }
    }
}

impl Terminator for ToleranceTerminator {
    fn terminate(&mut self, trace: &DescentTrace<'_>) -> Result<Option<Status>, Error> {
        match trace.prev {
            Some(prev) if trace.curr.eq_with(prev, Norm::Inf, self.eps)? => {
                Ok(Some(Status::Optimal))
            }
            _ => Ok(None),
        }
    }
}

/// Terminator that triggers after a specified number of seconds.
pub struct TimeOutTerminator {
    max_time_secs: u64,
    start_time: Instant,
}

impl TimeOutTerminator {
    pub fn new(max_time_secs: u64) -> Self {
        Self {
            max_time_secs,
            start_time: Instant::now(),
        }
    }
}

impl Terminator for TimeOutTerminator {
    fn initialize(&mut self) {
        self.start_time = Instant::now();
    }

    fn terminate(&mut self, _trace: &DescentTrace<'_>) -> Result<Option<Status>, Error> {
        if self.start_time.elapsed().as_secs() >= self.max_time_secs {
            Ok(Some(Status::TimeLimit))
        } else {
            Ok(None)
        }
    }
}

/// Terminator that combines multiple terminators and triggers if any of
/// them do.
pub struct MultipleTerminators {
    terminators: Vec<Box<dyn Terminator>>,
}

impl MultipleTerminators {
    pub fn new(terminators: Vec<Box<dyn Terminator>>) -> Self {
        Self { terminators }
    }
}

impl Terminator for MultipleTerminators {
    fn initialize(&mut self) {
        for terminator in &mut self.terminators {
            terminator.initialize();
        }
    }

    fn terminate(&mut self, trace: &DescentTrace<'_>) -> Result<Option<Status>, Error> {
        for terminator in &mut self.terminators {
            if let Some(status) = terminator.terminate(trace)? {
                return Ok(Some(status));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::vector::Vector;

    fn trace<'a>(curr: &'a Vector, prev: Option<&'a Vector>) -> DescentTrace<'a> {
        DescentTrace {
            nit: 0,
            alpha: 1.0,
            objective: 0.0,
            curr,
            prev,
        }
    }

    #[test]
    fn tolerance_needs_a_previous_iterate() {
        let curr = Vector::new(&[1.0, 1.0]).unwrap();
        let mut terminator = ToleranceTerminator::new(1e-3);
        assert_eq!(terminator.terminate(&trace(&curr, None)).unwrap(), None);
    }

    #[test]
    fn tolerance_fires_once_iterates_agree() {
        let curr = Vector::new(&[1.0, 1.0]).unwrap();
        let near = Vector::new(&[1.0 + 1e-4, 1.0]).unwrap();
        let far = Vector::new(&[1.5, 1.0]).unwrap();
        let mut terminator = ToleranceTerminator::new(1e-3);
        assert_eq!(
            terminator.terminate(&trace(&curr, Some(&far))).unwrap(),
            None
        );
        assert_eq!(
            terminator.terminate(&trace(&curr, Some(&near))).unwrap(),
            Some(Status::Optimal)
        );
    }

    #[test]
    fn timeout_fires_after_the_limit() {
        let curr = Vector::new(&[0.0]).unwrap();
        let mut terminator = TimeOutTerminator::new(0);
        terminator.initialize();
        assert_eq!(
            terminator.terminate(&trace(&curr, None)).unwrap(),
            Some(Status::TimeLimit)
        );
    }

    #[test]
    fn multiple_reports_the_first_firing_member() {
        let curr = Vector::new(&[1.0]).unwrap();
        let prev = Vector::new(&[1.0]).unwrap();
        let mut terminator = MultipleTerminators::new(vec![
            Box::new(TimeOutTerminator::new(3600)),
            Box::new(ToleranceTerminator::new(1e-6)),
        ]);
        terminator.initialize();
        assert_eq!(
            terminator.terminate(&trace(&curr, Some(&prev))).unwrap(),
            Some(Status::Optimal)
        );
    }
}
