//! End-to-end solves of the reference problem through the public solver
//! surface: broker construction, both configuration forms, convergence to
//! the grid sample nearest the analytic minimizer, and the descent
//! invariant on the goal-function values.

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;
use rstest_reuse::{apply, template};

use crate::config::SolverConfig;
use crate::descent::GradientDescent;
use crate::linalg::vector::Vector;
use crate::plugin::{BrokerKind, problem_broker, solver_broker};
use crate::problem::{Family, ShiftedParaboloid, axis_profile};
use crate::terminators::Terminator;
use crate::{DescentTrace, E, Error, Solver, SolverHooks, Status};

/// L∞ distance between neighboring samples of the reference compact
/// `[-10, 10]²` under default sampling.
const GRID_STEP: E = 20.0 / 65535.0;

fn reference_config(by_args: bool, args: [E; 2], params: [E; 2]) -> SolverConfig {
    SolverConfig {
        dim_args: 2,
        dim_params: 2,
        eps: 1e-4,
        by_args,
        args: args.to_vec(),
        params: params.to_vec(),
        begin: vec![-10.0, -10.0],
        end: vec![10.0, 10.0],
    }
}

fn assert_near(solution: &Vector, expected: [E; 2]) {
    for (coord, expected) in solution.coords().iter().zip(expected) {
        assert!(
            (coord - expected).abs() < GRID_STEP,
            "coordinate {coord} not within a grid step of {expected}"
        );
    }
}

#[template]
#[rstest]
#[case::by_args(true, [3.0, 4.0], [0.0, 0.0], [0.0, 0.0])]
#[case::by_params(false, [0.0, 0.0], [0.0, 0.0], [2.0, 1.0])]
fn reference_scenarios(
    #[case] by_args: bool,
    #[case] args: [E; 2],
    #[case] params: [E; 2],
    #[case] expected: [E; 2],
) {
}

#[apply(reference_scenarios)]
fn typed_configuration_converges(by_args: bool, args: [E; 2], params: [E; 2], expected: [E; 2]) {
    let mut solver = GradientDescent::new();
    solver.set_problem(Box::new(ShiftedParaboloid::new())).unwrap();
    solver
        .configure(&reference_config(by_args, args, params))
        .unwrap();
    assert_eq!(solver.solve().unwrap(), Status::Optimal);

    let mut solution = Vector::new(&[0.0, 0.0]).unwrap();
    solver.solution(&mut solution).unwrap();
    assert_near(&solution, expected);
}

#[apply(reference_scenarios)]
fn textual_configuration_converges(by_args: bool, args: [E; 2], params: [E; 2], expected: [E; 2]) {
    let mode = if by_args { "args" } else { "params" };
    let text = format!(
        "args:2 params:2 eps:0.0001 pararg:{mode} a0:{} a1:{} p0:{} p1:{} \
         b0:-10 b1:-10 e0:10 e1:10",
        args[0], args[1], params[0], params[1],
    );

    let mut solver = GradientDescent::new();
    solver.set_problem(Box::new(ShiftedParaboloid::new())).unwrap();
    solver.configure_text(&text).unwrap();
    assert_eq!(solver.solve().unwrap(), Status::Optimal);

    let mut solution = Vector::new(&[0.0, 0.0]).unwrap();
    solver.solution(&mut solution).unwrap();
    assert_near(&solution, expected);
}

/// Records the goal-function value of every accepted iterate.
struct ObjectiveRecorder {
    objectives: Rc<RefCell<Vec<E>>>,
}

impl Terminator for ObjectiveRecorder {
    fn terminate(&mut self, trace: &DescentTrace<'_>) -> Result<Option<Status>, Error> {
        self.objectives.borrow_mut().push(trace.objective);
        Ok(None)
    }
}

#[test]
fn objective_values_never_increase() {
    let objectives = Rc::new(RefCell::new(Vec::new()));
    let mut solver = GradientDescent::new();
    solver.set_problem(Box::new(ShiftedParaboloid::new())).unwrap();
    solver
        .configure(&reference_config(true, [3.0, 4.0], [0.0, 0.0]))
        .unwrap();
    solver.set_hooks(SolverHooks {
        callback: Default::default(),
        terminator: Some(Box::new(ObjectiveRecorder {
            objectives: objectives.clone(),
        })),
    });
    assert_eq!(solver.solve().unwrap(), Status::Optimal);

    let objectives = objectives.borrow();
    assert!(objectives.len() > 1);
    for pair in objectives.windows(2) {
        assert!(pair[1] <= pair[0], "objective increased: {pair:?}");
    }
}

#[test]
fn the_host_flow_runs_through_brokers() {
    // Host side of the data flow: obtain a problem and a solver from their
    // brokers, wire them up, solve, and sample a slice for plotting.
    let mut problem_handle = problem_broker();
    assert!(problem_handle.can_cast_to(BrokerKind::Problem));
    let problem = problem_handle.problem_mut().unwrap();

    let mut solver_handle = solver_broker();
    assert!(solver_handle.can_cast_to(BrokerKind::Solver));
    let solver = solver_handle.solver_mut().unwrap();

    solver.set_problem(dyn_clone::clone_box(problem)).unwrap();
    let layout = Vector::new(&[
        2.0, 2.0, 1e-4, 1.0, // dims, eps, args mode
        3.0, 4.0, // args seed
        0.0, 0.0, // params seed
        -10.0, -10.0, // compact lower corner
        10.0, 10.0, // compact upper corner
    ])
    .unwrap();
    solver.configure_vector(&layout).unwrap();
    assert_eq!(solver.solve().unwrap(), Status::Optimal);

    let mut minimizer = Vector::new(&[0.0, 0.0]).unwrap();
    solver.solution(&mut minimizer).unwrap();
    assert_near(&minimizer, [0.0, 0.0]);

    // One-dimensional slice of f through the minimizer, as the shell plots
    // it. The params family must be cached for by-args evaluation.
    let mut plotted = dyn_clone::clone_box(problem);
    plotted.set_params(&Vector::new(&[0.0, 0.0]).unwrap()).unwrap();
    let profile = axis_profile(
        plotted.as_ref(),
        Family::Args,
        &minimizer,
        0,
        (-1.0, 1.0),
        41,
    )
    .unwrap();
    assert_eq!(profile.len(), 41);
    let minimum = profile
        .iter()
        .cloned()
        .fold(E::INFINITY, |acc, (_, value)| acc.min(value));
    let center = profile[20].1;
    assert!((center - minimum).abs() < 1e-6);
}

#[test]
fn solution_requires_matching_dimensions() {
    let mut solver = GradientDescent::new();
    solver.set_problem(Box::new(ShiftedParaboloid::new())).unwrap();
    solver
        .configure(&reference_config(true, [1.0, 1.0], [0.0, 0.0]))
        .unwrap();
    solver.solve().unwrap();

    let mut wrong = Vector::new(&[0.0, 0.0, 0.0]).unwrap();
    assert_eq!(
        solver.solution(&mut wrong).unwrap_err(),
        Error::DimensionsMismatch
    );
}
