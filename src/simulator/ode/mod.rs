mod closure;

use closure::PkProblem;
use diffsol::{
    error::{DiffsolError, OdeSolverError},
    ode_solver::method::OdeSolverMethod,
    NalgebraLU, OdeBuilder, OdeSolverStopReason,
};
use ndarray::Array2;

use crate::protocol::Dose;
use crate::simulator::layout::Kinetics;
use crate::simulator::{Method, SolverSettings};
use crate::{DosingRate, FailureReason, PkError};

type V = nalgebra::DVector<f64>;
type M = nalgebra::DMatrix<f64>;

/// Times closer than this fraction of the time span are treated as equal
const SNAP: f64 = 1e-9;

/// Stretch of integration between two impulses
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    start: f64,
    /// Intermediate stops, with the report column each one fills
    stops: Vec<(f64, Option<usize>)>,
    end: f64,
    /// Amount added to the input compartment once `end` is reached
    impulse: f64,
    /// Report columns filled at `end`, after the impulse
    reports: Vec<usize>,
}

/// Segments covering the report grid, plus the amount given at t = 0
#[derive(Debug, Clone, PartialEq)]
struct Plan {
    initial: f64,
    segments: Vec<Segment>,
}

impl Plan {
    fn new(grid: &[f64], impulses: &[Dose], breakpoints: &[f64]) -> Self {
        let t_end = grid[grid.len() - 1];
        let snap = SNAP * t_end;

        let initial = impulses
            .iter()
            .filter(|dose| dose.time() <= snap)
            .map(|dose| dose.amount())
            .sum();

        let mut ends: Vec<(f64, f64)> = Vec::new();
        for dose in impulses
            .iter()
            .filter(|dose| dose.time() > snap && dose.time() <= t_end + snap)
        {
            let time = if dose.time() >= t_end - snap {
                t_end
            } else {
                dose.time()
            };
            match ends.last_mut() {
                Some(last) if time - last.0 <= snap => last.1 += dose.amount(),
                _ => ends.push((time, dose.amount())),
            }
        }
        if ends.last().map_or(true, |last| last.0 < t_end) {
            ends.push((t_end, 0.0));
        }

        let mut next = 1;
        let mut merged: Vec<f64> = Vec::with_capacity(breakpoints.len());
        for &b in breakpoints.iter().filter(|&&b| b > snap && b < t_end - snap) {
            if merged.last().map_or(true, |&last| b - last > snap) {
                merged.push(b);
            }
        }
        let mut breaks = merged.into_iter().peekable();
        let mut start = 0.0;
        let mut segments = Vec::with_capacity(ends.len());
        for (end, impulse) in ends {
            let mut stops = Vec::new();
            loop {
                let report = grid.get(next).copied().filter(|&g| g < end - snap);
                let point = breaks.peek().copied().filter(|&b| b < end - snap);
                match (report, point) {
                    (Some(g), Some(b)) if b < g - snap => {
                        stops.push((b, None));
                        breaks.next();
                    }
                    (Some(g), Some(b)) if (b - g).abs() <= snap => {
                        stops.push((g, Some(next)));
                        next += 1;
                        breaks.next();
                    }
                    (Some(g), _) => {
                        stops.push((g, Some(next)));
                        next += 1;
                    }
                    (None, Some(b)) => {
                        stops.push((b, None));
                        breaks.next();
                    }
                    (None, None) => break,
                }
            }
            while breaks.peek().is_some_and(|&b| b <= end + snap) {
                breaks.next();
            }
            let mut reports = Vec::new();
            while next < grid.len() && grid[next] <= end + snap {
                reports.push(next);
                next += 1;
            }
            segments.push(Segment {
                start,
                stops,
                end,
                impulse,
                reports,
            });
            start = end;
        }

        Plan { initial, segments }
    }
}

/// Integrate the system from a zero state over `grid`
///
/// Returns the state matrix (one column per grid point) and the number of solver steps taken.
pub(crate) fn integrate(
    kinetics: &Kinetics,
    dosing: &DosingRate,
    grid: &[f64],
    settings: &SolverSettings,
) -> Result<(Array2<f64>, usize), PkError> {
    let nstates = kinetics.nstates();
    let input = kinetics.layout().input();
    let plan = Plan::new(grid, dosing.impulses(), &dosing.breakpoints());

    let mut states = Array2::zeros((nstates, grid.len()));
    let mut budget = StepBudget::new(settings.max_steps);
    let mut x = V::zeros(nstates);
    x[input] += plan.initial;
    record(&mut states, 0, &x);

    for segment in &plan.segments {
        x = integrate_segment(kinetics, dosing, segment, x, settings, &mut states, &mut budget)?;
        x[input] += segment.impulse;
        check_finite(&x, segment.end)?;
        for &column in &segment.reports {
            record(&mut states, column, &x);
        }
    }
    Ok((states, budget.taken))
}

fn integrate_segment(
    kinetics: &Kinetics,
    dosing: &DosingRate,
    segment: &Segment,
    x: V,
    settings: &SolverSettings,
    states: &mut Array2<f64>,
    budget: &mut StepBudget,
) -> Result<V, PkError> {
    let mut dx = V::zeros(x.len());
    kinetics.derivative(&x, dosing.smooth_rate(segment.start), &mut dx);
    check_finite(&dx, segment.start)?;

    let problem = OdeBuilder::<M>::new()
        .atol(vec![settings.atol; kinetics.nstates()])
        .rtol(settings.rtol)
        .t0(segment.start)
        .h0(settings.h0.min(segment.end - segment.start))
        .build_from_eqn(PkProblem::new(kinetics, dosing, x))
        .map_err(|err| solver_error(segment.start, err))?;

    match settings.method {
        Method::Esdirk34 => {
            let mut solver = problem
                .esdirk34::<NalgebraLU<f64>>()
                .map_err(|err| solver_error(segment.start, err))?;
            advance(&mut solver, segment, states, budget)
        }
        Method::TrBdf2 => {
            let mut solver = problem
                .tr_bdf2::<NalgebraLU<f64>>()
                .map_err(|err| solver_error(segment.start, err))?;
            advance(&mut solver, segment, states, budget)
        }
        Method::Bdf => {
            let mut solver = problem
                .bdf::<NalgebraLU<f64>>()
                .map_err(|err| solver_error(segment.start, err))?;
            advance(&mut solver, segment, states, budget)
        }
    }
}

fn advance<'a, S>(
    solver: &mut S,
    segment: &Segment,
    states: &mut Array2<f64>,
    budget: &mut StepBudget,
) -> Result<V, PkError>
where
    S: OdeSolverMethod<'a, PkProblem>,
{
    for &(time, column) in &segment.stops {
        step_to(solver, time, budget)?;
        if let Some(column) = column {
            record(states, column, solver.state().y);
        }
    }
    step_to(solver, segment.end, budget)?;
    Ok(solver.state().y.clone())
}

fn step_to<'a, S>(solver: &mut S, stop: f64, budget: &mut StepBudget) -> Result<(), PkError>
where
    S: OdeSolverMethod<'a, PkProblem>,
{
    match solver.set_stop_time(stop) {
        Ok(_) => {}
        Err(DiffsolError::OdeSolverError(OdeSolverError::StopTimeAtCurrentTime)) => return Ok(()),
        Err(err) => return Err(solver_error(solver.state().t, err)),
    }
    loop {
        let result = solver.step();
        let time = solver.state().t;
        match result {
            Ok(OdeSolverStopReason::InternalTimestep) => {
                budget.take(time)?;
                check_finite(solver.state().y, time)?;
            }
            Ok(OdeSolverStopReason::TstopReached) => {
                budget.take(time)?;
                check_finite(solver.state().y, time)?;
                return Ok(());
            }
            Ok(reason) => {
                return Err(PkError::integration(
                    time,
                    FailureReason::Solver(format!("unexpected solver return value: {:?}", reason)),
                ))
            }
            Err(err) => return Err(solver_error(time, err)),
        }
    }
}

struct StepBudget {
    taken: usize,
    max: usize,
}

impl StepBudget {
    fn new(max: usize) -> Self {
        Self { taken: 0, max }
    }

    fn take(&mut self, time: f64) -> Result<(), PkError> {
        self.taken += 1;
        if self.taken > self.max {
            return Err(PkError::integration(
                time,
                FailureReason::MaxStepsExceeded(self.max),
            ));
        }
        Ok(())
    }
}

#[inline(always)]
fn record(states: &mut Array2<f64>, column: usize, x: &V) {
    for (row, value) in x.iter().enumerate() {
        states[[row, column]] = *value;
    }
}

fn check_finite(x: &V, time: f64) -> Result<(), PkError> {
    if x.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(PkError::integration(time, FailureReason::NonFinite))
    }
}

fn solver_error(time: f64, err: DiffsolError) -> PkError {
    match err {
        DiffsolError::OdeSolverError(OdeSolverError::StepSizeTooSmall { time }) => {
            PkError::integration(time, FailureReason::StepSizeTooSmall)
        }
        DiffsolError::OdeSolverError(OdeSolverError::TooManyErrorTestFailures { time }) => {
            PkError::integration(time, FailureReason::ErrorTestFailures)
        }
        err => PkError::integration(time, FailureReason::Solver(err.to_string())),
    }
}
