//! Assembly and integration of the compartmental ODE system
//!
//! [solve] is the single entry point: it resolves the [Kinetics] of a [Model] under the
//! route of a [Protocol], integrates the system from an empty body over `[0, t_max]` and
//! returns a [SimulationRun] sampled on an evenly spaced report grid.
//!
//! Instantaneous doses are either spread with a narrow Gaussian kernel, which keeps the
//! right-hand side integrable, or applied as exact jumps between integration segments,
//! depending on the protocol's [crate::BolusKernel]. The integrator stops at every report
//! time, so its internal step never exceeds the report spacing.
pub(crate) mod layout;
mod ode;
pub(crate) mod run;

pub use layout::{Kinetics, StateLayout};
pub use run::SimulationRun;

use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Model, PkError, Protocol};

/// Integration method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Adaptive embedded Runge-Kutta, ESDIRK 3(4) with an explicit first stage
    #[default]
    Esdirk34,
    /// Adaptive embedded Runge-Kutta, TR-BDF2
    TrBdf2,
    /// Variable-order backward differentiation
    Bdf,
}

/// Settings of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SolverSettings {
    /// End of the simulated time span (hours)
    pub t_max: f64,
    /// Number of evenly spaced report times, including 0 and `t_max`
    pub report_count: usize,
    pub rtol: f64,
    pub atol: f64,
    /// Initial step size
    pub h0: f64,
    /// Maximum number of solver steps for the whole run
    pub max_steps: usize,
    pub method: Method,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            t_max: 1.0,
            report_count: 1000,
            rtol: 1e-6,
            atol: 1e-8,
            h0: 1e-4,
            max_steps: 100_000,
            method: Method::Esdirk34,
        }
    }
}

impl SolverSettings {
    pub fn new(t_max: f64, report_count: usize) -> Self {
        SolverSettings {
            t_max,
            report_count,
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn validate(&self) -> Result<(), PkError> {
        if !self.t_max.is_finite() || self.t_max <= 0.0 {
            return Err(PkError::settings(format!(
                "t_max must be positive and finite, got {}",
                self.t_max
            )));
        }
        if self.report_count < 2 {
            return Err(PkError::settings(format!(
                "report_count must be at least 2, got {}",
                self.report_count
            )));
        }
        for (name, value) in [("rtol", self.rtol), ("atol", self.atol), ("h0", self.h0)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PkError::settings(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.max_steps == 0 {
            return Err(PkError::settings("max_steps must be at least 1"));
        }
        Ok(())
    }

    /// Evenly spaced report times from 0 to `t_max`, both included
    pub fn time_grid(&self) -> Result<Array1<f64>, PkError> {
        self.validate()?;
        let last = (self.report_count - 1) as f64;
        Ok(Array1::from_iter(
            (0..self.report_count).map(|i| self.t_max * i as f64 / last),
        ))
    }
}

/// Simulate `model` under `protocol` over `[0, t_max]`, reporting at `report_count` times
pub fn solve(
    model: &Model,
    protocol: &Protocol,
    t_max: f64,
    report_count: usize,
) -> Result<SimulationRun, PkError> {
    solve_with(model, protocol, &SolverSettings::new(t_max, report_count))
}

/// Simulate `model` under `protocol` with explicit [SolverSettings]
pub fn solve_with(
    model: &Model,
    protocol: &Protocol,
    settings: &SolverSettings,
) -> Result<SimulationRun, PkError> {
    let times = settings.time_grid()?;
    let kinetics = Kinetics::for_protocol(model, protocol);
    let dosing = protocol.dosing_rate();
    let layout = kinetics.layout();

    tracing::debug!(
        nstates = layout.nstates(),
        subcutaneous = protocol.is_subcutaneous(),
        t_max = settings.t_max,
        report_count = settings.report_count,
        method = ?settings.method,
        "starting simulation"
    );

    let grid = times.to_vec();
    match ode::integrate(&kinetics, &dosing, &grid, settings) {
        Ok((states, steps)) => {
            tracing::debug!(steps, "simulation finished");
            Ok(SimulationRun::new(times, states, layout, steps))
        }
        Err(err) => {
            tracing::warn!("simulation failed: {}", err);
            Err(err)
        }
    }
}

/// Simulate several independent model/protocol pairs in parallel
///
/// Results are returned in input order, each run failing or succeeding on its own.
pub fn solve_many(
    runs: &[(Model, Protocol)],
    settings: &SolverSettings,
) -> Vec<Result<SimulationRun, PkError>> {
    runs.par_iter()
        .map(|(model, protocol)| solve_with(model, protocol, settings))
        .collect()
}
