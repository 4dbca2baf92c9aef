//! JSON description of a complete simulation
//!
//! A [Scenario] bundles a [Model], a [Protocol] and optional [SolverSettings]. Both the
//! model and the protocol are validated while parsing, so a parsed scenario is always
//! ready to be solved.
//!
//! ```
//! use pkmodel::Scenario;
//!
//! let json = r#"{
//!     "model": {
//!         "central_volume": 2.0,
//!         "clearance": 3.0,
//!         "peripheral_volumes": [1.0, 2.0],
//!         "transition_rates": [3.0, 4.0]
//!     },
//!     "protocol": {
//!         "dose_amount": 10.0,
//!         "route": "subcutaneous",
//!         "absorption_rate": 0.3,
//!         "continuous": true,
//!         "continuous_window": [0.2, 0.6],
//!         "instantaneous": true,
//!         "dose_times": [0.0, 0.1, 0.2, 0.3]
//!     },
//!     "solver": { "t_max": 1.0, "report_count": 100 }
//! }"#;
//!
//! let scenario = Scenario::from_json(json).unwrap();
//! let run = scenario.solve().unwrap();
//! assert_eq!(run.nstates(), 4);
//! assert_eq!(run.ntimes(), 100);
//! ```

use serde::{Deserialize, Serialize};

use crate::simulator::{solve_with, SimulationRun, SolverSettings};
use crate::{Model, PkError, Protocol};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub model: Model,
    pub protocol: Protocol,
    #[serde(default)]
    pub solver: SolverSettings,
}

impl Scenario {
    pub fn new(model: Model, protocol: Protocol, solver: SolverSettings) -> Self {
        Scenario {
            model,
            protocol,
            solver,
        }
    }

    /// Parse a scenario from a JSON string
    pub fn from_json(json: &str) -> Result<Self, PkError> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.solver.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, PkError> {
        let scenario: Self = serde_json::from_value(value)?;
        scenario.solver.validate()?;
        Ok(scenario)
    }

    /// Serialize to a pretty-printed JSON string
    pub fn to_json(&self) -> Result<String, PkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Split into its parts, checking the solver settings
    pub fn build(self) -> Result<(Model, Protocol, SolverSettings), PkError> {
        self.solver.validate()?;
        Ok((self.model, self.protocol, self.solver))
    }

    pub fn solve(&self) -> Result<SimulationRun, PkError> {
        solve_with(&self.model, &self.protocol, &self.solver)
    }
}
