//! Multi-compartment pharmacokinetic simulation
//!
//! `pkmodel` simulates the amount of drug in a central compartment and any number of
//! peripheral compartments under a dosing [Protocol], by integrating the linear,
//! first-order mass-balance equations of the [Model].
//!
//! ```
//! use pkmodel::prelude::*;
//!
//! let model = Model::new(2.0, &[1.0, 2.0], &[3.0, 4.0], 3.0).unwrap();
//!
//! let mut protocol = Protocol::new(10.0).unwrap();
//! protocol.make_subcutaneous(0.3).unwrap();
//! protocol.set_continuous_window(0.2, 0.6).unwrap();
//! for t in [0.0, 0.1, 0.2, 0.3] {
//!     protocol.add_dose_time(t).unwrap();
//! }
//!
//! let run = solve(&model, &protocol, 1.0, 1000).unwrap();
//! assert_eq!(run.states().nrows(), 4);
//! assert_eq!(run.states().ncols(), 1000);
//! ```
pub mod error;
pub mod model;
pub mod protocol;
pub mod scenario;
pub mod simulator;

pub use crate::error::{FailureReason, PkError};
pub use crate::model::{Model, ModelBuilder, Peripheral};
pub use crate::protocol::{
    BolusKernel, ContinuousWindow, Dose, DoseSchedule, DosingRate, Protocol, ProtocolConfig,
    Route,
};
pub use crate::scenario::Scenario;
pub use crate::simulator::{
    solve, solve_many, solve_with, Kinetics, Method, SimulationRun, SolverSettings, StateLayout,
};

pub mod prelude {
    pub use crate::model::{Model, ModelBuilder};
    pub use crate::protocol::{BolusKernel, Protocol, Route};
    pub use crate::scenario::Scenario;
    pub use crate::simulator::{solve, solve_many, solve_with, Method, SimulationRun, SolverSettings};
    pub use crate::PkError;
}
