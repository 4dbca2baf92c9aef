use serde::{Deserialize, Serialize};

use crate::{Model, Protocol, Route};

type V = nalgebra::DVector<f64>;

/// Arrangement of the state vector for an administration route
///
/// Index 0 is always the central compartment and `1..size` the peripherals in model
/// order. Subcutaneous dosing appends a depot compartment at index `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateLayout {
    Intravenous { size: usize },
    Subcutaneous { size: usize },
}

impl StateLayout {
    /// Number of states in the ODE system
    pub fn nstates(&self) -> usize {
        match *self {
            StateLayout::Intravenous { size } => size,
            StateLayout::Subcutaneous { size } => size + 1,
        }
    }

    /// Number of model compartments, excluding the depot
    pub fn size(&self) -> usize {
        match *self {
            StateLayout::Intravenous { size } | StateLayout::Subcutaneous { size } => size,
        }
    }

    pub fn central(&self) -> usize {
        0
    }

    /// Index of the depot compartment, only present for subcutaneous dosing
    pub fn depot(&self) -> Option<usize> {
        match *self {
            StateLayout::Intravenous { .. } => None,
            StateLayout::Subcutaneous { size } => Some(size),
        }
    }

    /// Compartment that receives the drug input
    pub fn input(&self) -> usize {
        self.depot().unwrap_or(self.central())
    }
}

/// Linear first-order kinetics of a [Model] under a given [Route]
///
/// Resolved once per simulation, so the right-hand side does not branch on the
/// protocol settings while integrating.
#[derive(Debug, Clone, PartialEq)]
pub enum Kinetics {
    Intravenous {
        model: Model,
    },
    Subcutaneous {
        model: Model,
        absorption_rate: f64,
    },
}

impl Kinetics {
    pub fn new(model: &Model, route: Route) -> Self {
        let model = model.clone();
        match route {
            Route::Intravenous => Kinetics::Intravenous { model },
            Route::Subcutaneous { absorption_rate } => Kinetics::Subcutaneous {
                model,
                absorption_rate,
            },
        }
    }

    pub fn for_protocol(model: &Model, protocol: &Protocol) -> Self {
        Self::new(model, protocol.route())
    }

    pub fn layout(&self) -> StateLayout {
        match self {
            Kinetics::Intravenous { model } => StateLayout::Intravenous { size: model.size() },
            Kinetics::Subcutaneous { model, .. } => StateLayout::Subcutaneous { size: model.size() },
        }
    }

    pub fn nstates(&self) -> usize {
        self.layout().nstates()
    }

    /// Evaluate `dx = f(x)` given the external input rate into the dosing compartment
    ///
    /// The system is linear in `(x, input)`, so calling this with `input = 0` gives the
    /// Jacobian-vector product.
    pub fn derivative(&self, x: &V, input: f64, dx: &mut V) {
        match self {
            Kinetics::Intravenous { model } => disposition(model, x, input, dx),
            Kinetics::Subcutaneous {
                model,
                absorption_rate,
            } => {
                let depot = model.size();
                let absorbed = absorption_rate * x[depot];
                disposition(model, x, absorbed, dx);
                dx[depot] = input - absorbed;
            }
        }
    }
}

/// Mass balance of the central and peripheral compartments
#[inline(always)]
fn disposition(model: &Model, x: &V, inflow: f64, dx: &mut V) {
    let concentration = x[0] / model.central_volume();
    let mut outflow = concentration * model.clearance();
    for (i, peripheral) in model.peripherals().iter().enumerate() {
        let flux =
            peripheral.transition_rate() * (concentration - x[i + 1] / peripheral.volume());
        dx[i + 1] = flux;
        outflow += flux;
    }
    dx[0] = inflow - outflow;
}
