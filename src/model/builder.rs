use crate::model::Model;
use crate::PkError;

/// Fluent construction of a [Model]
///
/// Values are validated when [ModelBuilder::build] is called.
///
/// ```
/// use pkmodel::Model;
///
/// let model = Model::builder(2.0)
///     .clearance(3.0)
///     .peripheral(1.0, 3.0)
///     .peripheral(2.0, 4.0)
///     .build()
///     .unwrap();
/// assert_eq!(model.size(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    central_volume: f64,
    clearance: f64,
    volumes: Vec<f64>,
    rates: Vec<f64>,
}

impl ModelBuilder {
    pub(crate) fn new(central_volume: f64) -> Self {
        ModelBuilder {
            central_volume,
            clearance: 0.0,
            volumes: Vec::new(),
            rates: Vec::new(),
        }
    }

    pub fn clearance(mut self, clearance: f64) -> Self {
        self.clearance = clearance;
        self
    }

    /// Append a peripheral compartment
    pub fn peripheral(mut self, volume: f64, transition_rate: f64) -> Self {
        self.volumes.push(volume);
        self.rates.push(transition_rate);
        self
    }

    /// Append `n` identical peripheral compartments
    pub fn repeat(mut self, n: usize, volume: f64, transition_rate: f64) -> Self {
        for _ in 0..n {
            self = self.peripheral(volume, transition_rate);
        }
        self
    }

    pub fn build(self) -> Result<Model, PkError> {
        Model::new(self.central_volume, &self.volumes, &self.rates, self.clearance)
    }
}
