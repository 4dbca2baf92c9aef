//! Compartment topology of a linear pharmacokinetic model
//!
//! A [Model] always holds a central compartment, with an optional list of peripheral
//! compartments exchanging drug with it. Compartments are indexed in insertion order:
//! index 0 is the central compartment and `1..=N` are the peripherals in the order they
//! were added. Appending a compartment never changes the index of an existing one.

mod builder;

pub use builder::ModelBuilder;

use serde::{Deserialize, Serialize};

use crate::PkError;

/// A peripheral (tissue) compartment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PeripheralConfig", into = "PeripheralConfig")]
pub struct Peripheral {
    volume: f64,
    transition_rate: f64,
}

impl Peripheral {
    /// Create a new peripheral compartment
    ///
    /// # Arguments
    ///
    /// * `volume` - Volume of the compartment, must be positive
    /// * `transition_rate` - First-order exchange rate with the central compartment, must be non-negative
    pub fn new(volume: f64, transition_rate: f64) -> Result<Self, PkError> {
        check_volume("peripheral volume", volume)?;
        check_rate("transition rate", transition_rate)?;
        Ok(Peripheral {
            volume,
            transition_rate,
        })
    }

    /// Volume of the compartment
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Exchange rate with the central compartment
    pub fn transition_rate(&self) -> f64 {
        self.transition_rate
    }
}

/// A central compartment with clearance, plus zero or more peripheral compartments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelConfig", into = "ModelConfig")]
pub struct Model {
    central_volume: f64,
    clearance: f64,
    peripherals: Vec<Peripheral>,
}

impl Model {
    /// Create a new model
    ///
    /// `peripheral_volumes` and `transition_rates` are parallel lists, one entry per
    /// peripheral compartment, and must have the same length.
    pub fn new(
        central_volume: f64,
        peripheral_volumes: &[f64],
        transition_rates: &[f64],
        clearance: f64,
    ) -> Result<Self, PkError> {
        if peripheral_volumes.len() != transition_rates.len() {
            return Err(PkError::topology(format!(
                "got {} peripheral volumes but {} transition rates",
                peripheral_volumes.len(),
                transition_rates.len()
            )));
        }
        check_volume("central volume", central_volume)?;
        check_rate("clearance", clearance)?;

        let mut model = Model {
            central_volume,
            clearance,
            peripherals: Vec::with_capacity(peripheral_volumes.len()),
        };
        for (&volume, &rate) in peripheral_volumes.iter().zip(transition_rates) {
            model.add_compartment(volume, rate)?;
        }
        Ok(model)
    }

    /// Start a [ModelBuilder] for a model with the given central volume
    pub fn builder(central_volume: f64) -> ModelBuilder {
        ModelBuilder::new(central_volume)
    }

    /// Append a peripheral compartment, returning its compartment index
    pub fn add_compartment(&mut self, volume: f64, transition_rate: f64) -> Result<usize, PkError> {
        let peripheral = Peripheral::new(volume, transition_rate)?;
        self.peripherals.push(peripheral);
        tracing::trace!(
            index = self.peripherals.len(),
            volume,
            transition_rate,
            "added peripheral compartment"
        );
        Ok(self.peripherals.len())
    }

    /// Number of compartments, including the central one
    pub fn size(&self) -> usize {
        1 + self.peripherals.len()
    }

    /// Volume of the central compartment
    pub fn central_volume(&self) -> f64 {
        self.central_volume
    }

    /// Elimination rate from the central compartment
    pub fn clearance(&self) -> f64 {
        self.clearance
    }

    /// Peripheral compartments in index order
    pub fn peripherals(&self) -> &[Peripheral] {
        &self.peripherals
    }

    pub fn peripheral_volumes(&self) -> Vec<f64> {
        self.peripherals.iter().map(|p| p.volume).collect()
    }

    pub fn transition_rates(&self) -> Vec<f64> {
        self.peripherals.iter().map(|p| p.transition_rate).collect()
    }

    /// Volume of the compartment at `index`, if it exists
    pub fn volume(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.central_volume),
            i => self.peripherals.get(i - 1).map(|p| p.volume),
        }
    }
}

/// Serialized form of a [Peripheral]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeripheralConfig {
    pub volume: f64,
    pub transition_rate: f64,
}

impl TryFrom<PeripheralConfig> for Peripheral {
    type Error = PkError;

    fn try_from(config: PeripheralConfig) -> Result<Self, Self::Error> {
        Peripheral::new(config.volume, config.transition_rate)
    }
}

impl From<Peripheral> for PeripheralConfig {
    fn from(peripheral: Peripheral) -> Self {
        PeripheralConfig {
            volume: peripheral.volume,
            transition_rate: peripheral.transition_rate,
        }
    }
}

/// Flat, serializable form of a [Model]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub central_volume: f64,
    pub clearance: f64,
    #[serde(default)]
    pub peripheral_volumes: Vec<f64>,
    #[serde(default)]
    pub transition_rates: Vec<f64>,
}

impl TryFrom<ModelConfig> for Model {
    type Error = PkError;

    fn try_from(config: ModelConfig) -> Result<Self, Self::Error> {
        Model::new(
            config.central_volume,
            &config.peripheral_volumes,
            &config.transition_rates,
            config.clearance,
        )
    }
}

impl From<Model> for ModelConfig {
    fn from(model: Model) -> Self {
        ModelConfig {
            central_volume: model.central_volume,
            clearance: model.clearance,
            peripheral_volumes: model.peripheral_volumes(),
            transition_rates: model.transition_rates(),
        }
    }
}

fn check_volume(name: &str, value: f64) -> Result<(), PkError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PkError::topology(format!(
            "{} must be positive and finite, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_rate(name: &str, value: f64) -> Result<(), PkError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PkError::topology(format!(
            "{} must be non-negative and finite, got {}",
            name, value
        )));
    }
    Ok(())
}
