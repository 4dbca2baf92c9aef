//! Dosing protocols
//!
//! A [Protocol] describes how drug enters the system: the administration [Route], a
//! constant-rate infusion over a [ContinuousWindow], and a [DoseSchedule] of
//! instantaneous (bolus) doses. The time-dependent input it produces is evaluated through
//! [DosingRate], obtained with [Protocol::dosing_rate].

pub mod dosing;

pub use dosing::DosingRate;

use serde::{Deserialize, Serialize};

use crate::PkError;

/// Width (standard deviation, in hours) of the default Gaussian bolus kernel
pub const DEFAULT_KERNEL_WIDTH: f64 = 0.02;

/// Administration route of the drug
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Route {
    /// Drug enters the central compartment directly
    Intravenous,
    /// Drug enters a depot and is absorbed into the central compartment at `absorption_rate`
    Subcutaneous { absorption_rate: f64 },
}

/// Route tag used by [ProtocolConfig]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    #[default]
    Intravenous,
    Subcutaneous,
}

/// How instantaneous doses are represented when integrating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BolusKernel {
    /// Each dose is spread as a normalized Gaussian bump of standard deviation `width`
    /// centred at the dose time, which keeps the right-hand side smooth
    Gaussian { width: f64 },
    /// Each dose is an exact impulse: the rate function reports the full amount at the dose
    /// time, and the integrator applies it as a jump in the dosing compartment
    Impulse,
}

impl Default for BolusKernel {
    fn default() -> Self {
        BolusKernel::Gaussian {
            width: DEFAULT_KERNEL_WIDTH,
        }
    }
}

/// Half-open time interval `[start, end)` of a constant-rate infusion
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContinuousWindow {
    start: f64,
    end: f64,
}

impl ContinuousWindow {
    pub fn new(start: f64, end: f64) -> Result<Self, PkError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(PkError::protocol(format!(
                "continuous window bounds must be finite, got [{}, {}]",
                start, end
            )));
        }
        if start > end {
            return Err(PkError::protocol(format!(
                "continuous window starts after it ends: [{}, {}]",
                start, end
            )));
        }
        Ok(ContinuousWindow { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Returns true if `start <= t < end`
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A single instantaneous dose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dose {
    time: f64,
    amount: f64,
}

impl Dose {
    pub fn new(time: f64, amount: f64) -> Result<Self, PkError> {
        if !time.is_finite() || time < 0.0 {
            return Err(PkError::protocol(format!(
                "dose time must be non-negative and finite, got {}",
                time
            )));
        }
        check_non_negative("dose amount", amount)?;
        Ok(Dose { time, amount })
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

/// Append-only list of instantaneous doses, kept sorted by time
///
/// Doses sharing a time keep their insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DoseSchedule {
    doses: Vec<Dose>,
}

impl DoseSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schedule from parallel lists of times and amounts
    pub fn from_parallel(times: &[f64], amounts: &[f64]) -> Result<Self, PkError> {
        if times.len() != amounts.len() {
            return Err(PkError::protocol(format!(
                "got {} dose times but {} dose amounts",
                times.len(),
                amounts.len()
            )));
        }
        let mut schedule = DoseSchedule::new();
        for (&time, &amount) in times.iter().zip(amounts) {
            schedule.push(Dose::new(time, amount)?);
        }
        Ok(schedule)
    }

    /// Insert a dose after every dose with the same or an earlier time
    pub fn push(&mut self, dose: Dose) {
        let index = self.doses.partition_point(|d| d.time <= dose.time);
        self.doses.insert(index, dose);
    }

    pub fn len(&self) -> usize {
        self.doses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dose> {
        self.doses.iter()
    }

    pub fn as_slice(&self) -> &[Dose] {
        &self.doses
    }

    pub fn times(&self) -> Vec<f64> {
        self.doses.iter().map(|d| d.time).collect()
    }

    pub fn amounts(&self) -> Vec<f64> {
        self.doses.iter().map(|d| d.amount).collect()
    }
}

/// A dosing protocol
///
/// `dose_amount` is used both as the default size of an instantaneous dose (ng) and as
/// the rate of the continuous infusion (ng/hour).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProtocolConfig", into = "ProtocolConfig")]
pub struct Protocol {
    dose_amount: f64,
    route: Route,
    continuous: bool,
    window: ContinuousWindow,
    instantaneous: bool,
    schedule: DoseSchedule,
    kernel: BolusKernel,
}

impl Protocol {
    /// Create an intravenous protocol with no doses scheduled
    pub fn new(dose_amount: f64) -> Result<Self, PkError> {
        check_non_negative("dose amount", dose_amount)?;
        Ok(Protocol {
            dose_amount,
            route: Route::Intravenous,
            continuous: false,
            window: ContinuousWindow::default(),
            instantaneous: false,
            schedule: DoseSchedule::new(),
            kernel: BolusKernel::default(),
        })
    }

    /// Build a protocol from its flat configuration form
    pub fn from_config(config: ProtocolConfig) -> Result<Self, PkError> {
        let mut protocol = Protocol::new(config.dose_amount)?;
        match config.route {
            RouteKind::Intravenous => {
                check_non_negative("absorption rate", config.absorption_rate)?;
            }
            RouteKind::Subcutaneous => protocol.make_subcutaneous(config.absorption_rate)?,
        }
        if let Some((start, end)) = config.continuous_window {
            protocol.window = ContinuousWindow::new(start, end)?;
        }
        protocol.continuous = config.continuous;

        let amounts = match config.dose_amounts {
            Some(amounts) => amounts,
            None => vec![config.dose_amount; config.dose_times.len()],
        };
        protocol.schedule = DoseSchedule::from_parallel(&config.dose_times, &amounts)?;
        protocol.instantaneous = config.instantaneous;
        protocol.set_kernel(config.kernel)?;
        Ok(protocol)
    }

    pub fn dose_amount(&self) -> f64 {
        self.dose_amount
    }

    /// Replace the dose amount
    ///
    /// Doses already in the schedule keep the amount they were added with.
    pub fn change_dose(&mut self, dose_amount: f64) -> Result<(), PkError> {
        check_non_negative("dose amount", dose_amount)?;
        tracing::trace!(dose_amount, "changed dose amount");
        self.dose_amount = dose_amount;
        Ok(())
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn set_route(&mut self, route: Route) -> Result<(), PkError> {
        if let Route::Subcutaneous { absorption_rate } = route {
            check_non_negative("absorption rate", absorption_rate)?;
        }
        tracing::trace!(?route, "changed administration route");
        self.route = route;
        Ok(())
    }

    pub fn make_subcutaneous(&mut self, absorption_rate: f64) -> Result<(), PkError> {
        self.set_route(Route::Subcutaneous { absorption_rate })
    }

    pub fn make_intravenous(&mut self) {
        self.route = Route::Intravenous;
    }

    pub fn is_subcutaneous(&self) -> bool {
        matches!(self.route, Route::Subcutaneous { .. })
    }

    /// Absorption rate of the depot, only defined for subcutaneous dosing
    pub fn absorption_rate(&self) -> Option<f64> {
        match self.route {
            Route::Subcutaneous { absorption_rate } => Some(absorption_rate),
            Route::Intravenous => None,
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn continuous_window(&self) -> ContinuousWindow {
        self.window
    }

    /// Enable continuous dosing at `dose_amount` per hour over `[start, end)`
    pub fn set_continuous_window(&mut self, start: f64, end: f64) -> Result<(), PkError> {
        self.window = ContinuousWindow::new(start, end)?;
        self.continuous = true;
        tracing::trace!(start, end, "enabled continuous dosing");
        Ok(())
    }

    pub fn disable_continuous(&mut self) {
        self.continuous = false;
    }

    pub fn is_instantaneous(&self) -> bool {
        self.instantaneous
    }

    pub fn schedule(&self) -> &DoseSchedule {
        &self.schedule
    }

    pub fn dose_times(&self) -> Vec<f64> {
        self.schedule.times()
    }

    pub fn dose_amounts(&self) -> Vec<f64> {
        self.schedule.amounts()
    }

    /// Schedule an instantaneous dose and enable instantaneous dosing
    pub fn add_instantaneous_dose(&mut self, time: f64, amount: f64) -> Result<(), PkError> {
        self.schedule.push(Dose::new(time, amount)?);
        self.instantaneous = true;
        tracing::trace!(time, amount, "added instantaneous dose");
        Ok(())
    }

    /// Schedule an instantaneous dose of the current `dose_amount`
    pub fn add_dose_time(&mut self, time: f64) -> Result<(), PkError> {
        self.add_instantaneous_dose(time, self.dose_amount)
    }

    /// Stop delivering instantaneous doses; the schedule itself is kept
    pub fn disable_instantaneous(&mut self) {
        self.instantaneous = false;
    }

    pub fn kernel(&self) -> BolusKernel {
        self.kernel
    }

    pub fn set_kernel(&mut self, kernel: BolusKernel) -> Result<(), PkError> {
        if let BolusKernel::Gaussian { width } = kernel {
            if !width.is_finite() || width <= 0.0 {
                return Err(PkError::protocol(format!(
                    "gaussian kernel width must be positive and finite, got {}",
                    width
                )));
            }
        }
        self.kernel = kernel;
        Ok(())
    }

    /// Snapshot of the time-dependent input described by this protocol
    pub fn dosing_rate(&self) -> DosingRate {
        DosingRate::new(self)
    }
}

/// Flat, serializable form of a [Protocol]
///
/// When `dose_amounts` is omitted every entry of `dose_times` receives `dose_amount`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProtocolConfig {
    pub dose_amount: f64,
    pub route: RouteKind,
    pub absorption_rate: f64,
    pub continuous: bool,
    pub continuous_window: Option<(f64, f64)>,
    pub instantaneous: bool,
    pub dose_times: Vec<f64>,
    pub dose_amounts: Option<Vec<f64>>,
    pub kernel: BolusKernel,
}

impl TryFrom<ProtocolConfig> for Protocol {
    type Error = PkError;

    fn try_from(config: ProtocolConfig) -> Result<Self, Self::Error> {
        Protocol::from_config(config)
    }
}

impl From<Protocol> for ProtocolConfig {
    fn from(protocol: Protocol) -> Self {
        let (route, absorption_rate) = match protocol.route {
            Route::Intravenous => (RouteKind::Intravenous, 0.0),
            Route::Subcutaneous { absorption_rate } => (RouteKind::Subcutaneous, absorption_rate),
        };
        ProtocolConfig {
            dose_amount: protocol.dose_amount,
            route,
            absorption_rate,
            continuous: protocol.continuous,
            continuous_window: Some((protocol.window.start, protocol.window.end)),
            instantaneous: protocol.instantaneous,
            dose_times: protocol.schedule.times(),
            dose_amounts: Some(protocol.schedule.amounts()),
            kernel: protocol.kernel,
        }
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), PkError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PkError::protocol(format!(
            "{} must be non-negative and finite, got {}",
            name, value
        )));
    }
    Ok(())
}
