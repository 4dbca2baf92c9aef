use std::f64::consts::PI;

use crate::protocol::{BolusKernel, ContinuousWindow, Dose, Protocol};

/// Half-width of a Gaussian bump, in kernel widths, used to place integrator stops
const KERNEL_SPAN: f64 = 4.0;

/// Time-dependent drug input rate of a [Protocol]
///
/// The rate is the sum of two contributions:
/// - the instantaneous doses, each shaped by the protocol's [BolusKernel]
/// - the continuous infusion, `dose_amount` per hour inside the half-open window `[start, end)`
///
/// A [DosingRate] is an owned snapshot: later changes to the protocol do not affect it.
#[derive(Debug, Clone, PartialEq)]
pub struct DosingRate {
    infusion: Option<(ContinuousWindow, f64)>,
    boluses: Vec<Dose>,
    kernel: BolusKernel,
}

impl DosingRate {
    pub(crate) fn new(protocol: &Protocol) -> Self {
        let infusion = protocol
            .is_continuous()
            .then(|| (protocol.continuous_window(), protocol.dose_amount()));
        let boluses = if protocol.is_instantaneous() {
            protocol.schedule().as_slice().to_vec()
        } else {
            Vec::new()
        };
        DosingRate {
            infusion,
            boluses,
            kernel: protocol.kernel(),
        }
    }

    /// Total input rate at time `t`
    pub fn rate(&self, t: f64) -> f64 {
        self.bolus_rate(t) + self.continuous_rate(t)
    }

    /// Contribution of the continuous infusion at time `t`
    pub fn continuous_rate(&self, t: f64) -> f64 {
        match self.infusion {
            Some((window, rate)) if window.contains(t) => rate,
            _ => 0.0,
        }
    }

    /// Contribution of the instantaneous doses at time `t`
    ///
    /// With [BolusKernel::Impulse] this is the summed amount of the doses given exactly at `t`.
    pub fn bolus_rate(&self, t: f64) -> f64 {
        match self.kernel {
            BolusKernel::Gaussian { width } => self
                .boluses
                .iter()
                .map(|dose| dose.amount() * normpdf(t, dose.time(), width))
                .sum(),
            BolusKernel::Impulse => self
                .boluses
                .iter()
                .filter(|dose| dose.time() == t)
                .map(|dose| dose.amount())
                .sum(),
        }
    }

    /// The part of the input that enters the right-hand side of the ODE system
    ///
    /// Impulses are not integrable, so they are left out here and applied as jumps.
    pub(crate) fn smooth_rate(&self, t: f64) -> f64 {
        match self.kernel {
            BolusKernel::Gaussian { .. } => self.rate(t),
            BolusKernel::Impulse => self.continuous_rate(t),
        }
    }

    /// Doses to be applied as discrete jumps, sorted by time
    pub(crate) fn impulses(&self) -> &[Dose] {
        match self.kernel {
            BolusKernel::Impulse => &self.boluses,
            BolusKernel::Gaussian { .. } => &[],
        }
    }

    /// Times the integrator has to stop at so that no feature of the input is stepped over:
    /// the edges of the infusion window, and the centre and flanks of every Gaussian bump
    pub(crate) fn breakpoints(&self) -> Vec<f64> {
        let mut points = match self.infusion {
            Some((window, _)) if !window.is_empty() => vec![window.start(), window.end()],
            _ => Vec::new(),
        };
        if let BolusKernel::Gaussian { width } = self.kernel {
            for dose in &self.boluses {
                let t = dose.time();
                points.extend([t - KERNEL_SPAN * width, t, t + KERNEL_SPAN * width]);
            }
        }
        points.retain(|t| *t > 0.0);
        points.sort_by(f64::total_cmp);
        points.dedup();
        points
    }
}

/// Normal probability density
fn normpdf(x: f64, mean: f64, std: f64) -> f64 {
    let z = (x - mean) / std;
    (-0.5 * z * z).exp() / (std * (2.0 * PI).sqrt())
}
