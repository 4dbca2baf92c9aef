use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::simulator::StateLayout;
use crate::Model;

/// Result of a single simulation
///
/// Holds the report time grid and the drug amount (ng) of every state at each report time.
/// Rows of [SimulationRun::states] follow the [StateLayout] of the run, columns follow
/// [SimulationRun::times].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    times: Array1<f64>,
    states: Array2<f64>,
    layout: StateLayout,
    steps: usize,
}

impl SimulationRun {
    pub(crate) fn new(
        times: Array1<f64>,
        states: Array2<f64>,
        layout: StateLayout,
        steps: usize,
    ) -> Self {
        debug_assert_eq!(states.nrows(), layout.nstates());
        debug_assert_eq!(states.ncols(), times.len());
        SimulationRun {
            times,
            states,
            layout,
            steps,
        }
    }

    /// Report times, evenly spaced from 0 to `t_max`
    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    /// Drug amount per state (rows) and report time (columns)
    pub fn states(&self) -> &Array2<f64> {
        &self.states
    }

    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    pub fn nstates(&self) -> usize {
        self.states.nrows()
    }

    pub fn ntimes(&self) -> usize {
        self.times.len()
    }

    /// Number of solver steps taken
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Time series of the state at `index`, if it exists
    pub fn compartment(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.nstates()).then(|| self.states.row(index))
    }

    pub fn central(&self) -> ArrayView1<'_, f64> {
        self.states.row(self.layout.central())
    }

    /// Time series of peripheral compartment `i` (one-based, as in the model)
    pub fn peripheral(&self, i: usize) -> Option<ArrayView1<'_, f64>> {
        (i >= 1 && i < self.layout.size()).then(|| self.states.row(i))
    }

    /// Time series of the subcutaneous depot
    pub fn depot(&self) -> Option<ArrayView1<'_, f64>> {
        self.layout.depot().map(|index| self.states.row(index))
    }

    /// State at the last report time
    pub fn final_state(&self) -> ArrayView1<'_, f64> {
        self.states.column(self.ntimes() - 1)
    }

    /// Total amount of drug in the system at each report time
    pub fn total_amount(&self) -> Array1<f64> {
        self.states.sum_axis(Axis(0))
    }

    /// Concentration in the central compartment
    pub fn central_concentration(&self, model: &Model) -> Array1<f64> {
        self.central().mapv(|amount| amount / model.central_volume())
    }

    /// Returns true if every reported value is finite
    pub fn is_finite(&self) -> bool {
        self.states.iter().all(|value| value.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn run() -> SimulationRun {
        SimulationRun::new(
            array![0.0, 0.5, 1.0],
            array![[0.0, 2.0, 4.0], [0.0, 1.0, 1.0], [10.0, 5.0, 2.0]],
            StateLayout::Subcutaneous { size: 2 },
            12,
        )
    }

    #[test]
    fn accessors_follow_layout() {
        let run = run();
        assert_eq!(run.nstates(), 3);
        assert_eq!(run.ntimes(), 3);
        assert_eq!(run.steps(), 12);
        assert_eq!(run.central(), array![0.0, 2.0, 4.0]);
        assert_eq!(run.peripheral(1).unwrap(), array![0.0, 1.0, 1.0]);
        assert!(run.peripheral(0).is_none());
        assert!(run.peripheral(2).is_none());
        assert_eq!(run.depot().unwrap(), array![10.0, 5.0, 2.0]);
        assert!(run.compartment(3).is_none());
        assert_eq!(run.final_state(), array![4.0, 1.0, 2.0]);
    }

    #[test]
    fn totals_and_concentrations() {
        let run = run();
        assert_eq!(run.total_amount(), array![10.0, 8.0, 7.0]);
        let model = Model::new(2.0, &[1.0], &[1.0], 0.0).unwrap();
        assert_eq!(run.central_concentration(&model), array![0.0, 1.0, 2.0]);
        assert!(run.is_finite());
    }
}
