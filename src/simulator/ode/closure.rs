use crate::simulator::layout::Kinetics;
use crate::DosingRate;
use diffsol::{
    ConstantOp, LinearOp, NonLinearOp, NonLinearOpJacobian, OdeEquations, OdeEquationsRef, Op,
};
type T = f64;
type V = nalgebra::DVector<f64>;
type M = nalgebra::DMatrix<f64>;

pub struct PkRhs<'a> {
    nstates: usize,
    kinetics: &'a Kinetics,
    dosing: &'a DosingRate,
}

impl<'a> Op for PkRhs<'a> {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

pub struct PkMass {
    nstates: usize,
}

impl Op for PkMass {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

pub struct PkInit {
    nstates: usize,
    init: V,
}

impl Op for PkInit {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

pub struct PkRoot {
    nstates: usize,
}

impl Op for PkRoot {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        0
    }
    fn nparams(&self) -> usize {
        0
    }
}

pub struct PkOut {
    nstates: usize,
}

impl Op for PkOut {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl<'a> NonLinearOp for PkRhs<'a> {
    fn call_inplace(&self, x: &Self::V, t: Self::T, y: &mut Self::V) {
        self.kinetics.derivative(x, self.dosing.smooth_rate(t), y);
    }
}

impl<'a> NonLinearOpJacobian for PkRhs<'a> {
    fn jac_mul_inplace(&self, _x: &Self::V, _t: Self::T, v: &Self::V, y: &mut Self::V) {
        // The system is linear, the input only shifts it
        self.kinetics.derivative(v, 0.0, y);
    }
}

impl LinearOp for PkMass {
    fn gemv_inplace(&self, _x: &Self::V, _t: Self::T, _beta: Self::T, _y: &mut Self::V) {}
}

impl ConstantOp for PkInit {
    fn call_inplace(&self, _t: Self::T, y: &mut Self::V) {
        y.copy_from(&self.init);
    }
}

impl NonLinearOp for PkRoot {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

impl NonLinearOp for PkOut {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

/// ODE system of one integration segment, starting from `init`
///
/// Owns its inputs so the solver can borrow it for any lifetime.
pub struct PkProblem {
    kinetics: Kinetics,
    dosing: DosingRate,
    nstates: usize,
    init: V,
}

impl PkProblem {
    pub fn new(kinetics: &Kinetics, dosing: &DosingRate, init: V) -> Self {
        Self {
            nstates: kinetics.nstates(),
            kinetics: kinetics.clone(),
            dosing: dosing.clone(),
            init,
        }
    }
}

impl Op for PkProblem {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl<'b> OdeEquationsRef<'b> for PkProblem {
    type Rhs = PkRhs<'b>;
    type Mass = PkMass;
    type Init = PkInit;
    type Root = PkRoot;
    type Out = PkOut;
}

impl OdeEquations for PkProblem {
    fn rhs(&self) -> PkRhs<'_> {
        PkRhs {
            nstates: self.nstates,
            kinetics: &self.kinetics,
            dosing: &self.dosing,
        }
    }

    fn mass(&self) -> Option<PkMass> {
        None
    }

    fn init(&self) -> PkInit {
        PkInit {
            nstates: self.nstates,
            init: self.init.clone(),
        }
    }

    fn get_params(&self, _p: &mut V) {}

    fn root(&self) -> Option<PkRoot> {
        None
    }

    fn out(&self) -> Option<PkOut> {
        None
    }

    fn set_params(&mut self, _p: &V) {}
}
