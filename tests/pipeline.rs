//! End-to-end runs: model + protocol + solve.

use pkmodel::*;

const REPORTS: usize = 1000;

fn reference_model() -> Model {
    Model::new(2.0, &[1.0, 2.0], &[3.0, 4.0], 3.0).unwrap()
}

fn reference_protocol(route: protocol::RouteKind) -> Protocol {
    Protocol::from_config(ProtocolConfig {
        dose_amount: 10.0,
        route,
        absorption_rate: 0.3,
        continuous: true,
        continuous_window: Some((0.2, 0.6)),
        instantaneous: true,
        dose_times: vec![0.0, 0.1, 0.2, 0.3],
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn test_build_iv() {
    let model = reference_model();
    let protocol = reference_protocol(protocol::RouteKind::Intravenous);
    let run = solve(&model, &protocol, 1.0, REPORTS).expect("intravenous run");

    assert_eq!(run.states().nrows(), model.size());
    assert_eq!(run.states().ncols(), run.times().len());
    assert_eq!(run.times().len(), REPORTS);
    assert!(run.depot().is_none());
    assert!(run.is_finite());
}

#[test]
fn test_build_sc() {
    let model = reference_model();
    let protocol = reference_protocol(protocol::RouteKind::Subcutaneous);
    let run = solve(&model, &protocol, 1.0, REPORTS).expect("subcutaneous run");

    assert_eq!(run.states().nrows(), model.size() + 1);
    assert_eq!(run.states().ncols(), REPORTS);
    assert!(run.is_finite());
    assert!(run.depot().unwrap().iter().any(|amount| *amount > 0.0));
}

#[test]
fn subcutaneous_adds_exactly_one_state() {
    let model = reference_model();
    let iv = solve(
        &model,
        &reference_protocol(protocol::RouteKind::Intravenous),
        1.0,
        50,
    )
    .unwrap();
    let sc = solve(
        &model,
        &reference_protocol(protocol::RouteKind::Subcutaneous),
        1.0,
        50,
    )
    .unwrap();
    assert_eq!(sc.nstates(), iv.nstates() + 1);
}

#[test]
fn test_all_zeros() {
    let model = Model::new(2.0, &[], &[], 3.0).unwrap();
    let protocol = Protocol::from_config(ProtocolConfig {
        dose_amount: 0.0,
        route: protocol::RouteKind::Subcutaneous,
        absorption_rate: 0.3,
        instantaneous: true,
        ..Default::default()
    })
    .unwrap();

    let run = solve(&model, &protocol, 1.0, REPORTS).unwrap();
    assert!(run.states().iter().all(|amount| *amount == 0.0));
}

#[test]
fn no_source_and_no_loss_stays_empty() {
    let model = Model::new(2.0, &[1.0, 3.0], &[0.0, 0.0], 0.0).unwrap();
    let protocol = Protocol::new(0.0).unwrap();
    let run = solve(&model, &protocol, 5.0, 20).unwrap();
    assert_eq!(run.nstates(), 3);
    assert!(run.states().iter().all(|amount| *amount == 0.0));
}

#[test]
fn report_count_sets_the_grid() {
    let model = reference_model();
    let protocol = reference_protocol(protocol::RouteKind::Intravenous);
    for count in [2, 7, 250] {
        let run = solve(&model, &protocol, 1.0, count).unwrap();
        assert_eq!(run.times().len(), count);
        assert_eq!(run.states().ncols(), count);
        assert_eq!(run.times()[0], 0.0);
        assert_eq!(run.times()[count - 1], 1.0);
    }
}

#[test]
fn solving_does_not_touch_inputs() {
    let model = reference_model();
    let protocol = reference_protocol(protocol::RouteKind::Subcutaneous);
    let (model_before, protocol_before) = (model.clone(), protocol.clone());
    let first = solve(&model, &protocol, 1.0, 100).unwrap();
    let second = solve(&model, &protocol, 1.0, 100).unwrap();
    assert_eq!(model, model_before);
    assert_eq!(protocol, protocol_before);
    assert_eq!(first, second);
}

#[test]
fn step_budget_exhaustion_is_an_error() {
    let model = reference_model();
    let protocol = reference_protocol(protocol::RouteKind::Intravenous);
    let settings = SolverSettings::new(1.0, 100).with_max_steps(5);

    match solve_with(&model, &protocol, &settings) {
        Err(PkError::IntegrationFailure { time, reason }) => {
            assert_eq!(reason, FailureReason::MaxStepsExceeded(5));
            assert!(time > 0.0 && time <= 1.0);
        }
        other => panic!("expected an integration failure, got {:?}", other),
    }
}

#[test]
fn all_methods_agree() {
    let model = reference_model();
    let protocol = reference_protocol(protocol::RouteKind::Subcutaneous);
    let reference = solve_with(&model, &protocol, &SolverSettings::new(1.0, 101)).unwrap();

    for method in [Method::TrBdf2, Method::Bdf] {
        let other = solve_with(
            &model,
            &protocol,
            &SolverSettings::new(1.0, 101).with_method(method),
        )
        .unwrap();
        assert!(other.is_finite());
        for (a, b) in reference.states().iter().zip(other.states().iter()) {
            assert!(
                (a - b).abs() <= 1e-3 * a.abs().max(1.0),
                "esdirk34 {} vs {:?} {}",
                a,
                method,
                b
            );
        }
    }
}

#[test]
fn stiff_rates_are_integrated() {
    // Exchange and elimination far faster than the report spacing
    let model = Model::new(1.0, &[1.0], &[1e7], 1e7).unwrap();
    let protocol = reference_protocol(protocol::RouteKind::Intravenous);

    for method in [Method::Esdirk34, Method::Bdf] {
        let settings = SolverSettings::new(1.0, 101).with_method(method);
        let run = solve_with(&model, &protocol, &settings).unwrap();
        assert!(run.is_finite());
        // 4 boluses and 0.4 hours of infusion, all of it cleared almost at once
        assert!(run.states().iter().all(|amount| *amount > -1e-6 && *amount < 44.0));
    }
}

#[test]
fn overflowing_rates_fail_where_they_overflow() {
    let model = Model::new(1.0, &[], &[], 1e300).unwrap();
    let mut protocol = Protocol::new(0.0).unwrap();
    protocol.set_kernel(BolusKernel::Impulse).unwrap();
    protocol.add_instantaneous_dose(0.5, 1e10).unwrap();

    match solve(&model, &protocol, 1.0, 11) {
        Err(PkError::IntegrationFailure { time, reason }) => {
            assert_eq!(reason, FailureReason::NonFinite);
            assert_eq!(time, 0.5);
        }
        other => panic!("expected an integration failure, got {:?}", other),
    }
}

#[test]
fn compare_two_simulations_in_parallel() {
    let first = (
        Model::new(2.0, &[3.0, 1.0], &[1.0, 3.0], 3.0).unwrap(),
        reference_protocol(protocol::RouteKind::Subcutaneous),
    );
    let mut second_protocol = reference_protocol(protocol::RouteKind::Subcutaneous);
    second_protocol.change_dose(15.0).unwrap();
    second_protocol.set_continuous_window(0.3, 0.35).unwrap();
    let second = (
        Model::new(2.0, &[4.0, 5.0], &[8.0, 9.0], 3.0).unwrap(),
        second_protocol,
    );

    let settings = SolverSettings::new(1.0, 200);
    let runs = solve_many(&[first.clone(), second.clone()], &settings);
    assert_eq!(runs.len(), 2);

    let sequential = solve_with(&first.0, &first.1, &settings).unwrap();
    assert_eq!(runs[0].as_ref().unwrap(), &sequential);
    assert_ne!(
        runs[0].as_ref().unwrap().states(),
        runs[1].as_ref().unwrap().states()
    );
}

#[test]
fn failures_stay_local_to_their_run() {
    let mut infusion = Protocol::new(10.0).unwrap();
    infusion.set_continuous_window(0.2, 0.6).unwrap();
    let good = (reference_model(), infusion);

    // Every impulse restarts the integrator, so each one costs at least one step
    let mut heavy = Protocol::new(1.0).unwrap();
    heavy.set_kernel(BolusKernel::Impulse).unwrap();
    for i in 0..2500 {
        heavy.add_dose_time(0.0004 * i as f64).unwrap();
    }
    let bad = (reference_model(), heavy);

    let settings = SolverSettings::new(1.0, 20).with_max_steps(2000);
    let runs = solve_many(&[good, bad], &settings);
    assert!(runs[0].as_ref().unwrap().steps() <= 2000);
    match &runs[1] {
        Err(PkError::IntegrationFailure { reason, .. }) => {
            assert_eq!(*reason, FailureReason::MaxStepsExceeded(2000));
        }
        other => panic!("expected an integration failure, got {:?}", other),
    }
}
