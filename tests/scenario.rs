use approx::assert_relative_eq;
use pkmodel::*;
use serde_json::json;

#[test]
fn scenario_from_value_matches_manual_setup() {
    let scenario = Scenario::from_value(json!({
        "model": {
            "central_volume": 2.0,
            "clearance": 3.0,
            "peripheral_volumes": [1.0, 2.0],
            "transition_rates": [3.0, 4.0]
        },
        "protocol": {
            "dose_amount": 10.0,
            "route": "subcutaneous",
            "absorption_rate": 0.3,
            "continuous": true,
            "continuous_window": [0.2, 0.6],
            "instantaneous": true,
            "dose_times": [0.0, 0.1, 0.2, 0.3]
        },
        "solver": { "t_max": 1.0, "report_count": 200 }
    }))
    .unwrap();

    let model = Model::new(2.0, &[1.0, 2.0], &[3.0, 4.0], 3.0).unwrap();
    let mut protocol = Protocol::new(10.0).unwrap();
    protocol.make_subcutaneous(0.3).unwrap();
    protocol.set_continuous_window(0.2, 0.6).unwrap();
    for t in [0.0, 0.1, 0.2, 0.3] {
        protocol.add_dose_time(t).unwrap();
    }
    assert_eq!(scenario.model, model);
    assert_eq!(scenario.protocol, protocol);

    let from_json = scenario.solve().unwrap();
    let manual = solve(&model, &protocol, 1.0, 200).unwrap();
    assert_eq!(from_json, manual);
}

#[test]
fn explicit_dose_amounts_and_impulse_kernel() {
    let scenario = Scenario::from_value(json!({
        "model": { "central_volume": 2.0, "clearance": 1.0 },
        "protocol": {
            "instantaneous": true,
            "dose_times": [0.0],
            "dose_amounts": [100.0],
            "kernel": { "kind": "impulse" }
        },
        "solver": { "t_max": 2.0, "report_count": 21 }
    }))
    .unwrap();

    let run = scenario.solve().unwrap();
    for (t, x) in run.times().iter().zip(run.central().iter()) {
        assert_relative_eq!(*x, 100.0 * (-0.5 * t).exp(), max_relative = 1e-4);
    }
}

#[test]
fn mismatched_dose_lists_are_rejected() {
    let result = Scenario::from_value(json!({
        "model": { "central_volume": 2.0, "clearance": 1.0 },
        "protocol": {
            "instantaneous": true,
            "dose_times": [0.0, 1.0],
            "dose_amounts": [100.0]
        }
    }));
    assert!(result.is_err());
}

#[test]
fn subcutaneous_route_requires_positive_absorption() {
    let result = Scenario::from_value(json!({
        "model": { "central_volume": 2.0, "clearance": 1.0 },
        "protocol": { "route": "subcutaneous", "absorption_rate": -1.0 }
    }));
    assert!(result.is_err());
}
