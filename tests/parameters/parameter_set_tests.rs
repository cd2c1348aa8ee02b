//! Integration tests for the ParameterSet collection
//!
//! These tests verify that ParameterSet behaves correctly in various scenarios.

use rbtheta_rs::parameters::{ParameterSet, DEFAULT_PRECISION};
use rbtheta_rs::RbError;

#[test]
fn test_parameter_set_basic_operations() {
    // Create an empty parameter set
    let mut mu = ParameterSet::new();
    assert_eq!(mu.n_parameters(), 0);
    assert_eq!(mu.n_steps(), 1);

    // Add single-step parameters
    mu.set_value("Re", 100.0);
    mu.set_value("Pr", 0.7);

    assert_eq!(mu.n_parameters(), 2);
    assert!(mu.has_value("Re"));
    assert!(!mu.has_value("Ma"));
    assert_eq!(mu.get_value("Re").unwrap(), 100.0);

    // Missing names report the name
    match mu.get_value("Ma") {
        Err(RbError::ParameterNotFound { name }) => assert_eq!(name, "Ma"),
        other => panic!("Expected ParameterNotFound, got {:?}", other),
    }
    assert_eq!(mu.get_value_or("Ma", 0.3), 0.3);

    // Remove a parameter
    mu.erase_parameter("Pr");
    assert!(!mu.has_value("Pr"));
    assert_eq!(mu.n_parameters(), 1);

    // Removing an absent name is a no-op
    mu.erase_parameter("Pr");
    assert_eq!(mu.n_parameters(), 1);
}

#[test]
fn test_time_dependent_parameters() {
    let mut mu = ParameterSet::new();
    for (step, t) in [0.0, 0.1, 0.2, 0.3].iter().enumerate() {
        mu.set_step_value("t", step, *t);
        mu.push_back_value("source", 2.0 * t);
    }

    assert_eq!(mu.n_steps(), 4);
    assert_eq!(mu.validate_steps().unwrap(), 4);
    assert_eq!(mu.get_step_value("t", 2).unwrap(), 0.2);
    assert_eq!(mu.get_step_value("source", 3).unwrap(), 0.6);

    match mu.get_step_value("t", 4) {
        Err(RbError::StepOutOfRange { name, step, len }) => {
            assert_eq!(name, "t");
            assert_eq!(step, 4);
            assert_eq!(len, 4);
        }
        other => panic!("Expected StepOutOfRange, got {:?}", other),
    }
    assert_eq!(mu.get_step_value_or("t", 4, -1.0), -1.0);

    // Overwriting inside the range does not grow the parameter
    mu.set_step_value("t", 1, 0.15);
    assert_eq!(mu.n_steps(), 4);
    assert_eq!(mu.get_step_value("t", 1).unwrap(), 0.15);
}

#[test]
fn test_inconsistent_steps_are_reported() {
    let mut mu = ParameterSet::new();
    mu.push_back_value("a", 1.0);
    mu.push_back_value("a", 2.0);
    mu.set_value("b", 3.0);

    match mu.validate_steps() {
        Err(RbError::InconsistentSteps {
            name,
            expected,
            found,
        }) => {
            assert_eq!(name, "b");
            assert_eq!(expected, 2);
            assert_eq!(found, 1);
        }
        other => panic!("Expected InconsistentSteps, got {:?}", other),
    }

    // Extra parameters take no part in the check
    let mut mu = ParameterSet::from_values([("a", 1.0)]);
    for i in 0..5 {
        mu.push_back_extra_value("residual", i as f64);
    }
    assert_eq!(mu.validate_steps().unwrap(), 1);
    assert_eq!(mu.n_steps(), 1);
}

#[test]
fn test_declared_steps_for_empty_set() {
    let mut mu = ParameterSet::new();
    mu.set_n_steps(10);
    assert_eq!(mu.n_steps(), 10);
    assert_eq!(mu.validate_steps().unwrap(), 10);

    // Stored parameters take over from the declared count
    mu.set_value("x", 1.0);
    assert_eq!(mu.n_steps(), 1);

    mu.erase_parameter("x");
    assert_eq!(mu.n_steps(), 10);
}

#[test]
fn test_extra_parameters_are_disjoint() {
    let mut mu = ParameterSet::new();
    mu.set_value("k", 1.0);
    mu.set_extra_value("k", 2.0);
    mu.set_extra_step_value("estimate", 2, 0.5);

    assert_eq!(mu.get_value("k").unwrap(), 1.0);
    assert_eq!(mu.get_extra_value("k").unwrap(), 2.0);
    assert_eq!(mu.get_extra_step_value("estimate", 0).unwrap(), 0.0);
    assert_eq!(mu.get_extra_step_value("estimate", 2).unwrap(), 0.5);
    assert_eq!(mu.get_extra_value_or("missing", 7.0), 7.0);
    assert!(mu.has_extra_value("estimate"));
    assert!(!mu.has_value("estimate"));

    assert_eq!(mu.n_parameters(), 1);
    assert_eq!(mu.n_extra_parameters(), 2);

    mu.erase_extra_parameter("k");
    assert!(mu.has_value("k"));
    assert!(!mu.has_extra_value("k"));
}

#[test]
fn test_names_and_iteration_are_sorted() {
    let mut mu = ParameterSet::new();
    for name in ["zeta", "alpha", "mu_1", "beta"] {
        mu.set_value(name, 1.0);
    }
    mu.set_extra_value("omega", 0.0);
    mu.set_extra_value("delta", 0.0);

    let names: Vec<String> = mu.parameter_names().into_iter().collect();
    assert_eq!(names, vec!["alpha", "beta", "mu_1", "zeta"]);

    let iterated: Vec<&str> = mu.iter().map(|(name, _)| name).collect();
    assert_eq!(iterated, vec!["alpha", "beta", "mu_1", "zeta"]);
    assert_eq!(mu.iter().len(), 4);

    let extra: Vec<&str> = mu.extra_iter().map(|(name, _)| name).collect();
    assert_eq!(extra, vec!["delta", "omega"]);
    assert_eq!(
        mu.extra_parameter_names().into_iter().collect::<Vec<_>>(),
        vec!["delta", "omega"]
    );
}

#[test]
fn test_merge_and_add_assign() {
    let mut lhs = ParameterSet::from_values([("x", 1.0), ("y", 2.0)]);
    lhs.set_extra_value("e", 0.1);
    let mut rhs = ParameterSet::from_values([("y", 20.0), ("z", 30.0)]);
    rhs.set_extra_value("e", 0.2);

    lhs += &rhs;

    assert_eq!(lhs.get_value("x").unwrap(), 1.0);
    assert_eq!(lhs.get_value("y").unwrap(), 20.0);
    assert_eq!(lhs.get_value("z").unwrap(), 30.0);
    assert_eq!(lhs.get_extra_value("e").unwrap(), 0.2);

    // rhs is not modified
    assert_eq!(rhs.n_parameters(), 2);
}

#[test]
fn test_merge_step_mismatch_leaves_target_unchanged() {
    let mut lhs = ParameterSet::from_values([("x", 1.0)]);
    let mut rhs = ParameterSet::new();
    rhs.push_back_value("y", 1.0);
    rhs.push_back_value("y", 2.0);

    let before = lhs.clone();
    match lhs.merge(&rhs) {
        Err(err @ RbError::StepCountMismatch { .. }) => {
            assert_eq!(
                err.to_string(),
                "Can only merge parameter sets with matching step counts: 1 != 2"
            );
        }
        other => panic!("Expected StepCountMismatch, got {:?}", other),
    }
    assert_eq!(lhs, before);
}

#[test]
#[should_panic(expected = "Can only merge parameter sets with matching step counts")]
fn test_add_assign_panics_on_step_mismatch() {
    let mut lhs = ParameterSet::from_values([("x", 1.0)]);
    let mut rhs = ParameterSet::new();
    rhs.set_step_value("y", 2, 1.0);
    lhs += &rhs;
}

#[test]
fn test_text_dump() {
    let mut mu = ParameterSet::new();
    mu.push_back_value("k", 3.5);
    mu.push_back_value("k", -0.001);
    mu.set_extra_value("hidden", 1.0);
    mu.push_back_value("alpha", 12500.0);
    mu.push_back_value("alpha", 0.0);

    assert_eq!(
        mu.get_string(DEFAULT_PRECISION),
        "alpha: 1.250000e+04, 0.000000e+00\nk: 3.500000e+00, -1.000000e-03\n"
    );
    assert_eq!(
        mu.get_string(2),
        "alpha: 1.25e+04, 0.00e+00\nk: 3.50e+00, -1.00e-03\n"
    );
    assert_eq!(mu.to_string(), mu.get_string(DEFAULT_PRECISION));

    assert_eq!(ParameterSet::new().get_string(DEFAULT_PRECISION), "");
}

#[test]
fn test_json_roundtrip() {
    let mut mu = ParameterSet::new();
    mu.push_back_value("t", 0.0);
    mu.push_back_value("t", 0.5);
    mu.push_back_value("k", 1.5);
    mu.push_back_value("k", 2.5);
    mu.set_extra_value("indicator", 1e-4);

    let json = mu.to_json().unwrap();
    let restored = ParameterSet::from_json(&json).unwrap();
    assert_eq!(restored, mu);
    assert_eq!(restored.n_steps(), 2);

    // Missing optional sections fall back to defaults
    let minimal = ParameterSet::from_json(r#"{"parameters": {"k": [1.0, 2.0]}}"#).unwrap();
    assert_eq!(minimal.get_step_value("k", 1).unwrap(), 2.0);
    assert_eq!(minimal.n_extra_parameters(), 0);

    assert!(matches!(
        ParameterSet::from_json("not json"),
        Err(RbError::JsonError(_))
    ));
}

#[test]
fn test_json_file_roundtrip() {
    let mu = ParameterSet::from_values([("Re", 250.0), ("Pr", 0.71)]);

    if let Some(temp_dir) = std::env::temp_dir().to_str() {
        let file_path = format!("{}/rbtheta_parameter_set_test.json", temp_dir);

        mu.save_json(&file_path).unwrap();
        let loaded = ParameterSet::load_json(&file_path).unwrap();
        assert_eq!(loaded, mu);

        let _ = std::fs::remove_file(&file_path);
    }

    assert!(matches!(
        ParameterSet::load_json("/nonexistent/dir/parameters.json"),
        Err(RbError::IoError(_))
    ));
}

#[test]
fn test_collect_from_pairs() {
    let mu: ParameterSet = vec![("a".to_string(), 1.0), ("b".to_string(), 2.0)]
        .into_iter()
        .collect();
    assert_eq!(mu.n_parameters(), 2);
    assert_eq!(mu.get_value("b").unwrap(), 2.0);
}
