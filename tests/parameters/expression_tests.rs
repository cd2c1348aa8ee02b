//! Tests for the Expression parsing and evaluation, including evaluation
//! against parameter sets through step contexts

use approx::assert_abs_diff_eq;
use rbtheta_rs::parameters::{EvaluationContext, Expression, ExpressionError, ParameterSet};
use std::collections::HashMap;

fn eval(source: &str, context: &HashMap<String, f64>) -> f64 {
    Expression::parse(source).unwrap().evaluate(context).unwrap()
}

#[test]
fn test_expression_parsing() {
    let valid = [
        "42",
        "x",
        "x + y",
        "2 * (x + 1)",
        "sin(x) + cos(y)",
        "max(a, b, c)",
        "(x + y) * (z - 1) / w",
        "  (  x  +  y  )  *  z  ",
        "-x",
        "x + (-y)",
        "1.5e-3 * Re",
        ".5 * x",
    ];
    for source in valid {
        assert!(Expression::parse(source).is_ok(), "failed to parse {:?}", source);
    }

    for source in ["", "x +", "x + (y", "@#$%", "2 3", "sin(x"] {
        assert!(
            matches!(
                Expression::parse(source),
                Err(ExpressionError::ParseError { .. })
            ),
            "accepted {:?}",
            source
        );
    }
}

#[test]
fn test_expression_variables() {
    let expr = Expression::parse("x + x + x").unwrap();
    assert_eq!(expr.variables(), vec!["x".to_string()]);

    let expr = Expression::parse("2 * (z + y) / x").unwrap();
    assert_eq!(expr.variables(), vec!["x", "y", "z"]);

    let expr = Expression::parse("exp(-mu_0 * t) + mu_1").unwrap();
    assert_eq!(expr.variables(), vec!["mu_0", "mu_1", "t"]);

    assert!(Expression::parse("42").unwrap().variables().is_empty());
}

#[test]
fn test_operator_precedence() {
    let context = HashMap::from([("x".to_string(), 2.0), ("y".to_string(), 3.0)]);

    assert_eq!(eval("x + y * 2", &context), 8.0);
    assert_eq!(eval("(x + y) * 2", &context), 10.0);
    assert_eq!(eval("8 - 3 - 2", &context), 3.0);
    assert_eq!(eval("16 / 4 / 2", &context), 2.0);
    assert_eq!(eval("2^3^2", &context), 512.0);
    assert_eq!(eval("-x^2", &context), -4.0);
    assert_eq!(eval("(-x)^2", &context), 4.0);
    assert_eq!(eval("x^2 + y^2", &context), 13.0);
    assert_eq!(eval("--x", &context), 2.0);
}

#[test]
fn test_expression_evaluation_functions() {
    let context = HashMap::from([
        ("x".to_string(), 2.0),
        ("y".to_string(), 3.0),
        ("z".to_string(), 4.0),
    ]);

    let close = |source: &str, expected: f64| {
        assert_abs_diff_eq!(eval(source, &context), expected, epsilon = 1e-10);
    };

    close("sin(x)", 2.0_f64.sin());
    close("cos(y)", 3.0_f64.cos());
    close("tan(x)", 2.0_f64.tan());
    close("exp(x)", 2.0_f64.exp());
    close("log(y)", 3.0_f64.ln());
    close("ln(y)", 3.0_f64.ln());
    close("log10(z)", 4.0_f64.log10());
    close("sqrt(z)", 2.0);
    close("abs(-x)", 2.0);
    close("max(x, y, z)", 4.0);
    close("min(x, y, z)", 2.0);
    close("sin(x)^2 + cos(x)^2", 1.0);
    close("log(exp(x))", 2.0);
}

#[test]
fn test_expression_evaluation_errors() {
    let context = HashMap::from([("x".to_string(), 2.0)]);

    match Expression::parse("y").unwrap().evaluate(&context) {
        Err(ExpressionError::UndefinedVariable { name }) => assert_eq!(name, "y"),
        other => panic!("Expected UndefinedVariable error, got {:?}", other),
    }

    assert!(matches!(
        Expression::parse("x / (x - 2)").unwrap().evaluate(&context),
        Err(ExpressionError::DivisionByZero)
    ));

    match Expression::parse("unknown_func(x)").unwrap().evaluate(&context) {
        Err(ExpressionError::UndefinedFunction { name }) => assert_eq!(name, "unknown_func"),
        other => panic!("Expected UndefinedFunction error, got {:?}", other),
    }

    for source in ["sin(x, x)", "max(x)"] {
        assert!(matches!(
            Expression::parse(source).unwrap().evaluate(&context),
            Err(ExpressionError::InvalidOperation { .. })
        ));
    }
}

#[test]
fn test_step_context() {
    let mut mu = ParameterSet::new();
    mu.push_back_value("k", 1.0);
    mu.push_back_value("k", 4.0);
    mu.push_back_value("t", 0.0);
    mu.push_back_value("t", 0.5);
    mu.set_extra_value("hidden", 9.0);

    let context = mu.at_step(1);
    assert_eq!(context.step(), 1);
    assert!(context.has_variable("k"));
    assert!(!context.has_variable("hidden"));
    assert_eq!(context.variable_names(), vec!["k", "t"]);
    assert_eq!(context.get_variable("t").unwrap(), 0.5);

    let expr = Expression::parse("sqrt(k) + t").unwrap();
    assert_eq!(expr.evaluate(&mu.at_step(0)).unwrap(), 1.0);
    assert_eq!(expr.evaluate(&mu.at_step(1)).unwrap(), 2.5);

    // Extra parameters are invisible
    assert!(matches!(
        Expression::parse("hidden").unwrap().evaluate(&context),
        Err(ExpressionError::UndefinedVariable { .. })
    ));

    // A step past the end is an evaluation failure, not an undefined name
    assert!(matches!(
        expr.evaluate(&mu.at_step(2)),
        Err(ExpressionError::InvalidOperation { .. })
    ));
}

#[test]
fn test_map_contexts() {
    let hash_map = HashMap::from([("a".to_string(), 4.0), ("b".to_string(), 5.0)]);
    assert!(hash_map.has_variable("a"));
    assert!(!hash_map.has_variable("c"));
    assert_eq!(hash_map.get_variable("b").unwrap(), 5.0);
    assert!(hash_map.get_variable("c").is_err());

    let mut names = hash_map.variable_names();
    names.sort();
    assert_eq!(names, vec!["a", "b"]);

    let btree: std::collections::BTreeMap<String, f64> =
        [("b".to_string(), 1.0), ("a".to_string(), 2.0)].into();
    assert_eq!(btree.variable_names(), vec!["a", "b"]);
    assert_eq!(
        Expression::parse("a - b").unwrap().evaluate(&btree).unwrap(),
        1.0
    );
}
