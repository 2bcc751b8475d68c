// tests/conditions.rs
use rand::SeedableRng;
use rand::rngs::StdRng;
use symbios_flora::condition::{Condition, Relation, evaluate_condition};
use symbios_flora::{ConditionError, Constants, ExprError, Scope};

fn check(guard: &str, x: f64) -> bool {
    let mut constants = Constants::new();
    constants.set("W", 4.0);
    let bindings = [("x", x)];
    let mut rng = StdRng::seed_from_u64(0);
    evaluate_condition(guard, &Scope::new(&bindings, &constants), &mut rng)
}

#[test]
fn test_single_comparisons() {
    assert!(check("x<5", 3.0));
    assert!(!check("x<5", 5.0));
    assert!(check("x>2", 3.0));
    assert!(check("x=3", 3.0));
    assert!(!check("x=3", 3.5));
    assert!(check("x<=3", 3.0));
    assert!(!check("x<=2", 3.0));
    assert!(check("x>=3", 3.0));
    assert!(check("x*2>=W+2", 3.0));
    assert!(check("x<W", 3.0));
}

#[test]
fn test_operator_detection() {
    let parsed = Condition::parse("x>=1&y<2&z=3&w<=4&v>5").unwrap();
    let relations: Vec<Relation> = parsed.comparisons.iter().map(|c| c.relation).collect();
    assert_eq!(
        relations,
        vec![
            Relation::Ge,
            Relation::Lt,
            Relation::Eq,
            Relation::Le,
            Relation::Gt
        ]
    );
}

#[test]
fn test_every_conjunct_must_hold() {
    assert!(check("x>1&x<5", 3.0));
    assert!(!check("x>1&x<2", 3.0));
    // The last conjunct alone is true here; the first one still vetoes.
    assert!(!check("x<2&x>1", 3.0));
}

#[test]
fn test_malformed_guards_are_false() {
    assert!(matches!(
        Condition::parse("x"),
        Err(ConditionError::Malformed(_))
    ));
    assert!(matches!(
        Condition::parse("x<<5"),
        Err(ConditionError::Malformed(_))
    ));
    assert_eq!(
        Condition::parse("x<5+"),
        Err(ConditionError::Operand(ExprError::UnexpectedEnd))
    );
    // Comparison operators never reach an operand.
    assert!(matches!(
        Condition::parse("x<(1=1)"),
        Err(ConditionError::Malformed(_))
    ));

    let err = Condition::parse("x").unwrap_err();
    assert_eq!(err.to_string(), "malformed guard conjunct 'x'");

    assert!(!check("x", 3.0));
    assert!(!check("", 3.0));
    assert!(!check("x<5&bogus", 3.0));
    // Unknown names fail at evaluation and also count as false.
    assert!(!check("y<5", 3.0));
}
