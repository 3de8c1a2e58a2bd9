//! Rule predicates over measured job facts.

use jobroute_core::Condition;
use serde_json::{Map, Value};

/// Totals the rule scan tests against. Only the facts a tool's rules need
/// are measured; the rest stay `None` and never match.
#[derive(Debug, Clone, Default)]
pub struct Facts {
    pub total_size: Option<u128>,
    pub total_records: Option<u128>,
    pub dataset_count: Option<u128>,
    pub arguments: Map<String, Value>,
}

impl Facts {
    pub fn satisfies(&self, condition: &Condition) -> bool {
        match condition {
            Condition::FileSize(range) => self.total_size.is_some_and(|v| range.contains(v)),
            Condition::Records(range) => self.total_records.is_some_and(|v| range.contains(v)),
            Condition::NumInputDatasets(range) => {
                self.dataset_count.is_some_and(|v| range.contains(v))
            }
            Condition::Arguments(expected) => arguments_match(expected, &self.arguments),
        }
    }
}

/// Every key the rule lists must be present with an equal value. Nested
/// mappings recurse, so a rule may name a subset of a nested argument.
pub fn arguments_match(expected: &Map<String, Value>, actual: &Map<String, Value>) -> bool {
    expected.iter().all(|(key, want)| {
        actual
            .get(key)
            .is_some_and(|have| value_matches(want, have))
    })
}

fn value_matches(want: &Value, have: &Value) -> bool {
    match (want, have) {
        (Value::Object(want), Value::Object(have)) => arguments_match(want, have),
        // `1` and `1.0` are the same argument value.
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        _ => want == have,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobroute_core::{Bound, Range};
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn size_range_is_inclusive() {
        let facts = Facts {
            total_size: Some(3308),
            ..Facts::default()
        };
        let exact = Range::new(Bound::Finite(3308), Bound::Finite(3308));
        assert!(facts.satisfies(&Condition::FileSize(exact)));
        assert!(!facts.satisfies(&Condition::Records(exact)));
    }

    #[test]
    fn arguments_are_conjunctive() {
        let expected = map(json!({ "careful": true, "k": 21 }));
        assert!(arguments_match(
            &expected,
            &map(json!({ "careful": true, "k": 21, "extra": "x" }))
        ));
        assert!(!arguments_match(&expected, &map(json!({ "careful": true }))));
        assert!(!arguments_match(
            &expected,
            &map(json!({ "careful": false, "k": 21 }))
        ));
    }

    #[test]
    fn nested_arguments_match_recursively() {
        let expected = map(json!({ "mlst_or_genedb": { "vfdb_in": "-bact" } }));
        let actual = map(json!({ "mlst_or_genedb": { "vfdb_in": "-bact", "other": 1 } }));
        assert!(arguments_match(&expected, &actual));

        let other = map(json!({ "mlst_or_genedb": { "vfdb_in": "-not_here" } }));
        assert!(!arguments_match(&expected, &other));
    }

    #[test]
    fn numbers_compare_by_value() {
        let expected = map(json!({ "threads": 4 }));
        assert!(arguments_match(&expected, &map(json!({ "threads": 4.0 }))));
    }
}
