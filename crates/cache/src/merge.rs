//! Recursive record merge.

use {
    breadcord_common::ArrayStrategy,
    serde_json::{Map, Value},
};

/// Merge `patch` into `target` in place.
///
/// For each key of `patch`: two records merge recursively, two arrays
/// combine per `strategy`, anything else is replaced by the patch value.
/// Keys absent from `patch` are left untouched.
pub fn merge_records(target: &mut Map<String, Value>, patch: &Map<String, Value>, strategy: ArrayStrategy) {
    for (key, incoming) in patch {
        let Some(existing) = target.get_mut(key) else {
            target.insert(key.clone(), incoming.clone());
            continue;
        };
        match (existing, incoming) {
            (Value::Object(a), Value::Object(b)) => merge_records(a, b, strategy),
            (Value::Array(a), Value::Array(b)) => merge_arrays(a, b, strategy),
            (slot, _) => *slot = incoming.clone(),
        }
    }
}

fn merge_arrays(existing: &mut Vec<Value>, incoming: &[Value], strategy: ArrayStrategy) {
    match strategy {
        ArrayStrategy::Replace => *existing = incoming.to_vec(),
        ArrayStrategy::Concat => existing.extend(incoming.iter().cloned()),
        ArrayStrategy::Unique => {
            let mut out: Vec<Value> = Vec::with_capacity(existing.len() + incoming.len());
            for value in existing.iter().chain(incoming) {
                if !out.contains(value) {
                    out.push(value.clone());
                }
            }
            *existing = out;
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    fn record(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[rstest]
    #[case(ArrayStrategy::Replace, json!([3]))]
    #[case(ArrayStrategy::Concat, json!([1, 2, 3]))]
    #[case(ArrayStrategy::Unique, json!([1, 2, 3]))]
    fn array_strategies(#[case] strategy: ArrayStrategy, #[case] expected: Value) {
        let mut target = record(json!({"a": [1, 2]}));
        merge_records(&mut target, &record(json!({"a": [3]})), strategy);
        assert_eq!(target["a"], expected);
    }

    #[rstest]
    #[case(ArrayStrategy::Concat, json!([1, 2, 2, 3]))]
    #[case(ArrayStrategy::Unique, json!([1, 2, 3]))]
    fn overlapping_arrays(#[case] strategy: ArrayStrategy, #[case] expected: Value) {
        let mut target = record(json!({"a": [1, 2]}));
        merge_records(&mut target, &record(json!({"a": [2, 3]})), strategy);
        assert_eq!(target["a"], expected);
    }

    #[test]
    fn unique_compares_structurally_and_keeps_first() {
        let mut target = record(json!({"a": [{"x": 1}, {"x": 1}, "s"]}));
        merge_records(
            &mut target,
            &record(json!({"a": [{"x": 1}, {"x": 2}, "s"]})),
            ArrayStrategy::Unique,
        );
        assert_eq!(target["a"], json!([{"x": 1}, "s", {"x": 2}]));
    }

    #[test]
    fn nested_records_merge_recursively() {
        let mut target = record(json!({"a": {"b": 1, "c": {"d": 2}}, "keep": true}));
        merge_records(
            &mut target,
            &record(json!({"a": {"c": {"e": 3}}, "new": "x"})),
            ArrayStrategy::Replace,
        );
        assert_eq!(
            Value::Object(target),
            json!({"a": {"b": 1, "c": {"d": 2, "e": 3}}, "keep": true, "new": "x"})
        );
    }

    #[test]
    fn mismatched_kinds_are_replaced() {
        let mut target = record(json!({"a": [1], "b": {"x": 1}, "c": 1}));
        merge_records(
            &mut target,
            &record(json!({"a": {"y": 2}, "b": [2], "c": null})),
            ArrayStrategy::Concat,
        );
        assert_eq!(
            Value::Object(target),
            json!({"a": {"y": 2}, "b": [2], "c": null})
        );
    }
}
