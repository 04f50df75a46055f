//! Deterministic plugin load order.
//!
//! Manifests are deduplicated by id (first occurrence wins), checked for
//! missing dependencies, then sorted depth-first so every plugin comes
//! after all of its dependencies. Roots are visited in lexicographic order
//! and dependencies in declared order, which makes the result stable for a
//! given set of manifests.

use std::collections::{BTreeMap, HashMap};

use crate::{
    error::{Error, Result},
    manifest::PluginManifest,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

pub fn resolve_load_order(manifests: &[PluginManifest]) -> Result<Vec<String>> {
    let mut graph: BTreeMap<&str, &[String]> = BTreeMap::new();
    for manifest in manifests {
        graph
            .entry(manifest.id.as_str())
            .or_insert(manifest.dependencies.as_slice());
    }

    for (plugin, deps) in &graph {
        if let Some(missing) = deps.iter().find(|dep| !graph.contains_key(dep.as_str())) {
            return Err(Error::missing_dependency(plugin, missing));
        }
    }

    let mut marks = HashMap::with_capacity(graph.len());
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(graph.len());
    for id in graph.keys() {
        visit(id, &graph, &mut marks, &mut stack, &mut order)?;
    }
    Ok(order)
}

fn visit<'a>(
    id: &'a str,
    graph: &BTreeMap<&'a str, &'a [String]>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    order: &mut Vec<String>,
) -> Result<()> {
    match marks.get(id) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            // The cycle starts where `id` was first entered.
            let start = stack.iter().position(|s| *s == id).unwrap_or_default();
            let mut path: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
            path.push(id.to_string());
            return Err(Error::Cycle { path });
        },
        None => {},
    }

    marks.insert(id, Mark::Visiting);
    stack.push(id);
    if let Some(deps) = graph.get(id) {
        for dep in deps.iter() {
            visit(dep.as_str(), graph, marks, stack, order)?;
        }
    }
    stack.pop();
    marks.insert(id, Mark::Done);
    order.push(id.to_string());
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn m(id: &str, deps: &[&str]) -> PluginManifest {
        PluginManifest::new(id, deps.iter().copied())
    }

    #[rstest]
    #[case(&[("A", &[] as &[&str]), ("B", &["A"][..]), ("C", &["A", "B"][..])], &["A", "B", "C"])]
    #[case(&[("C", &["A", "B"][..]), ("B", &["A"][..]), ("A", &[] as &[&str])], &["A", "B", "C"])]
    #[case(&[("solo", &[] as &[&str])], &["solo"])]
    fn resolves_in_dependency_order(
        #[case] input: &[(&str, &[&str])],
        #[case] expected: &[&str],
    ) {
        let manifests: Vec<_> = input.iter().map(|(id, deps)| m(id, deps)).collect();
        assert_eq!(resolve_load_order(&manifests).unwrap(), expected);
    }

    #[rstest]
    #[case(&[("A", &["Z"][..])], "A", "Z")]
    #[case(&[("A", &[] as &[&str]), ("B", &["A", "Y"][..])], "B", "Y")]
    fn missing_dependency_names_both(
        #[case] input: &[(&str, &[&str])],
        #[case] plugin: &str,
        #[case] dependency: &str,
    ) {
        let manifests: Vec<_> = input.iter().map(|(id, deps)| m(id, deps)).collect();
        let err = resolve_load_order(&manifests).unwrap_err();
        assert!(err.is_graph_error());
        let message = err.to_string();
        assert!(message.contains(&format!("\"{plugin}\"")), "{message}");
        assert!(message.contains(&format!("\"{dependency}\"")), "{message}");
    }

    #[test]
    fn dependencies_come_first() {
        let order = resolve_load_order(&[m("A", &["B"]), m("B", &["C"]), m("C", &[])]).unwrap();
        assert_eq!(order, ["C", "B", "A"]);
    }

    #[test]
    fn independent_plugins_are_lexicographic() {
        let order = resolve_load_order(&[m("c", &[]), m("a", &[]), m("b", &[])]).unwrap();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn declared_dependency_order_is_kept() {
        let order = resolve_load_order(&[
            m("app", &["zlib", "alpha"]),
            m("alpha", &[]),
            m("zlib", &[]),
        ])
        .unwrap();
        assert_eq!(order, ["zlib", "alpha", "app"]);
    }

    #[test]
    fn diamond_visits_shared_dependency_once() {
        let order = resolve_load_order(&[
            m("top", &["left", "right"]),
            m("left", &["base"]),
            m("right", &["base"]),
            m("base", &[]),
        ])
        .unwrap();
        assert_eq!(order, ["base", "left", "right", "top"]);
    }

    #[test]
    fn first_manifest_wins() {
        let order = resolve_load_order(&[m("a", &[]), m("a", &["missing"]), m("b", &["a"])]).unwrap();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn empty_input() {
        assert!(resolve_load_order(&[]).unwrap().is_empty());
    }

    #[rstest]
    #[case(&[("A", &["B"][..]), ("B", &["A"][..])], "A -> B -> A")]
    #[case(&[("A", &["A"][..])], "A -> A")]
    #[case(&[("root", &["x"][..]), ("x", &["y"][..]), ("y", &["x"][..])], "x -> y -> x")]
    fn cycles_report_the_path(#[case] input: &[(&str, &[&str])], #[case] expected: &str) {
        let manifests: Vec<_> = input.iter().map(|(id, deps)| m(id, deps)).collect();
        let err = resolve_load_order(&manifests).unwrap_err();
        assert!(err.is_graph_error());
        assert_eq!(err.to_string(), format!("circular dependency detected: {expected}"));
    }

    #[test]
    fn missing_dependency_is_reported_deterministically() {
        let err = resolve_load_order(&[m("zed", &["nope"]), m("abc", &["gone"])]).unwrap_err();
        match err {
            Error::MissingDependency { plugin, dependency } => {
                assert_eq!(plugin, "abc");
                assert_eq!(dependency, "gone");
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
