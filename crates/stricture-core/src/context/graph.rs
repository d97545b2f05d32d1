//! Graph algorithms over the file dependency graph.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Exact transpose: `result[b]` contains `a` for every edge `a -> b`.
/// Every node of `graph` appears as a key, with sorted, de-duplicated values.
pub fn transpose(graph: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    let mut reverse: BTreeMap<String, BTreeSet<String>> = graph
        .keys()
        .map(|k| (k.clone(), BTreeSet::new()))
        .collect();
    for (source, targets) in graph {
        for target in targets {
            reverse
                .entry(target.clone())
                .or_default()
                .insert(source.clone());
        }
    }
    reverse
        .into_iter()
        .map(|(k, v)| (k, v.into_iter().collect()))
        .collect()
}

/// Upper bound on the number of cycles enumerated for one graph.
pub const MAX_CYCLES: usize = 1_000;

/// Every elementary dependency cycle, up to [`MAX_CYCLES`].
///
/// The graph is split into strongly connected components and the circuits of
/// each component are enumerated from its smallest node, after which that
/// node is removed and the remainder is decomposed again. Each cycle
/// therefore appears once and starts at its smallest node. The result is
/// sorted and every traversal is iterative, so deep graphs are safe.
pub fn find_cycles(graph: &BTreeMap<String, Vec<String>>) -> Vec<Vec<String>> {
    find_cycles_capped(graph, MAX_CYCLES)
}

pub fn find_cycles_capped(graph: &BTreeMap<String, Vec<String>>, limit: usize) -> Vec<Vec<String>> {
    let names: Vec<&str> = graph
        .iter()
        .flat_map(|(node, targets)| std::iter::once(node).chain(targets))
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    let adjacency: Vec<Vec<usize>> = names
        .iter()
        .map(|node| {
            let mut targets: Vec<usize> = graph
                .get(*node)
                .into_iter()
                .flatten()
                .filter_map(|t| index.get(t.as_str()).copied())
                .collect();
            targets.sort_unstable();
            targets.dedup();
            targets
        })
        .collect();

    let all: Vec<usize> = (0..names.len()).collect();
    let mut pending: Vec<Vec<usize>> = cyclic_components(&all, &adjacency);
    let mut search = CircuitSearch::new(names.len());
    let mut found: Vec<Vec<usize>> = Vec::new();

    while let Some(mut component) = pending.pop() {
        if found.len() >= limit {
            tracing::warn!(limit, "Cycle enumeration stopped at limit");
            break;
        }
        component.sort_unstable();
        search.run(&component, &adjacency, limit, &mut found);
        pending.extend(cyclic_components(&component[1..], &adjacency));
    }

    let mut cycles: Vec<Vec<String>> = found
        .into_iter()
        .map(|cycle| cycle.into_iter().map(|i| names[i].to_string()).collect())
        .collect();
    cycles.sort();
    cycles
}

/// Strongly connected components of the subgraph induced by `nodes` that
/// contain at least one cycle (more than one node, or a self-loop).
fn cyclic_components(nodes: &[usize], adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    strongly_connected(nodes, adjacency)
        .into_iter()
        .filter(|c| c.len() > 1 || adjacency[c[0]].contains(&c[0]))
        .collect()
}

/// Iterative Tarjan over the subgraph induced by `nodes`.
fn strongly_connected(nodes: &[usize], adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;
    let local: HashMap<usize, usize> = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let mut order = vec![UNVISITED; nodes.len()];
    let mut low = vec![0; nodes.len()];
    let mut on_stack = vec![false; nodes.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut counter = 0;

    for root in 0..nodes.len() {
        if order[root] != UNVISITED {
            continue;
        }
        order[root] = counter;
        low[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;
        // (local node, index of the next target to visit)
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            let targets = &adjacency[nodes[v]];
            if frame.1 < targets.len() {
                let target = targets[frame.1];
                frame.1 += 1;
                let Some(&w) = local.get(&target) else {
                    continue;
                };
                if order[w] == UNVISITED {
                    order[w] = counter;
                    low[w] = counter;
                    counter += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    frames.push((w, 0));
                } else if on_stack[w] {
                    low[v] = low[v].min(order[w]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                low[parent] = low[parent].min(low[v]);
            }
            if low[v] == order[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(nodes[w]);
                    if w == v {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }
    components
}

/// Elementary-circuit search state, reused across components.
struct CircuitSearch {
    member: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<Vec<usize>>,
}

impl CircuitSearch {
    fn new(size: usize) -> Self {
        Self {
            member: vec![false; size],
            blocked: vec![false; size],
            blocked_by: vec![Vec::new(); size],
        }
    }

    /// Push every circuit through `component[0]` that stays inside
    /// `component` (sorted) onto `found`, stopping at `limit`.
    fn run(
        &mut self,
        component: &[usize],
        adjacency: &[Vec<usize>],
        limit: usize,
        found: &mut Vec<Vec<usize>>,
    ) {
        for &n in component {
            self.member[n] = true;
            self.blocked[n] = false;
            self.blocked_by[n].clear();
        }
        let start = component[0];
        self.blocked[start] = true;
        let mut path: Vec<usize> = vec![start];
        // (node, index of the next target, closed a circuit)
        let mut frames: Vec<(usize, usize, bool)> = vec![(start, 0, false)];

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            let targets = &adjacency[v];
            if frame.1 < targets.len() {
                let w = targets[frame.1];
                frame.1 += 1;
                if !self.member[w] {
                    continue;
                }
                if w == start {
                    frame.2 = true;
                    found.push(path.clone());
                    if found.len() >= limit {
                        break;
                    }
                } else if !self.blocked[w] {
                    self.blocked[w] = true;
                    path.push(w);
                    frames.push((w, 0, false));
                }
                continue;
            }

            let closed = frame.2;
            frames.pop();
            path.pop();
            if closed {
                self.unblock(v);
            } else {
                for &w in targets {
                    if self.member[w] && !self.blocked_by[w].contains(&v) {
                        self.blocked_by[w].push(v);
                    }
                }
            }
            if let Some(parent) = frames.last_mut() {
                parent.2 |= closed;
            }
        }

        for &n in component {
            self.member[n] = false;
        }
    }

    fn unblock(&mut self, node: usize) {
        let mut stack = vec![node];
        while let Some(u) = stack.pop() {
            if !self.blocked[u] {
                continue;
            }
            self.blocked[u] = false;
            stack.append(&mut self.blocked_by[u]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> BTreeMap<String, Vec<String>> {
        let mut g: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (a, b) in edges {
            g.entry(a.to_string()).or_default().push(b.to_string());
            g.entry(b.to_string()).or_default();
        }
        g
    }

    #[test]
    fn test_transpose_is_exact() {
        let g = graph(&[("a", "b"), ("a", "c"), ("c", "b")]);
        let r = transpose(&g);
        assert_eq!(r["b"], vec!["a".to_string(), "c".to_string()]);
        assert_eq!(r["c"], vec!["a".to_string()]);
        assert!(r["a"].is_empty());
        for (a, targets) in &g {
            for b in targets {
                assert!(r[b].contains(a));
            }
        }
    }

    #[test]
    fn test_find_cycles_triangle() {
        let g = graph(&[("b", "c"), ("c", "a"), ("a", "b")]);
        let cycles = find_cycles(&g);
        assert_eq!(cycles, vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]]);
    }

    #[test]
    fn test_find_cycles_removing_edge_breaks_cycle() {
        let g = graph(&[("a", "b"), ("b", "c")]);
        assert!(find_cycles(&g).is_empty());
    }

    #[test]
    fn test_find_cycles_self_loop_and_two_cycles() {
        let g = graph(&[("a", "a"), ("b", "c"), ("c", "b"), ("c", "d")]);
        let cycles = find_cycles(&g);
        assert_eq!(
            cycles,
            vec![
                vec!["a".to_string()],
                vec!["b".to_string(), "c".to_string()],
            ]
        );
    }

    fn names(cycle: &[&str]) -> Vec<String> {
        cycle.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_find_cycles_diamond_reports_both_paths() {
        let g = graph(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "a")]);
        assert_eq!(
            find_cycles(&g),
            vec![names(&["a", "b", "d"]), names(&["a", "c", "d"])]
        );
    }

    #[test]
    fn test_find_cycles_two_cycles_sharing_a_node() {
        // Both cycles pass through "m", which is fully explored by the
        // first one before the second is reached.
        let g = graph(&[("a", "m"), ("m", "a"), ("m", "z"), ("z", "m"), ("b", "m")]);
        assert_eq!(find_cycles(&g), vec![names(&["a", "m"]), names(&["m", "z"])]);
    }

    #[test]
    fn test_find_cycles_nested_cycles_in_one_component() {
        let g = graph(&[("a", "b"), ("b", "c"), ("c", "a"), ("b", "a"), ("c", "b")]);
        assert_eq!(
            find_cycles(&g),
            vec![names(&["a", "b"]), names(&["a", "b", "c"]), names(&["b", "c"])]
        );
    }

    #[test]
    fn test_find_cycles_capped_stops_at_limit() {
        // Complete graph on five nodes has 84 elementary circuits.
        let nodes = ["a", "b", "c", "d", "e"];
        let mut edges = Vec::new();
        for x in nodes {
            for y in nodes {
                if x != y {
                    edges.push((x, y));
                }
            }
        }
        let g = graph(&edges);
        assert_eq!(find_cycles(&g).len(), 84);
        assert_eq!(find_cycles_capped(&g, 10).len(), 10);
    }

    #[test]
    fn test_find_cycles_deep_chain_does_not_overflow() {
        let mut g: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let n = 50_000;
        for i in 0..n {
            g.insert(format!("f{i:06}"), vec![format!("f{:06}", (i + 1) % n)]);
        }
        let cycles = find_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), n);
        assert_eq!(cycles[0][0], "f000000");
    }
}
