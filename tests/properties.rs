use fas::hcs;
use fas::heuristic::greedy;
use fas::histogram::HistogramMaxHeap;
use fas::recursive::interleave;
use fas::scc::strongly_connected_components;
use fas::solution::{fas_weight, inverse, is_permutation, Solution};
use fas::{Algorithm, Contraction, CsrGraph, Edge, Reducer, Weight};
use itertools::Itertools;
use proptest::prelude::*;

fn arb_graph(max_n: usize, max_m: usize) -> impl Strategy<Value = CsrGraph> {
    (1..=max_n).prop_flat_map(move |n| {
        proptest::collection::vec((0..n, 0..n, 1..=5 as Weight), 0..=max_m)
            .prop_map(move |arcs| CsrGraph::new(n, arcs.into_iter().map(|(u, v, w)| Edge::new(u, v, w))))
    })
}

/// Tries every order.
fn exact(g: &CsrGraph) -> Solution {
    let n = g.num_vertices();
    (0..n)
        .permutations(n)
        .map(|seq| inverse(&seq))
        .min_by_key(|rank| fas_weight(g, rank).unwrap_or(Weight::MAX))
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
enum HeapOp {
    Increase(usize),
    Decrease(usize),
    Pop,
}

proptest! {
    #[test]
    fn every_pipeline_returns_a_permutation(g in arb_graph(14, 40)) {
        for alg in Algorithm::all() {
            let rank = alg.solve(&g);
            prop_assert!(is_permutation(&rank), "{}", alg);
            prop_assert_eq!(rank.len(), g.num_vertices());
        }
        prop_assert!(is_permutation(&hcs::solve(&g, &greedy)));
    }

    #[test]
    fn scc_colors_match_reachability(g in arb_graph(10, 25)) {
        let n = g.num_vertices();
        let mut reach = vec![vec![false; n]; n];
        for (u, row) in reach.iter_mut().enumerate() {
            row[u] = true;
        }
        for e in g.edges() {
            reach[e.src][e.dst] = true;
        }
        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    if reach[i][k] && reach[k][j] {
                        reach[i][j] = true;
                    }
                }
            }
        }
        let c = strongly_connected_components(&g);
        for u in 0..n {
            for v in 0..n {
                prop_assert_eq!(c.color[u] == c.color[v], reach[u][v] && reach[v][u]);
            }
        }
        for e in g.edges() {
            prop_assert!(c.color[e.src] <= c.color[e.dst]);
        }
    }

    #[test]
    fn heap_top_is_the_maximum(
        keys in proptest::collection::vec(0..=8usize, 1..20),
        ops in proptest::collection::vec(
            prop_oneof![
                (0..20usize).prop_map(HeapOp::Increase),
                (0..20usize).prop_map(HeapOp::Decrease),
                Just(HeapOp::Pop),
            ],
            0..120
        )
    ) {
        let max_key = 8;
        let n = keys.len();
        let mut heap = HistogramMaxHeap::new(max_key, keys.clone());
        let mut model: Vec<Option<usize>> = keys.into_iter().map(Some).collect();
        for op in ops {
            match op {
                HeapOp::Increase(i) => {
                    let i = i % n;
                    if let Some(k) = model[i].filter(|&k| k < max_key) {
                        heap.increase_key(i);
                        model[i] = Some(k + 1);
                    }
                }
                HeapOp::Decrease(i) => {
                    let i = i % n;
                    if let Some(k) = model[i].filter(|&k| k > 0) {
                        heap.decrease_key(i);
                        model[i] = Some(k - 1);
                    }
                }
                HeapOp::Pop => {
                    let best = model.iter().flatten().max().copied();
                    match heap.pop() {
                        Some(v) => {
                            prop_assert_eq!(model[v], best);
                            model[v] = None;
                        }
                        None => prop_assert_eq!(best, None),
                    }
                }
            }
            let best = model.iter().flatten().max().copied();
            prop_assert_eq!(heap.top().map(|v| heap.key(v)), best);
            prop_assert_eq!(heap.len(), model.iter().flatten().count());
        }
    }

    #[test]
    fn interleaving_beats_both_concatenations(g in arb_graph(10, 30), split in proptest::collection::vec(any::<bool>(), 10)) {
        let n = g.num_vertices();
        let (a, b): (Vec<usize>, Vec<usize>) = (0..n).partition(|&v| split[v]);
        let cost = |seq: &[usize]| fas_weight(&g, &inverse(seq)).unwrap();
        let merged = interleave(&g, &a, &b);
        prop_assert_eq!(merged.iter().copied().sorted().collect_vec(), (0..n).collect_vec());
        let ab = a.iter().chain(&b).copied().collect_vec();
        let ba = b.iter().chain(&a).copied().collect_vec();
        prop_assert!(cost(&merged) <= cost(&ab));
        prop_assert!(cost(&merged) <= cost(&ba));
        if n <= 8 {
            // an interleaving is fixed by the positions taken by `a`
            let best = (0..n)
                .combinations(a.len())
                .map(|slots| {
                    let (mut ia, mut ib) = (a.iter(), b.iter());
                    let seq = (0..n)
                        .filter_map(|k| if slots.contains(&k) { ia.next() } else { ib.next() })
                        .copied()
                        .collect_vec();
                    cost(&seq)
                })
                .min()
                .unwrap();
            prop_assert_eq!(cost(&merged), best);
        }
    }

    #[test]
    fn reductions_keep_the_optimum(g in arb_graph(6, 14)) {
        let best = fas_weight(&g, &exact(&g)).unwrap();
        for contraction in [Contraction::None, Contraction::ChainOnly, Contraction::Full] {
            for recurse_scc in [false, true] {
                let rank = Reducer::new(contraction, recurse_scc).solve(&g, &exact);
                prop_assert!(is_permutation(&rank));
                prop_assert_eq!(fas_weight(&g, &rank).unwrap(), best, "{:?} {}", contraction, recurse_scc);
            }
        }
    }
}
