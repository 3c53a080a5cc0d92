use std::borrow::Cow;
use std::mem;
use itertools::Itertools;
use log::trace;
use crate::graph::{self, CsrGraph, Edge, Weight};
use crate::heuristic::{greedy_order, trivial, Selection};
use crate::scc::{self, Coloring};
use crate::solution::{self, Solution, Solver};

/// One part of a decomposition: the original ids of its vertices (local id
/// `i` is `ids[i]`) and the induced subgraph on local ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    pub ids: Vec<usize>,
    pub graph: CsrGraph,
}

/// A graph split into parts, plus the quotient graph with one vertex per part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub outer: CsrGraph,
    pub parts: Vec<Part>,
}

/// Splits `g` along `coloring`. Local ids inside a part follow the original
/// id order; parallel edges are merged in both the parts and the quotient.
pub fn partition(g: &CsrGraph, coloring: &Coloring) -> Partition {
    let color = &coloring.color;
    let k = coloring.count;
    let mut local = vec![0; g.num_vertices()];
    let mut ids = vec![Vec::new(); k];
    for (v, &c) in color.iter().enumerate() {
        local[v] = ids[c].len();
        ids[c].push(v);
    }
    let mut inner = vec![Vec::new(); k];
    for e in g.edges() {
        let (cu, cv) = (color[e.src], color[e.dst]);
        if cu == cv {
            inner[cu].push(Edge::new(local[e.src], local[e.dst], e.weight));
        }
    }
    let parts = ids
        .into_iter()
        .zip(inner)
        .map(|(ids, edges)| {
            let n = ids.len();
            Part { ids, graph: CsrGraph::new(n, graph::merge_parallel_edges(&edges, n)) }
        })
        .collect();
    Partition { outer: graph::coalesce(g, coloring), parts }
}

/// Concatenates the part solutions in part order.
pub fn default_assemble(n: usize, p: &Partition, solutions: &[Solution]) -> Solution {
    let mut rank = vec![0; n];
    let mut offset = 0;
    for (part, sol) in p.parts.iter().zip(solutions) {
        for (i, &v) in part.ids.iter().enumerate() {
            rank[v] = offset + sol[i];
        }
        offset += part.ids.len();
    }
    rank
}

/// Orders the parts by solving the quotient graph with `outer`, then
/// concatenates the part solutions in that order.
pub fn hybrid_assemble<S: Solver + ?Sized>(n: usize, p: &Partition, solutions: &[Solution], outer: &S) -> Solution {
    let part_order = solution::inverse(&outer.solve(&p.outer));
    let mut rank = vec![0; n];
    let mut offset = 0;
    for i in part_order {
        let part = &p.parts[i];
        for (j, &v) in part.ids.iter().enumerate() {
            rank[v] = offset + solutions[i][j];
        }
        offset += part.ids.len();
    }
    rank
}

/// Merges two vertex sequences of `g` into the interleaving with the least
/// backward weight between them. The relative order inside each sequence is
/// kept. O(|a| |b|) time and space.
pub fn interleave(g: &CsrGraph, a: &[usize], b: &[usize]) -> Vec<usize> {
    let (n1, n2) = (a.len(), b.len());
    let n = g.num_vertices();
    let mut pos1 = vec![usize::MAX; n];
    let mut pos2 = vec![usize::MAX; n];
    for (i, &v) in a.iter().enumerate() {
        pos1[v] = i;
    }
    for (i, &v) in b.iter().enumerate() {
        pos2[v] = i;
    }
    let w1 = n2 + 1;
    let w2 = n1 + 1;
    // ab[i][j]: weight from a[i-1] into b[..j]; ba[j][i]: from b[j-1] into a[..i]
    let mut ab: Vec<Weight> = vec![0; (n1 + 1) * w1];
    let mut ba: Vec<Weight> = vec![0; (n2 + 1) * w2];
    for (i, &u) in a.iter().enumerate() {
        for e in g.out_edges(u) {
            if pos2[e.dst] != usize::MAX {
                ab[(i + 1) * w1 + pos2[e.dst] + 1] += e.weight;
            }
        }
    }
    for (j, &u) in b.iter().enumerate() {
        for e in g.out_edges(u) {
            if pos1[e.dst] != usize::MAX {
                ba[(j + 1) * w2 + pos1[e.dst] + 1] += e.weight;
            }
        }
    }
    for i in 1..=n1 {
        for j in 1..=n2 {
            ab[i * w1 + j] += ab[i * w1 + j - 1];
        }
    }
    for j in 1..=n2 {
        for i in 1..=n1 {
            ba[j * w2 + i] += ba[j * w2 + i - 1];
        }
    }
    // dp[i][j]: cheapest merge of a[..i] and b[..j]
    let mut dp: Vec<Weight> = vec![0; (n1 + 1) * w1];
    for i in 1..=n1 {
        for j in 1..=n2 {
            let take_a = dp[(i - 1) * w1 + j] + ab[i * w1 + j];
            let take_b = dp[i * w1 + j - 1] + ba[j * w2 + i];
            dp[i * w1 + j] = take_a.min(take_b);
        }
    }
    let mut merged = Vec::with_capacity(n1 + n2);
    let (mut i, mut j) = (n1, n2);
    while i > 0 || j > 0 {
        let take_a = j == 0 || (i > 0 && dp[i * w1 + j] == dp[(i - 1) * w1 + j] + ab[i * w1 + j]);
        if take_a {
            i -= 1;
            merged.push(a[i]);
        } else {
            j -= 1;
            merged.push(b[j]);
        }
    }
    merged.reverse();
    merged
}

/// Visits the parts in the order given by solving the quotient graph with
/// `outer` and folds each one into the sequence built so far with
/// `interleave`. A fold over more than `max_pairs` vertex pairs appends the
/// part instead.
pub fn interleave_assemble<S: Solver + ?Sized>(
    g: &CsrGraph,
    p: &Partition,
    solutions: &[Solution],
    outer: &S,
    max_pairs: usize,
) -> Solution {
    let part_order = solution::inverse(&outer.solve(&p.outer));
    let mut cur: Vec<usize> = Vec::new();
    for i in part_order {
        let ids = &p.parts[i].ids;
        let seq = solution::inverse(&solutions[i]).into_iter().map(|j| ids[j]).collect_vec();
        if cur.len().saturating_mul(seq.len()) <= max_pairs {
            cur = interleave(g, &cur, &seq);
        } else {
            trace!("appending {} vertices after {} without interleaving", seq.len(), cur.len());
            cur.extend(seq);
        }
    }
    solution::inverse(&cur)
}

/// A way of splitting a graph into smaller graphs and putting their
/// solutions back together.
pub trait Decomposer {
    fn decompose(&self, g: &CsrGraph) -> Partition;
    /// Only `ids` of the parts are looked at; the part graphs may be gone.
    fn assemble(&self, g: &CsrGraph, p: &Partition, solutions: &[Solution]) -> Solution;
}

/// Splits into strongly connected components and concatenates in
/// condensation order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SccDecomposer;

impl Decomposer for SccDecomposer {
    fn decompose(&self, g: &CsrGraph) -> Partition {
        partition(g, &scc::strongly_connected_components(g))
    }

    fn assemble(&self, g: &CsrGraph, p: &Partition, solutions: &[Solution]) -> Solution {
        default_assemble(g.num_vertices(), p, solutions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assembly {
    /// Put the two halves one after the other.
    #[default]
    Hybrid,
    /// Merge the two halves optimally.
    Interleave,
}

/// Cuts the greedy order of a graph in two. The cut is placed after the
/// vertices the greedy put at the front, but clamped so both halves hold
/// between `1 - alpha` and `alpha` of the vertices.
///
/// With `Assembly::Interleave`, halves whose product of sizes exceeds
/// `max_dp_pairs` are concatenated as with `Assembly::Hybrid`.
#[derive(Debug, Clone, Copy)]
pub struct GreedyDecomposer {
    pub alpha: f64,
    pub assembly: Assembly,
    pub max_dp_pairs: usize,
}

/// About 100 MB of tables for one interleave.
pub const DEFAULT_MAX_DP_PAIRS: usize = 1 << 22;

impl Default for GreedyDecomposer {
    fn default() -> GreedyDecomposer {
        GreedyDecomposer { alpha: 2.0 / 3.0, assembly: Assembly::Hybrid, max_dp_pairs: DEFAULT_MAX_DP_PAIRS }
    }
}

impl GreedyDecomposer {
    pub fn new(assembly: Assembly) -> GreedyDecomposer {
        GreedyDecomposer { assembly, ..Default::default() }
    }
}

impl Decomposer for GreedyDecomposer {
    fn decompose(&self, g: &CsrGraph) -> Partition {
        let n = g.num_vertices();
        let order = greedy_order(g, Selection::Absolute);
        let lo = ((1.0 - self.alpha) * n as f64).ceil() as usize;
        let hi = (self.alpha * n as f64).floor() as usize;
        let t = order.front.max(lo).min(hi);
        let color = order.rank.iter().map(|&r| usize::from(r >= t)).collect();
        partition(g, &Coloring { count: 2, color })
    }

    fn assemble(&self, g: &CsrGraph, p: &Partition, solutions: &[Solution]) -> Solution {
        match self.assembly {
            Assembly::Hybrid => hybrid_assemble(g.num_vertices(), p, solutions, &trivial),
            Assembly::Interleave => interleave_assemble(g, p, solutions, &trivial, self.max_dp_pairs),
        }
    }
}

struct Frame<'g> {
    graph: Cow<'g, CsrGraph>,
    level: usize,
    stalls: usize,
    partition: Partition,
    solutions: Vec<Solution>,
}

struct Recursion<'a, S: ?Sized> {
    base: &'a S,
    threshold: usize,
    decomposers: &'a [&'a dyn Decomposer],
}

impl<S: Solver + ?Sized> Recursion<'_, S> {
    /// Solves `graph` directly or pushes a frame for its parts.
    fn open<'g>(&self, stack: &mut Vec<Frame<'g>>, graph: Cow<'g, CsrGraph>, level: usize, stalls: usize) -> Option<Solution> {
        if graph.num_vertices() <= self.threshold || stalls >= self.decomposers.len() {
            return Some(self.base.solve(&graph));
        }
        let partition = self.decomposers[level].decompose(&graph);
        trace!("depth {}: {} vertices into {} parts", stack.len(), graph.num_vertices(), partition.parts.len());
        stack.push(Frame { graph, level, stalls, partition, solutions: Vec::new() });
        None
    }
}

/// Decompose-solve-assemble. Graphs with at most `threshold` vertices go to
/// `base`; larger ones are split by the decomposers in round-robin order by
/// depth. A decomposer that hands back a part as large as its input passes
/// the part on to the next one; once all of them did, `base` takes over.
///
/// The recursion runs on an explicit stack of frames.
pub fn recurse<S: Solver + ?Sized>(g: &CsrGraph, base: &S, threshold: usize, decomposers: &[&dyn Decomposer]) -> Solution {
    let k = decomposers.len();
    let rec = Recursion { base, threshold, decomposers };
    let mut stack: Vec<Frame> = Vec::new();
    let mut done = rec.open(&mut stack, Cow::Borrowed(g), 0, 0);
    while let Some(top) = stack.last_mut() {
        if let Some(sol) = done.take() {
            top.solutions.push(sol);
        }
        let i = top.solutions.len();
        if i == top.partition.parts.len() {
            if let Some(frame) = stack.pop() {
                done = Some(decomposers[frame.level].assemble(&frame.graph, &frame.partition, &frame.solutions));
            }
            continue;
        }
        let child = mem::take(&mut top.partition.parts[i].graph);
        let stalls = if child.num_vertices() == top.graph.num_vertices() { top.stalls + 1 } else { 0 };
        let level = (top.level + 1) % k;
        done = rec.open(&mut stack, Cow::Owned(child), level, stalls);
    }
    done.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::greedy;
    use crate::solution::{fas_weight, is_permutation};

    fn graph(n: usize, arcs: &[(usize, usize, Weight)]) -> CsrGraph {
        CsrGraph::new(n, arcs.iter().map(|&(u, v, w)| Edge::new(u, v, w)))
    }

    fn two_triangles() -> CsrGraph {
        graph(6, &[(3, 4, 1), (4, 5, 1), (5, 3, 1), (0, 1, 1), (1, 2, 1), (2, 0, 1), (2, 3, 2), (5, 0, 1)])
    }

    #[test]
    fn partition_maps_ids_and_merges() {
        let g = graph(4, &[(0, 2, 1), (0, 2, 2), (2, 0, 1), (1, 3, 5), (0, 1, 4), (2, 3, 1)]);
        let c = Coloring { count: 2, color: vec![0, 1, 0, 1] };
        let p = partition(&g, &c);
        assert_eq!(p.parts[0].ids, vec![0, 2]);
        assert_eq!(p.parts[0].graph.edges(), &[Edge::new(0, 1, 3), Edge::new(1, 0, 1)]);
        assert_eq!(p.parts[1].graph.edges(), &[Edge::new(0, 1, 5)]);
        assert_eq!(p.outer.edges(), &[Edge::new(0, 1, 5)]);
    }

    #[test]
    fn assemblers_respect_part_order() {
        let g = graph(4, &[(1, 0, 1), (2, 3, 1), (3, 1, 7)]);
        let c = Coloring { count: 2, color: vec![0, 0, 1, 1] };
        let p = partition(&g, &c);
        let sols = vec![vec![1, 0], vec![0, 1]];
        assert_eq!(default_assemble(4, &p, &sols), vec![1, 0, 2, 3]);
        // the quotient has the single arc 1 -> 0, so the trivial solver reverses
        let rank = hybrid_assemble(4, &p, &sols, &trivial);
        assert_eq!(rank, vec![3, 2, 0, 1]);
        assert_eq!(fas_weight(&g, &rank).unwrap(), 0);
    }

    #[test]
    fn interleave_finds_the_best_merge() {
        // a = [0, 1], b = [2, 3]; 0 -> 2, 2 -> 1 and 1 -> 3 force 0, 2, 1, 3
        let g = graph(4, &[(0, 1, 1), (2, 3, 1), (2, 1, 5), (1, 3, 5), (0, 2, 1)]);
        assert_eq!(interleave(&g, &[0, 1], &[2, 3]), vec![0, 2, 1, 3]);
        assert_eq!(interleave(&g, &[], &[2, 3]), vec![2, 3]);
        assert_eq!(interleave(&g, &[0, 1], &[]), vec![0, 1]);
    }

    #[test]
    fn interleaving_stays_within_the_pair_budget() {
        let g = graph(4, &[(0, 1, 1), (2, 3, 1), (2, 1, 5), (1, 3, 5), (0, 2, 1)]);
        let p = partition(&g, &Coloring { count: 2, color: vec![0, 0, 1, 1] });
        let sols = vec![vec![0, 1], vec![0, 1]];
        assert_eq!(interleave_assemble(&g, &p, &sols, &trivial, 4), vec![0, 2, 1, 3]);
        assert_eq!(interleave_assemble(&g, &p, &sols, &trivial, 3), vec![0, 1, 2, 3]);

        let tight = GreedyDecomposer { max_dp_pairs: 3, ..GreedyDecomposer::new(Assembly::Interleave) };
        let loose = GreedyDecomposer::new(Assembly::Interleave);
        assert_eq!(tight.assemble(&g, &p, &sols), vec![0, 1, 2, 3]);
        assert_eq!(loose.assemble(&g, &p, &sols), vec![0, 2, 1, 3]);
    }

    #[test]
    fn greedy_decomposer_splits_in_two() {
        let g = two_triangles();
        let p = GreedyDecomposer::default().decompose(&g);
        assert_eq!(p.parts.len(), 2);
        let sizes: Vec<usize> = p.parts.iter().map(|x| x.ids.len()).collect();
        assert!(sizes.iter().all(|&s| (2..=4).contains(&s)));
        assert_eq!(sizes.iter().sum::<usize>(), 6);
    }

    #[test]
    fn recursion_beats_trivial_and_keeps_dags_acyclic() {
        let g = two_triangles();
        let scc = SccDecomposer;
        let dc = GreedyDecomposer::default();
        let dp = GreedyDecomposer::new(Assembly::Interleave);
        for d in [&dc as &dyn Decomposer, &dp] {
            let rank = recurse(&g, &trivial, 1, &[&scc as &dyn Decomposer, d]);
            assert!(is_permutation(&rank));
            assert!(fas_weight(&g, &rank).unwrap() <= fas_weight(&g, &trivial(&g)).unwrap());
        }
        let dag = graph(5, &(0..5).flat_map(|i| (i + 1..5).map(move |j| (i, j, 1))).collect::<Vec<_>>());
        let rank = recurse(&dag, &trivial, 1, &[&scc as &dyn Decomposer, &dc]);
        assert_eq!(fas_weight(&dag, &rank).unwrap(), 0);
    }

    #[test]
    fn stalling_decomposers_fall_back_to_base() {
        let g = graph(3, &[(0, 1, 1), (1, 2, 1), (2, 0, 1)]);
        let rank = recurse(&g, &greedy, 1, &[&SccDecomposer as &dyn Decomposer]);
        assert_eq!(fas_weight(&g, &rank).unwrap(), 1);
        assert_eq!(recurse(&g, &greedy, 1, &[]), greedy(&g));
        assert!(recurse(&CsrGraph::default(), &greedy, 1, &[&SccDecomposer as &dyn Decomposer]).is_empty());
    }
}
