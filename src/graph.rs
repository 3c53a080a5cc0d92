use std::collections::VecDeque;
use itertools::Itertools;
use crate::error::{FasError, Result};
use crate::histogram;
use crate::scc::Coloring;

// This module contains the immutable graph representation.
// Vertices are dense ids 0..n, edges are (src, dst, weight) records.

pub type Weight = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub src: usize,
    pub dst: usize,
    pub weight: Weight,
}

impl Edge {
    pub fn new(src: usize, dst: usize, weight: Weight) -> Edge {
        Edge { src, dst, weight }
    }
}

/// Read access to a weighted digraph, shared by `CsrGraph` and the group views
/// of the reduction engine so the greedy orderer can run on either.
pub trait Digraph {
    fn num_vertices(&self) -> usize;
    /// Outgoing arcs of `u` as `(dst, weight)`.
    fn out_arcs(&self, u: usize) -> impl Iterator<Item = (usize, Weight)> + '_;
    /// Incoming arcs of `u` as `(src, weight)`.
    fn in_arcs(&self, u: usize) -> impl Iterator<Item = (usize, Weight)> + '_;
}

/// Immutable multigraph in compressed sparse row form.
///
/// Edges are stored twice: grouped by source (each group sorted by destination)
/// and grouped by destination (each group sorted by source). Both layouts are
/// produced by counting sorts, so construction is O(n + m). Zero-weight edges
/// are dropped. Endpoints must be `< n`; this is not checked here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrGraph {
    n: usize,
    out_offsets: Vec<usize>,
    out_edges: Vec<Edge>,
    in_offsets: Vec<usize>,
    in_edges: Vec<Edge>,
}

impl CsrGraph {
    pub fn new(n: usize, edges: impl IntoIterator<Item = Edge>) -> CsrGraph {
        let edges = edges.into_iter().filter(|e| e.weight > 0).collect_vec();
        let (_, by_dst) = histogram::counting_sort(&edges, n, |e| e.dst);
        let (out_offsets, out_edges) = histogram::counting_sort(&by_dst, n, |e| e.src);
        let (in_offsets, in_edges) = histogram::counting_sort(&out_edges, n, |e| e.dst);
        CsrGraph { n, out_offsets, out_edges, in_offsets, in_edges }
    }

    /// Like `new`, but rejects edges with an endpoint outside `0..n`.
    pub fn try_new(n: usize, edges: Vec<Edge>) -> Result<CsrGraph> {
        if let Some(e) = edges.iter().find(|e| e.src >= n || e.dst >= n) {
            return Err(FasError::VertexOutOfRange { vertex: e.src.max(e.dst), n });
        }
        Ok(CsrGraph::new(n, edges))
    }

    pub fn num_vertices(&self) -> usize {
        self.n
    }

    pub fn num_edges(&self) -> usize {
        self.out_edges.len()
    }

    /// All edges, grouped by source and sorted by destination within a group.
    pub fn edges(&self) -> &[Edge] {
        &self.out_edges
    }

    pub fn out_edges(&self, v: usize) -> &[Edge] {
        &self.out_edges[self.out_offsets[v]..self.out_offsets[v + 1]]
    }

    pub fn in_edges(&self, v: usize) -> &[Edge] {
        &self.in_edges[self.in_offsets[v]..self.in_offsets[v + 1]]
    }

    pub fn edge_weight_sum(&self) -> Weight {
        self.out_edges.iter().map(|e| e.weight).sum()
    }

    /// Rebuilds the graph with every vertex `v` renamed to `id[v]`.
    pub fn relabel(&self, id: &[usize]) -> CsrGraph {
        let edges = self.out_edges.iter().map(|e| Edge::new(id[e.src], id[e.dst], e.weight));
        CsrGraph::new(self.n, edges)
    }
}

impl Digraph for CsrGraph {
    fn num_vertices(&self) -> usize {
        self.n
    }

    fn out_arcs(&self, u: usize) -> impl Iterator<Item = (usize, Weight)> + '_ {
        self.out_edges(u).iter().map(|e| (e.dst, e.weight))
    }

    fn in_arcs(&self, u: usize) -> impl Iterator<Item = (usize, Weight)> + '_ {
        self.in_edges(u).iter().map(|e| (e.src, e.weight))
    }
}

/// Sorts `edges` by (src, dst) and sums the weights of parallel edges.
/// All endpoints must be `< n`.
pub fn merge_parallel_edges(edges: &[Edge], n: usize) -> Vec<Edge> {
    let (_, by_dst) = histogram::counting_sort(edges, n, |e| e.dst);
    let (_, sorted) = histogram::counting_sort(&by_dst, n, |e| e.src);
    sorted
        .into_iter()
        .coalesce(|a, b| {
            if a.src == b.src && a.dst == b.dst {
                Ok(Edge::new(a.src, a.dst, a.weight + b.weight))
            } else {
                Err((a, b))
            }
        })
        .collect()
}

/// Quotient graph: one vertex per color, edges between distinct colors merged.
pub fn coalesce(g: &CsrGraph, coloring: &Coloring) -> CsrGraph {
    let color = &coloring.color;
    let edges = g
        .edges()
        .iter()
        .filter(|e| color[e.src] != color[e.dst])
        .map(|e| Edge::new(color[e.src], color[e.dst], e.weight))
        .collect_vec();
    CsrGraph::new(coloring.count, merge_parallel_edges(&edges, coloring.count))
}

/// Returns a topological ordering of `g` as a vertex sequence, or `None` if `g`
/// has a cycle (self-loops included).
pub fn top_ordering(g: &CsrGraph) -> Option<Vec<usize>> {
    let n = g.num_vertices();
    let mut indeg = vec![0usize; n];
    for e in g.edges() {
        indeg[e.dst] += 1;
    }
    let mut q: VecDeque<usize> = (0..n).filter(|&u| indeg[u] == 0).collect();
    let mut ord = Vec::with_capacity(n);
    while let Some(u) = q.pop_front() {
        ord.push(u);
        for e in g.out_edges(u) {
            indeg[e.dst] -= 1;
            if indeg[e.dst] == 0 {
                q.push_back(e.dst);
            }
        }
    }
    if ord.len() == n {
        Some(ord)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsrGraph {
        CsrGraph::new(4, vec![
            Edge::new(2, 1, 3),
            Edge::new(0, 3, 1),
            Edge::new(0, 1, 2),
            Edge::new(3, 0, 4),
            Edge::new(0, 1, 5),
            Edge::new(1, 1, 0),
        ])
    }

    #[test]
    fn adjacency_is_grouped_and_sorted() {
        let g = sample();
        assert_eq!(g.num_vertices(), 4);
        assert_eq!(g.num_edges(), 5);
        let out0 = g.out_edges(0).iter().map(|e| (e.dst, e.weight)).collect_vec();
        assert_eq!(out0, vec![(1, 2), (1, 5), (3, 1)]);
        let in1 = g.in_edges(1).iter().map(|e| (e.src, e.weight)).collect_vec();
        assert_eq!(in1, vec![(0, 2), (0, 5), (2, 3)]);
        assert!(g.out_edges(1).is_empty());
        assert_eq!(g.edge_weight_sum(), 15);
    }

    #[test]
    fn in_and_out_views_agree() {
        let g = sample();
        let mut from_in = (0..4).flat_map(|v| g.in_edges(v).iter().copied()).collect_vec();
        let mut from_out = g.edges().to_vec();
        from_in.sort_by_key(|e| (e.src, e.dst, e.weight));
        from_out.sort_by_key(|e| (e.src, e.dst, e.weight));
        assert_eq!(from_in, from_out);
    }

    #[test]
    fn merge_sums_parallel_edges() {
        let merged = merge_parallel_edges(sample().edges(), 4);
        assert_eq!(merged, vec![
            Edge::new(0, 1, 7),
            Edge::new(0, 3, 1),
            Edge::new(2, 1, 3),
            Edge::new(3, 0, 4),
        ]);
    }

    #[test]
    fn relabel_and_coalesce() {
        let g = sample();
        let h = g.relabel(&[3, 2, 1, 0]);
        assert_eq!(h.out_edges(3).len(), 3);
        assert_eq!(h.out_edges(0)[0], Edge::new(0, 3, 4));

        let c = Coloring { count: 2, color: vec![0, 1, 1, 0] };
        let q = coalesce(&g, &c);
        assert_eq!(q.edges(), &[Edge::new(0, 1, 7)]);
    }

    #[test]
    fn try_new_checks_endpoints() {
        assert!(CsrGraph::try_new(2, vec![Edge::new(0, 1, 1)]).is_ok());
        assert!(matches!(
            CsrGraph::try_new(2, vec![Edge::new(0, 2, 1)]),
            Err(FasError::VertexOutOfRange { vertex: 2, n: 2 })
        ));
    }

    #[test]
    fn top_ordering_detects_cycles() {
        let dag = CsrGraph::new(3, vec![Edge::new(2, 0, 1), Edge::new(0, 1, 1)]);
        assert_eq!(top_ordering(&dag), Some(vec![2, 0, 1]));
        assert_eq!(top_ordering(&sample()), None);
        assert_eq!(top_ordering(&CsrGraph::new(0, vec![])), Some(vec![]));
    }
}
