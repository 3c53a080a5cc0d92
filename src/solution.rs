use bit_set::BitSet;
use crate::error::{FasError, Result};
use crate::graph::{CsrGraph, Edge, Weight};

/// `rank[v]` is the position of vertex `v` in the linear order.
pub type Solution = Vec<usize>;

/// Anything that orders the vertices of a graph.
pub trait Solver {
    fn solve(&self, g: &CsrGraph) -> Solution;
}

impl<F: Fn(&CsrGraph) -> Solution> Solver for F {
    fn solve(&self, g: &CsrGraph) -> Solution {
        self(g)
    }
}

/// Inverts a permutation. Turns a rank array into the vertex sequence and back.
pub fn inverse(a: &[usize]) -> Vec<usize> {
    let mut b = vec![0; a.len()];
    for (i, &x) in a.iter().enumerate() {
        b[x] = i;
    }
    b
}

pub fn is_permutation(rank: &[usize]) -> bool {
    let n = rank.len();
    let mut seen = BitSet::with_capacity(n);
    rank.iter().all(|&r| r < n && seen.insert(r))
}

fn check_len(g: &CsrGraph, rank: &[usize]) -> Result<()> {
    if rank.len() != g.num_vertices() {
        return Err(FasError::InvalidSolution { expected: g.num_vertices(), found: rank.len() });
    }
    Ok(())
}

/// Total weight of the edges `(u, v)` with `rank[u] >= rank[v]`.
pub fn fas_weight(g: &CsrGraph, rank: &[usize]) -> Result<Weight> {
    check_len(g, rank)?;
    Ok(g.edges().iter().filter(|e| rank[e.src] >= rank[e.dst]).map(|e| e.weight).sum())
}

/// Total weight of the edges that point forward in the order.
pub fn lo_weight(g: &CsrGraph, rank: &[usize]) -> Result<Weight> {
    check_len(g, rank)?;
    Ok(g.edges().iter().filter(|e| rank[e.src] < rank[e.dst]).map(|e| e.weight).sum())
}

/// The feedback arc set induced by the order: every backward edge.
pub fn backward_edges(g: &CsrGraph, rank: &[usize]) -> Result<Vec<Edge>> {
    check_len(g, rank)?;
    Ok(g.edges().iter().filter(|e| rank[e.src] >= rank[e.dst]).copied().collect())
}
