use std::fmt;
use std::str::FromStr;
use log::{debug, info};
use crate::error::{FasError, Result};
use crate::graph::{CsrGraph, Edge, Weight};
use crate::hcs;
use crate::heuristic::{greedy, trivial};
use crate::recursive::{self, Assembly, Decomposer, GreedyDecomposer, SccDecomposer};
use crate::reduction::{Contraction, ReductionReport, Reducer};
use crate::scc::{self, Coloring};
use crate::solution::Solution;

/// A complete solving pipeline, selected by name on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Trivial,
    Greedy,
    SccGreedy,
    Scc2CycGreedy,
    Scc2CycChainGreedy,
    RedGreedy,
    RedStarGreedy,
    HcsGreedy,
    /// Hybrid reduction with greedy bisection; the balance is at least 1.
    Ras(usize),
    RasStar,
    GreedyDc,
    GreedyDp,
}

impl FromStr for Algorithm {
    type Err = FasError;

    fn from_str(s: &str) -> Result<Algorithm> {
        let alg = match s {
            "Trivial" => Algorithm::Trivial,
            "Greedy" => Algorithm::Greedy,
            "scc+Greedy" => Algorithm::SccGreedy,
            "scc+2cyc+Greedy" => Algorithm::Scc2CycGreedy,
            "scc+2cyc+chain+Greedy" => Algorithm::Scc2CycChainGreedy,
            "RED+Greedy" => Algorithm::RedGreedy,
            "REDstar+Greedy" => Algorithm::RedStarGreedy,
            "HCS+Greedy" => Algorithm::HcsGreedy,
            "RASstar" => Algorithm::RasStar,
            "GreedyDC" => Algorithm::GreedyDc,
            "GreedyDP" => Algorithm::GreedyDp,
            _ => match s.strip_prefix("RAS").and_then(|p| p.parse::<usize>().ok()) {
                Some(p) if p >= 1 => Algorithm::Ras(p),
                _ => return Err(FasError::UnknownAlgorithm(s.to_string())),
            },
        };
        Ok(alg)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Algorithm::Trivial => write!(f, "Trivial"),
            Algorithm::Greedy => write!(f, "Greedy"),
            Algorithm::SccGreedy => write!(f, "scc+Greedy"),
            Algorithm::Scc2CycGreedy => write!(f, "scc+2cyc+Greedy"),
            Algorithm::Scc2CycChainGreedy => write!(f, "scc+2cyc+chain+Greedy"),
            Algorithm::RedGreedy => write!(f, "RED+Greedy"),
            Algorithm::RedStarGreedy => write!(f, "REDstar+Greedy"),
            Algorithm::HcsGreedy => write!(f, "HCS+Greedy"),
            Algorithm::Ras(p) => write!(f, "RAS{}", p),
            Algorithm::RasStar => write!(f, "RASstar"),
            Algorithm::GreedyDc => write!(f, "GreedyDC"),
            Algorithm::GreedyDp => write!(f, "GreedyDP"),
        }
    }
}

impl Algorithm {
    /// Every named pipeline, with `RAS` at a few typical balances.
    pub fn all() -> Vec<Algorithm> {
        let mut all = vec![
            Algorithm::Trivial,
            Algorithm::Greedy,
            Algorithm::SccGreedy,
            Algorithm::Scc2CycGreedy,
            Algorithm::Scc2CycChainGreedy,
            Algorithm::RedGreedy,
            Algorithm::RedStarGreedy,
            Algorithm::HcsGreedy,
        ];
        all.extend([2, 3, 4, 8].map(Algorithm::Ras));
        all.extend([Algorithm::RasStar, Algorithm::GreedyDc, Algorithm::GreedyDp]);
        all
    }

    pub fn solve(&self, g: &CsrGraph) -> Solution {
        info!("running {} on {} vertices, {} edges", self, g.num_vertices(), g.num_edges());
        match *self {
            Algorithm::Trivial => trivial(g),
            Algorithm::Greedy => greedy(g),
            Algorithm::SccGreedy => {
                let scc = SccDecomposer;
                let p = scc.decompose(g);
                debug!("{} strongly connected components", p.parts.len());
                let solutions: Vec<Solution> = p.parts.iter().map(|part| greedy(&part.graph)).collect();
                scc.assemble(g, &p, &solutions)
            }
            Algorithm::Scc2CycGreedy => Reducer::new(Contraction::None, false).solve(g, &greedy),
            Algorithm::Scc2CycChainGreedy => Reducer::new(Contraction::ChainOnly, false).solve(g, &greedy),
            Algorithm::RedGreedy => Reducer::new(Contraction::Full, false).solve(g, &greedy),
            Algorithm::RedStarGreedy => Reducer::new(Contraction::Full, true).solve(g, &greedy),
            Algorithm::HcsGreedy => hcs::solve(g, &greedy),
            Algorithm::Ras(p) => Reducer::new(Contraction::Full, false).solve_hybrid(g, Some(p)),
            Algorithm::RasStar => Reducer::new(Contraction::Full, true).solve_hybrid(g, Some(3)),
            Algorithm::GreedyDc => {
                let dc = GreedyDecomposer::new(Assembly::Hybrid);
                let decomposers: [&dyn Decomposer; 2] = [&SccDecomposer, &dc];
                recursive::recurse(g, &trivial, 1, &decomposers)
            }
            Algorithm::GreedyDp => {
                let dp = GreedyDecomposer::new(Assembly::Interleave);
                let decomposers: [&dyn Decomposer; 2] = [&SccDecomposer, &dp];
                recursive::recurse(g, &trivial, 1, &decomposers)
            }
        }
    }
}

/// Reductions whose leftovers `reduction_stats` can measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionKey {
    Loops,
    Scc,
    Scc2Cyc,
    Scc2CycChain,
    Red,
    RedStar,
    Hcs,
}

impl FromStr for ReductionKey {
    type Err = FasError;

    fn from_str(s: &str) -> Result<ReductionKey> {
        match s {
            "loops" => Ok(ReductionKey::Loops),
            "scc" => Ok(ReductionKey::Scc),
            "scc+2cyc" => Ok(ReductionKey::Scc2Cyc),
            "scc+2cyc+chain" => Ok(ReductionKey::Scc2CycChain),
            "RED" => Ok(ReductionKey::Red),
            "REDstar" => Ok(ReductionKey::RedStar),
            "HCS" => Ok(ReductionKey::Hcs),
            _ => Err(FasError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Edges and weight a base solver would still have to look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionStats {
    pub edges: usize,
    pub weight: Weight,
}

impl From<ReductionReport> for ReductionStats {
    fn from(r: ReductionReport) -> ReductionStats {
        ReductionStats { edges: r.residual_edges, weight: r.residual_weight }
    }
}

fn inner_edges(g: &CsrGraph, coloring: &Coloring) -> ReductionStats {
    let color = &coloring.color;
    let mut stats = ReductionStats::default();
    for e in g.edges().iter().filter(|e| color[e.src] == color[e.dst]) {
        stats.edges += 1;
        stats.weight += e.weight;
    }
    stats
}

/// Nets every pair of opposite edges into one edge carrying the difference.
/// Self-loops and fully cancelled pairs disappear.
pub fn net_two_cycles(g: &CsrGraph) -> CsrGraph {
    let n = g.num_vertices();
    // orient every edge low -> high, remembering the direction in the sign
    let mut signed: Vec<(usize, usize, i128)> = Vec::with_capacity(g.num_edges());
    for e in g.edges() {
        if e.src < e.dst {
            signed.push((e.src, e.dst, e.weight as i128));
        } else if e.src > e.dst {
            signed.push((e.dst, e.src, -(e.weight as i128)));
        }
    }
    signed.sort_unstable_by_key(|&(u, v, _)| (u, v));
    let mut edges = Vec::new();
    for chunk in signed.chunk_by(|a, b| (a.0, a.1) == (b.0, b.1)) {
        let (u, v, _) = chunk[0];
        let w: i128 = chunk.iter().map(|&(_, _, w)| w).sum();
        if w > 0 {
            edges.push(Edge::new(u, v, w as Weight));
        } else if w < 0 {
            edges.push(Edge::new(v, u, (-w) as Weight));
        }
    }
    CsrGraph::new(n, edges)
}

/// Measures how much of `g` survives the reduction named by `key`.
pub fn reduction_stats(g: &CsrGraph, key: ReductionKey) -> ReductionStats {
    let stats = match key {
        ReductionKey::Loops => {
            let mut stats = ReductionStats { edges: g.num_edges(), weight: g.edge_weight_sum() };
            for e in g.edges().iter().filter(|e| e.src == e.dst) {
                stats.edges -= 1;
                stats.weight -= e.weight;
            }
            stats
        }
        ReductionKey::Scc => inner_edges(g, &scc::strongly_connected_components(g)),
        ReductionKey::Scc2Cyc => inner_edges(g, &scc::strongly_connected_components(&net_two_cycles(g))),
        ReductionKey::Scc2CycChain => Reducer::new(Contraction::ChainOnly, false).run(g, &trivial).1.into(),
        ReductionKey::Red => Reducer::new(Contraction::Full, false).run(g, &trivial).1.into(),
        ReductionKey::RedStar => Reducer::new(Contraction::Full, true).run(g, &trivial).1.into(),
        ReductionKey::Hcs => hcs::run(g, &trivial).1.into(),
    };
    debug!("{:?}: {} edges, weight {} left", key, stats.edges, stats.weight);
    stats
}
