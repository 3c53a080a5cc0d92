pub mod error;
pub mod histogram;
pub mod graph;
pub mod scc;
pub mod solution;
pub mod heuristic;
pub mod dynamic;
pub mod reduction;
pub mod hcs;
pub mod recursive;
pub mod pipeline;
pub mod io;
pub mod perturb;

// Re-exports to flatten the crate.
pub use error::{FasError, Result};
pub use graph::{CsrGraph, Digraph, Edge, Weight};
pub use scc::Coloring;
pub use solution::{Solution, Solver};
pub use reduction::{Contraction, Reducer, ReductionReport};
pub use recursive::{Decomposer, GreedyDecomposer, SccDecomposer};
pub use pipeline::{Algorithm, ReductionKey, ReductionStats};
pub use io::GraphFormat;
