use rand::distributions::{Distribution, Uniform};
use rand::seq::SliceRandom;
use rand::Rng;
use crate::graph::{Edge, Weight};
use crate::solution::Solution;

/// Replaces every weight by a uniform draw from `1..=max_weight`.
pub fn randomize_weights<R: Rng>(edges: &mut [Edge], max_weight: Weight, rng: &mut R) {
    let dist = Uniform::new_inclusive(1, max_weight.max(1));
    for e in edges.iter_mut() {
        e.weight = dist.sample(rng);
    }
}

/// Shuffles the edge order and renames vertex `v` to `vertex_map[v]` with a
/// random permutation. Returns the permutation.
pub fn shuffle_vertices<R: Rng>(n: usize, edges: &mut [Edge], rng: &mut R) -> Vec<usize> {
    edges.shuffle(rng);
    let mut vertex_map: Vec<usize> = (0..n).collect();
    vertex_map.shuffle(rng);
    for e in edges.iter_mut() {
        e.src = vertex_map[e.src];
        e.dst = vertex_map[e.dst];
    }
    vertex_map
}

/// Positions of the original vertices, given the positions of the renamed
/// ones.
pub fn restore(rank: &[usize], vertex_map: &[usize]) -> Solution {
    vertex_map.iter().map(|&v| rank[v]).collect()
}
