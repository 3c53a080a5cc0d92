use std::cmp;
use bit_set::BitSet;
use crate::graph::CsrGraph;

/// Partition of the vertices into `count` numbered groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coloring {
    pub count: usize,
    pub color: Vec<usize>,
}

impl Coloring {
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.count];
        for &c in &self.color {
            sizes[c] += 1;
        }
        sizes
    }

    /// Members of each group in increasing id order.
    pub fn classes(&self) -> Vec<Vec<usize>> {
        let mut classes = vec![Vec::new(); self.count];
        for (v, &c) in self.color.iter().enumerate() {
            classes[c].push(v);
        }
        classes
    }
}

const UNVISITED: usize = usize::MAX;

/// Scratch space for an iterative Tarjan search.
///
/// The buffers are sized for the whole vertex universe once and only the
/// entries of the searched vertices are reset per run, so repeated searches
/// over small vertex groups stay proportional to the group size.
pub struct Tarjan {
    index: Vec<usize>,
    low: Vec<usize>,
    on_stack: BitSet,
    stack: Vec<usize>,
    next: usize,
}

impl Tarjan {
    pub fn new(n: usize) -> Tarjan {
        Tarjan {
            index: vec![UNVISITED; n],
            low: vec![UNVISITED; n],
            on_stack: BitSet::with_capacity(n),
            stack: Vec::new(),
            next: 0,
        }
    }

    fn discover(&mut self, u: usize) {
        self.index[u] = self.next;
        self.low[u] = self.next;
        self.next += 1;
        self.stack.push(u);
        self.on_stack.insert(u);
    }

    /// Colors `vertices` by strongly connected component and returns the number
    /// of components. Components are numbered sources first: every arc goes from
    /// a color to an equal or larger one. `successors(u)` must only yield
    /// members of `vertices`.
    pub fn run<F, I>(&mut self, vertices: &[usize], mut successors: F, color: &mut [usize]) -> usize
    where
        F: FnMut(usize) -> I,
        I: Iterator<Item = usize>,
    {
        for &v in vertices {
            self.index[v] = UNVISITED;
        }
        self.next = 0;
        let mut count = 0;
        let mut frames: Vec<(usize, I)> = Vec::new();
        for &root in vertices {
            if self.index[root] != UNVISITED {
                continue;
            }
            self.discover(root);
            frames.push((root, successors(root)));
            while let Some((u, arcs)) = frames.last_mut() {
                let u = *u;
                if let Some(v) = arcs.next() {
                    if self.index[v] == UNVISITED {
                        self.discover(v);
                        frames.push((v, successors(v)));
                    } else if self.on_stack.contains(v) {
                        self.low[u] = cmp::min(self.low[u], self.index[v]);
                    }
                    continue;
                }
                frames.pop();
                if let Some((parent, _)) = frames.last() {
                    let parent = *parent;
                    self.low[parent] = cmp::min(self.low[parent], self.low[u]);
                }
                if self.low[u] == self.index[u] {
                    while let Some(w) = self.stack.pop() {
                        self.on_stack.remove(w);
                        color[w] = count;
                        if w == u {
                            break;
                        }
                    }
                    count += 1;
                }
            }
        }
        // Tarjan finishes sinks first
        for &v in vertices {
            color[v] = count - color[v] - 1;
        }
        count
    }
}

/// Strongly connected components of `g`, numbered sources first.
pub fn strongly_connected_components(g: &CsrGraph) -> Coloring {
    let n = g.num_vertices();
    let vertices: Vec<usize> = (0..n).collect();
    let mut color = vec![0; n];
    let count = Tarjan::new(n).run(&vertices, |u| g.out_edges(u).iter().map(|e| e.dst), &mut color);
    Coloring { count, color }
}
