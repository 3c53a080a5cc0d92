use std::cmp;
use std::collections::{BinaryHeap, VecDeque};
use log::{debug, trace};
use crate::dynamic::{Group, WorkingGraph};
use crate::graph::{CsrGraph, Digraph, Weight};
use crate::heuristic::{greedy_order, Selection};
use crate::solution::{Solution, Solver};

/// Which contractions the reducer performs before splitting a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Contraction {
    /// None; only the netting of opposite arcs on construction.
    None,
    /// Bypass every vertex with exactly one in-arc and one out-arc.
    ChainOnly,
    /// Every safe contraction, found incrementally.
    #[default]
    Full,
}

/// Counters collected over one reducer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionReport {
    pub contractions: usize,
    pub groups: usize,
    pub bisections: usize,
    /// Graphs handed to the base solver and their total size.
    pub solved: usize,
    pub residual_edges: usize,
    pub residual_weight: Weight,
}

/// Arc contraction engine.
///
/// A vertex whose only out-arc `(u, v, w)` satisfies
/// `w >= min(in_sum(u), out_sum(v))` can be merged into `v` without making
/// the optimum worse, and symmetrically for a vertex with a single in-arc.
/// The reducer applies such contractions until none is left, splits the
/// residual group into strongly connected components and either works on
/// the components again (`recurse_scc`) or hands each of them to a base
/// solver. Positions are produced left to right, so the component order of
/// every split is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reducer {
    pub contraction: Contraction,
    pub recurse_scc: bool,
}

impl Default for Reducer {
    fn default() -> Reducer {
        Reducer { contraction: Contraction::Full, recurse_scc: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Normal,
    InQueue,
    Deleted,
}

// (weight, other endpoint) of a vertex's only arc in one direction
type Candidate = Option<(Weight, usize)>;

struct Engine {
    wg: WorkingGraph,
    status: Vec<Status>,
    queue: VecDeque<usize>,
    // out_heap[v] holds (w, u) for vertices u whose only out-arc is (u, v, w)
    out_heap: Vec<BinaryHeap<(Weight, usize)>>,
    in_heap: Vec<BinaryHeap<(Weight, usize)>>,
    out_cand: Vec<Candidate>,
    in_cand: Vec<Candidate>,
    report: ReductionReport,
}

impl Engine {
    fn new(g: &CsrGraph) -> Engine {
        let n = g.num_vertices();
        Engine {
            wg: WorkingGraph::new(g, true),
            status: vec![Status::Normal; n],
            queue: VecDeque::new(),
            out_heap: vec![BinaryHeap::new(); n],
            in_heap: vec![BinaryHeap::new(); n],
            out_cand: vec![None; n],
            in_cand: vec![None; n],
            report: ReductionReport::default(),
        }
    }

    fn out_candidate(&self, u: usize) -> Candidate {
        self.wg.sole_out(u).map(|(v, w)| (w, v))
    }

    fn in_candidate(&self, u: usize) -> Candidate {
        self.wg.sole_in(u).map(|(v, w)| (w, v))
    }

    /// Target of a safe contraction along the only out-arc of `u`.
    fn out_contractible(&self, u: usize) -> Option<usize> {
        let (v, w) = self.wg.sole_out(u)?;
        (w >= cmp::min(self.wg.in_sum(u), self.wg.out_sum(v))).then_some(v)
    }

    /// Source of a safe contraction along the only in-arc of `u`.
    fn in_contractible(&self, u: usize) -> Option<usize> {
        let (p, w) = self.wg.sole_in(u)?;
        (w >= cmp::min(self.wg.out_sum(u), self.wg.in_sum(p))).then_some(p)
    }

    fn enqueue(&mut self, u: usize) {
        if self.status[u] == Status::Normal {
            self.queue.push_back(u);
            self.status[u] = Status::InQueue;
        }
    }

    /// Registers the current candidates of `u` with the heaps of their
    /// other endpoints.
    fn refresh(&mut self, u: usize) {
        let oc = self.out_candidate(u);
        if let Some((w, v)) = oc {
            if self.out_cand[u] != oc {
                self.out_heap[v].push((w, u));
            }
        }
        self.out_cand[u] = oc;
        let ic = self.in_candidate(u);
        if let Some((w, v)) = ic {
            if self.in_cand[u] != ic {
                self.in_heap[v].push((w, u));
            }
        }
        self.in_cand[u] = ic;
    }

    /// Enqueues `u` and every registered neighbour that may have become
    /// contractible after the weight sums of `u` changed.
    fn scan(&mut self, u: usize) {
        if self.out_contractible(u).is_some() || self.in_contractible(u).is_some() {
            self.enqueue(u);
        }
        while let Some(&(w, v)) = self.out_heap[u].peek() {
            let live = self.status[v] == Status::Normal
                && self.out_cand[v] == Some((w, u))
                && self.out_candidate(v) == self.out_cand[v];
            if live {
                if w < self.wg.out_sum(u) {
                    break;
                }
                self.enqueue(v);
            }
            self.out_heap[u].pop();
            if self.out_cand[v] == Some((w, u)) {
                self.out_cand[v] = None;
            }
        }
        while let Some(&(w, v)) = self.in_heap[u].peek() {
            let live = self.status[v] == Status::Normal
                && self.in_cand[v] == Some((w, u))
                && self.in_candidate(v) == self.in_cand[v];
            if live {
                if w < self.wg.in_sum(u) {
                    break;
                }
                self.enqueue(v);
            }
            self.in_heap[u].pop();
            if self.in_cand[v] == Some((w, u)) {
                self.in_cand[v] = None;
            }
        }
    }

    /// Contracts the arc `(u, v)`. The endpoint with fewer arcs is absorbed.
    fn contract(&mut self, u: usize, v: usize) {
        self.wg.del_arc(u, v);
        let deg = |x: usize| self.wg.out_degree(x) + self.wg.in_degree(x);
        let (gone, kept) = if deg(u) > deg(v) {
            self.wg.append_list(u, v);
            (v, u)
        } else {
            self.wg.prepend_list(v, u);
            (u, v)
        };
        let (outs, ins) = self.wg.detach(gone);
        self.status[gone] = Status::Deleted;
        self.out_heap[gone].clear();
        self.in_heap[gone].clear();
        for &(x, w) in &outs {
            self.wg.add_arc(kept, x, w);
        }
        for &(x, w) in &ins {
            self.wg.add_arc(x, kept, w);
        }
        for &(x, _) in outs.iter().chain(&ins) {
            self.refresh(x);
        }
        self.refresh(kept);
        for &(x, _) in outs.iter().chain(&ins) {
            self.scan(x);
        }
        self.scan(kept);
        self.report.contractions += 1;
    }

    fn compact(&mut self, group: Group) -> Group {
        let status = &self.status;
        self.wg.retain(group, |u| status[u] != Status::Deleted)
    }

    fn reduce(&mut self, group: Group) -> Group {
        let members = self.wg.members(&group).to_vec();
        for &u in &members {
            self.refresh(u);
        }
        for &u in &members {
            self.scan(u);
        }
        while let Some(u) = self.queue.pop_front() {
            if self.status[u] == Status::Deleted {
                continue;
            }
            self.status[u] = Status::Normal;
            if let Some(p) = self.in_contractible(u) {
                self.contract(p, u);
            } else if let Some(s) = self.out_contractible(u) {
                self.contract(u, s);
            } else {
                self.refresh(u);
            }
        }
        self.compact(group)
    }

    fn contract_chains(&mut self, group: Group) -> Group {
        let members = self.wg.members(&group).to_vec();
        for u in members {
            let (Some((pred, w1)), Some((succ, w2))) = (self.wg.sole_in(u), self.wg.sole_out(u)) else {
                continue;
            };
            self.wg.del_arc(pred, u);
            self.wg.del_arc(u, succ);
            self.wg.add_arc(pred, succ, cmp::min(w1, w2));
            if w1 < w2 {
                self.wg.prepend_list(succ, u);
            } else {
                self.wg.append_list(pred, u);
            }
            self.status[u] = Status::Deleted;
            self.report.contractions += 1;
        }
        self.compact(group)
    }

    fn shrink(&mut self, group: Group, contraction: Contraction) -> Group {
        match contraction {
            Contraction::None => group,
            Contraction::ChainOnly => self.contract_chains(group),
            Contraction::Full => self.reduce(group),
        }
    }

    fn components(&mut self, group: Group) -> Vec<Group> {
        let count = self.wg.scc(&group);
        self.wg.split(group, count)
    }

    fn solve_part<S: Solver + ?Sized>(&mut self, part: &Group, solver: &S) {
        let (m, w) = self.wg.emit_solved(part, solver);
        trace!("solved group of {} vertices, {} arcs", part.len(), m);
        self.report.solved += 1;
        self.report.residual_edges += m;
        self.report.residual_weight += w;
    }

    fn bisect(&mut self, part: Group, balance: Option<usize>) -> Vec<Group> {
        let sides: Vec<(usize, usize)> = {
            let view = self.wg.view(&part);
            let rank = greedy_order(&view, Selection::Absolute).rank;
            let pos = cut_position(&view, &rank, balance);
            rank.iter().enumerate().map(|(i, &r)| (view.global(i), usize::from(r > pos))).collect()
        };
        for (u, side) in sides {
            self.wg.set_color(u, side);
        }
        self.report.bisections += 1;
        self.wg.split(part, 2)
    }
}

/// Chooses where to cut the order `rank` of `g` in two: after position `pos`
/// such that the weight of backward arcs jumping over the cut is smallest.
/// With a balance `p`, only cuts leaving at least `n / p` vertices on both
/// sides are eligible. Without an eligible cut the middle is taken.
pub fn cut_position<G: Digraph>(g: &G, rank: &[usize], balance: Option<usize>) -> usize {
    let n = g.num_vertices();
    if n < 2 {
        return 0;
    }
    let mut starts: Vec<Weight> = vec![0; n];
    let mut ends: Vec<Weight> = vec![0; n];
    for u in 0..n {
        for (v, w) in g.out_arcs(u) {
            if rank[u] >= rank[v] {
                starts[rank[v]] += w;
                ends[rank[u]] += w;
            }
        }
    }
    let mut cut: Weight = 0;
    let mut best: Option<(usize, Weight)> = None;
    for i in 0..n - 1 {
        cut = cut + starts[i] - ends[i];
        let eligible = balance.map_or(true, |p| cmp::min(i + 1, n - i - 1).checked_mul(p).map_or(true, |x| x >= n));
        if eligible && best.map_or(true, |(_, bw)| cut < bw) {
            best = Some((i, cut));
        }
    }
    // both halves must be non-empty, so never cut after the last vertex
    best.map_or(cmp::min(n / 2, n - 2), |(i, _)| i)
}

impl Reducer {
    pub fn new(contraction: Contraction, recurse_scc: bool) -> Reducer {
        Reducer { contraction, recurse_scc }
    }

    /// Reduces `g` and orders every residual group with `solver`.
    pub fn solve<S: Solver + ?Sized>(&self, g: &CsrGraph, solver: &S) -> Solution {
        self.run(g, solver).0
    }

    pub fn run<S: Solver + ?Sized>(&self, g: &CsrGraph, solver: &S) -> (Solution, ReductionReport) {
        let mut engine = Engine::new(g);
        let mut work = vec![engine.wg.root()];
        while let Some(group) = work.pop() {
            if group.is_empty() {
                continue;
            }
            engine.report.groups += 1;
            let group = engine.shrink(group, self.contraction);
            let parts = engine.components(group);
            if self.recurse_scc && parts.len() > 1 {
                work.extend(parts.into_iter().rev());
            } else {
                for part in &parts {
                    engine.solve_part(part, solver);
                }
            }
        }
        debug!("reduction: {:?}", engine.report);
        (engine.wg.into_solution(), engine.report)
    }

    /// Divide and conquer without a base solver: every residual component is
    /// ordered by the greedy heuristic and cut in two at the cheapest
    /// eligible position (see `cut_position`), until single vertices remain.
    pub fn solve_hybrid(&self, g: &CsrGraph, balance: Option<usize>) -> Solution {
        let mut engine = Engine::new(g);
        let mut work = vec![engine.wg.root()];
        while let Some(group) = work.pop() {
            match group.len() {
                0 => continue,
                1 => {
                    let u = engine.wg.members(&group)[0];
                    engine.wg.emit(u);
                    continue;
                }
                _ => {}
            }
            engine.report.groups += 1;
            let group = engine.shrink(group, self.contraction);
            let parts = engine.components(group);
            if self.recurse_scc && parts.len() > 1 {
                work.extend(parts.into_iter().rev());
                continue;
            }
            let mut next = Vec::with_capacity(2 * parts.len());
            for part in parts {
                if part.len() > 1 {
                    next.extend(engine.bisect(part, balance));
                } else {
                    next.push(part);
                }
            }
            work.extend(next.into_iter().rev());
        }
        debug!("hybrid reduction (balance {:?}): {:?}", balance, engine.report);
        engine.wg.into_solution()
    }

    /// Runs one contraction pass over the whole graph and returns the
    /// contraction lists of the surviving vertices.
    pub fn contraction_classes(&self, g: &CsrGraph) -> Vec<Vec<usize>> {
        let mut engine = Engine::new(g);
        let root = engine.wg.root();
        let group = engine.shrink(root, self.contraction);
        engine.wg.members(&group).iter().map(|&u| engine.wg.list(u).collect()).collect()
    }
}
