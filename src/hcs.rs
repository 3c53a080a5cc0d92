use std::cmp;
use bit_set::BitSet;
use log::{debug, trace};
use crate::dynamic::{Group, WorkingGraph};
use crate::graph::CsrGraph;
use crate::reduction::ReductionReport;
use crate::solution::{Solution, Solver};

/// Sweep-based reduction of chains and dominated 2-cycle arcs.
///
/// Unlike `Reducer`, opposite arcs are not netted and no weight sums are
/// consulted. Each sweep walks the group once and
/// - bypasses a vertex with a single in-arc `(p, u, w1)` and a single out-arc
///   `(u, s, w2)`, `p != s`, by an arc `(p, s, min(w1, w2))`;
/// - drops the only out-arc `(u, v)` of a vertex when `(v, u)` is at least as
///   heavy, and the only in-arc symmetrically.
///
/// Sweeps repeat until one changes nothing. The residual group is then split
/// into strongly connected components, which are handled the same way;
/// a group that stays strongly connected goes to the base solver.
struct Hcs {
    wg: WorkingGraph,
    deleted: BitSet,
    report: ReductionReport,
}

impl Hcs {
    fn new(g: &CsrGraph) -> Hcs {
        Hcs {
            wg: WorkingGraph::new(g, false),
            deleted: BitSet::with_capacity(g.num_vertices()),
            report: ReductionReport::default(),
        }
    }

    /// One pass over `members`; returns whether anything changed.
    fn sweep(&mut self, members: &[usize]) -> bool {
        let mut changed = false;
        for &u in members {
            match (self.wg.sole_in(u), self.wg.sole_out(u)) {
                (Some((pred, w1)), Some((succ, w2))) => {
                    if pred == succ {
                        continue;
                    }
                    self.wg.del_arc(pred, u);
                    self.wg.del_arc(u, succ);
                    self.wg.merge_arc(pred, succ, cmp::min(w1, w2));
                    if w1 < w2 {
                        self.wg.prepend_list(succ, u);
                    } else {
                        self.wg.append_list(pred, u);
                    }
                    self.deleted.insert(u);
                    self.report.contractions += 1;
                }
                (None, Some((v, w2))) => {
                    if !self.wg.arc(v, u).is_some_and(|w1| w2 <= w1) {
                        continue;
                    }
                    self.wg.del_arc(u, v);
                }
                (Some((v, w1)), None) => {
                    if !self.wg.arc(u, v).is_some_and(|w2| w1 <= w2) {
                        continue;
                    }
                    self.wg.del_arc(v, u);
                }
                (None, None) => continue,
            }
            changed = true;
        }
        changed
    }

    fn reduce(&mut self, group: Group) -> Group {
        let members = self.wg.members(&group).to_vec();
        let mut sweeps = 0;
        while self.sweep(&members) {
            sweeps += 1;
        }
        trace!("{} sweeps over {} vertices", sweeps, members.len());
        let deleted = &self.deleted;
        self.wg.retain(group, |u| !deleted.contains(u))
    }

    fn run<S: Solver + ?Sized>(mut self, solver: &S) -> (Solution, ReductionReport) {
        let mut work = vec![self.wg.root()];
        while let Some(group) = work.pop() {
            match group.len() {
                0 => continue,
                1 => {
                    let u = self.wg.members(&group)[0];
                    self.wg.emit(u);
                    continue;
                }
                _ => {}
            }
            self.report.groups += 1;
            let group = self.reduce(group);
            let count = self.wg.scc(&group);
            if count > 1 {
                let parts = self.wg.split(group, count);
                work.extend(parts.into_iter().rev());
                continue;
            }
            let (m, w) = self.wg.emit_solved(&group, solver);
            self.report.solved += 1;
            self.report.residual_edges += m;
            self.report.residual_weight += w;
        }
        debug!("hcs reduction: {:?}", self.report);
        (self.wg.into_solution(), self.report)
    }
}

/// Reduces `g` with the sweep rules and orders the residual groups with
/// `solver`.
pub fn solve<S: Solver + ?Sized>(g: &CsrGraph, solver: &S) -> Solution {
    Hcs::new(g).run(solver).0
}

/// Like `solve`, also returning what the reduction left for the solver.
pub fn run<S: Solver + ?Sized>(g: &CsrGraph, solver: &S) -> (Solution, ReductionReport) {
    Hcs::new(g).run(solver)
}
