use std::collections::LinkedList;
use std::mem;
use std::ops::Range;
use rustc_hash::FxHashMap;
use crate::graph::{CsrGraph, Digraph, Edge, Weight};
use crate::histogram;
use crate::scc::Tarjan;
use crate::solution::{self, Solution, Solver};

/// A contiguous range of positions in the member array of a `WorkingGraph`.
pub type Group = Range<usize>;

/// Mutable digraph used by the reduction engines.
///
/// Arcs live in per-vertex hash maps in both directions, so parallel arcs are
/// always merged and self-loops are never stored. Every live vertex owns a
/// contraction list: the input vertices it stands for, in the order they
/// will be placed. Vertices are grouped into disjoint ranges of `members`;
/// arcs never cross two groups that are still pending.
pub struct WorkingGraph {
    fwd: Vec<FxHashMap<usize, Weight>>,
    bwd: Vec<FxHashMap<usize, Weight>>,
    out_sum: Vec<Weight>,
    in_sum: Vec<Weight>,
    members: Vec<usize>,
    lists: Vec<LinkedList<usize>>,
    color: Vec<usize>,
    local: Vec<usize>,
    tarjan: Tarjan,
    rank: Solution,
    next: usize,
}

impl WorkingGraph {
    /// Builds the working graph. With `cancel`, opposite arcs are netted
    /// against each other as they are inserted; otherwise they coexist.
    pub fn new(g: &CsrGraph, cancel: bool) -> WorkingGraph {
        let n = g.num_vertices();
        let mut wg = WorkingGraph {
            fwd: vec![FxHashMap::default(); n],
            bwd: vec![FxHashMap::default(); n],
            out_sum: vec![0; n],
            in_sum: vec![0; n],
            members: (0..n).collect(),
            lists: (0..n).map(|u| LinkedList::from([u])).collect(),
            color: vec![0; n],
            local: vec![0; n],
            tarjan: Tarjan::new(n),
            rank: vec![0; n],
            next: 0,
        };
        for e in g.edges() {
            if cancel {
                wg.add_arc(e.src, e.dst, e.weight);
            } else {
                wg.merge_arc(e.src, e.dst, e.weight);
            }
        }
        wg
    }

    pub fn num_vertices(&self) -> usize {
        self.fwd.len()
    }

    /// The group holding every vertex.
    pub fn root(&self) -> Group {
        0..self.members.len()
    }

    pub fn members(&self, group: &Group) -> &[usize] {
        &self.members[group.clone()]
    }

    pub fn out_degree(&self, u: usize) -> usize {
        self.fwd[u].len()
    }

    pub fn in_degree(&self, u: usize) -> usize {
        self.bwd[u].len()
    }

    pub fn out_sum(&self, u: usize) -> Weight {
        self.out_sum[u]
    }

    pub fn in_sum(&self, u: usize) -> Weight {
        self.in_sum[u]
    }

    pub fn arc(&self, u: usize, v: usize) -> Option<Weight> {
        self.fwd[u].get(&v).copied()
    }

    /// The only out-arc of `u` as `(dst, weight)`, if it has exactly one.
    pub fn sole_out(&self, u: usize) -> Option<(usize, Weight)> {
        match self.fwd[u].len() {
            1 => self.fwd[u].iter().next().map(|(&v, &w)| (v, w)),
            _ => None,
        }
    }

    /// The only in-arc of `u` as `(src, weight)`, if it has exactly one.
    pub fn sole_in(&self, u: usize) -> Option<(usize, Weight)> {
        match self.bwd[u].len() {
            1 => self.bwd[u].iter().next().map(|(&v, &w)| (v, w)),
            _ => None,
        }
    }

    pub fn out_arcs(&self, u: usize) -> impl Iterator<Item = (usize, Weight)> + '_ {
        self.fwd[u].iter().map(|(&v, &w)| (v, w))
    }

    pub fn in_arcs(&self, u: usize) -> impl Iterator<Item = (usize, Weight)> + '_ {
        self.bwd[u].iter().map(|(&v, &w)| (v, w))
    }

    fn insert(&mut self, u: usize, v: usize, w: Weight) {
        *self.fwd[u].entry(v).or_insert(0) += w;
        *self.bwd[v].entry(u).or_insert(0) += w;
        self.out_sum[u] += w;
        self.in_sum[v] += w;
    }

    /// Adds `w` to the arc `(u, v)`, merging with a parallel arc.
    pub fn merge_arc(&mut self, u: usize, v: usize, w: Weight) {
        if u != v && w > 0 {
            self.insert(u, v, w);
        }
    }

    /// Adds the arc `(u, v)` and nets it against a reverse arc `(v, u)`:
    /// the lighter of the two disappears and the heavier keeps the difference.
    pub fn add_arc(&mut self, u: usize, v: usize, w: Weight) {
        if u == v || w == 0 {
            return;
        }
        let Some(rev) = self.arc(v, u) else {
            self.insert(u, v, w);
            return;
        };
        if rev > w {
            self.fwd[v].insert(u, rev - w);
            self.bwd[u].insert(v, rev - w);
            self.out_sum[v] -= w;
            self.in_sum[u] -= w;
        } else {
            self.del_arc(v, u);
            if w > rev {
                self.insert(u, v, w - rev);
            }
        }
    }

    /// Removes the arc `(u, v)` and returns its weight (0 if absent).
    pub fn del_arc(&mut self, u: usize, v: usize) -> Weight {
        let Some(w) = self.fwd[u].remove(&v) else {
            return 0;
        };
        self.bwd[v].remove(&u);
        self.out_sum[u] -= w;
        self.in_sum[v] -= w;
        w
    }

    /// Removes every arc of `u`; returns its out-arcs and in-arcs.
    pub fn detach(&mut self, u: usize) -> (Vec<(usize, Weight)>, Vec<(usize, Weight)>) {
        let outs: Vec<_> = self.out_arcs(u).collect();
        let ins: Vec<_> = self.in_arcs(u).collect();
        for &(v, _) in &outs {
            self.del_arc(u, v);
        }
        for &(v, _) in &ins {
            self.del_arc(v, u);
        }
        (outs, ins)
    }

    /// Moves the contraction list of `u` in front of the list of `v`.
    pub fn prepend_list(&mut self, v: usize, u: usize) {
        let mut list = mem::take(&mut self.lists[u]);
        list.append(&mut self.lists[v]);
        self.lists[v] = list;
    }

    /// Moves the contraction list of `u` behind the list of `v`.
    pub fn append_list(&mut self, v: usize, u: usize) {
        let mut list = mem::take(&mut self.lists[u]);
        self.lists[v].append(&mut list);
    }

    pub fn list(&self, u: usize) -> impl Iterator<Item = usize> + '_ {
        self.lists[u].iter().copied()
    }

    /// Drops the members rejected by `keep`, keeping the order of the rest.
    pub fn retain(&mut self, group: Group, keep: impl Fn(usize) -> bool) -> Group {
        let mut w = group.start;
        for i in group.clone() {
            if keep(self.members[i]) {
                self.members.swap(w, i);
                w += 1;
            }
        }
        group.start..w
    }

    /// Colors the group by strongly connected component, sources first, and
    /// returns the number of components.
    pub fn scc(&mut self, group: &Group) -> usize {
        let WorkingGraph { fwd, members, color, tarjan, .. } = self;
        let fwd = &*fwd;
        tarjan.run(&members[group.clone()], |u| fwd[u].keys().copied(), color)
    }

    pub fn set_color(&mut self, u: usize, c: usize) {
        self.color[u] = c;
    }

    /// Reorders the group stably by color (`0..count`) and deletes every arc
    /// between two colors. Returns the non-empty color classes in order.
    pub fn split(&mut self, group: Group, count: usize) -> Vec<Group> {
        let color = &self.color;
        let (offsets, sorted) = histogram::counting_sort(&self.members[group.clone()], count, |&u| color[u]);
        self.members[group.clone()].copy_from_slice(&sorted);
        let mut cross = Vec::new();
        for &u in &sorted {
            for &v in self.fwd[u].keys() {
                if self.color[u] != self.color[v] {
                    cross.push((u, v));
                }
            }
        }
        for (u, v) in cross {
            self.del_arc(u, v);
        }
        offsets
            .windows(2)
            .map(|w| group.start + w[0]..group.start + w[1])
            .filter(|g| !g.is_empty())
            .collect()
    }

    fn number(&mut self, group: &Group) {
        for i in group.clone() {
            self.local[self.members[i]] = i - group.start;
        }
    }

    /// Read-only view of a group with local ids `0..group.len()`.
    pub fn view(&mut self, group: &Group) -> GroupView<'_> {
        self.number(group);
        let wg: &WorkingGraph = self;
        GroupView { wg, members: &wg.members[group.clone()] }
    }

    /// The group as a standalone graph on local ids.
    pub fn export(&mut self, group: &Group) -> CsrGraph {
        self.number(group);
        let mut edges = Vec::new();
        for (i, &u) in self.members[group.clone()].iter().enumerate() {
            edges.extend(self.fwd[u].iter().map(|(&v, &w)| Edge::new(i, self.local[v], w)));
        }
        CsrGraph::new(group.len(), edges)
    }

    /// Assigns the next free positions to the input vertices behind `u`.
    pub fn emit(&mut self, u: usize) {
        for &v in &self.lists[u] {
            self.rank[v] = self.next;
            self.next += 1;
        }
    }

    /// Solves the group with `solver` and places it right after everything
    /// emitted so far.
    pub fn emit_solved<S: Solver + ?Sized>(&mut self, group: &Group, solver: &S) -> (usize, Weight) {
        let h = self.export(group);
        let order = solution::inverse(&solver.solve(&h));
        for i in order {
            self.emit(self.members[group.start + i]);
        }
        (h.num_edges(), h.edge_weight_sum())
    }

    /// Final positions of the input vertices. Complete once every vertex has
    /// been emitted.
    pub fn into_solution(self) -> Solution {
        debug_assert_eq!(self.next, self.rank.len());
        self.rank
    }
}

/// A group of a `WorkingGraph` seen as a `Digraph` on local ids.
pub struct GroupView<'a> {
    wg: &'a WorkingGraph,
    members: &'a [usize],
}

impl GroupView<'_> {
    pub fn global(&self, i: usize) -> usize {
        self.members[i]
    }
}

impl Digraph for GroupView<'_> {
    fn num_vertices(&self) -> usize {
        self.members.len()
    }

    fn out_arcs(&self, u: usize) -> impl Iterator<Item = (usize, Weight)> + '_ {
        let wg = self.wg;
        wg.out_arcs(self.members[u]).map(move |(v, w)| (wg.local[v], w))
    }

    fn in_arcs(&self, u: usize) -> impl Iterator<Item = (usize, Weight)> + '_ {
        let wg = self.wg;
        wg.in_arcs(self.members[u]).map(move |(v, w)| (wg.local[v], w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn build(n: usize, arcs: &[(usize, usize, Weight)], cancel: bool) -> WorkingGraph {
        let g = CsrGraph::new(n, arcs.iter().map(|&(u, v, w)| Edge::new(u, v, w)));
        WorkingGraph::new(&g, cancel)
    }

    #[test]
    fn opposite_arcs_cancel() {
        let wg = build(3, &[(0, 1, 5), (1, 0, 3), (1, 2, 2), (2, 1, 2), (2, 2, 7)], true);
        assert_eq!(wg.arc(0, 1), Some(2));
        assert_eq!(wg.arc(1, 0), None);
        assert_eq!(wg.arc(1, 2), None);
        assert_eq!(wg.arc(2, 1), None);
        assert_eq!(wg.out_sum(0), 2);
        assert_eq!(wg.in_sum(1), 2);
        assert_eq!(wg.in_sum(2), 0);
        assert_eq!(wg.sole_out(0), Some((1, 2)));
        assert_eq!(wg.sole_in(0), None);
    }

    #[test]
    fn merging_keeps_both_directions() {
        let wg = build(2, &[(0, 1, 5), (1, 0, 3), (0, 1, 1)], false);
        assert_eq!(wg.arc(0, 1), Some(6));
        assert_eq!(wg.arc(1, 0), Some(3));
        assert_eq!(wg.out_sum(0), 6);
        assert_eq!(wg.in_sum(0), 3);
    }

    #[test]
    fn reverse_arc_flips_when_heavier() {
        let mut wg = build(2, &[(0, 1, 2)], true);
        wg.add_arc(1, 0, 5);
        assert_eq!(wg.arc(0, 1), None);
        assert_eq!(wg.arc(1, 0), Some(3));
        assert_eq!(wg.out_sum(1), 3);
        assert_eq!(wg.out_sum(0), 0);
        assert_eq!(wg.in_sum(1), 0);
    }

    #[test]
    fn lists_splice_in_order() {
        let mut wg = build(4, &[], true);
        wg.append_list(0, 1);
        wg.prepend_list(0, 2);
        wg.append_list(3, 0);
        assert_eq!(wg.list(3).collect_vec(), vec![3, 2, 0, 1]);
        assert_eq!(wg.list(0).count(), 0);
        wg.emit(3);
        assert_eq!(wg.into_solution(), vec![2, 3, 1, 0]);
    }

    #[test]
    fn split_drops_cross_arcs() {
        // {0,1} -> {2,3}
        let mut wg = build(4, &[(2, 3, 1), (3, 2, 2), (0, 1, 1), (1, 0, 2), (1, 2, 4)], false);
        let root = wg.root();
        assert_eq!(wg.scc(&root), 2);
        let parts = wg.split(root, 2);
        assert_eq!(parts, vec![0..2, 2..4]);
        assert_eq!(wg.members(&parts[0]), &[0, 1]);
        assert_eq!(wg.arc(1, 2), None);
        assert_eq!(wg.out_sum(1), 2);

        let h = wg.export(&parts[1]);
        assert_eq!(h.edges(), &[Edge::new(0, 1, 1), Edge::new(1, 0, 2)]);
        let view = wg.view(&parts[1]);
        assert_eq!(view.num_vertices(), 2);
        assert_eq!(view.global(1), 3);
        assert_eq!(view.out_arcs(1).collect_vec(), vec![(0, 2)]);
    }

    #[test]
    fn retain_compacts_stably() {
        let mut wg = build(5, &[], true);
        let g = wg.retain(1..5, |u| u % 2 == 0);
        assert_eq!(g, 1..3);
        assert_eq!(wg.members(&g), &[2, 4]);
    }
}
