// Counting-sort based helpers for small integer key ranges.

/// Stable counting sort of `items` by `key`, which must lie in `0..buckets`.
/// Returns the bucket offsets (length `buckets + 1`) and the sorted items;
/// items with key `k` occupy `offsets[k]..offsets[k + 1]`.
pub fn counting_sort<T: Copy>(items: &[T], buckets: usize, key: impl Fn(&T) -> usize) -> (Vec<usize>, Vec<T>) {
    let mut offsets = vec![0; buckets + 1];
    for it in items {
        offsets[key(it) + 1] += 1;
    }
    for k in 0..buckets {
        offsets[k + 1] += offsets[k];
    }
    let mut cursor = offsets.clone();
    let mut slots = vec![0; items.len()];
    for (i, it) in items.iter().enumerate() {
        let k = key(it);
        slots[cursor[k]] = i;
        cursor[k] += 1;
    }
    let sorted = slots.into_iter().map(|i| items[i]).collect();
    (offsets, sorted)
}

/// Max-heap over the elements `0..n` with integer keys in `[0, max_key]`.
///
/// Elements are kept in a single array sorted by key, with `start[k]` marking
/// where the bucket of key `k` begins. Changing a key by one swaps the element
/// with the boundary element of its bucket and moves the boundary, so both
/// `increase_key` and `decrease_key` are O(1). `top` is the last element of
/// the array; `pop` only shrinks the array, and callers are expected to pop
/// lazily-removed elements until a live one shows up.
///
/// Popped elements must not have their keys changed afterwards.
#[derive(Debug, Clone, Default)]
pub struct HistogramMaxHeap {
    max_key: usize,
    keys: Vec<usize>,
    order: Vec<usize>,
    start: Vec<usize>,
    pos: Vec<usize>,
}

impl HistogramMaxHeap {
    pub fn new(max_key: usize, keys: Vec<usize>) -> HistogramMaxHeap {
        let n = keys.len();
        let mut start = vec![0; max_key + 1];
        for &k in &keys {
            debug_assert!(k <= max_key);
            start[k] += 1;
        }
        for k in 1..=max_key {
            start[k] += start[k - 1];
        }
        let mut order = vec![0; n];
        let mut pos = vec![0; n];
        for i in 0..n {
            start[keys[i]] -= 1;
            pos[i] = start[keys[i]];
            order[pos[i]] = i;
        }
        HistogramMaxHeap { max_key, keys, order, start, pos }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn key(&self, i: usize) -> usize {
        self.keys[i]
    }

    /// Element with the largest key among those not yet popped.
    pub fn top(&self) -> Option<usize> {
        self.order.last().copied()
    }

    pub fn pop(&mut self) -> Option<usize> {
        self.order.pop()
    }

    fn swap_positions(&mut self, i: usize, j: usize) {
        if i != j {
            self.pos.swap(i, j);
            self.order[self.pos[i]] = i;
            self.order[self.pos[j]] = j;
        }
    }

    pub fn increase_key(&mut self, i: usize) {
        let k = self.keys[i];
        debug_assert!(k < self.max_key);
        // last live element holding key k
        let last = if k == self.max_key {
            self.len() - 1
        } else {
            self.len().min(self.start[k + 1]) - 1
        };
        let j = self.order[last];
        self.swap_positions(i, j);
        self.keys[i] += 1;
        self.start[k + 1] = self.pos[i];
    }

    pub fn decrease_key(&mut self, i: usize) {
        let k = self.keys[i];
        debug_assert!(k > 0);
        let j = self.order[self.start[k]];
        self.swap_positions(i, j);
        self.start[k] += 1;
        self.keys[i] -= 1;
    }

    pub fn modify_key(&mut self, i: usize, k: usize) {
        while self.keys[i] < k {
            self.increase_key(i);
        }
        while self.keys[i] > k {
            self.decrease_key(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_sort_is_stable() {
        let items = [(2, 'a'), (0, 'b'), (2, 'c'), (1, 'd'), (0, 'e')];
        let (offsets, sorted) = counting_sort(&items, 3, |it| it.0);
        assert_eq!(offsets, vec![0, 2, 3, 5]);
        assert_eq!(sorted, vec![(0, 'b'), (0, 'e'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn counting_sort_empty() {
        let (offsets, sorted) = counting_sort::<usize>(&[], 4, |&x| x);
        assert_eq!(offsets, vec![0; 5]);
        assert!(sorted.is_empty());
    }

    #[test]
    fn top_follows_key_changes() {
        let mut heap = HistogramMaxHeap::new(4, vec![1, 3, 0, 3]);
        assert_eq!(heap.key(heap.top().unwrap()), 3);
        heap.modify_key(2, 4);
        assert_eq!(heap.top(), Some(2));
        heap.modify_key(2, 0);
        heap.decrease_key(1);
        assert_eq!(heap.top(), Some(3));
        heap.decrease_key(3);
        heap.decrease_key(3);
        assert_eq!(heap.top(), Some(1));
        assert_eq!(heap.key(1), 2);
    }

    #[test]
    fn pop_then_modify_remaining() {
        let mut heap = HistogramMaxHeap::new(5, vec![5, 2, 2, 1]);
        assert_eq!(heap.pop(), Some(0));
        assert_eq!(heap.len(), 3);
        heap.increase_key(3);
        heap.increase_key(3);
        assert_eq!(heap.key(3), 3);
        assert_eq!(heap.top(), Some(3));
        heap.increase_key(1);
        heap.increase_key(1);
        heap.increase_key(1);
        assert_eq!(heap.top(), Some(1));
    }
}
