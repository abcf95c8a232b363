//! Top-N 排名
//!
//! - 串行路径：收集全部候选，整体降序排序后截断
//! - 并行路径：每个工作线程维护容量为 n 的有界小顶堆，结束后把各线程的堆合并进同一个有界堆
//!
//! 排名键为 (数值降序, 实体键升序)，是全序，因此两条路径以及两种布局给出完全相同的列表。

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::query::types::RankedEntry;
use crate::storage::types::MeasureValue;

/// 排名候选
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a, K> {
    pub value: K,
    pub entity: &'a str,
}

impl<'a, K: MeasureValue> Candidate<'a, K> {
    pub fn new(entity: &'a str, value: K) -> Self {
        Self { value, entity }
    }

    pub fn into_entry(self) -> RankedEntry<K> {
        RankedEntry {
            entity: self.entity.to_string(),
            value: self.value,
        }
    }
}

/// 排名越靠前越 "大"
impl<K: MeasureValue> Ord for Candidate<'_, K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .rank_cmp(&other.value)
            .then_with(|| other.entity.cmp(self.entity))
    }
}

impl<K: MeasureValue> PartialOrd for Candidate<'_, K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: MeasureValue> PartialEq for Candidate<'_, K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: MeasureValue> Eq for Candidate<'_, K> {}

// ═══════════════════════════════════════════════════════════════════════════
// 有界小顶堆
// ═══════════════════════════════════════════════════════════════════════════

/// 容量为 n 的有界小顶堆，堆顶是当前保留的最差候选
#[derive(Debug, Clone)]
pub struct BoundedMinHeap<'a, K> {
    capacity: usize,
    heap: BinaryHeap<Reverse<Candidate<'a, K>>>,
}

impl<'a, K: MeasureValue> BoundedMinHeap<'a, K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1).min(1024)),
        }
    }

    /// 未满时直接入堆；已满时仅当候选优于堆顶才替换堆顶
    pub fn push(&mut self, candidate: Candidate<'a, K>) {
        if self.capacity == 0 || !candidate.value.is_valid() {
            return;
        }

        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(candidate));
        } else if let Some(mut worst) = self.heap.peek_mut() {
            if candidate > worst.0 {
                *worst = Reverse(candidate);
            }
        }
    }

    /// 把另一个堆的候选按同样规则并入
    pub fn merge(&mut self, other: BoundedMinHeap<'a, K>) {
        for Reverse(candidate) in other.heap {
            self.push(candidate);
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// 取出全部候选，降序
    pub fn into_sorted_desc(self) -> Vec<Candidate<'a, K>> {
        // Reverse 升序即候选降序
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(c)| c)
            .collect()
    }
}

/// 串行路径：整体排序后截断
pub fn rank_serial<K: MeasureValue>(mut candidates: Vec<Candidate<'_, K>>, n: usize) -> Vec<RankedEntry<K>> {
    candidates.retain(|c| c.value.is_valid());
    candidates.sort_unstable_by(|a, b| b.cmp(a));
    candidates.truncate(n);
    candidates.into_iter().map(Candidate::into_entry).collect()
}

/// 并行路径的合并阶段：各线程的局部堆并入一个最终的有界堆
pub fn merge_heaps<'a, K: MeasureValue>(
    heaps: Vec<BoundedMinHeap<'a, K>>,
    n: usize,
) -> Vec<RankedEntry<K>> {
    let mut merged = BoundedMinHeap::new(n);
    for heap in heaps {
        merged.merge(heap);
    }
    merged
        .into_sorted_desc()
        .into_iter()
        .map(Candidate::into_entry)
        .collect()
}
