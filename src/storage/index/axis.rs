//! 轴索引
//!
//! 设计理念：
//! - 轴值 (年份 / Unix 时间戳) ↔ 稠密下标的双向映射
//! - 导入阶段按首次出现顺序追加，导入结束后整体排序一次
//! - 排序返回置换表，持有平行数组的一方 (列式存储的槽位) 据此同步重排
//! - 区间查询：lower_bound(start) .. upper_bound(end) - 1

use std::collections::HashMap;

use crate::storage::types::AxisRange;

/// 轴索引
#[derive(Debug, Clone)]
pub struct AxisIndex {
    /// 下标 → 轴值
    values: Vec<i64>,
    /// 轴值 → 下标
    positions: HashMap<i64, usize>,
    /// values 是否升序
    sorted: bool,
}

impl Default for AxisIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AxisIndex {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            positions: HashMap::new(),
            sorted: true,
        }
    }

    /// 插入轴值，已存在时返回原下标
    pub fn insert(&mut self, value: i64) -> usize {
        if let Some(&idx) = self.positions.get(&value) {
            return idx;
        }

        if let Some(&last) = self.values.last() {
            if value < last {
                self.sorted = false;
            }
        }

        let idx = self.values.len();
        self.values.push(value);
        self.positions.insert(value, idx);
        idx
    }

    #[inline]
    pub fn index_of(&self, value: i64) -> Option<usize> {
        self.positions.get(&value).copied()
    }

    /// 下标 → 轴值，越界直接 panic
    #[inline]
    pub fn value_of(&self, idx: usize) -> i64 {
        self.values[idx]
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// 升序排序
    ///
    /// 已有序时返回 `None`；否则返回置换表 `perm`，新下标 `i` 对应旧下标 `perm[i]`。
    pub fn sort(&mut self) -> Option<Vec<usize>> {
        if self.sorted {
            return None;
        }

        let mut perm: Vec<usize> = (0..self.values.len()).collect();
        perm.sort_unstable_by_key(|&i| self.values[i]);

        self.values = perm.iter().map(|&i| self.values[i]).collect();
        self.positions = self
            .values
            .iter()
            .enumerate()
            .map(|(idx, &value)| (value, idx))
            .collect();
        self.sorted = true;

        Some(perm)
    }

    /// 区间查询
    ///
    /// 返回 `[start, end]` 内首尾两个下标 (闭区间)；区间内没有任何轴值时返回 `None`。
    /// 要求索引已排序。
    pub fn range(&self, start: i64, end: i64) -> Option<(usize, usize)> {
        debug_assert!(self.sorted, "range lookup on unsorted axis");

        if start > end {
            return None;
        }

        let lo = self.values.partition_point(|&v| v < start);
        let hi = self.values.partition_point(|&v| v <= end);
        if lo >= hi {
            None
        } else {
            Some((lo, hi - 1))
        }
    }

    /// 已存储轴值的跨度
    pub fn span(&self) -> Option<AxisRange> {
        if self.sorted {
            match (self.values.first(), self.values.last()) {
                (Some(&first), Some(&last)) => Some(AxisRange::new(first, last)),
                _ => None,
            }
        } else {
            let min = self.values.iter().min()?;
            let max = self.values.iter().max()?;
            Some(AxisRange::new(*min, *max))
        }
    }
}
