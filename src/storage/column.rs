//! 列式存储 (轴优先)
//!
//! 每个轴点一个槽位，槽位内是该轴点上全部实体的测量：
//! - 人口数据：表头声明的年份决定槽位，槽位内每个实体至多一条 (稠密列)
//! - 环境数据：槽位按时间戳首次出现顺序创建，槽位内是无序的 (实体, 参数, 数值) 事件
//!
//! 导入期间槽位只追加；`seal` 时对轴值排序一次，槽位按置换表同步重排。

use std::collections::HashSet;
use std::mem;

use crate::storage::index::{AxisIndex, Catalog};
use crate::storage::types::{union_bounds, BoundingBox, MeasureValue, Measurement, Observation};
use crate::storage::{resolve_observation, LayoutStore, StoreOptions};

/// 列式存储
#[derive(Debug, Clone)]
pub struct ColumnStore<V> {
    catalog: Catalog,
    axis: AxisIndex,
    /// 与 axis 的下标一一对应
    slots: Vec<Vec<Measurement<V>>>,
    unique_cells: bool,
    bounds: Option<BoundingBox>,
    measurements: usize,
    sealed: bool,
}

impl<V: MeasureValue> Default for ColumnStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: MeasureValue> ColumnStore<V> {
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            catalog: Catalog::new(),
            axis: AxisIndex::new(),
            slots: Vec::new(),
            unique_cells: options.unique_cells,
            bounds: None,
            measurements: 0,
            sealed: true,
        }
    }

    /// 解析或创建轴点对应的槽位
    fn slot_for(&mut self, value: i64) -> usize {
        let slot = self.axis.insert(value);
        if slot == self.slots.len() {
            self.slots.push(Vec::new());
            self.sealed = false;
        }
        slot
    }

    /// 追加一条测量
    pub fn append(&mut self, observation: &Observation<V>) {
        let measurement = resolve_observation(&mut self.catalog, observation);
        let slot = self.slot_for(measurement.axis);

        if let Some(position) = measurement.position {
            match &mut self.bounds {
                Some(bounds) => bounds.expand(&position),
                None => self.bounds = Some(BoundingBox::around(position)),
            }
        }

        self.slots[slot].push(measurement);
        self.measurements += 1;
        self.sealed = false;
    }

    /// 轴点上的全部测量；轴值未知时返回空切片
    pub fn slice_at(&self, value: i64) -> &[Measurement<V>] {
        match self.axis.index_of(value) {
            Some(slot) => &self.slots[slot],
            None => &[],
        }
    }

    /// 区间 `[start, end]` 覆盖的槽位下标 (闭区间)，不相交时返回 `None`
    pub fn slice_range(&self, start: i64, end: i64) -> Option<(usize, usize)> {
        self.axis.range(start, end)
    }

    #[inline]
    pub fn slot(&self, idx: usize) -> &[Measurement<V>] {
        &self.slots[idx]
    }

    /// 按轴值升序排列的全部槽位 (seal 之后)
    pub fn slots(&self) -> &[Vec<Measurement<V>>] {
        &self.slots
    }

    pub fn unique_cells(&self) -> bool {
        self.unique_cells
    }

    pub fn entity_count(&self) -> usize {
        self.catalog.entity_count()
    }

    /// 合并另一个列式存储
    ///
    /// 相同轴值的槽位拼接测量列表，新轴值追加槽位，最后整体重排。
    pub fn merge(&mut self, other: ColumnStore<V>) {
        let remap = self.catalog.absorb(&other.catalog);

        for (idx, slot) in other.slots.into_iter().enumerate() {
            let target = self.slot_for(other.axis.value_of(idx));
            self.slots[target].extend(slot.into_iter().map(|m| Measurement {
                entity: remap.entity(m.entity),
                parameter: remap.parameter(m.parameter),
                ..m
            }));
        }

        self.unique_cells = self.unique_cells && other.unique_cells;
        self.bounds = union_bounds(self.bounds, other.bounds);
        self.measurements += other.measurements;
        self.sealed = false;
        self.seal();
    }

    /// 是否存在同一 (实体, 参数) 在同一槽位中出现多次
    fn has_duplicate_cells(&self) -> bool {
        self.slots.iter().any(|slot| {
            let mut seen = HashSet::with_capacity(slot.len());
            slot.iter().any(|m| !seen.insert((m.entity, m.parameter)))
        })
    }

    /// 对轴值排序一次，槽位随置换表同步重排
    ///
    /// 声明了 `unique_cells` 但数据中存在重复单元格 (例如同一国家出现在两份文件中) 时，
    /// 关闭该选项，查询回到完整扫描。
    pub fn seal(&mut self) {
        if self.sealed {
            return;
        }

        if self.unique_cells && self.has_duplicate_cells() {
            log::warn!("[ColumnStore] duplicate cells found, disabling single-hit slot scans");
            self.unique_cells = false;
        }

        let reordered = match self.axis.sort() {
            Some(perm) => {
                let mut old = mem::take(&mut self.slots);
                self.slots = perm.iter().map(|&i| mem::take(&mut old[i])).collect();
                true
            }
            None => false,
        };
        self.sealed = true;

        log::debug!(
            "[ColumnStore] sealed: {} slots, {} measurements, reordered={}",
            self.slots.len(),
            self.measurements,
            reordered
        );
    }
}

impl<V: MeasureValue> LayoutStore<V> for ColumnStore<V> {
    const LAYOUT: &'static str = "column";

    fn with_options(options: StoreOptions) -> Self {
        ColumnStore::with_options(options)
    }

    fn declare_axis(&mut self, values: &[i64]) {
        for &value in values {
            self.slot_for(value);
        }
    }

    fn append(&mut self, observation: &Observation<V>) {
        ColumnStore::append(self, observation)
    }

    fn merge(&mut self, other: Self) {
        ColumnStore::merge(self, other)
    }

    fn seal(&mut self) {
        ColumnStore::seal(self)
    }

    fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn axis(&self) -> &AxisIndex {
        &self.axis
    }

    fn measurement_count(&self) -> usize {
        self.measurements
    }

    fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }
}
