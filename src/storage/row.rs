//! 行式存储 (实体优先)
//!
//! 每个实体持有一段测量序列，序列按轴值升序：
//! - 人口数据按表头年份顺序追加，天然有序，无需排序
//! - 环境数据按任意时间顺序到达，出现逆序时标记该实体，`seal` 时只对标记的序列做一次稳定排序
//!
//! 轴值相同的测量保持追加顺序 (稳定排序)。

use crate::storage::index::{AxisIndex, Catalog};
use crate::storage::types::{union_bounds, BoundingBox, EntityId, MeasureValue, Measurement, Observation};
use crate::storage::{resolve_observation, LayoutStore, StoreOptions};

/// 行式存储
#[derive(Debug, Clone)]
pub struct RowStore<V> {
    catalog: Catalog,
    axis: AxisIndex,
    /// 按 EntityId 排列
    sequences: Vec<Vec<Measurement<V>>>,
    /// 序列是否需要重排
    unsorted: Vec<bool>,
    bounds: Option<BoundingBox>,
    measurements: usize,
    sealed: bool,
}

impl<V: MeasureValue> Default for RowStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: MeasureValue> RowStore<V> {
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            axis: AxisIndex::new(),
            sequences: Vec::new(),
            unsorted: Vec::new(),
            bounds: None,
            measurements: 0,
            sealed: true,
        }
    }

    /// 追加一条测量
    pub fn append(&mut self, observation: &Observation<V>) {
        let measurement = resolve_observation(&mut self.catalog, observation);
        self.axis.insert(measurement.axis);
        self.push(measurement);
    }

    fn push(&mut self, measurement: Measurement<V>) {
        let id = measurement.entity as usize;
        if id >= self.sequences.len() {
            self.sequences.resize_with(id + 1, Vec::new);
            self.unsorted.resize(id + 1, false);
        }

        let sequence = &mut self.sequences[id];
        if let Some(last) = sequence.last() {
            if measurement.axis < last.axis {
                self.unsorted[id] = true;
            }
        }
        if let Some(position) = measurement.position {
            match &mut self.bounds {
                Some(bounds) => bounds.expand(&position),
                None => self.bounds = Some(BoundingBox::around(position)),
            }
        }

        sequence.push(measurement);
        self.measurements += 1;
        self.sealed = false;
    }

    /// 实体的测量序列；实体未知时返回空切片
    pub fn sequence_of(&self, key: &str) -> &[Measurement<V>] {
        match self.catalog.resolve_entity(key) {
            Some(id) => self.sequence(id),
            None => &[],
        }
    }

    #[inline]
    pub fn sequence(&self, id: EntityId) -> &[Measurement<V>] {
        self.sequences
            .get(id as usize)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    /// 按 EntityId 顺序排列的全部序列
    pub fn sequences(&self) -> &[Vec<Measurement<V>>] {
        &self.sequences
    }

    pub fn entity_count(&self) -> usize {
        self.catalog.entity_count()
    }

    /// 合并另一个行式存储
    ///
    /// 对方的实体 / 参数下标在本目录中重新解析，每个实体的序列拼接到本方序列之后，
    /// 拼接处出现逆序时重新排序。
    pub fn merge(&mut self, other: RowStore<V>) {
        let remap = self.catalog.absorb(&other.catalog);
        for &value in other.axis.values() {
            self.axis.insert(value);
        }

        for (old_id, sequence) in other.sequences.into_iter().enumerate() {
            if sequence.is_empty() {
                continue;
            }
            let id = remap.entity(old_id as EntityId) as usize;
            if id >= self.sequences.len() {
                self.sequences.resize_with(id + 1, Vec::new);
                self.unsorted.resize(id + 1, false);
            }

            let target = &mut self.sequences[id];
            let crosses = match (target.last(), sequence.first()) {
                (Some(last), Some(first)) => first.axis < last.axis,
                _ => false,
            };
            if crosses || other.unsorted[old_id] {
                self.unsorted[id] = true;
            }

            target.extend(sequence.into_iter().map(|m| Measurement {
                entity: id as EntityId,
                parameter: remap.parameter(m.parameter),
                ..m
            }));
        }

        self.bounds = union_bounds(self.bounds, other.bounds);
        self.measurements += other.measurements;
        self.sealed = false;
        self.seal();
    }

    /// 恢复排序不变式
    pub fn seal(&mut self) {
        if self.sealed {
            return;
        }

        let mut resorted = 0usize;
        for (sequence, unsorted) in self.sequences.iter_mut().zip(self.unsorted.iter_mut()) {
            if *unsorted {
                sequence.sort_by_key(|m| m.axis);
                *unsorted = false;
                resorted += 1;
            }
        }
        self.axis.sort();
        self.sealed = true;

        log::debug!(
            "[RowStore] sealed: {} entities, {} measurements, {} sequences re-sorted",
            self.sequences.len(),
            self.measurements,
            resorted
        );
    }
}

impl<V: MeasureValue> LayoutStore<V> for RowStore<V> {
    const LAYOUT: &'static str = "row";

    fn with_options(_options: StoreOptions) -> Self {
        Self::new()
    }

    fn declare_axis(&mut self, values: &[i64]) {
        for &value in values {
            self.axis.insert(value);
        }
        if !self.axis.is_sorted() {
            self.sealed = false;
        }
    }

    fn append(&mut self, observation: &Observation<V>) {
        RowStore::append(self, observation)
    }

    fn merge(&mut self, other: Self) {
        RowStore::merge(self, other)
    }

    fn seal(&mut self) {
        RowStore::seal(self)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{EntityMeta, GeoPoint};

    fn obs(entity: &str, axis: i64, value: f64) -> Observation<f64> {
        Observation::new(entity, axis, value).with_parameter("PM2.5")
    }

    fn axes(seq: &[Measurement<f64>]) -> Vec<i64> {
        seq.iter().map(|m| m.axis).collect()
    }

    #[test]
    fn test_append_in_order() {
        let mut store = RowStore::new();
        for (year, value) in [(2020, 1.0), (2021, 2.0), (2022, 3.0)] {
            store.append(&Observation::new("Country1", year, value as i64));
        }
        store.seal();

        let seq = store.sequence_of("Country1");
        assert_eq!(seq.len(), 3);
        assert_eq!(seq[2].value, 3);
        assert!(store.sequence_of("Nowhere").is_empty());
    }

    #[test]
    fn test_out_of_order_sorted_on_seal() {
        let mut store = RowStore::new();
        store.append(&obs("S1", 300, 3.0));
        store.append(&obs("S1", 100, 1.0));
        store.append(&obs("S1", 200, 2.0));
        store.append(&obs("S2", 50, 9.0));
        store.seal();

        assert_eq!(axes(store.sequence_of("S1")), vec![100, 200, 300]);
        assert_eq!(store.axis().values(), &[50, 100, 200, 300]);
        assert_eq!(store.measurement_count(), 4);
    }

    #[test]
    fn test_stable_within_axis() {
        let mut store = RowStore::new();
        store.append(&obs("S1", 200, 1.0));
        store.append(&Observation::new("S1", 100, 5.0).with_parameter("OZONE"));
        store.append(&obs("S1", 100, 2.0));
        store.seal();

        let values: Vec<f64> = store.sequence_of("S1").iter().map(|m| m.value).collect();
        assert_eq!(values, vec![5.0, 2.0, 1.0]);
    }

    #[test]
    fn test_merge_reresolves_indices() {
        let mut left = RowStore::new();
        left.append(&obs("S1", 100, 1.0));
        left.append(&obs("S1", 300, 3.0));

        let mut right = RowStore::new();
        right.append(&Observation::new("S2", 150, 7.0).with_parameter("OZONE"));
        right.append(&obs("S1", 200, 2.0));

        left.merge(right);

        assert!(left.is_sealed());
        assert_eq!(left.entity_count(), 2);
        assert_eq!(axes(left.sequence_of("S1")), vec![100, 200, 300]);

        // 合并后的下标属于本方目录
        let s2 = left.catalog().resolve_entity("S2").unwrap();
        let merged = left.sequence(s2);
        assert_eq!(merged[0].entity, s2);
        let ozone = left.catalog().parameter_id("OZONE").unwrap();
        assert_eq!(merged[0].parameter, Some(ozone));
        assert_eq!(left.axis().values(), &[100, 150, 200, 300]);
    }

    #[test]
    fn test_bounds_tracking() {
        let mut store = RowStore::new();
        let meta = |lat, lon| EntityMeta {
            position: Some(GeoPoint::new(lat, lon)),
            ..EntityMeta::default()
        };
        store.append(&obs("S1", 1, 1.0).with_meta(meta(34.0, -118.0)));
        store.append(&obs("S2", 1, 1.0).with_meta(meta(36.5, -121.0)));

        let bounds = store.bounds().unwrap();
        assert_eq!(bounds.min_lat, 34.0);
        assert_eq!(bounds.min_lon, -121.0);
    }
}
