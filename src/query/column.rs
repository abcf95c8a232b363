//! 列式布局上的查询
//!
//! 轴点查询 O(1) 定位槽位后线性扫描该槽位，无需实体循环；
//! 区间查询先二分得到槽位区间，再跨槽位归约；
//! 单实体查询需要遍历所有槽位。
//!
//! 并行路径：轴点查询按槽位内测量分区，跨槽位查询按槽位分区。

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::query::parallel::{partitioned, partitioned_fold};
use crate::query::topn::{merge_heaps, rank_serial, BoundedMinHeap, Candidate};
use crate::query::{
    add_counts, fold_where, inside, tally_categories, AggOp, AnalyticalQueries, CategoryCounts, Partial,
    RankedEntry, SeriesPoint,
};
use crate::storage::index::ParamFilter;
use crate::storage::types::{AxisRange, BoundingBox, EntityId, MeasureValue, Measurement};
use crate::storage::{ColumnStore, LayoutStore};

/// 保留实体的较大值
#[inline]
fn keep_best<V: MeasureValue>(best: &mut HashMap<EntityId, V>, entity: EntityId, value: V) {
    best.entry(entity)
        .and_modify(|current| {
            if value.rank_cmp(current) == Ordering::Greater {
                *current = value;
            }
        })
        .or_insert(value);
}

/// 一段槽位测量中每个实体的最大匹配值
fn best_per_entity<V: MeasureValue>(chunk: &[Measurement<V>], filter: ParamFilter) -> HashMap<EntityId, V> {
    let mut best = HashMap::new();
    for m in chunk {
        if filter.accepts(m.parameter) && m.value.is_valid() {
            keep_best(&mut best, m.entity, m.value);
        }
    }
    best
}

impl<V: MeasureValue> ColumnStore<V> {
    /// 区间覆盖的槽位
    fn slots_in(&self, range: AxisRange) -> &[Vec<Measurement<V>>] {
        match self.slice_range(range.start, range.end) {
            Some((lo, hi)) => &self.slots()[lo..=hi],
            None => &[],
        }
    }

    /// 跨槽位并行折叠
    fn fold_slots<F>(&self, slots: &[Vec<Measurement<V>>], workers: usize, visit: F) -> Partial<V>
    where
        F: Fn(&[Measurement<V>]) -> Partial<V> + Sync + Send,
    {
        partitioned_fold(
            workers,
            slots.len(),
            |r| {
                slots[r]
                    .iter()
                    .fold(Partial::empty(), |acc, slot| acc.combine(visit(slot.as_slice())))
            },
            Partial::combine,
        )
    }

    /// 槽位内命中一次即可停止：每个 (实体, 轴值, 参数) 至多一条，且过滤条件唯一确定参数
    fn single_hit(&self, filter: ParamFilter) -> bool {
        self.unique_cells()
            && (matches!(filter, ParamFilter::Only(_)) || self.catalog().parameter_count() == 0)
    }

    /// 逐实体部分聚合，跨槽位按分段顺序合并
    fn per_entity_partials(&self, filter: ParamFilter, workers: usize) -> Vec<Partial<V>> {
        let entities = self.entity_count();
        let slots = self.slots();

        let parts = partitioned(workers, slots.len(), |r| {
            let mut acc = vec![Partial::empty(); entities];
            for slot in &slots[r] {
                for m in slot {
                    if filter.accepts(m.parameter) {
                        acc[m.entity as usize].observe(m.value);
                    }
                }
            }
            acc
        });

        let mut merged = vec![Partial::empty(); entities];
        for part in parts {
            for (total, partial) in merged.iter_mut().zip(part) {
                *total = total.combine(partial);
            }
        }
        merged
    }
}

impl<V: MeasureValue> AnalyticalQueries<V> for ColumnStore<V> {
    fn reduce_at(&self, axis: i64, parameter: Option<&str>, workers: usize) -> Partial<V> {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() {
            return Partial::empty();
        }

        let slot = self.slice_at(axis);
        partitioned_fold(
            workers,
            slot.len(),
            |r| fold_where(&slot[r], filter, |_| true),
            Partial::combine,
        )
    }

    fn series_in_range(
        &self,
        entity: &str,
        range: AxisRange,
        parameter: Option<&str>,
        workers: usize,
    ) -> Vec<SeriesPoint<V>> {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() || range.is_empty() {
            return Vec::new();
        }
        let id: EntityId = match self.catalog().resolve_entity(entity) {
            Some(id) => id,
            None => return Vec::new(),
        };

        let slots = self.slots_in(range);
        let single_hit = self.single_hit(filter);
        let collect = |chunk: &[Vec<Measurement<V>>]| -> Vec<SeriesPoint<V>> {
            let mut points = Vec::new();
            for slot in chunk {
                for m in slot {
                    if m.entity == id && filter.accepts(m.parameter) && m.value.is_valid() {
                        points.push(SeriesPoint {
                            axis: m.axis,
                            value: m.value,
                        });
                        if single_hit {
                            break;
                        }
                    }
                }
            }
            points
        };

        if workers <= 1 {
            return collect(slots);
        }
        partitioned(workers, slots.len(), |r| collect(&slots[r]))
            .into_iter()
            .flatten()
            .collect()
    }

    fn reduce_over_range(
        &self,
        entity: Option<&str>,
        range: AxisRange,
        parameter: Option<&str>,
        workers: usize,
    ) -> Partial<V> {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() || range.is_empty() {
            return Partial::empty();
        }

        let slots = self.slots_in(range);
        match entity {
            Some(key) => match self.catalog().resolve_entity(key) {
                Some(id) => self.fold_slots(slots, workers, |slot| fold_where(slot, filter, |m| m.entity == id)),
                None => Partial::empty(),
            },
            None => self.fold_slots(slots, workers, |slot| fold_where(slot, filter, |_| true)),
        }
    }

    fn top_n(&self, n: usize, axis: i64, parameter: Option<&str>, workers: usize) -> Vec<RankedEntry<V>> {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() || n == 0 {
            return Vec::new();
        }

        let catalog = self.catalog();
        let slot = self.slice_at(axis);

        // 槽位内同一实体可能有多条测量 (多参数 / 重复行)，先按实体去重
        let best = if workers <= 1 {
            best_per_entity(slot, filter)
        } else {
            let mut best = HashMap::new();
            for part in partitioned(workers, slot.len(), |r| best_per_entity(&slot[r], filter)) {
                for (entity, value) in part {
                    keep_best(&mut best, entity, value);
                }
            }
            best
        };
        let candidates: Vec<Candidate<'_, V>> = best
            .into_iter()
            .map(|(entity, value)| Candidate::new(catalog.entity_key(entity), value))
            .collect();

        if workers <= 1 {
            return rank_serial(candidates, n);
        }

        let heaps = partitioned(workers, candidates.len(), |r| {
            let mut heap = BoundedMinHeap::new(n);
            for &candidate in &candidates[r] {
                heap.push(candidate);
            }
            heap
        });
        merge_heaps(heaps, n)
    }

    fn top_n_entities(
        &self,
        n: usize,
        op: AggOp,
        parameter: Option<&str>,
        workers: usize,
    ) -> Vec<RankedEntry<f64>> {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() || n == 0 {
            return Vec::new();
        }

        let catalog = self.catalog();
        let partials = self.per_entity_partials(filter, workers);
        let score = move |id: usize| {
            let partial = &partials[id];
            if partial.is_empty() {
                return None;
            }
            Some(Candidate::new(
                catalog.entity_key(id as EntityId),
                partial.finish(op).as_f64(),
            ))
        };

        if workers <= 1 {
            let candidates = (0..self.entity_count()).filter_map(&score).collect();
            return rank_serial(candidates, n);
        }

        let heaps = partitioned(workers, self.entity_count(), |r| {
            let mut heap = BoundedMinHeap::new(n);
            for candidate in r.filter_map(&score) {
                heap.push(candidate);
            }
            heap
        });
        merge_heaps(heaps, n)
    }

    fn reduce_in_bbox(&self, bbox: &BoundingBox, parameter: Option<&str>, workers: usize) -> Partial<V> {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() {
            return Partial::empty();
        }

        self.fold_slots(self.slots(), workers, |slot| fold_where(slot, filter, |m| inside(m, bbox)))
    }

    fn category_distribution(&self, parameter: Option<&str>, workers: usize) -> CategoryCounts {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() {
            return CategoryCounts::default();
        }

        let slots = self.slots();
        partitioned_fold(
            workers,
            slots.len(),
            |r| {
                let mut counts = CategoryCounts::default();
                for slot in &slots[r] {
                    tally_categories(slot, filter, &mut counts);
                }
                counts
            },
            add_counts,
        )
    }

    fn value_at(&self, entity: &str, axis: i64, parameter: Option<&str>) -> Option<V> {
        let filter = self.catalog().param_filter(parameter);
        let id = self.catalog().resolve_entity(entity)?;
        self.slice_at(axis)
            .iter()
            .find(|m| m.entity == id && filter.accepts(m.parameter) && m.value.is_valid())
            .map(|m| m.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::Observation;
    use crate::storage::StoreOptions;

    fn readings() -> ColumnStore<f64> {
        let mut store = ColumnStore::new();
        let rows = [
            ("S1", 300, "PM2.5", 12.0),
            ("S2", 100, "PM2.5", 8.0),
            ("S1", 100, "OZONE", 0.04),
            ("S1", 100, "PM2.5", 10.0),
            ("S2", 300, "PM2.5", 30.0),
            ("S3", 200, "PM2.5", f64::NAN),
        ];
        for (site, ts, param, value) in rows {
            store.append(&Observation::new(site, ts, value).with_parameter(param));
        }
        store.seal();
        store
    }

    #[test]
    fn test_reduce_at_filters_parameter() {
        let store = readings();
        for workers in [1, 2, 4] {
            let partial = store.reduce_at(100, Some("PM2.5"), workers);
            assert_eq!(partial.count, 2);
            assert_eq!(partial.sum, 18.0);
        }
        // 非有限值不参与聚合
        assert!(store.reduce_at(200, None, 1).is_empty());
        assert!(store.reduce_at(100, Some("CO"), 1).is_empty());
    }

    #[test]
    fn test_series_across_slots() {
        let store = readings();
        let series = store.series_for_entity("S1", Some("PM2.5"), 1);
        assert_eq!(
            series,
            vec![
                SeriesPoint { axis: 100, value: 10.0 },
                SeriesPoint { axis: 300, value: 12.0 },
            ]
        );
        assert_eq!(series, store.series_for_entity("S1", Some("PM2.5"), 4));
    }

    #[test]
    fn test_single_hit_only_with_unique_cells() {
        let mut store: ColumnStore<i64> = ColumnStore::with_options(StoreOptions { unique_cells: true });
        store.append(&Observation::new("Country1", 2020, 5));
        store.seal();
        assert!(store.single_hit(ParamFilter::Any));

        let env = readings();
        assert!(!env.single_hit(ParamFilter::Any));
    }

    #[test]
    fn test_top_n_at_slot() {
        let store = readings();
        let top = store.top_n(5, 300, Some("PM2.5"), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].entity, "S2");
        assert_eq!(top[0].value, 30.0);
        assert_eq!(top, store.top_n(5, 300, Some("PM2.5"), 1));
    }

    #[test]
    fn test_top_n_dedupes_entities_in_slot() {
        let mut store = ColumnStore::new();
        store.append(&Observation::new("S1", 100, 50.0).with_parameter("PM2.5"));
        store.append(&Observation::new("S1", 100, 40.0).with_parameter("PM10"));
        store.append(&Observation::new("S2", 100, 10.0).with_parameter("PM2.5"));
        store.append(&Observation::new("S1", 100, 45.0).with_parameter("PM2.5"));
        store.seal();

        for workers in [1, 2, 4] {
            let top = store.top_n(2, 100, None, workers);
            assert_eq!(top.len(), 2, "workers = {}", workers);
            assert_eq!((top[0].entity.as_str(), top[0].value), ("S1", 50.0));
            assert_eq!((top[1].entity.as_str(), top[1].value), ("S2", 10.0));
        }
    }

    #[test]
    fn test_category_distribution_across_slots() {
        let mut store = ColumnStore::new();
        for (site, ts, category) in [("S1", 300, 5), ("S2", 100, 1), ("S1", 100, 1), ("S2", 200, 4)] {
            store.append(
                &Observation::new(site, ts, 2.0)
                    .with_parameter("PM2.5")
                    .with_category(category),
            );
        }
        store.seal();

        for workers in [1, 2, 8] {
            assert_eq!(store.category_distribution(None, workers), [0, 2, 0, 0, 1, 1]);
        }
        assert_eq!(store.count_by_category(1, Some("PM2.5"), 2), 2);
    }

    #[test]
    fn test_reduce_over_range_by_entity() {
        let store = readings();
        let range = AxisRange::new(100, 300);
        let partial = store.reduce_over_range(Some("S1"), range, Some("PM2.5"), 1);
        assert_eq!(partial.sum, 22.0);
        assert_eq!(store.count_in_range(range, None, 4), 5);
        assert!(store.reduce_over_range(Some("Nowhere"), range, None, 1).is_empty());
    }
}
