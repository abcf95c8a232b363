//! 行式布局上的查询
//!
//! 单实体查询 O(1) 定位实体后扫描一段有序序列；
//! 按轴点 / 跨实体的查询需要遍历全部实体，每个实体内用二分查找定位轴值。
//! 并行路径按实体分区。

use crate::query::parallel::{partitioned, partitioned_fold};
use crate::query::topn::{merge_heaps, rank_serial, BoundedMinHeap, Candidate};
use crate::query::{
    add_counts, fold_where, inside, tally_categories, AggOp, AnalyticalQueries, CategoryCounts, Partial,
    RankedEntry, SeriesPoint,
};
use crate::storage::index::ParamFilter;
use crate::storage::types::{AxisRange, BoundingBox, MeasureValue, Measurement};
use crate::storage::{LayoutStore, RowStore};

/// 有序序列中轴值落在 `[start, end]` 内的子切片
#[inline]
fn window<V>(sequence: &[Measurement<V>], start: i64, end: i64) -> &[Measurement<V>] {
    let lo = sequence.partition_point(|m| m.axis < start);
    let hi = lo + sequence[lo..].partition_point(|m| m.axis <= end);
    &sequence[lo..hi]
}

impl<V: MeasureValue> RowStore<V> {
    /// 单实体区间聚合：定位起点后顺序扫描，越过 end 即停止
    fn reduce_entity_range(
        &self,
        sequence: &[Measurement<V>],
        range: AxisRange,
        filter: ParamFilter,
        workers: usize,
    ) -> Partial<V> {
        let lo = sequence.partition_point(|m| m.axis < range.start);
        let tail = &sequence[lo..];

        if workers <= 1 {
            let mut partial = Partial::empty();
            for m in tail.iter().take_while(|m| m.axis <= range.end) {
                if filter.accepts(m.parameter) {
                    partial.observe(m.value);
                }
            }
            return partial;
        }

        let span = window(tail, range.start, range.end);
        partitioned_fold(
            workers,
            span.len(),
            |r| fold_where(&span[r], filter, |_| true),
            Partial::combine,
        )
    }

    /// 跨实体并行折叠，每个实体只交给 `visit` 一段子切片
    fn fold_entities<F>(&self, workers: usize, visit: F) -> Partial<V>
    where
        F: Fn(&[Measurement<V>]) -> Partial<V> + Sync + Send,
    {
        let sequences = self.sequences();
        partitioned_fold(
            workers,
            sequences.len(),
            |r| {
                sequences[r]
                    .iter()
                    .fold(Partial::empty(), |acc, seq| acc.combine(visit(seq.as_slice())))
            },
            Partial::combine,
        )
    }

    /// 按实体聚合后排名
    fn rank_entities(&self, n: usize, op: AggOp, filter: ParamFilter, workers: usize) -> Vec<RankedEntry<f64>> {
        let catalog = self.catalog();
        let sequences = self.sequences();
        let score = move |id: usize| {
            let partial = fold_where(&sequences[id], filter, |_| true);
            if partial.is_empty() {
                return None;
            }
            Some(Candidate::new(
                catalog.entity_key(id as u32),
                partial.finish(op).as_f64(),
            ))
        };

        if workers <= 1 {
            let candidates = (0..sequences.len()).filter_map(&score).collect();
            return rank_serial(candidates, n);
        }

        let heaps = partitioned(workers, sequences.len(), |r| {
            let mut heap = BoundedMinHeap::new(n);
            for id in r {
                if let Some(candidate) = score(id) {
                    heap.push(candidate);
                }
            }
            heap
        });
        merge_heaps(heaps, n)
    }
}

impl<V: MeasureValue> AnalyticalQueries<V> for RowStore<V> {
    fn reduce_at(&self, axis: i64, parameter: Option<&str>, workers: usize) -> Partial<V> {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() {
            return Partial::empty();
        }

        self.fold_entities(workers, |seq| fold_where(window(seq, axis, axis), filter, |_| true))
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

        let span = window(self.sequence_of(entity), range.start, range.end);
        let collect = |slice: &[Measurement<V>]| -> Vec<SeriesPoint<V>> {
            slice
                .iter()
                .filter(|m| filter.accepts(m.parameter) && m.value.is_valid())
                .map(|m| SeriesPoint {
                    axis: m.axis,
                    value: m.value,
                })
                .collect()
        };

        if workers <= 1 {
            return collect(span);
        }
        partitioned(workers, span.len(), |r| collect(&span[r]))
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

        match entity {
            Some(key) => match self.catalog().resolve_entity(key) {
                Some(id) => self.reduce_entity_range(self.sequence(id), range, filter, workers),
                None => Partial::empty(),
            },
            None => self.fold_entities(workers, |seq| {
                fold_where(window(seq, range.start, range.end), filter, |_| true)
            }),
        }
    }

    fn top_n(&self, n: usize, axis: i64, parameter: Option<&str>, workers: usize) -> Vec<RankedEntry<V>> {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() || n == 0 {
            return Vec::new();
        }

        let catalog = self.catalog();
        let sequences = self.sequences();
        // 每个实体至多一个候选：该轴点上匹配测量中的最大值
        let best_of = move |id: usize| {
            window(&sequences[id], axis, axis)
                .iter()
                .filter(|m| filter.accepts(m.parameter) && m.value.is_valid())
                .max_by(|a, b| a.value.rank_cmp(&b.value))
                .map(|m| Candidate::new(catalog.entity_key(id as u32), m.value))
        };

        if workers <= 1 {
            let candidates = (0..sequences.len()).filter_map(&best_of).collect();
            return rank_serial(candidates, n);
        }

        let heaps = partitioned(workers, sequences.len(), |r| {
            let mut heap = BoundedMinHeap::new(n);
            for candidate in r.filter_map(&best_of) {
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
        self.rank_entities(n, op, filter, workers)
    }

    fn reduce_in_bbox(&self, bbox: &BoundingBox, parameter: Option<&str>, workers: usize) -> Partial<V> {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() {
            return Partial::empty();
        }

        self.fold_entities(workers, |seq| fold_where(seq, filter, |m| inside(m, bbox)))
    }

    fn category_distribution(&self, parameter: Option<&str>, workers: usize) -> CategoryCounts {
        let filter = self.catalog().param_filter(parameter);
        if filter.is_nothing() {
            return CategoryCounts::default();
        }

        let sequences = self.sequences();
        partitioned_fold(
            workers,
            sequences.len(),
            |r| {
                let mut counts = CategoryCounts::default();
                for seq in &sequences[r] {
                    tally_categories(seq, filter, &mut counts);
                }
                counts
            },
            add_counts,
        )
    }

    fn value_at(&self, entity: &str, axis: i64, parameter: Option<&str>) -> Option<V> {
        let filter = self.catalog().param_filter(parameter);
        window(self.sequence_of(entity), axis, axis)
            .iter()
            .find(|m| filter.accepts(m.parameter) && m.value.is_valid())
            .map(|m| m.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::Observation;

    fn population() -> RowStore<i64> {
        let mut store = RowStore::new();
        let rows = [
            ("Country1", [1_000_000, 1_100_000, 1_200_000]),
            ("Country2", [2_000_000, 2_200_000, 2_400_000]),
            ("Country3", [500_000, 550_000, 600_000]),
        ];
        for (country, values) in rows {
            for (year, value) in [2020, 2021, 2022].into_iter().zip(values) {
                store.append(&Observation::new(country, year, value));
            }
        }
        store.seal();
        store
    }

    #[test]
    fn test_window() {
        let store = population();
        let seq = store.sequence_of("Country1");
        assert_eq!(window(seq, 2021, 2022).len(), 2);
        assert!(window(seq, 2023, 2030).is_empty());
        assert!(window(seq, 1990, 2000).is_empty());
    }

    #[test]
    fn test_reduce_at() {
        let store = population();
        for workers in [1, 2, 4] {
            let partial = store.reduce_at(2021, None, workers);
            assert_eq!(partial.sum, 3_850_000);
            assert_eq!(partial.count, 3);
        }
        assert!(store.reduce_at(1999, None, 1).is_empty());
    }

    #[test]
    fn test_entity_range_early_stop() {
        let store = population();
        let range = AxisRange::new(2020, 2021);
        for workers in [1, 4] {
            let partial = store.reduce_over_range(Some("Country2"), range, None, workers);
            assert_eq!(partial.sum, 4_200_000);
            assert_eq!(partial.mean(), 2_100_000.0);
        }
    }

    #[test]
    fn test_value_at_and_series() {
        let store = population();
        assert_eq!(store.value_at("Country3", 2022, None), Some(600_000));
        assert_eq!(store.value_at("Country3", 2030, None), None);

        let series = store.series_for_entity("Country1", None, 2);
        let years: Vec<i64> = series.iter().map(|p| p.axis).collect();
        assert_eq!(years, vec![2020, 2021, 2022]);
        assert!(store.series_for_entity("Nowhere", None, 1).is_empty());
    }

    #[test]
    fn test_top_n_one_candidate_per_entity() {
        let mut store = RowStore::new();
        store.append(&Observation::new("S1", 100, 50.0).with_parameter("PM2.5"));
        store.append(&Observation::new("S1", 100, 40.0).with_parameter("PM10"));
        store.append(&Observation::new("S2", 100, 10.0).with_parameter("PM2.5"));
        store.seal();

        for workers in [1, 4] {
            let top = store.top_n(2, 100, None, workers);
            let ranked: Vec<(&str, f64)> = top.iter().map(|e| (e.entity.as_str(), e.value)).collect();
            assert_eq!(ranked, vec![("S1", 50.0), ("S2", 10.0)]);
        }
        let pm10 = store.top_n(5, 100, Some("PM10"), 1);
        assert_eq!(pm10.len(), 1);
        assert_eq!(pm10[0].value, 40.0);
    }

    #[test]
    fn test_category_distribution() {
        let mut store = RowStore::new();
        for (site, ts, category) in [("S1", 1, 0), ("S1", 2, 3), ("S2", 1, 3), ("S2", 2, 9)] {
            store.append(
                &Observation::new(site, ts, 1.0)
                    .with_parameter("PM2.5")
                    .with_category(category),
            );
        }
        store.append(&Observation::new("S3", 1, 1.0).with_parameter("OZONE"));
        store.seal();

        for workers in [1, 2, 4] {
            // 类别 9 越界、OZONE 无类别，都不计入
            assert_eq!(store.category_distribution(None, workers), [1, 0, 0, 2, 0, 0]);
            assert_eq!(store.count_by_category(3, Some("PM2.5"), workers), 2);
        }
        assert_eq!(store.count_by_category(7, None, 1), 0);
        assert_eq!(store.category_distribution(Some("CO"), 1), [0; 6]);
    }

    #[test]
    fn test_top_n_entities() {
        let store = population();
        let top = store.top_n_entities(2, AggOp::Max, None, 1);
        assert_eq!(top[0].entity, "Country2");
        assert_eq!(top[0].value, 2_400_000.0);
        assert_eq!(top, store.top_n_entities(2, AggOp::Max, None, 4));
    }
}
