//! 服务门面
//!
//! 与布局无关的查询入口。门面独占已 seal 的存储，可放进 `Arc` 在线程间共享；
//! 每个查询都显式接收 `workers` 参数 (1 = 串行)。

use std::marker::PhantomData;

use crate::query::{AggOp, AggValue, AnalyticalQueries, CategoryCounts, RankedEntry, SeriesPoint, StoreStats};
use crate::storage::types::{AxisRange, BoundingBox, EntityMeta, MeasureValue};

/// 服务门面
#[derive(Debug, Clone)]
pub struct ServiceFacade<V, S> {
    store: S,
    _value: PhantomData<fn() -> V>,
}

impl<V, S> ServiceFacade<V, S>
where
    V: MeasureValue,
    S: AnalyticalQueries<V>,
{
    /// 接管存储；未 seal 的存储在此 seal
    pub fn new(mut store: S) -> Self {
        store.seal();
        Self {
            store,
            _value: PhantomData,
        }
    }

    pub fn layout_name(&self) -> &'static str {
        S::LAYOUT
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 轴点聚合
    // ═══════════════════════════════════════════════════════════════════════

    pub fn reduce_at(&self, axis: i64, parameter: Option<&str>, op: AggOp, workers: usize) -> AggValue<V> {
        self.store.reduce_at(axis, parameter, workers).finish(op)
    }

    pub fn sum_at(&self, axis: i64, parameter: Option<&str>, workers: usize) -> V {
        self.store.reduce_at(axis, parameter, workers).sum
    }

    pub fn avg_at(&self, axis: i64, parameter: Option<&str>, workers: usize) -> f64 {
        self.store.reduce_at(axis, parameter, workers).mean()
    }

    pub fn min_at(&self, axis: i64, parameter: Option<&str>, workers: usize) -> V {
        self.store
            .reduce_at(axis, parameter, workers)
            .min
            .unwrap_or(V::ZERO)
    }

    pub fn max_at(&self, axis: i64, parameter: Option<&str>, workers: usize) -> V {
        self.store
            .reduce_at(axis, parameter, workers)
            .max
            .unwrap_or(V::ZERO)
    }

    pub fn count_at(&self, axis: i64, parameter: Option<&str>, workers: usize) -> u64 {
        self.store.reduce_at(axis, parameter, workers).count
    }

    pub fn top_n(&self, n: usize, axis: i64, parameter: Option<&str>, workers: usize) -> Vec<RankedEntry<V>> {
        self.store.top_n(n, axis, parameter, workers)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 实体查询
    // ═══════════════════════════════════════════════════════════════════════

    pub fn series_for_entity(&self, entity: &str, parameter: Option<&str>, workers: usize) -> Vec<SeriesPoint<V>> {
        self.store.series_for_entity(entity, parameter, workers)
    }

    pub fn series_in_range(
        &self,
        entity: &str,
        range: AxisRange,
        parameter: Option<&str>,
        workers: usize,
    ) -> Vec<SeriesPoint<V>> {
        self.store.series_in_range(entity, range, parameter, workers)
    }

    pub fn value_at(&self, entity: &str, axis: i64, parameter: Option<&str>) -> Option<V> {
        self.store.value_at(entity, axis, parameter)
    }

    /// 实体在区间内的平均值
    pub fn avg_for_entity_in_range(
        &self,
        entity: &str,
        range: AxisRange,
        parameter: Option<&str>,
        workers: usize,
    ) -> f64 {
        self.store
            .reduce_over_range(Some(entity), range, parameter, workers)
            .mean()
    }

    pub fn reduce_for_entity(&self, entity: &str, parameter: Option<&str>, op: AggOp, workers: usize) -> AggValue<V> {
        self.store.reduce_for_entity(entity, parameter, workers).finish(op)
    }

    /// 实体的缓存元数据 (按主键或别名)
    pub fn entity_meta(&self, entity: &str) -> Option<&EntityMeta> {
        let catalog = self.store.catalog();
        catalog.resolve_entity(entity).map(|id| catalog.meta(id))
    }

    /// 按实体聚合值排名
    pub fn top_entities(
        &self,
        n: usize,
        op: AggOp,
        parameter: Option<&str>,
        workers: usize,
    ) -> Vec<RankedEntry<f64>> {
        self.store.top_n_entities(n, op, parameter, workers)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 区间 / 全量 / 地理
    // ═══════════════════════════════════════════════════════════════════════

    pub fn reduce_over_range(
        &self,
        entity: Option<&str>,
        range: AxisRange,
        parameter: Option<&str>,
        op: AggOp,
        workers: usize,
    ) -> AggValue<V> {
        self.store
            .reduce_over_range(entity, range, parameter, workers)
            .finish(op)
    }

    pub fn count_in_range(&self, range: AxisRange, parameter: Option<&str>, workers: usize) -> u64 {
        self.store.count_in_range(range, parameter, workers)
    }

    pub fn reduce_all(&self, parameter: Option<&str>, op: AggOp, workers: usize) -> AggValue<V> {
        self.store.reduce_all(parameter, workers).finish(op)
    }

    pub fn count_in_bbox(&self, bbox: &BoundingBox, parameter: Option<&str>, workers: usize) -> u64 {
        self.store.reduce_in_bbox(bbox, parameter, workers).count
    }

    pub fn avg_in_bbox(&self, bbox: &BoundingBox, parameter: Option<&str>, workers: usize) -> f64 {
        self.store.reduce_in_bbox(bbox, parameter, workers).mean()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // AQI 类别
    // ═══════════════════════════════════════════════════════════════════════

    pub fn category_distribution(&self, parameter: Option<&str>, workers: usize) -> CategoryCounts {
        self.store.category_distribution(parameter, workers)
    }

    pub fn count_by_category(&self, category: u8, parameter: Option<&str>, workers: usize) -> u64 {
        self.store.count_by_category(category, parameter, workers)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 目录
    // ═══════════════════════════════════════════════════════════════════════

    pub fn entity_count(&self) -> usize {
        self.store.catalog().entity_count()
    }

    pub fn measurement_count(&self) -> usize {
        self.store.measurement_count()
    }

    pub fn entities(&self) -> Vec<&str> {
        self.store.catalog().entities().iter().map(|(_, key)| key).collect()
    }

    pub fn parameters(&self) -> Vec<&str> {
        self.store.catalog().parameters().iter().map(|(_, name)| name).collect()
    }

    pub fn axis_values(&self) -> &[i64] {
        self.store.axis().values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{GeoPoint, Observation};
    use crate::storage::{ColumnStore, RowStore};

    fn sites<S: AnalyticalQueries<f64> + Default>() -> ServiceFacade<f64, S> {
        let mut store = S::default();
        let rows = [
            ("Chico", 100, "PM2.5", 180.0, (39.76, -121.84)),
            ("Chico", 200, "PM2.5", 120.0, (39.76, -121.84)),
            ("Redding", 100, "PM2.5", 90.0, (40.55, -122.38)),
            ("Fresno", 100, "OZONE", 0.05, (36.78, -119.77)),
        ];
        for (site, ts, param, value, (lat, lon)) in rows {
            let meta = EntityMeta {
                position: Some(GeoPoint::new(lat, lon)),
                ..EntityMeta::default()
            };
            let category = if value > 100.0 { 4 } else { 1 };
            store.append(
                &Observation::new(site, ts, value)
                    .with_parameter(param)
                    .with_category(category)
                    .with_meta(meta),
            );
        }
        ServiceFacade::new(store)
    }

    fn check<S: AnalyticalQueries<f64> + Default>() {
        let service = sites::<S>();

        assert_eq!(service.sum_at(100, Some("PM2.5"), 1), 270.0);
        assert_eq!(service.max_at(100, None, 2), 180.0);
        assert_eq!(service.min_at(999, None, 1), 0.0);
        assert_eq!(service.count_at(100, None, 4), 3);
        assert_eq!(service.avg_for_entity_in_range("Chico", AxisRange::new(0, 500), None, 1), 150.0);

        // 北加州
        let north = BoundingBox::new(39.0, 41.0, -123.0, -121.0);
        assert_eq!(service.count_in_bbox(&north, None, 2), 3);
        assert_eq!(service.avg_in_bbox(&north, Some("PM2.5"), 1), 130.0);

        let top = service.top_entities(1, AggOp::Avg, Some("PM2.5"), 2);
        assert_eq!(top[0].entity, "Chico");
        assert_eq!(top[0].value, 150.0);

        assert_eq!(service.parameters(), vec!["PM2.5", "OZONE"]);
        assert_eq!(service.entity_count(), 3);
        assert!(service.entity_meta("Redding").is_some());

        assert_eq!(service.category_distribution(None, 2), [0, 2, 0, 0, 2, 0]);
        assert_eq!(service.count_by_category(4, Some("PM2.5"), 1), 2);

        // 每个站点只占一个名次
        let top = service.top_n(3, 100, None, 1);
        assert_eq!(top.len(), 3);
        assert_eq!(top[2].entity, "Fresno");
    }

    #[test]
    fn test_facade_row() {
        check::<RowStore<f64>>();
    }

    #[test]
    fn test_facade_column() {
        check::<ColumnStore<f64>>();
    }
}
