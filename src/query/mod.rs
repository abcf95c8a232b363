// 查询引擎模块
//
// 架构：
// ┌─────────────────────────────────────────────────────────────┐
// │                      Query Layer                            │
// │                                                             │
// │          ┌──────────────────────────────────┐               │
// │          │   AnalyticalQueries<V> (trait)   │               │
// │          └──────────────────────────────────┘               │
// │                 │                    │                      │
// │        ┌────────▼───────┐   ┌────────▼───────┐              │
// │        │ RowStore 实现  │   │ColumnStore 实现│              │
// │        │ (实体循环)     │   │ (槽位直达)     │              │
// │        └────────────────┘   └────────────────┘              │
// │                 │                    │                      │
// │        ┌────────▼────────────────────▼───────┐              │
// │        │ parallel (分区 + 顺序合并) / topn   │              │
// │        └─────────────────────────────────────┘              │
// └─────────────────────────────────────────────────────────────┘
//
// 每个操作都接收 workers 参数：0 或 1 走串行路径，更大的值在对应线程池上分区执行。
// 两种布局、串行与并行路径对同一输入给出相同结果。

pub mod column;
pub mod parallel;
pub mod row;
pub mod topn;
pub mod types;

pub use types::*;

use crate::storage::index::{Catalog, ParamFilter};
use crate::storage::types::{AxisRange, BoundingBox, MeasureValue, Measurement};
use crate::storage::LayoutStore;

/// 覆盖全部轴值的区间
pub const FULL_RANGE: AxisRange = AxisRange {
    start: i64::MIN,
    end: i64::MAX,
};

/// 分析查询接口
///
/// 查询不修改存储；未知实体、未知轴值、未知参数、空区间都返回零值 / 空结果哨兵。
/// 调用前存储必须已 `seal`。
pub trait AnalyticalQueries<V: MeasureValue>: LayoutStore<V> + Sync {
    /// 轴点上的聚合 (`reduceAt`)
    fn reduce_at(&self, axis: i64, parameter: Option<&str>, workers: usize) -> Partial<V>;

    /// 实体在区间内的序列，按轴值升序
    fn series_in_range(
        &self,
        entity: &str,
        range: AxisRange,
        parameter: Option<&str>,
        workers: usize,
    ) -> Vec<SeriesPoint<V>>;

    /// 区间聚合；`entity` 为 `None` 时覆盖全部实体
    fn reduce_over_range(
        &self,
        entity: Option<&str>,
        range: AxisRange,
        parameter: Option<&str>,
        workers: usize,
    ) -> Partial<V>;

    /// 轴点上数值最大的 n 条测量
    fn top_n(&self, n: usize, axis: i64, parameter: Option<&str>, workers: usize) -> Vec<RankedEntry<V>>;

    /// 按实体聚合值排名的前 n 个实体
    fn top_n_entities(
        &self,
        n: usize,
        op: AggOp,
        parameter: Option<&str>,
        workers: usize,
    ) -> Vec<RankedEntry<f64>>;

    /// 坐标落在矩形内 (含边界) 的测量的聚合
    fn reduce_in_bbox(&self, bbox: &BoundingBox, parameter: Option<&str>, workers: usize) -> Partial<V>;

    /// 实体在轴点上的第一条匹配测量
    fn value_at(&self, entity: &str, axis: i64, parameter: Option<&str>) -> Option<V>;

    /// 匹配测量在各 AQI 类别上的分布；无类别或类别越界的测量不计入
    fn category_distribution(&self, parameter: Option<&str>, workers: usize) -> CategoryCounts;

    /// 单个 AQI 类别的测量条数
    fn count_by_category(&self, category: u8, parameter: Option<&str>, workers: usize) -> u64 {
        self.category_distribution(parameter, workers)
            .get(category as usize)
            .copied()
            .unwrap_or(0)
    }

    /// 实体的完整序列 (`seriesForEntity`)
    fn series_for_entity(&self, entity: &str, parameter: Option<&str>, workers: usize) -> Vec<SeriesPoint<V>> {
        self.series_in_range(entity, FULL_RANGE, parameter, workers)
    }

    /// 区间内匹配测量的条数
    fn count_in_range(&self, range: AxisRange, parameter: Option<&str>, workers: usize) -> u64 {
        self.reduce_over_range(None, range, parameter, workers).count
    }

    /// 全部测量的聚合
    fn reduce_all(&self, parameter: Option<&str>, workers: usize) -> Partial<V> {
        self.reduce_over_range(None, FULL_RANGE, parameter, workers)
    }

    /// 单个实体全部测量的聚合
    fn reduce_for_entity(&self, entity: &str, parameter: Option<&str>, workers: usize) -> Partial<V> {
        self.reduce_over_range(Some(entity), FULL_RANGE, parameter, workers)
    }

    fn stats(&self) -> StoreStats {
        let catalog: &Catalog = self.catalog();
        StoreStats {
            layout: Self::LAYOUT,
            entities: catalog.entity_count(),
            parameters: catalog.parameter_count(),
            axis_points: self.axis().len(),
            measurements: self.measurement_count(),
            axis_span: self.axis().span(),
            bounds: self.bounds(),
        }
    }
}

/// 折叠一段测量
#[inline]
pub(crate) fn fold_where<V, P>(measurements: &[Measurement<V>], filter: ParamFilter, mut pred: P) -> Partial<V>
where
    V: MeasureValue,
    P: FnMut(&Measurement<V>) -> bool,
{
    let mut partial = Partial::empty();
    for m in measurements {
        if filter.accepts(m.parameter) && pred(m) {
            partial.observe(m.value);
        }
    }
    partial
}

/// 把一段测量的类别计入 `counts`
#[inline]
pub(crate) fn tally_categories<V>(measurements: &[Measurement<V>], filter: ParamFilter, counts: &mut CategoryCounts) {
    for m in measurements {
        if !filter.accepts(m.parameter) {
            continue;
        }
        if let Some(category) = m.category {
            if let Some(count) = counts.get_mut(category as usize) {
                *count += 1;
            }
        }
    }
}

/// 按类别逐项相加
pub(crate) fn add_counts(mut total: CategoryCounts, part: CategoryCounts) -> CategoryCounts {
    for (t, p) in total.iter_mut().zip(part) {
        *t += p;
    }
    total
}

/// 测量坐标是否落在矩形内
#[inline]
pub(crate) fn inside(m: &Measurement<impl MeasureValue>, bbox: &BoundingBox) -> bool {
    m.position.map_or(false, |p| bbox.contains(&p))
}
