//! 存储模块
//!
//! 同一数据集的两种物理布局：
//! - `RowStore`: 实体优先，每个实体一段按轴值升序的测量序列
//! - `ColumnStore`: 轴优先，每个轴点一段测量切片
//!
//! 两者都实现 `LayoutStore`，导入流水线只依赖该 trait。

pub mod column;
pub mod index;
pub mod row;
pub mod types;

pub use column::ColumnStore;
pub use index::{AxisIndex, Catalog, EntityIndex, ParamFilter};
pub use row::RowStore;
pub use types::{
    AxisRange, BoundingBox, EntityId, EntityMeta, GeoPoint, MeasureValue, Measurement,
    Observation, ParamId,
};

/// 存储构建选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// 每个 (实体, 轴值, 参数) 至多一条测量。
    /// 列式存储据此在单个槽位内命中后提前结束扫描。
    pub unique_cells: bool,
}

/// 导入阶段的存储接口
///
/// 生命周期：空 → 多次 append / merge → seal → 只读查询。
pub trait LayoutStore<V: MeasureValue>: Send + Sized {
    /// 布局名称 ("row" / "column")
    const LAYOUT: &'static str;

    fn with_options(options: StoreOptions) -> Self;

    /// 预先声明轴 (人口数据的年份表头)
    fn declare_axis(&mut self, values: &[i64]);

    fn append(&mut self, observation: &Observation<V>);

    /// 合并另一个独立构建的存储，合并后仍满足排序不变式
    fn merge(&mut self, other: Self);

    /// 结束导入：恢复排序不变式，幂等
    fn seal(&mut self);

    fn is_sealed(&self) -> bool;

    fn catalog(&self) -> &Catalog;

    fn axis(&self) -> &AxisIndex;

    fn measurement_count(&self) -> usize;

    /// 全部带坐标测量的外包矩形
    fn bounds(&self) -> Option<BoundingBox>;
}

/// 把观测转换为本存储下标空间中的测量
pub(crate) fn resolve_observation<V: MeasureValue>(
    catalog: &mut Catalog,
    observation: &Observation<V>,
) -> Measurement<V> {
    let entity = catalog.register_entity(&observation.entity, &observation.meta);
    let parameter = observation
        .parameter
        .as_deref()
        .map(|name| catalog.register_parameter(name));

    Measurement {
        entity,
        axis: observation.axis,
        parameter,
        value: observation.value,
        position: observation.meta.position,
        category: observation.category,
    }
}
