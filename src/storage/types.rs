//! 存储层基础类型
//!
//! - `MeasureValue`: 测量值抽象 (人口计数为 i64，浓度 / AQI 为 f64)
//! - `Measurement`: 已入库的测量 (实体下标 + 轴值 + 可选参数 + 数值)
//! - `Observation`: 导入阶段的原始观测 (仍以字符串标识实体和参数)

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 实体稠密下标
pub type EntityId = u32;

/// 参数 (污染物类型) 稠密下标
pub type ParamId = u32;

// ═══════════════════════════════════════════════════════════════════════════
// 测量值
// ═══════════════════════════════════════════════════════════════════════════

/// 测量值类型
///
/// 聚合所需的全部运算都在这里定义，引擎其余部分对具体数值类型无感知。
pub trait MeasureValue:
    Copy + Send + Sync + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Serialize + 'static
{
    const ZERO: Self;

    /// 非有限值 (NaN / ±Inf) 不参与任何聚合与排名
    fn is_valid(self) -> bool;

    /// 求和 (整数饱和加法)
    ///
    /// 分区合并要求满足结合律：整数饱和加法只在同号输入上满足，
    /// 因此整数测量值必须非负 (人口适配器在解析时拒绝负数)。
    fn accumulate(self, other: Self) -> Self;

    fn to_f64(self) -> f64;

    /// 排名用全序
    fn rank_cmp(&self, other: &Self) -> Ordering;

    /// 从 CSV 字段解析
    fn parse_field(field: &str) -> Option<Self>;
}

/// 能无损转换为 i64 的浮点数上界 (2^63)
const I64_FLOAT_LIMIT: f64 = 9_223_372_036_854_775_808.0;

impl MeasureValue for i64 {
    const ZERO: Self = 0;

    #[inline]
    fn is_valid(self) -> bool {
        true
    }

    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self.saturating_add(other)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn parse_field(field: &str) -> Option<Self> {
        let field = field.trim();
        field.parse::<i64>().ok().or_else(|| {
            // 部分数据源把整数写成 "1234.0"
            field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < I64_FLOAT_LIMIT)
                .map(|v| v as i64)
        })
    }
}

impl MeasureValue for f64 {
    const ZERO: Self = 0.0;

    #[inline]
    fn is_valid(self) -> bool {
        self.is_finite()
    }

    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self + other
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn parse_field(field: &str) -> Option<Self> {
        field.trim().parse::<f64>().ok()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 地理类型
// ═══════════════════════════════════════════════════════════════════════════

/// 经纬度坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// 经纬度矩形 (闭区间)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// 单点退化矩形
    pub fn around(point: GeoPoint) -> Self {
        Self::new(point.lat, point.lat, point.lon, point.lon)
    }

    #[inline]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }

    /// 扩展以包含给定点
    pub fn expand(&mut self, point: &GeoPoint) {
        self.min_lat = self.min_lat.min(point.lat);
        self.max_lat = self.max_lat.max(point.lat);
        self.min_lon = self.min_lon.min(point.lon);
        self.max_lon = self.max_lon.max(point.lon);
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_lat.min(other.min_lat),
            self.max_lat.max(other.max_lat),
            self.min_lon.min(other.min_lon),
            self.max_lon.max(other.max_lon),
        )
    }
}

/// 合并两个可选外包矩形
pub(crate) fn union_bounds(a: Option<BoundingBox>, b: Option<BoundingBox>) -> Option<BoundingBox> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(&b)),
        (a, None) => a,
        (None, b) => b,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 轴区间
// ═══════════════════════════════════════════════════════════════════════════

/// 轴值闭区间 `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisRange {
    pub start: i64,
    pub end: i64,
}

impl AxisRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// 单点区间
    pub fn point(value: i64) -> Self {
        Self::new(value, value)
    }

    /// start > end 视为空区间
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        value >= self.start && value <= self.end
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 测量
// ═══════════════════════════════════════════════════════════════════════════

/// 已入库的测量
///
/// `entity` / `parameter` 是所属存储 `Catalog` 中的下标，不能跨存储使用。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement<V> {
    pub entity: EntityId,
    pub axis: i64,
    pub parameter: Option<ParamId>,
    pub value: V,
    pub position: Option<GeoPoint>,
    /// AQI 类别 (0 良 .. 5 危险)
    pub category: Option<u8>,
}

/// 实体元数据 (首次出现时缓存，之后不再覆盖)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    /// 备用键 (国家代码 / AQS 代码)
    pub alias: Option<String>,
    /// 描述 (指标名 / 站点位置)
    pub label: Option<String>,
    pub agency: Option<String>,
    pub position: Option<GeoPoint>,
}

/// 导入阶段的观测记录
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<V> {
    pub entity: String,
    pub axis: i64,
    pub parameter: Option<String>,
    pub value: V,
    pub category: Option<u8>,
    pub meta: EntityMeta,
}

impl<V> Observation<V> {
    pub fn new(entity: impl Into<String>, axis: i64, value: V) -> Self {
        Self {
            entity: entity.into(),
            axis,
            parameter: None,
            value,
            category: None,
            meta: EntityMeta::default(),
        }
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn with_category(mut self, category: u8) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_meta(mut self, meta: EntityMeta) -> Self {
        self.meta = meta;
        self
    }
}
