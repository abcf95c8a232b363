//! 查询结果类型

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::types::{AxisRange, BoundingBox, MeasureValue};

/// 聚合操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggOp {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggOp {
    pub const ALL: [AggOp; 5] = [AggOp::Sum, AggOp::Avg, AggOp::Min, AggOp::Max, AggOp::Count];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggOp::Sum => "sum",
            AggOp::Avg => "avg",
            AggOp::Min => "min",
            AggOp::Max => "max",
            AggOp::Count => "count",
        }
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(AggOp::Sum),
            "avg" | "average" | "mean" => Ok(AggOp::Avg),
            "min" => Ok(AggOp::Min),
            "max" => Ok(AggOp::Max),
            "count" => Ok(AggOp::Count),
            other => Err(format!("unknown aggregation: {}", other)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 部分聚合
// ═══════════════════════════════════════════════════════════════════════════

/// 部分聚合结果
///
/// `combine` 满足结合律，各分区的部分结果按分区顺序合并；
/// 平均值在合并之后由 sum / count 得出。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial<V> {
    pub sum: V,
    pub count: u64,
    pub min: Option<V>,
    pub max: Option<V>,
}

impl<V: MeasureValue> Default for Partial<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V: MeasureValue> Partial<V> {
    pub fn empty() -> Self {
        Self {
            sum: V::ZERO,
            count: 0,
            min: None,
            max: None,
        }
    }

    /// 纳入一个值；非有限值被忽略
    #[inline]
    pub fn observe(&mut self, value: V) {
        if !value.is_valid() {
            return;
        }
        self.sum = self.sum.accumulate(value);
        self.count += 1;
        self.min = Some(match self.min {
            Some(m) if m <= value => m,
            _ => value,
        });
        self.max = Some(match self.max {
            Some(m) if m >= value => m,
            _ => value,
        });
    }

    pub fn combine(self, other: Self) -> Self {
        let min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(if a <= b { a } else { b }),
            (a, b) => a.or(b),
        };
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(if a >= b { a } else { b }),
            (a, b) => a.or(b),
        };

        Self {
            sum: self.sum.accumulate(other.sum),
            count: self.count + other.count,
            min,
            max,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 平均值，空时为 0.0
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum.to_f64() / self.count as f64
        }
    }

    /// 生成最终结果；没有匹配时返回零值哨兵
    pub fn finish(&self, op: AggOp) -> AggValue<V> {
        match op {
            AggOp::Sum => AggValue::Value(self.sum),
            AggOp::Avg => AggValue::Mean(self.mean()),
            AggOp::Min => AggValue::Value(self.min.unwrap_or(V::ZERO)),
            AggOp::Max => AggValue::Value(self.max.unwrap_or(V::ZERO)),
            AggOp::Count => AggValue::Count(self.count),
        }
    }
}

impl<V: MeasureValue> FromIterator<V> for Partial<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut partial = Partial::empty();
        for value in iter {
            partial.observe(value);
        }
        partial
    }
}

/// 聚合结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggValue<V> {
    Value(V),
    Mean(f64),
    Count(u64),
}

impl<V: MeasureValue> AggValue<V> {
    pub fn as_f64(&self) -> f64 {
        match self {
            AggValue::Value(v) => v.to_f64(),
            AggValue::Mean(m) => *m,
            AggValue::Count(c) => *c as f64,
        }
    }
}

impl<V: MeasureValue> fmt::Display for AggValue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggValue::Value(v) => write!(f, "{}", v),
            AggValue::Mean(m) => write!(f, "{:.4}", m),
            AggValue::Count(c) => write!(f, "{}", c),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 序列与排名
// ═══════════════════════════════════════════════════════════════════════════

/// 时间序列中的一点
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint<V> {
    pub axis: i64,
    pub value: V,
}

/// Top-N 结果项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry<K> {
    pub entity: String,
    pub value: K,
}

/// AQI 类别数 (0 良, 1 中等, 2 敏感人群不健康, 3 不健康, 4 非常不健康, 5 危险)
pub const CATEGORY_COUNT: usize = 6;

/// 按 AQI 类别计数，下标即类别
pub type CategoryCounts = [u64; CATEGORY_COUNT];

/// 存储统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub layout: &'static str,
    pub entities: usize,
    pub parameters: usize,
    pub axis_points: usize,
    pub measurements: usize,
    pub axis_span: Option<AxisRange>,
    pub bounds: Option<BoundingBox>,
}
