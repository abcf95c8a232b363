//! # DUALSTORE-RS
//!
//! 内存双布局分析引擎 - 同一数据集同时以行式 (实体优先) 与列式 (轴优先) 两种物理布局存储
//!
//! ## 核心能力
//!
//! - **索引**: 实体键 ↔ 稠密下标 (字符串驻留)，轴值 ↔ 稠密下标 (有序，二分范围查询)
//! - **行式存储**: 每个实体一段按轴值升序的测量序列
//! - **列式存储**: 每个轴点一段测量切片，覆盖该轴点上的全部实体
//! - **数据导入**: 串行逐文件导入，或按文件并行导入后顺序合并
//! - **查询引擎**: 聚合 / 时间序列 / 区间 / Top-N / 地理框，每种查询都有串行与并行两条路径
//! - **服务门面**: 与布局无关的查询接口
//!
//! ## 架构设计
//!
//! ```text
//! CSV 文件
//!     ↓
//! Domain Adapter (domain/)      ← 人口 / 空气质量 / 火情传感器
//!     ↓
//! Ingestion Pipeline (ingest/)
//!     ↓
//! RowStore | ColumnStore (storage/) + EntityIndex / AxisIndex
//!     ↓
//! Query Engine (query/)         ← rayon 分区并行 + 有界小顶堆 Top-N
//!     ↓
//! Service Facade (service/)
//! ```
//!
//! 导入完成后模型只读，查询可在任意线程并发执行。

// ============================================================================
// 外部依赖
// ============================================================================

pub use rayon;
pub use serde;
pub use chrono;
pub use log;
pub use thiserror;

// ============================================================================
// 内部模块
// ============================================================================

/// 存储层: 索引、行式与列式布局
pub mod storage;

/// 查询引擎 (行式 / 列式实现，串行 / 并行路径)
pub mod query;

/// 数据导入流水线
pub mod ingest;

/// 领域适配器 (CSV → 记录批次)
pub mod domain;

/// 服务门面
pub mod service;

/// 工具模块
pub mod utils;

// ============================================================================
// 重导出常用类型
// ============================================================================

pub use domain::{AirQualityAdapter, DomainAdapter, FireAdapter, PopulationAdapter, ValueField};
pub use ingest::{IngestReport, IngestionPipeline};
pub use query::{
    AggOp, AggValue, AnalyticalQueries, CategoryCounts, Partial, RankedEntry, SeriesPoint, StoreStats,
};
pub use service::ServiceFacade;
pub use storage::{AxisRange, BoundingBox, ColumnStore, GeoPoint, LayoutStore, RowStore};
pub use utils::config::EngineConfig;

// ============================================================================
// 全局错误类型
// ============================================================================

/// 引擎错误类型
///
/// 只有导入阶段的致命错误会以 `Err` 返回；查询阶段的空结果一律用零值哨兵表达。
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Path not found: {}", .0.display())]
    PathNotFound(std::path::PathBuf),

    #[error("No CSV files under {}", .0.display())]
    NoInputFiles(std::path::PathBuf),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// 版本信息
// ============================================================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
