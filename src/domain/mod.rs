//! 领域适配器
//!
//! 把某个数据集的 CSV 文件转换成记录批次，引擎其余部分与具体领域无关：
//! - `PopulationAdapter`: 宽表，国家 × 年份，整数人口
//! - `AirQualityAdapter`: 窄表，监测站 × 时间戳 × 污染物，浮点浓度
//! - `FireAdapter`: 窄表，火情传感器站点 × 时间戳 × 参数，浮点浓度 / AQI
//!
//! 单条记录的解析失败 (`RecordError`) 只会让该记录被跳过并计数，不会中止导入。

pub mod air_quality;
pub mod environmental;
pub mod fire;
pub mod population;

pub use air_quality::AirQualityAdapter;
pub use environmental::ValueField;
pub use fire::FireAdapter;
pub use population::PopulationAdapter;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::storage::types::{MeasureValue, Observation};
use crate::{EngineError, Result};

/// 单条记录的可恢复错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("invalid number in {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// 一个文件解析出的记录批次
#[derive(Debug, Clone)]
pub struct RecordBatch<V> {
    /// 表头预先声明的轴 (人口年份)；窄表为 `None`
    pub declared_axis: Option<Vec<i64>>,
    pub observations: Vec<Observation<V>>,
    /// 被跳过的记录数
    pub skipped: usize,
}

impl<V> Default for RecordBatch<V> {
    fn default() -> Self {
        Self {
            declared_axis: None,
            observations: Vec::new(),
            skipped: 0,
        }
    }
}

impl<V> RecordBatch<V> {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// 记录一条被跳过的行
    pub(crate) fn skip(&mut self, line: u64, error: &RecordError) {
        self.skipped += 1;
        log::debug!("[Ingest] skipping record at line {}: {}", line, error);
    }
}

/// 领域适配器
pub trait DomainAdapter: Send + Sync {
    type Value: MeasureValue;

    /// 领域名称 (日志 / 配置)
    fn name(&self) -> &'static str;

    /// 每个 (实体, 轴值, 参数) 是否至多一条测量
    fn unique_cells(&self) -> bool;

    fn parse_reader<R: Read>(&self, reader: R) -> Result<RecordBatch<Self::Value>>;

    fn parse_file(&self, path: &Path) -> Result<RecordBatch<Self::Value>> {
        let file = File::open(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let batch = self.parse_reader(BufReader::new(file))?;

        if batch.skipped > 0 {
            log::warn!(
                "[Ingest] {}: skipped {} malformed records in {}",
                self.name(),
                batch.skipped,
                path.display()
            );
        }
        Ok(batch)
    }
}

/// 共用的 CSV 读取配置
pub(crate) fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader)
}

/// 记录读取错误中只有 IO 错误是致命的，其余 (如非 UTF-8) 按坏记录跳过
pub(crate) fn is_fatal(error: &csv::Error) -> bool {
    error.is_io_error()
}

/// 当前记录所在行号
pub(crate) fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// 解析数值字段
pub(crate) fn parse_number<V: MeasureValue>(field: &'static str, text: &str) -> std::result::Result<V, RecordError> {
    V::parse_field(text).ok_or_else(|| RecordError::InvalidNumber {
        field,
        value: text.to_string(),
    })
}
