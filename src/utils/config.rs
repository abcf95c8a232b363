//! 配置管理模块

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::ValueField;
use crate::{EngineError, Result};

/// 数据领域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    #[default]
    Population,
    AirQuality,
    Fire,
}

/// 存储布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Row,
    #[default]
    Column,
}

/// 引擎配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// 数据源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub domain: Domain,
    /// CSV 文件或目录
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
    /// 环境数据作为测量值的列
    #[serde(default)]
    pub value_field: ValueField,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            domain: Domain::default(),
            path: default_data_path(),
            value_field: ValueField::default(),
        }
    }
}

/// 导入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub layout: Layout,
    /// 并行导入线程数，1 为串行
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            workers: default_workers(),
        }
    }
}

/// 查询
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// 查询并行线程数，1 为串行
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            top_n: default_top_n(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_workers() -> usize {
    rayon::current_num_threads().max(1)
}

fn default_top_n() -> usize {
    10
}

impl EngineConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| EngineError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// 加载默认配置文件
    pub fn load_default() -> Result<Self> {
        Self::load_from_file("config/engine.toml")
    }
}
