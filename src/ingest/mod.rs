//! 数据导入流水线
//!
//! - 串行模式：按文件顺序逐条追加到正在构建的存储
//! - 并行模式：排好序的文件列表切成 W 段连续分组，每个工作线程独占一个私有存储；
//!   全部完成后按分组顺序依次合并，合并结果的插入顺序与串行模式一致
//!
//! 文件不存在 / 不可读是致命错误；单条坏记录跳过并计数。

pub mod loader;

pub use loader::collect_csv_files;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use crate::domain::{DomainAdapter, RecordBatch};
use crate::query::parallel::{chunks, pool};
use crate::storage::{ColumnStore, LayoutStore, MeasureValue, RowStore, StoreOptions};
use crate::Result;

/// 导入统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub domain: &'static str,
    pub layout: &'static str,
    pub files: usize,
    pub records: usize,
    pub skipped: usize,
    pub workers: usize,
    pub elapsed: Duration,
}

/// 单个工作线程的产出
struct GroupOutput<S> {
    store: S,
    records: usize,
    skipped: usize,
}

/// 导入流水线
#[derive(Debug, Clone)]
pub struct IngestionPipeline<D> {
    adapter: D,
    workers: usize,
}

impl<D: DomainAdapter> IngestionPipeline<D> {
    pub fn new(adapter: D) -> Self {
        Self { adapter, workers: 1 }
    }

    /// 并行导入的工作线程数，0 / 1 为串行
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn adapter(&self) -> &D {
        &self.adapter
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn options(&self) -> StoreOptions {
        StoreOptions {
            unique_cells: self.adapter.unique_cells(),
        }
    }

    /// 把一个批次写入存储
    pub fn apply<V, S>(store: &mut S, batch: &RecordBatch<V>)
    where
        V: MeasureValue,
        S: LayoutStore<V>,
    {
        if let Some(axis) = &batch.declared_axis {
            store.declare_axis(axis);
        }
        for observation in &batch.observations {
            store.append(observation);
        }
    }

    /// 从内存中的批次串行构建存储 (已 seal)
    pub fn ingest_batches<S, I>(&self, batches: I) -> S
    where
        S: LayoutStore<D::Value>,
        I: IntoIterator<Item = RecordBatch<D::Value>>,
    {
        let mut store = S::with_options(self.options());
        for batch in batches {
            Self::apply(&mut store, &batch);
        }
        store.seal();
        store
    }

    /// 串行构建一组文件
    fn build_group<S: LayoutStore<D::Value>>(&self, files: &[PathBuf]) -> Result<GroupOutput<S>> {
        let mut output = GroupOutput {
            store: S::with_options(self.options()),
            records: 0,
            skipped: 0,
        };

        for file in files {
            let batch = self.adapter.parse_file(file)?;
            output.records += batch.len();
            output.skipped += batch.skipped;
            Self::apply(&mut output.store, &batch);
        }
        Ok(output)
    }

    /// 从文件列表构建存储 (已 seal)
    pub fn ingest_files<S: LayoutStore<D::Value>>(&self, files: &[PathBuf]) -> Result<(S, IngestReport)> {
        let start = Instant::now();
        let workers = self.workers.min(files.len()).max(1);

        log::info!(
            "[Ingest] {} -> {} layout: {} files, {} workers",
            self.adapter.name(),
            S::LAYOUT,
            files.len(),
            workers
        );

        let groups: Vec<GroupOutput<S>> = if workers <= 1 {
            vec![self.build_group(files)?]
        } else {
            let ranges = chunks(files.len(), workers);
            match pool(workers) {
                Some(pool) => pool.install(|| {
                    ranges
                        .into_par_iter()
                        .map(|r| self.build_group(&files[r]))
                        .collect::<Result<Vec<_>>>()
                })?,
                None => ranges
                    .into_iter()
                    .map(|r| self.build_group(&files[r]))
                    .collect::<Result<Vec<_>>>()?,
            }
        };

        let load_elapsed = start.elapsed();
        let mut records = 0;
        let mut skipped = 0;
        let mut merged: Option<S> = None;
        for group in groups {
            records += group.records;
            skipped += group.skipped;
            match merged.as_mut() {
                Some(store) => store.merge(group.store),
                None => merged = Some(group.store),
            }
        }

        let mut store = merged.unwrap_or_else(|| S::with_options(self.options()));
        store.seal();

        let report = IngestReport {
            domain: self.adapter.name(),
            layout: S::LAYOUT,
            files: files.len(),
            records,
            skipped,
            workers,
            elapsed: start.elapsed(),
        };

        log::info!(
            "[Ingest] {} {} store ready: {} records ({} skipped), {} entities, {} axis points, load {:?}, merge {:?}",
            report.domain,
            report.layout,
            report.records,
            report.skipped,
            store.catalog().entity_count(),
            store.axis().len(),
            load_elapsed,
            report.elapsed.saturating_sub(load_elapsed)
        );

        Ok((store, report))
    }

    /// 从文件或目录构建存储
    pub fn ingest_path<S: LayoutStore<D::Value>>(&self, path: &Path) -> Result<(S, IngestReport)> {
        let files = collect_csv_files(path)?;
        self.ingest_files(&files)
    }

    pub fn build_row(&self, path: &Path) -> Result<(RowStore<D::Value>, IngestReport)> {
        self.ingest_path(path)
    }

    pub fn build_column(&self, path: &Path) -> Result<(ColumnStore<D::Value>, IngestReport)> {
        self.ingest_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PopulationAdapter;
    use crate::storage::Observation;

    fn batch(rows: &[(&str, [i64; 3])]) -> RecordBatch<i64> {
        let mut batch = RecordBatch {
            declared_axis: Some(vec![2020, 2021, 2022]),
            ..RecordBatch::default()
        };
        for (country, values) in rows {
            for (year, value) in [2020, 2021, 2022].into_iter().zip(values) {
                batch.observations.push(Observation::new(*country, year, *value));
            }
        }
        batch
    }

    #[test]
    fn test_ingest_batches_both_layouts() {
        let pipeline = IngestionPipeline::new(PopulationAdapter);
        let batches = || {
            vec![
                batch(&[("Country1", [1, 2, 3])]),
                batch(&[("Country2", [4, 5, 6])]),
            ]
        };

        let row: RowStore<i64> = pipeline.ingest_batches(batches());
        let column: ColumnStore<i64> = pipeline.ingest_batches(batches());

        assert!(row.is_sealed() && column.is_sealed());
        assert_eq!(row.measurement_count(), 6);
        assert_eq!(column.measurement_count(), 6);
        assert!(column.unique_cells());
        assert_eq!(column.slice_at(2021).len(), 2);
    }

    #[test]
    fn test_empty_file_list() {
        let pipeline = IngestionPipeline::new(PopulationAdapter).with_workers(4);
        let (store, report): (RowStore<i64>, _) = pipeline.ingest_files(&[]).unwrap();
        assert_eq!(store.measurement_count(), 0);
        assert_eq!(report.files, 0);
        assert_eq!(report.workers, 1);
    }
}
