//! dualstore 命令行入口
//!
//! 加载配置 → 导入一个领域的数据 → 在所选布局上执行一组代表性查询并记录日志。
//!
//! 运行: cargo run --release --bin dualstore-cli -- [config/engine.toml]

use std::time::Instant;

use anyhow::Context;

use dualstore::query::AggOp;
use dualstore::utils::config::{Domain, EngineConfig, Layout};
use dualstore::utils::datetime::format_timestamp;
use dualstore::{
    AirQualityAdapter, AnalyticalQueries, AxisRange, ColumnStore, DomainAdapter, FireAdapter,
    IngestionPipeline, PopulationAdapter, RowStore, ServiceFacade,
};

fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from_file(&path)
            .with_context(|| format!("loading config {}", path))?,
        None => EngineConfig::load_default().unwrap_or_else(|e| {
            log::warn!("Failed to load config file: {}, using defaults", e);
            EngineConfig::default()
        }),
    };

    log::info!(
        "{} v{} | domain={:?} layout={:?} path={}",
        dualstore::NAME,
        dualstore::VERSION,
        config.data.domain,
        config.ingest.layout,
        config.data.path.display()
    );

    match config.data.domain {
        Domain::Population => run(PopulationAdapter::new(), &config),
        Domain::AirQuality => run(AirQualityAdapter::new(config.data.value_field), &config),
        Domain::Fire => run(FireAdapter::new(config.data.value_field), &config),
    }
}

fn run<D: DomainAdapter>(adapter: D, config: &EngineConfig) -> anyhow::Result<()> {
    let pipeline = IngestionPipeline::new(adapter).with_workers(config.ingest.workers);

    match config.ingest.layout {
        Layout::Row => {
            let (store, _) = pipeline
                .build_row(&config.data.path)
                .context("building row store")?;
            exercise(ServiceFacade::<D::Value, RowStore<D::Value>>::new(store), config);
        }
        Layout::Column => {
            let (store, _) = pipeline
                .build_column(&config.data.path)
                .context("building column store")?;
            exercise(ServiceFacade::<D::Value, ColumnStore<D::Value>>::new(store), config);
        }
    }
    Ok(())
}

/// 取中位轴点执行一组查询，串行与并行各一次
fn exercise<V, S>(service: ServiceFacade<V, S>, config: &EngineConfig)
where
    V: dualstore::storage::MeasureValue,
    S: AnalyticalQueries<V>,
{
    let stats = service.stats();
    log::info!(
        "[Model] layout={} entities={} parameters={} axis_points={} measurements={}",
        stats.layout,
        stats.entities,
        stats.parameters,
        stats.axis_points,
        stats.measurements
    );

    let axis = service.axis_values();
    let Some(&at) = axis.get(axis.len() / 2) else {
        log::warn!("[Model] empty model, nothing to query");
        return;
    };
    let label = if at > 10_000 {
        format_timestamp(at)
    } else {
        at.to_string()
    };

    for workers in [1, config.query.workers.max(1)] {
        let start = Instant::now();
        for op in AggOp::ALL {
            log::info!(
                "[Query] reduce_at({}, {}) workers={} -> {}",
                label,
                op,
                workers,
                service.reduce_at(at, None, op, workers)
            );
        }

        let top = service.top_n(config.query.top_n, at, None, workers);
        for (rank, entry) in top.iter().enumerate() {
            log::info!("[Query] top_n #{} {} = {}", rank + 1, entry.entity, entry.value);
        }

        if let Some(leader) = top.first() {
            let series = service.series_for_entity(&leader.entity, None, workers);
            log::info!("[Query] series_for_entity({}) -> {} points", leader.entity, series.len());
        }

        let categories = service.category_distribution(None, workers);
        if categories.iter().any(|&c| c > 0) {
            log::info!("[Query] category_distribution workers={} -> {:?}", workers, categories);
        }

        if let (Some(&first), Some(&last)) = (axis.first(), axis.last()) {
            let count = service.count_in_range(AxisRange::new(first, last), None, workers);
            log::info!("[Query] count_in_range(all) workers={} -> {}", workers, count);
        }

        log::info!("[Query] workers={} finished in {:?}", workers, start.elapsed());
    }
}
