// 人口数据场景测试
//
// 3 个国家 × 3 个年份，在行式 / 列式两种布局、串行 / 并行两条路径上验证同一组结果。

use dualstore::domain::RecordBatch;
use dualstore::storage::Observation;
use dualstore::{
    AggOp, AggValue, AnalyticalQueries, AxisRange, ColumnStore, IngestionPipeline,
    PopulationAdapter, RankedEntry, RowStore, ServiceFacade,
};

const WORKERS: [usize; 4] = [1, 2, 4, 8];

fn batch() -> RecordBatch<i64> {
    let rows = [
        ("Country1", [1_000_000, 1_100_000, 1_200_000]),
        ("Country2", [2_000_000, 2_200_000, 2_400_000]),
        ("Country3", [500_000, 550_000, 600_000]),
    ];

    let mut batch = RecordBatch {
        declared_axis: Some(vec![2020, 2021, 2022]),
        ..RecordBatch::default()
    };
    for (country, values) in rows {
        for (year, value) in [2020, 2021, 2022].into_iter().zip(values) {
            batch.observations.push(Observation::new(country, year, value));
        }
    }
    batch
}

fn row() -> ServiceFacade<i64, RowStore<i64>> {
    ServiceFacade::new(IngestionPipeline::new(PopulationAdapter).ingest_batches(vec![batch()]))
}

fn column() -> ServiceFacade<i64, ColumnStore<i64>> {
    ServiceFacade::new(IngestionPipeline::new(PopulationAdapter).ingest_batches(vec![batch()]))
}

fn entry(entity: &str, value: i64) -> RankedEntry<i64> {
    RankedEntry {
        entity: entity.to_string(),
        value,
    }
}

fn sum_at_2021<S: AnalyticalQueries<i64>>(service: &ServiceFacade<i64, S>) {
    for workers in WORKERS {
        assert_eq!(service.sum_at(2021, None, workers), 3_850_000, "workers = {}", workers);
        assert_eq!(
            service.reduce_at(2021, None, AggOp::Sum, workers),
            AggValue::Value(3_850_000)
        );
    }
}

#[test]
fn test_reduce_at_sum() {
    sum_at_2021(&row());
    sum_at_2021(&column());
}

#[test]
fn test_reduce_at_other_ops() {
    let (row, column) = (row(), column());
    for workers in WORKERS {
        for service_min in [row.min_at(2021, None, workers), column.min_at(2021, None, workers)] {
            assert_eq!(service_min, 550_000);
        }
        assert_eq!(row.max_at(2022, None, workers), 2_400_000);
        assert_eq!(column.max_at(2022, None, workers), 2_400_000);
        assert_eq!(row.count_at(2020, None, workers), 3);
        assert_eq!(column.count_at(2020, None, workers), 3);
        // 3_850_000 / 3
        let expected = 3_850_000.0 / 3.0;
        assert!((row.avg_at(2021, None, workers) - expected).abs() < 1e-9);
        assert!((column.avg_at(2021, None, workers) - expected).abs() < 1e-9);
    }
}

#[test]
fn test_top_2() {
    let expected = vec![entry("Country2", 2_200_000), entry("Country1", 1_100_000)];
    for workers in WORKERS {
        assert_eq!(row().top_n(2, 2021, None, workers), expected);
        assert_eq!(column().top_n(2, 2021, None, workers), expected);
    }
}

#[test]
fn test_slice_range_excludes_2022() {
    let service = column();
    let store = service.store();

    let (lo, hi) = store.slice_range(2020, 2021).unwrap();
    let covered: Vec<i64> = (lo..=hi).map(|i| service.axis_values()[i]).collect();
    assert_eq!(covered, vec![2020, 2021]);

    assert_eq!(store.slice_range(2023, 2100), None);
    assert_eq!(store.slice_range(1900, 2019), None);
}

#[test]
fn test_unknown_entity_and_axis() {
    let (row, column) = (row(), column());
    for workers in WORKERS {
        assert!(row.series_for_entity("Nowhere", None, workers).is_empty());
        assert!(column.series_for_entity("Nowhere", None, workers).is_empty());
        assert_eq!(row.sum_at(1999, None, workers), 0);
        assert_eq!(column.sum_at(1999, None, workers), 0);
        assert_eq!(row.avg_at(1999, None, workers), 0.0);
        assert_eq!(column.count_at(1999, None, workers), 0);
    }
}

#[test]
fn test_top_n_larger_than_candidates() {
    for workers in WORKERS {
        let top = row().top_n(10, 2021, None, workers);
        assert_eq!(top.len(), 3);
        assert_eq!(top, column().top_n(10, 2021, None, workers));
        assert_eq!(top[2], entry("Country3", 550_000));
    }
}

#[test]
fn test_series_and_range() {
    let (row, column) = (row(), column());
    for workers in WORKERS {
        let series = row.series_for_entity("Country2", None, workers);
        assert_eq!(series, column.series_for_entity("Country2", None, workers));
        let values: Vec<i64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![2_000_000, 2_200_000, 2_400_000]);

        let range = AxisRange::new(2021, 2022);
        assert_eq!(row.avg_for_entity_in_range("Country1", range, None, workers), 1_150_000.0);
        assert_eq!(column.avg_for_entity_in_range("Country1", range, None, workers), 1_150_000.0);
        assert_eq!(row.count_in_range(range, None, workers), 6);
        assert_eq!(column.count_in_range(range, None, workers), 6);
    }
}

#[test]
fn test_value_at() {
    let (row, column) = (row(), column());
    assert_eq!(row.value_at("Country3", 2020, None), Some(500_000));
    assert_eq!(column.value_at("Country3", 2020, None), Some(500_000));
    assert_eq!(row.value_at("Country3", 2030, None), None);
    // 人口数据没有参数维度，按参数过滤匹配不到任何测量
    assert_eq!(column.sum_at(2020, Some("PM2.5"), 1), 0);
}

#[test]
fn test_empty_model() {
    let row: ServiceFacade<i64, RowStore<i64>> = ServiceFacade::new(RowStore::new());
    let column: ServiceFacade<i64, ColumnStore<i64>> = ServiceFacade::new(ColumnStore::new());

    for workers in WORKERS {
        for op in AggOp::ALL {
            assert_eq!(row.reduce_at(2020, None, op, workers).as_f64(), 0.0);
            assert_eq!(column.reduce_at(2020, None, op, workers).as_f64(), 0.0);
        }
        assert!(row.top_n(5, 2020, None, workers).is_empty());
        assert!(column.top_n(5, 2020, None, workers).is_empty());
        assert_eq!(row.count_in_range(AxisRange::new(0, 3000), None, workers), 0);
        assert_eq!(column.count_in_range(AxisRange::new(0, 3000), None, workers), 0);
        assert!(row.top_entities(3, AggOp::Sum, None, workers).is_empty());
        assert!(column.top_entities(3, AggOp::Sum, None, workers).is_empty());
    }
    assert_eq!(row.stats().measurements, 0);
}

#[test]
fn test_idempotent_requery() {
    let service = column();
    let first = (service.top_n(3, 2022, None, 4), service.sum_at(2022, None, 4));
    let second = (service.top_n(3, 2022, None, 4), service.sum_at(2022, None, 4));
    assert_eq!(first, second);
}

#[test]
fn test_duplicate_country_across_files_same_series() {
    let mut repeat = RecordBatch {
        declared_axis: Some(vec![2020, 2021, 2022]),
        ..RecordBatch::default()
    };
    repeat.observations.push(Observation::new("Country1", 2021, 1_150_000));

    let pipeline = IngestionPipeline::new(PopulationAdapter);
    let row: RowStore<i64> = pipeline.ingest_batches(vec![batch(), repeat.clone()]);
    let column: ColumnStore<i64> = pipeline.ingest_batches(vec![batch(), repeat]);

    for workers in WORKERS {
        let expected = row.series_for_entity("Country1", None, workers);
        assert_eq!(expected.len(), 4);
        assert_eq!(column.series_for_entity("Country1", None, workers), expected);
    }
}
