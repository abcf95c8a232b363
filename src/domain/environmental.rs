//! 环境数据 (空气质量 / 火情传感器) 共用的 13 列窄表解析
//!
//! ```text
//! 0 lat, 1 lon, 2 datetime, 3 parameter, 4 value, 5 unit, 6 raw value,
//! 7 aqi, 8 category, 9 site name, 10 agency, 11 aqs code, 12 full aqs code
//! ```
//!
//! 校验：坐标在合法范围内，时间可解析且在 2000-01-01 ~ 2100-01-01 之间，
//! 实体键与参数非空，所选数值列为有限值且不是缺测哨兵 -999，
//! AQI 类别为空或 0-255 的整数。

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::domain::{csv_reader, is_fatal, line_of, parse_number, RecordBatch, RecordError};
use crate::storage::types::{EntityMeta, GeoPoint, Observation};
use crate::utils::datetime::{is_plausible, parse_timestamp};
use crate::Result;

pub const FIELD_COUNT: usize = 13;

/// 数据源的缺测哨兵
const MISSING: f64 = -999.0;

/// 作为测量值的列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueField {
    /// 第 5 列：浓度
    #[default]
    Value,
    /// 第 7 列：原始浓度
    Raw,
    /// 第 8 列：AQI
    Aqi,
}

impl ValueField {
    fn column(&self) -> (usize, &'static str) {
        match self {
            ValueField::Value => (4, "value"),
            ValueField::Raw => (6, "raw value"),
            ValueField::Aqi => (7, "aqi"),
        }
    }
}

/// 站点相关列的选取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SiteColumns {
    pub entity: usize,
    pub alias: usize,
    pub label: Option<usize>,
}

pub(crate) const AGENCY_COLUMN: usize = 10;

/// 表头行 (含 `Latitude` 或 `DateTime`)
fn is_header(record: &csv::StringRecord) -> bool {
    record
        .iter()
        .any(|cell| cell.eq_ignore_ascii_case("latitude") || cell.contains("DateTime"))
}

fn non_empty(record: &csv::StringRecord, col: usize) -> Option<String> {
    record
        .get(col)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
}

/// 解析一行
pub(crate) fn parse_record(
    record: &csv::StringRecord,
    field: ValueField,
    site: SiteColumns,
) -> std::result::Result<Observation<f64>, RecordError> {
    if record.len() < FIELD_COUNT {
        return Err(RecordError::FieldCount {
            expected: FIELD_COUNT,
            found: record.len(),
        });
    }

    let lat: f64 = parse_number("latitude", &record[0])?;
    let lon: f64 = parse_number("longitude", &record[1])?;
    let position = GeoPoint::new(lat, lon);
    if !position.is_valid() {
        return Err(RecordError::OutOfRange {
            field: "coordinates",
            value: format!("({}, {})", lat, lon),
        });
    }

    let timestamp = parse_timestamp(&record[2])
        .ok_or_else(|| RecordError::InvalidTimestamp(record[2].to_string()))?;
    if !is_plausible(timestamp) {
        return Err(RecordError::OutOfRange {
            field: "timestamp",
            value: record[2].to_string(),
        });
    }

    let parameter = non_empty(record, 3).ok_or(RecordError::MissingField("parameter"))?;
    let entity = non_empty(record, site.entity).ok_or(RecordError::MissingField("site id"))?;

    let (col, name) = field.column();
    let value: f64 = parse_number(name, &record[col])?;
    if !value.is_finite() || value == MISSING {
        return Err(RecordError::OutOfRange {
            field: name,
            value: record[col].to_string(),
        });
    }

    let category = match record[8].trim() {
        "" => None,
        text => Some(text.parse::<u8>().map_err(|_| RecordError::InvalidNumber {
            field: "category",
            value: text.to_string(),
        })?),
    };

    let meta = EntityMeta {
        alias: non_empty(record, site.alias),
        label: site.label.and_then(|col| non_empty(record, col)),
        agency: non_empty(record, AGENCY_COLUMN),
        position: Some(position),
    };

    let mut observation = Observation::new(entity, timestamp, value)
        .with_parameter(parameter)
        .with_meta(meta);
    observation.category = category;
    Ok(observation)
}

/// 解析整份 CSV
pub(crate) fn parse_environmental<R: Read>(
    reader: R,
    field: ValueField,
    site: SiteColumns,
) -> Result<RecordBatch<f64>> {
    let mut reader = csv_reader(reader);
    let mut batch = RecordBatch::default();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) if is_fatal(&e) => return Err(e.into()),
            Err(e) => {
                batch.skip(0, &RecordError::Malformed(e.to_string()));
                continue;
            }
        };
        if is_header(&record) {
            continue;
        }

        match parse_record(&record, field, site) {
            Ok(observation) => batch.observations.push(observation),
            Err(e) => batch.skip(line_of(&record), &e),
        }
    }

    Ok(batch)
}
