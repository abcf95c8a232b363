//! 人口数据适配器
//!
//! 宽表格式：
//!
//! ```text
//! Country Name,Country Code,Indicator Name,Indicator Code,1960,1961,...
//! Aruba,ABW,"Population, total",SP.POP.TOTL,54608,55811,...
//! ```
//!
//! 表头第 5 列起声明年份轴；空单元格表示缺失，不写入存储 (不按 0 填充)。

use std::io::Read;

use crate::domain::{csv_reader, is_fatal, line_of, parse_number, DomainAdapter, RecordBatch, RecordError};
use crate::storage::types::{EntityMeta, Observation};
use crate::Result;

/// 年份列起始下标
const FIRST_YEAR_COLUMN: usize = 4;

/// 人口数据适配器
#[derive(Debug, Clone, Copy, Default)]
pub struct PopulationAdapter;

impl PopulationAdapter {
    pub fn new() -> Self {
        Self
    }

    /// 解析表头：(列下标, 年份)，空单元格与非数字单元格不构成年份列
    fn parse_header(record: &csv::StringRecord) -> Vec<(usize, i64)> {
        record
            .iter()
            .enumerate()
            .skip(FIRST_YEAR_COLUMN)
            .filter(|(_, cell)| !cell.is_empty())
            .filter_map(|(col, cell)| cell.parse::<i64>().ok().map(|year| (col, year)))
            .collect()
    }

    fn parse_row(
        record: &csv::StringRecord,
        years: &[(usize, i64)],
    ) -> std::result::Result<Vec<Observation<i64>>, RecordError> {
        if record.len() <= FIRST_YEAR_COLUMN {
            return Err(RecordError::FieldCount {
                expected: FIRST_YEAR_COLUMN + 1,
                found: record.len(),
            });
        }

        let country = record.get(0).unwrap_or_default();
        if country.is_empty() {
            return Err(RecordError::MissingField("country name"));
        }
        let meta = EntityMeta {
            alias: record.get(1).filter(|c| !c.is_empty()).map(str::to_string),
            label: record.get(2).filter(|c| !c.is_empty()).map(str::to_string),
            ..EntityMeta::default()
        };

        let mut observations = Vec::with_capacity(years.len());
        for &(col, year) in years {
            let cell = match record.get(col) {
                Some(cell) if !cell.is_empty() => cell,
                _ => continue,
            };
            let value = parse_number::<i64>("population", cell)?;
            if value < 0 {
                return Err(RecordError::OutOfRange {
                    field: "population",
                    value: cell.to_string(),
                });
            }
            observations.push(Observation::new(country, year, value).with_meta(meta.clone()));
        }
        Ok(observations)
    }
}

impl DomainAdapter for PopulationAdapter {
    type Value = i64;

    fn name(&self) -> &'static str {
        "population"
    }

    fn unique_cells(&self) -> bool {
        true
    }

    fn parse_reader<R: Read>(&self, reader: R) -> Result<RecordBatch<i64>> {
        let mut reader = csv_reader(reader);
        let mut batch = RecordBatch::default();
        let mut years: Option<Vec<(usize, i64)>> = None;

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) if is_fatal(&e) => return Err(e.into()),
                Err(e) => {
                    batch.skip(0, &RecordError::Malformed(e.to_string()));
                    continue;
                }
            };

            match &years {
                None => {
                    let header = Self::parse_header(&record);
                    batch.declared_axis = Some(header.iter().map(|&(_, year)| year).collect());
                    years = Some(header);
                }
                Some(columns) => match Self::parse_row(&record, columns) {
                    Ok(rows) => batch.observations.extend(rows),
                    Err(e) => batch.skip(line_of(&record), &e),
                },
            }
        }

        Ok(batch)
    }
}
