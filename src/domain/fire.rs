//! 火情传感器适配器
//!
//! 实体为站点名称 (第 10 列)，AQS 代码 (第 12 列) 登记为别名，
//! 完整 AQS 代码 (第 13 列) 作为描述。

use std::io::Read;

use crate::domain::environmental::{parse_environmental, SiteColumns, ValueField};
use crate::domain::{DomainAdapter, RecordBatch};
use crate::Result;

const SITE: SiteColumns = SiteColumns {
    entity: 9,
    alias: 11,
    label: Some(12),
};

/// 火情传感器适配器
#[derive(Debug, Clone, Copy, Default)]
pub struct FireAdapter {
    value_field: ValueField,
}

impl FireAdapter {
    pub fn new(value_field: ValueField) -> Self {
        Self { value_field }
    }

    pub fn value_field(&self) -> ValueField {
        self.value_field
    }
}

impl DomainAdapter for FireAdapter {
    type Value = f64;

    fn name(&self) -> &'static str {
        "fire"
    }

    fn unique_cells(&self) -> bool {
        false
    }

    fn parse_reader<R: Read>(&self, reader: R) -> Result<RecordBatch<f64>> {
        parse_environmental(reader, self.value_field, SITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
39.7592,-121.8420,2020-09-10T13:00,PM2.5,182.3,UG/M3,182.3,232,5,Chico-East Avenue,Butte County AQMD,060070008,840060070008
39.7592,-121.8420,2020-09-10T13:00,OZONE,0.045,PPM,0.045,41,1,Chico-East Avenue,Butte County AQMD,060070008,840060070008
";

    #[test]
    fn test_site_keyed_by_name_with_aqs_alias() {
        let batch = FireAdapter::default().parse_reader(CSV.as_bytes()).unwrap();

        assert_eq!(batch.len(), 2);
        let first = &batch.observations[0];
        assert_eq!(first.entity, "Chico-East Avenue");
        assert_eq!(first.meta.alias.as_deref(), Some("060070008"));
        assert_eq!(first.meta.agency.as_deref(), Some("Butte County AQMD"));
    }

    #[test]
    fn test_aqi_as_value() {
        let batch = FireAdapter::new(ValueField::Aqi).parse_reader(CSV.as_bytes()).unwrap();
        let aqi: Vec<f64> = batch.observations.iter().map(|o| o.value).collect();
        assert_eq!(aqi, vec![232.0, 41.0]);
    }
}
