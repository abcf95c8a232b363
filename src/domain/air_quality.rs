//! 空气质量 (AirNow) 适配器
//!
//! 实体为监测站 ID (第 12 列)，完整 AQS 代码 (第 13 列) 登记为别名，
//! 站点位置名称 (第 10 列) 作为描述。

use std::io::Read;

use crate::domain::environmental::{parse_environmental, SiteColumns, ValueField};
use crate::domain::{DomainAdapter, RecordBatch};
use crate::Result;

const SITE: SiteColumns = SiteColumns {
    entity: 11,
    alias: 12,
    label: Some(9),
};

/// 空气质量适配器
#[derive(Debug, Clone, Copy, Default)]
pub struct AirQualityAdapter {
    value_field: ValueField,
}

impl AirQualityAdapter {
    pub fn new(value_field: ValueField) -> Self {
        Self { value_field }
    }

    pub fn value_field(&self) -> ValueField {
        self.value_field
    }
}

impl DomainAdapter for AirQualityAdapter {
    type Value = f64;

    fn name(&self) -> &'static str {
        "air_quality"
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

    #[test]
    fn test_station_keyed_by_site_id() {
        let csv = "\
34.0667,-118.2275,2020-08-10T01:00,PM2.5,12.5,UG/M3,13.1,52,2,Los Angeles,South Coast AQMD,060371103,840060371103
34.0667,-118.2275,2020-08-10T02:00,OZONE,0.031,PPM,0.031,29,1,Los Angeles,South Coast AQMD,060371103,840060371103
";
        let batch = AirQualityAdapter::default().parse_reader(csv.as_bytes()).unwrap();

        assert_eq!(batch.len(), 2);
        assert!(batch.observations.iter().all(|o| o.entity == "060371103"));
        assert_eq!(batch.observations[1].parameter.as_deref(), Some("OZONE"));
    }
}
