use crate::config::{AppConfig, MissingPolicy};
use crate::data::MapData;
use crate::scale::{self, ScaleError, ThresholdScale};
use crate::types::{Borders, County, Education, Fips};
use geo::MultiPolygon;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("no education record for county {fips}")]
    Missing { fips: Fips },
    #[error("invalid color scale")]
    Scale(#[from] ScaleError),
}

/// Education records indexed by FIPS. With duplicate ids the first record wins.
#[derive(Debug, Clone)]
pub struct Statistics {
    records: Vec<Education>,
    by_fips: HashMap<Fips, usize>,
}

impl Statistics {
    pub fn new(records: Vec<Education>) -> Self {
        let mut by_fips = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            by_fips.entry(record.fips).or_insert(i);
        }
        Self { records, by_fips }
    }

    pub fn lookup(&self, fips: Fips) -> Option<&Education> {
        self.by_fips.get(&fips).map(|&i| &self.records[i])
    }

    pub fn extent(&self) -> Option<(f64, f64)> {
        scale::extent(self.records.iter().map(|r| r.bachelors_or_higher))
    }
}

/// A county together with its statistic and color bucket.
#[derive(Debug, Clone)]
pub struct JoinedCounty {
    pub fips: Fips,
    pub geometry: MultiPolygon<f64>,
    /// `None` only under the fallback policy.
    pub record: Option<Education>,
    pub bucket: Option<usize>,
}

impl JoinedCounty {
    pub fn education(&self) -> Option<f64> {
        self.record.as_ref().map(|r| r.bachelors_or_higher)
    }
}

/// The joined and classified dataset, ready to render.
#[derive(Debug, Clone)]
pub struct Choropleth {
    pub counties: Vec<JoinedCounty>,
    pub scale: ThresholdScale,
    pub borders: Borders,
    pub fallback_color: String,
}

impl Choropleth {
    pub fn fill(&self, county: &JoinedCounty) -> &str {
        match county.bucket {
            Some(bucket) => self.scale.bucket_color(bucket),
            None => &self.fallback_color,
        }
    }

    pub fn county(&self, fips: Fips) -> Option<&JoinedCounty> {
        self.counties.iter().find(|c| c.fips == fips)
    }
}

pub fn process_data(config: &AppConfig, data: MapData) -> Result<Choropleth, JoinError> {
    info!("Joining {} counties against {} records...", data.counties.len(), data.education.len());

    let statistics = Statistics::new(data.education);
    let scale = ThresholdScale::equal_interval(statistics.extent(), config.scale.intervals, &config.scale.palette)?;
    let counties = join_counties(data.counties, &statistics, &scale, config.input.on_missing)?;

    info!("Classified {} counties into {} buckets.", counties.len(), scale.bucket_count());

    Ok(Choropleth {
        counties,
        scale,
        borders: data.borders,
        fallback_color: config.input.fallback_color.clone(),
    })
}

pub fn join_counties(
    counties: Vec<County>,
    statistics: &Statistics,
    scale: &ThresholdScale,
    policy: MissingPolicy,
) -> Result<Vec<JoinedCounty>, JoinError> {
    let mut joined = Vec::with_capacity(counties.len());

    for county in counties {
        let record = statistics.lookup(county.fips).cloned();
        if record.is_none() {
            match policy {
                MissingPolicy::Abort => return Err(JoinError::Missing { fips: county.fips }),
                MissingPolicy::Skip => {
                    warn!("No education record for county {}, skipping", county.fips);
                    continue;
                }
                MissingPolicy::Fallback => {
                    warn!("No education record for county {}, using fallback color", county.fips);
                }
            }
        }

        let bucket = record.as_ref().map(|r| scale.bucket(r.bachelors_or_higher));
        joined.push(JoinedCounty {
            fips: county.fips,
            geometry: county.geometry,
            record,
            bucket,
        });
    }

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ORANGES_9;
    use geo::polygon;

    fn record(fips: u32, value: f64) -> Education {
        Education {
            fips: Fips(fips),
            state: "AL".to_string(),
            area_name: format!("County {fips}"),
            bachelors_or_higher: value,
        }
    }

    fn county(fips: u32) -> County {
        County {
            fips: Fips(fips),
            geometry: MultiPolygon::new(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]]),
        }
    }

    fn palette() -> Vec<String> {
        ORANGES_9.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn lookup_keeps_first_duplicate() {
        let stats = Statistics::new(vec![record(1, 10.0), record(1, 99.0), record(2, 50.0)]);
        assert_eq!(stats.lookup(Fips(1)).unwrap().bachelors_or_higher, 10.0);
        assert_eq!(stats.extent(), Some((10.0, 99.0)));
        assert!(stats.lookup(Fips(3)).is_none());
    }

    #[test]
    fn joined_bucket_matches_scale() {
        let stats = Statistics::new(vec![record(1001, 10.0), record(1003, 20.0), record(1005, 50.0)]);
        let scale = ThresholdScale::equal_interval(stats.extent(), 8, &palette()).unwrap();
        let joined = join_counties(vec![county(1001), county(1003), county(1005)], &stats, &scale, MissingPolicy::Abort)
            .unwrap();

        for county in &joined {
            let value = county.education().unwrap();
            assert_eq!(county.bucket, Some(scale.bucket(value)));
        }
        assert_eq!(joined[1].bucket, Some(3));
    }

    #[test]
    fn missing_record_aborts_by_default() {
        let stats = Statistics::new(vec![record(1, 10.0), record(2, 20.0)]);
        let scale = ThresholdScale::equal_interval(stats.extent(), 8, &palette()).unwrap();
        let err = join_counties(vec![county(1), county(7)], &stats, &scale, MissingPolicy::Abort).unwrap_err();
        assert!(matches!(err, JoinError::Missing { fips: Fips(7) }));
    }

    #[test]
    fn skip_and_fallback_policies() {
        let stats = Statistics::new(vec![record(1, 10.0), record(2, 20.0)]);
        let scale = ThresholdScale::equal_interval(stats.extent(), 8, &palette()).unwrap();

        let skipped = join_counties(vec![county(1), county(7)], &stats, &scale, MissingPolicy::Skip).unwrap();
        assert_eq!(skipped.len(), 1);

        let kept = join_counties(vec![county(1), county(7)], &stats, &scale, MissingPolicy::Fallback).unwrap();
        assert_eq!(kept.len(), 2);
        assert!(kept[1].record.is_none());
        assert_eq!(kept[1].bucket, None);
    }

    #[test]
    fn empty_statistics_cannot_build_a_scale() {
        let config = AppConfig::from_toml_str("[input]\neducation = \"a\"\ncounties = \"b\"\n").unwrap();
        let data = MapData {
            counties: vec![county(1)],
            borders: Borders::default(),
            education: Vec::new(),
        };
        assert!(matches!(
            process_data(&config, data),
            Err(JoinError::Scale(ScaleError::EmptyDomain))
        ));
    }
}
