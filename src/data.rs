use crate::config::AppConfig;
use crate::topology::{MeshFilter, Topology, TopologyError};
use crate::types::{Borders, County, Education, Fips};
use geo::{Geometry, MultiPolygon};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("request to {location} failed")]
    Http {
        location: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{location} returned HTTP {status}")]
    Status {
        location: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to read {location}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {location}")]
    Json {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid topology in {location}")]
    Topology {
        location: String,
        #[source]
        source: TopologyError,
    },
}

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl Source {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Source::Url(location.to_string())
        } else {
            Source::File(PathBuf::from(location))
        }
    }

    fn describe(&self) -> String {
        match self {
            Source::Url(url) => url.clone(),
            Source::File(path) => path.display().to_string(),
        }
    }
}

/// Everything the map is built from.
#[derive(Debug, Clone)]
pub struct MapData {
    pub counties: Vec<County>,
    pub borders: Borders,
    pub education: Vec<Education>,
}

pub async fn load_data(config: &AppConfig) -> Result<MapData, LoadError> {
    info!("Loading data...");

    let client = reqwest::Client::builder()
        .user_agent(concat!("edumap/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.input.timeout_secs))
        .build()
        .map_err(LoadError::Client)?;

    let education_source = Source::parse(&config.input.education);
    let counties_source = Source::parse(&config.input.counties);

    // Independent resources; both must arrive before anything is drawn.
    let (education_bytes, counties_bytes) = tokio::try_join!(
        read_source(&client, &education_source),
        read_source(&client, &counties_source),
    )?;

    let education: Vec<Education> = parse_json(&education_source, &education_bytes)?;
    info!("Loaded education data for {} counties", education.len());

    let topology: Topology = parse_json(&counties_source, &counties_bytes)?;
    let (counties, borders) = counties_from_topology(&topology).map_err(|source| LoadError::Topology {
        location: counties_source.describe(),
        source,
    })?;
    info!("Loaded geometry for {} counties", counties.len());

    Ok(MapData {
        counties,
        borders,
        education,
    })
}

pub async fn read_source(client: &reqwest::Client, source: &Source) -> Result<Vec<u8>, LoadError> {
    match source {
        Source::Url(url) => {
            debug!("Fetching {}", url);
            let http_err = |source| LoadError::Http {
                location: url.clone(),
                source,
            };
            let response = client.get(url).send().await.map_err(http_err)?;
            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::Status {
                    location: url.clone(),
                    status,
                });
            }
            let body = response.bytes().await.map_err(http_err)?;
            Ok(body.to_vec())
        }
        Source::File(path) => {
            debug!("Reading {:?}", path);
            tokio::fs::read(path).await.map_err(|source| LoadError::Io {
                location: path.display().to_string(),
                source,
            })
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(source: &Source, bytes: &[u8]) -> Result<T, LoadError> {
    serde_json::from_slice(bytes).map_err(|source_err| LoadError::Json {
        location: source.describe(),
        source: source_err,
    })
}

/// County shapes plus the state and nation outlines of a US topology.
pub fn counties_from_topology(topology: &Topology) -> Result<(Vec<County>, Borders), TopologyError> {
    let mut counties = Vec::new();

    for feature in topology.feature("counties")? {
        let fips = match feature.id.as_ref().and_then(Fips::from_json) {
            Some(fips) => fips,
            None => {
                warn!("Skipping county feature without a usable id: {:?}", feature.id);
                continue;
            }
        };

        let geometry = match feature.geometry {
            Geometry::MultiPolygon(mp) => mp,
            Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            _ => continue, // Skip points/lines
        };

        counties.push(County { fips, geometry });
    }

    let borders = Borders {
        states: topology.mesh("states", MeshFilter::Interior)?,
        nation: topology.mesh("nation", MeshFilter::All)?,
    };

    Ok((counties, borders))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_distinguishes_urls_from_paths() {
        assert_eq!(
            Source::parse("https://cdn.example.com/counties.json"),
            Source::Url("https://cdn.example.com/counties.json".to_string())
        );
        assert_eq!(
            Source::parse("data/counties.json"),
            Source::File(PathBuf::from("data/counties.json"))
        );
    }

    const TOPOLOGY: &str = r#"{
        "type": "Topology",
        "arcs": [
            [[1, 0], [1, 1]],
            [[1, 1], [0, 1], [0, 0], [1, 0]],
            [[1, 0], [2, 0], [2, 1], [1, 1]]
        ],
        "objects": {
            "counties": {"type": "GeometryCollection", "geometries": [
                {"type": "Polygon", "id": 1001, "arcs": [[0, 1]]},
                {"type": "Polygon", "id": "01003", "arcs": [[2, -1]]},
                {"type": "Polygon", "arcs": [[2, -1]]}
            ]},
            "states": {"type": "GeometryCollection", "geometries": [
                {"type": "Polygon", "id": "01", "arcs": [[0, 1]]},
                {"type": "Polygon", "id": "02", "arcs": [[2, -1]]}
            ]},
            "nation": {"type": "GeometryCollection", "geometries": [
                {"type": "MultiPolygon", "arcs": [[[1, 2]]]}
            ]}
        }
    }"#;

    const EDUCATION: &str = r#"[
        {"fips": 1001, "state": "AL", "area_name": "Autauga County", "bachelorsOrHigher": 21.9},
        {"fips": 1003, "state": "AL", "area_name": "Baldwin County", "bachelorsOrHigher": 28.6}
    ]"#;

    /// Serves the datasets on an ephemeral local port. Unrouted paths get a 404.
    async fn serve_datasets() -> String {
        let app = axum::Router::new()
            .route("/education.json", axum::routing::get(|| async { EDUCATION }))
            .route("/counties.json", axum::routing::get(|| async { TOPOLOGY }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn url_config(education: &str, counties: &str) -> AppConfig {
        AppConfig::from_toml_str(&format!("[input]\neducation = {education:?}\ncounties = {counties:?}\n")).unwrap()
    }

    #[test]
    fn topology_yields_counties_and_borders() {
        let topology: Topology = serde_json::from_str(TOPOLOGY).unwrap();

        let (counties, borders) = counties_from_topology(&topology).unwrap();
        let ids: Vec<Fips> = counties.iter().map(|c| c.fips).collect();
        assert_eq!(ids, vec![Fips(1001), Fips(1003)]);
        assert_eq!(borders.states.0.len(), 1);
        assert_eq!(borders.nation.0.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let client = reqwest::Client::new();
        let source = Source::File(PathBuf::from("does/not/exist.json"));
        let err = read_source(&client, &source).await.unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[tokio::test]
    async fn fetches_datasets_over_http() {
        let base = serve_datasets().await;
        let config = url_config(&format!("{base}/education.json"), &format!("{base}/counties.json"));

        let data = load_data(&config).await.unwrap();
        assert_eq!(data.education.len(), 2);
        assert_eq!(data.education[1].fips, Fips(1003));
        assert_eq!(data.counties.len(), 2);
        assert_eq!(data.borders.states.0.len(), 1);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let base = serve_datasets().await;
        let client = reqwest::Client::new();
        let source = Source::Url(format!("{base}/missing.json"));

        let err = read_source(&client, &source).await.unwrap_err();
        match err {
            LoadError::Status { location, status } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert!(location.ends_with("/missing.json"));
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn one_failed_fetch_yields_no_data() {
        let base = serve_datasets().await;
        let config = url_config(&format!("{base}/education.json"), &format!("{base}/missing.json"));

        assert!(matches!(
            load_data(&config).await,
            Err(LoadError::Status { status, .. }) if status == reqwest::StatusCode::NOT_FOUND
        ));
        assert!(crate::prepare(&config).await.is_err());
    }
}
