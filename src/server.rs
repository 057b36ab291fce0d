use crate::config::AppConfig;
use crate::processing::{Choropleth, JoinedCounty};
use crate::types::Fips;
use anyhow::Result;
use axum::{
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Wrapper for RTree indexing
pub struct CountyEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CountyEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub choropleth: Choropleth,
    pub tree: RTree<CountyEnvelope>,
}

impl AppState {
    pub fn new(choropleth: Choropleth) -> Self {
        info!("Building spatial index for API...");
        let items: Vec<CountyEnvelope> = choropleth
            .counties
            .iter()
            .enumerate()
            .filter_map(|(index, county)| {
                let rect = county.geometry.bounding_rect()?;
                Some(CountyEnvelope {
                    index,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        let tree = RTree::bulk_load(items);
        Self { choropleth, tree }
    }

    /// County whose shape contains the map point, if any.
    pub fn county_at(&self, x: f64, y: f64) -> Option<&JoinedCounty> {
        let point = Point::new(x, y);
        let envelope = AABB::from_point([x, y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.choropleth.counties.get(candidate.index))
            .find(|county| county.geometry.contains(&point))
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CountyResponse {
    pub fips: Fips,
    pub area_name: Option<String>,
    pub state: Option<String>,
    pub education: Option<f64>,
    pub bucket: Option<usize>,
    pub fill: String,
}

impl CountyResponse {
    fn new(choropleth: &Choropleth, county: &JoinedCounty) -> Self {
        Self {
            fips: county.fips,
            area_name: county.record.as_ref().map(|r| r.area_name.clone()),
            state: county.record.as_ref().map(|r| r.state.clone()),
            education: county.education(),
            bucket: county.bucket,
            fill: choropleth.fill(county).to_string(),
        }
    }
}

pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/query", get(query_handler))
        .route("/api/counties/:fips", get(county_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: &AppConfig, choropleth: Choropleth) -> Result<()> {
    let state = Arc::new(AppState::new(choropleth));
    let static_dir = config
        .output
        .path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = router(state, static_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<CountyResponse>> {
    Json(
        state
            .county_at(params.x, params.y)
            .map(|county| CountyResponse::new(&state.choropleth, county)),
    )
}

async fn county_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(fips): UrlPath<String>,
) -> Result<Json<CountyResponse>, StatusCode> {
    let fips: Fips = fips.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    state
        .choropleth
        .county(fips)
        .map(|county| Json(CountyResponse::new(&state.choropleth, county)))
        .ok_or(StatusCode::NOT_FOUND)
}
