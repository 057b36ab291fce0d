//! Choropleth map of U.S. county educational attainment.
//!
//! The pipeline is load → join/classify → render: [`data::load_data`] fetches
//! the county topology and the education records, [`processing::process_data`]
//! joins them by FIPS code and assigns threshold-scale buckets, and
//! [`render::build_scene`] turns the result into a [`render::Scene`] that
//! [`document`] writes as HTML.

pub mod config;
pub mod data;
pub mod document;
pub mod export;
pub mod processing;
pub mod render;
pub mod scale;
pub mod server;
pub mod topology;
pub mod types;

use anyhow::{Context, Result};

/// Load both datasets and classify every county.
pub async fn prepare(config: &config::AppConfig) -> Result<processing::Choropleth> {
    let map_data = data::load_data(config)
        .await
        .context("Failed to load map data")?;
    let choropleth = processing::process_data(config, map_data)
        .context("Failed to join education data onto counties")?;
    Ok(choropleth)
}
