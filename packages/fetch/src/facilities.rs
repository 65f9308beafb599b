//! Health facility download from the healthsites.io API.

use std::path::{Path, PathBuf};

use crate::{FetchError, retry};

const HEALTHSITES_URL: &str = "https://healthsites.io/api/v2/facilities/";

/// Maximum features per request, matching the API's page cap.
const PAGE_LIMIT: u32 = 10_000;

/// Downloads the facility GeoJSON for a country (ISO 3166-1 alpha-2
/// code) into `output_dir`, returning the written file's path.
///
/// The API answers a GeoJSON `FeatureCollection`; the raw body is saved
/// as-is and parsed downstream by the vector loader.
///
/// # Errors
///
/// Returns [`FetchError`] on download or I/O failure, or when the
/// response is not a feature collection.
pub async fn download_facilities(
    client: &reqwest::Client,
    output_dir: &Path,
    country_code: &str,
) -> Result<PathBuf, FetchError> {
    std::fs::create_dir_all(output_dir)?;
    let target = output_dir.join("facilities.geojson");
    if target.exists() {
        log::info!("Facilities already present at {}", target.display());
        return Ok(target);
    }

    log::info!("Downloading health facilities for {country_code}");
    let body = retry::send_json(|| {
        client.get(HEALTHSITES_URL).query(&[
            ("country", country_code),
            ("limit", &PAGE_LIMIT.to_string()),
        ])
    })
    .await?;

    let count = body
        .get("features")
        .and_then(serde_json::Value::as_array)
        .map_or(0, Vec::len);
    if count == 0 {
        log::warn!("Facility response for {country_code} contains no features");
    }

    std::fs::write(&target, serde_json::to_vec(&body)?)?;
    log::info!("Downloaded {count} health facilities");
    Ok(target)
}
