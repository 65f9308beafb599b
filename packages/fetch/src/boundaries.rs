//! Administrative boundary download.
//!
//! Fetches the Natural Earth admin-1 states/provinces archive as zipped
//! GeoJSON and extracts it into the data directory. The extracted layer
//! carries an `ADM0_A3` country-code column the pipeline filters on.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use crate::{FetchError, retry};

/// Natural Earth 10m admin-1 boundaries, GeoJSON packaging.
const BOUNDARIES_URL: &str =
    "https://naciscdn.org/naturalearth/10m/cultural/ne_10m_admin_1_states_provinces.geojson.zip";

/// Downloads and extracts the boundary archive into `output_dir`.
///
/// Returns the path of the extracted GeoJSON file. Skips the download
/// when the file already exists.
///
/// # Errors
///
/// Returns [`FetchError`] on download, extraction, or I/O failure.
pub async fn download_boundaries(
    client: &reqwest::Client,
    output_dir: &Path,
) -> Result<PathBuf, FetchError> {
    std::fs::create_dir_all(output_dir)?;
    let target = output_dir.join("admin_boundaries.geojson");
    if target.exists() {
        log::info!("Boundaries already present at {}", target.display());
        return Ok(target);
    }

    log::info!("Downloading administrative boundaries");
    let body = retry::send_bytes(|| client.get(BOUNDARIES_URL)).await?;

    extract_first_entry(&body, "geojson", &target)?;
    log::info!("Downloaded boundaries to {}", target.display());
    Ok(target)
}

/// Extracts the first archive entry with the given extension to `target`.
fn extract_first_entry(archive: &[u8], extension: &str, target: &Path) -> Result<(), FetchError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if Path::new(entry.name())
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            let mut contents = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry.read_to_end(&mut contents)?;
            std::fs::write(target, contents)?;
            return Ok(());
        }
    }
    Err(FetchError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("archive contains no .{extension} entry"),
    )))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn archive_with(name: &str, contents: &[u8]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        writer.start_file(name, options).unwrap();
        writer.write_all(contents).unwrap();
        writer.finish().unwrap();
        buffer.into_inner()
    }

    #[test]
    fn extracts_matching_entry() {
        let dir = std::env::temp_dir().join("health_access_fetch_test_extract");
        std::fs::create_dir_all(&dir).unwrap();
        let target = dir.join("out.geojson");

        let archive = archive_with("boundaries.GeoJSON", b"{\"type\":\"FeatureCollection\"}");
        extract_first_entry(&archive, "geojson", &target).unwrap();
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "{\"type\":\"FeatureCollection\"}"
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_entry_is_an_error() {
        let dir = std::env::temp_dir().join("health_access_fetch_test_missing");
        std::fs::create_dir_all(&dir).unwrap();
        let archive = archive_with("readme.txt", b"nope");
        let result = extract_first_entry(&archive, "geojson", &dir.join("out.geojson"));
        assert!(result.is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
