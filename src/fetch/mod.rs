//! Loading of the station and trip datasets from files or URLs.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use tracing::{debug, info};

use crate::error::{Result, TrafficError};
use crate::model::Station;
use crate::parser::{TripBatch, read_stations, read_trip_bytes};

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse()
            .map_err(|e| TrafficError::Url(format!("{url}: {e}")))?,
    );

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Reads `source` from disk, or over HTTP when it is an `http(s)` URL.
#[tracing::instrument(skip(client), fields(source = %source))]
pub async fn load_source<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_bytes(client, source).await?
    } else {
        tokio::fs::read(source).await?
    };
    debug!(bytes = bytes.len(), "Source loaded");
    Ok(bytes)
}

pub async fn load_stations<C: HttpClient>(client: &C, source: &str) -> Result<Vec<Station>> {
    let bytes = load_source(client, source).await?;
    let stations = read_stations(&bytes)?;
    info!(count = stations.len(), "Stations loaded");
    Ok(stations)
}

pub async fn load_trips<C: HttpClient>(client: &C, source: &str) -> Result<TripBatch> {
    let bytes = load_source(client, source).await?;
    let batch = read_trip_bytes(&bytes)?;
    info!(
        count = batch.trips.len(),
        skipped = batch.skipped,
        "Trips loaded"
    );
    Ok(batch)
}

/// Loads both datasets concurrently. Each result is reported on its own so the
/// caller can tell which dataset failed.
pub async fn load_datasets<C: HttpClient>(
    client: &C,
    stations: &str,
    trips: &str,
) -> (Result<Vec<Station>>, Result<TripBatch>) {
    tokio::join!(load_stations(client, stations), load_trips(client, trips))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[tokio::test]
    async fn test_load_datasets_from_files() {
        let stations_path = temp_path("bikewatch_test_stations.json");
        let trips_path = temp_path("bikewatch_test_trips.csv");
        fs::write(
            &stations_path,
            r#"[{"short_name":"A","name":"Alpha","lon":-71.0,"lat":42.0}]"#,
        )
        .unwrap();
        fs::write(
            &trips_path,
            "started_at,ended_at,start_station_id,end_station_id\n\
             2024-03-01 08:00:00,2024-03-01 08:10:00,A,A\n",
        )
        .unwrap();

        let client = BasicClient::new(&HttpConfig::default()).unwrap();
        let (stations, trips) = load_datasets(&client, &stations_path, &trips_path).await;

        assert_eq!(stations.unwrap().len(), 1);
        assert_eq!(trips.unwrap().trips.len(), 1);

        fs::remove_file(&stations_path).unwrap();
        fs::remove_file(&trips_path).unwrap();
    }

    #[tokio::test]
    async fn test_unparseable_trip_log_is_error() {
        let trips_path = temp_path("bikewatch_test_trips_html.csv");
        fs::write(&trips_path, "<html><body>502 Bad Gateway</body></html>\n").unwrap();

        let client = BasicClient::new(&HttpConfig::default()).unwrap();
        let result = load_trips(&client, &trips_path).await;

        assert!(matches!(result, Err(TrafficError::MissingField(_))));
        fs::remove_file(&trips_path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let client = BasicClient::new(&HttpConfig::default()).unwrap();
        let result = load_source(&client, "/nonexistent/bikewatch/trips.csv").await;

        assert!(matches!(result, Err(TrafficError::Io(_))));
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported() {
        let client = BasicClient::new(&HttpConfig::default()).unwrap();
        let result = fetch_bytes(&client, "not a url").await;

        assert!(matches!(result, Err(TrafficError::Url(_))));
    }
}
