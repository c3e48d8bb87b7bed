//! End-to-end scenarios 4 and 5: `SourceSelector` routing a
//! short 1s-interval request to REST, and a 90-day 1m-interval request to
//! the archive because it exceeds REST's chunk-count budget.

use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use kline_client::archive::zip_url_with_base;
use kline_core::types::{Interval, MarketType, TimeRange};
use kline_core::OrchestratorConfig;
use kline_engine::{ArchiveFetcher, Orchestrator, RestFetcher, SourceHint};
use kline_cache::FileCache;
use serde_json::json;
use std::io::Write as _;
use std::sync::{Arc, Mutex};

fn build_archive_zip(filename: &str, csv_contents: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buf);
        let mut zip = zip::ZipWriter::new(cursor);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(filename, options).unwrap();
        zip.write_all(csv_contents.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn day_csv(day: NaiveDate) -> String {
    let day_start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap());
    let mut out = String::new();
    for minute in 0..1440i64 {
        let open_time = day_start + ChronoDuration::minutes(minute);
        let close_time = open_time + ChronoDuration::seconds(59) + ChronoDuration::milliseconds(999);
        out.push_str(&format!(
            "{},100.0,101.0,99.0,100.5,1.0,{},100.0,1,0.5,50.0,0\n",
            open_time.timestamp_millis(),
            close_time.timestamp_millis(),
        ));
    }
    out
}

/// Regenerates a deterministic per-day archive so the same pair of mocked
/// routes (one for `.zip`, one for `.CHECKSUM`) can serve all 90 distinct
/// days scenario 5 requests, each with that day's own timestamps.
struct ArchiveDayResponder {
    days: Arc<Mutex<std::collections::HashMap<NaiveDate, Vec<u8>>>>,
    checksum: bool,
}

impl ArchiveDayResponder {
    fn zip_bytes_for(&self, day: NaiveDate) -> Vec<u8> {
        let mut days = self.days.lock().unwrap();
        days.entry(day)
            .or_insert_with(|| build_archive_zip(&format!("BTCUSDT-1m-{day}.csv"), &day_csv(day)))
            .clone()
    }

    fn day_from_path(path: &str) -> NaiveDate {
        let zip_pos = path.find(".zip").expect("path must contain .zip");
        let date_str = &path[zip_pos - 10..zip_pos];
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").expect("path must end in a YYYY-MM-DD date")
    }
}

/// Matches any request whose path has a given prefix and suffix, used in
/// place of a full regex matcher since none of this crate's dependencies
/// pull in the `regex` crate directly.
struct PrefixSuffixPath {
    prefix: String,
    suffix: &'static str,
}

impl wiremock::Match for PrefixSuffixPath {
    fn matches(&self, request: &wiremock::Request) -> bool {
        let path = request.url.path();
        path.starts_with(&self.prefix) && path.ends_with(self.suffix)
    }
}

impl wiremock::Respond for ArchiveDayResponder {
    fn respond(&self, request: &wiremock::Request) -> wiremock::ResponseTemplate {
        let day = Self::day_from_path(request.url.path());
        let bytes = self.zip_bytes_for(day);
        if self.checksum {
            let digest = kline_client::archive::sha256_hex(&bytes);
            wiremock::ResponseTemplate::new(200).set_body_string(format!("{digest}  ignored.zip\n"))
        } else {
            wiremock::ResponseTemplate::new(200).set_body_bytes(bytes)
        }
    }
}

#[tokio::test]
async fn short_second_interval_request_is_served_from_rest() {
    // Pick an already second-aligned window so the 5-minute span produces
    // exactly 300 one-second candles with no alignment slack.
    let end = {
        let raw = Utc::now() - ChronoDuration::minutes(5);
        Utc.timestamp_opt(raw.timestamp(), 0).unwrap()
    };
    let start = end - ChronoDuration::minutes(5);

    let mut rows = Vec::new();
    for s in 0..300i64 {
        let open_time_ms = (start + ChronoDuration::seconds(s)).timestamp_millis();
        let close_time_ms = open_time_ms + 999;
        rows.push(json!([open_time_ms, "100.0", "101.0", "99.0", "100.5", "1.0", close_time_ms, "100.0", 1, "0.5", "50.0", "0"]));
    }

    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(json!(rows)))
        .mount(&server)
        .await;

    let cache_dir = tempfile::tempdir().unwrap().keep();
    let config = OrchestratorConfig::default().with_cache_dir(cache_dir);
    let cache = Arc::new(FileCache::new(&config.cache_dir).unwrap());
    let archive_fetcher =
        Arc::new(ArchiveFetcher::with_base_url(MarketType::Spot, "http://127.0.0.1:1", config.api_timeout_seconds, config.retry_count).unwrap());
    let leaked_host: &'static str = Box::leak(server.uri().into_boxed_str());
    let rest_fetcher =
        Arc::new(RestFetcher::with_hosts(MarketType::Spot, config.api_timeout_seconds, config.retry_count, vec![leaked_host]).unwrap());
    let orchestrator =
        Orchestrator::with_fetchers(MarketType::Spot, config, cache, archive_fetcher, rest_fetcher).unwrap();

    let range = TimeRange::new(start, end).unwrap();
    let (table, coverage) = orchestrator.get_range("BTCUSDT", Interval::Sec1, range, SourceHint::Auto).await.unwrap();

    assert_eq!(table.len(), 300);
    assert_eq!(coverage.expected_points, 300);
}

#[tokio::test]
async fn ninety_day_span_is_served_from_the_archive() {
    let end_day = (Utc::now() - ChronoDuration::days(45)).date_naive();
    let start_day = end_day - ChronoDuration::days(90);
    let end_time = Utc.from_utc_datetime(&end_day.and_hms_opt(0, 0, 0).unwrap());
    let start_time = Utc.from_utc_datetime(&start_day.and_hms_opt(0, 0, 0).unwrap());

    let server = wiremock::MockServer::start().await;
    let base = server.uri();
    let probe_url = zip_url_with_base(&base, MarketType::Spot, "BTCUSDT", "1m", start_day);
    let probe_path = probe_url.trim_start_matches(base.as_str());
    let zip_path_prefix = &probe_path[..probe_path.len() - "2024-01-01.zip".len()];

    let days = Arc::new(Mutex::new(std::collections::HashMap::new()));
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(PrefixSuffixPath { prefix: zip_path_prefix.to_string(), suffix: ".zip" })
        .respond_with(ArchiveDayResponder { days: days.clone(), checksum: false })
        .mount(&server)
        .await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(PrefixSuffixPath { prefix: zip_path_prefix.to_string(), suffix: ".CHECKSUM" })
        .respond_with(ArchiveDayResponder { days: days.clone(), checksum: true })
        .mount(&server)
        .await;

    let cache_dir = tempfile::tempdir().unwrap().keep();
    let config = OrchestratorConfig::default().with_cache_dir(cache_dir);
    let cache = Arc::new(FileCache::new(&config.cache_dir).unwrap());
    let archive_fetcher =
        Arc::new(ArchiveFetcher::with_base_url(MarketType::Spot, base, config.api_timeout_seconds, config.retry_count).unwrap());
    let rest_fetcher =
        Arc::new(RestFetcher::with_hosts(MarketType::Spot, config.api_timeout_seconds, config.retry_count, vec!["http://127.0.0.1:1"]).unwrap());
    let orchestrator =
        Orchestrator::with_fetchers(MarketType::Spot, config, cache, archive_fetcher, rest_fetcher).unwrap();

    let range = TimeRange::new(start_time, end_time).unwrap();
    let (table, coverage) = orchestrator.get_range("BTCUSDT", Interval::Min1, range, SourceHint::Auto).await.unwrap();

    assert_eq!(table.len(), 90 * 1440);
    assert_eq!(coverage.expected_points, 90 * 1440);
}
