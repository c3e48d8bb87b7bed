//! End-to-end scenario 6: a corrupted first download is detected via
//! checksum mismatch, retried once, and the retry succeeds.

use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use kline_client::archive::zip_url_with_base;
use kline_core::types::{Interval, MarketType, TimeRange};
use kline_core::OrchestratorConfig;
use kline_engine::{ArchiveFetcher, Orchestrator, RestFetcher, SourceHint};
use kline_cache::FileCache;
use std::io::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

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

fn path_only(full_url: &str, base: &str) -> String {
    full_url.trim_start_matches(base).to_string()
}

/// Serves a corrupted ZIP on the first request and the good one on every
/// request after, so the test observes exactly one checksum-driven retry.
struct FlakyZipResponder {
    good_bytes: Vec<u8>,
    attempts: AtomicUsize,
}

impl wiremock::Respond for FlakyZipResponder {
    fn respond(&self, _request: &wiremock::Request) -> wiremock::ResponseTemplate {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt == 0 {
            let mut corrupted = self.good_bytes.clone();
            if let Some(first) = corrupted.first_mut() {
                *first ^= 0xFF;
            }
            wiremock::ResponseTemplate::new(200).set_body_bytes(corrupted)
        } else {
            wiremock::ResponseTemplate::new(200).set_body_bytes(self.good_bytes.clone())
        }
    }
}

#[tokio::test]
async fn corrupted_download_is_retried_once_and_recovers() {
    let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let csv = day_csv(day);
    let zip_bytes = build_archive_zip("BTCUSDT-1m-2024-01-01.csv", &csv);
    let checksum = kline_client::archive::sha256_hex(&zip_bytes);

    let server = wiremock::MockServer::start().await;
    let base = server.uri();
    let zip_url = zip_url_with_base(&base, MarketType::Spot, "BTCUSDT", "1m", day);
    let checksum_url = format!("{zip_url}.CHECKSUM");
    let zip_path = path_only(&zip_url, &base);
    let checksum_path = path_only(&checksum_url, &base);

    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path(zip_path))
        .respond_with(FlakyZipResponder { good_bytes: zip_bytes.clone(), attempts: AtomicUsize::new(0) })
        .mount(&server)
        .await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path(checksum_path))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(format!("{checksum}  BTCUSDT-1m-2024-01-01.zip\n")))
        .mount(&server)
        .await;

    let cache_dir = tempfile::tempdir().unwrap().keep();
    let config = OrchestratorConfig::default().with_cache_dir(cache_dir);
    let cache = Arc::new(FileCache::new(&config.cache_dir).unwrap());
    let archive_fetcher = Arc::new(ArchiveFetcher::with_base_url(MarketType::Spot, base, config.api_timeout_seconds, config.retry_count).unwrap());
    let rest_fetcher = Arc::new(RestFetcher::with_hosts(MarketType::Spot, config.api_timeout_seconds, config.retry_count, vec!["http://127.0.0.1:1"]).unwrap());
    let orchestrator =
        Orchestrator::with_fetchers(MarketType::Spot, config, cache, archive_fetcher, rest_fetcher).unwrap();

    let range = TimeRange::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
    )
    .unwrap();

    let (table, coverage) = orchestrator.get_range("BTCUSDT", Interval::Min1, range, SourceHint::Auto).await.unwrap();

    assert_eq!(table.len(), 1440, "the retried download should recover the full day");
    assert_eq!(coverage.actual_points, 1440);

    let zip_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with(".zip"))
        .count();
    assert_eq!(zip_requests, 2, "exactly one retry expected after the checksum mismatch");
}
