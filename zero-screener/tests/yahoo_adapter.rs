//! Chart API adapter against a mock HTTP server.

use std::time::Duration;

use chrono::NaiveDate;
use wiremock::matchers::{method, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zero_screener::data::{BarsProvider, ProviderError, YahooChartAdapter};

const CHART_BODY: &str = r#"{
    "chart": {
        "result": [{
            "meta": {"symbol": "^NSEI", "gmtoffset": 19800},
            "timestamp": [1704252600, 1704166200],
            "indicators": {"quote": [{
                "open":  [21751.35, 21727.75],
                "high":  [21755.60, 21755.60],
                "low":   [21555.65, 21589.20],
                "close": [21517.35, 21665.80]
            }]}
        }],
        "error": null
    }
}"#;

fn adapter(server: &MockServer) -> YahooChartAdapter {
    YahooChartAdapter::new(server.uri(), Duration::from_secs(5))
}

#[tokio::test]
async fn test_fetches_full_daily_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v8/finance/chart/[^/]*NSEI$"))
        .and(query_param("range", "max"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHART_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let bars = adapter(&server).get_daily_bars("^NSEI").await.unwrap();

    assert_eq!(bars.len(), 2);
    let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
    assert!(dates.contains(&NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
    assert!(dates.contains(&NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()));
}

#[tokio::test]
async fn test_chart_error_is_data_not_available() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#,
        ))
        .mount(&server)
        .await;

    let err = adapter(&server).get_daily_bars("^NOPE").await.unwrap_err();
    assert!(matches!(err, ProviderError::DataNotAvailable(_)));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = adapter(&server).get_daily_bars("^NSEI").await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_garbage_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = adapter(&server).get_daily_bars("^NSEI").await.unwrap_err();
    assert!(matches!(err, ProviderError::Malformed(_)));
}
