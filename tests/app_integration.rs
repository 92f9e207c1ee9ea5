use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use tower::ServiceExt;
use tracing::{error, info};
use travel_budget::api::create_router;
use travel_budget::build_state;
use travel_budget::core::config::AppConfig;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const GB_JSON: &str = r#"[{
        "cca2": "GB",
        "name": {"common": "United Kingdom"},
        "currencies": {"GBP": {"name": "British pound", "symbol": "£"}},
        "flags": {"png": "https://flagcdn.com/w320/gb.png"}
    }]"#;

    pub const JP_JSON: &str = r#"[{
        "cca2": "JP",
        "name": {"common": "Japan"},
        "currencies": {"JPY": {"name": "Japanese yen", "symbol": "¥"}},
        "flags": {"png": "https://flagcdn.com/w320/jp.png"}
    }]"#;

    pub async fn mount_json(
        mock_server: &MockServer,
        url_path: &str,
        body: &str,
        expected_calls: u64,
    ) {
        Mock::given(method("GET"))
            .and(path(url_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected_calls)
            .mount(mock_server)
            .await;
    }

    pub async fn create_countries_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;
        for (code, body) in [("GB", GB_JSON), ("JP", JP_JSON)] {
            Mock::given(method("GET"))
                .and(path(format!("/v3.1/alpha/{code}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&mock_server)
                .await;
        }
        mock_server
    }

    pub fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        std::fs::write(config_file.path(), contents).expect("Failed to write config file");
        config_file
    }
}

async fn send(config: &AppConfig, request: Request<Body>) -> (StatusCode, Value) {
    let state = build_state(config).await.expect("Failed to build state");
    let response = create_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn budget_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/budget/calculate")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[test_log::test(tokio::test)]
async fn test_budget_flow_with_rate_table() {
    let countries = test_utils::create_countries_mock_server().await;
    let rates = wiremock::MockServer::start().await;
    // Both destinations are answered from one table
    test_utils::mount_json(
        &rates,
        "/v6/latest/USD",
        r#"{"result": "success", "base_code": "USD", "rates": {"GBP": 0.79, "JPY": 149.5}}"#,
        1,
    )
    .await;

    let config_file = test_utils::write_config(&format!(
        r#"
        providers:
          countries:
            base_url: {}
          rates:
            base_url: {}
          retries: 0
        rates:
          strategy: table
    "#,
        countries.uri(),
        rates.uri()
    ));
    let config = AppConfig::load_from_path(config_file.path()).unwrap();

    let (status, body) = send(
        &config,
        budget_request(
            r#"{"homeCurrency":"USD","dailyBudget":100,"tripDays":7,"destinationCountries":["GB","JP"]}"#,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    let results = body.as_array().unwrap();
    assert_eq!(results[0]["countryName"], "United Kingdom");
    assert_eq!(results[0]["totalBudgetLocal"], 553.0);
    assert_eq!(results[0]["dailyLocalAmount"], 79.0);
    assert_eq!(results[1]["countryCode"], "JP");
    assert_eq!(results[1]["totalBudgetLocal"], 104650.0);
    assert_eq!(results[1]["dailyLocalAmount"], 14950.0);
}

#[test_log::test(tokio::test)]
async fn test_budget_flow_with_pairwise_rates_in_parallel() {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    let countries = test_utils::create_countries_mock_server().await;
    let frankfurter = wiremock::MockServer::start().await;
    for (to, rate) in [("GBP", "0.7912345678"), ("JPY", "149.5")] {
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("from", "USD"))
            .and(query_param("to", to))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"amount": 1.0, "base": "USD", "date": "2024-01-05", "rates": {{"{to}": {rate}}}}}"#
            )))
            .expect(1)
            .mount(&frankfurter)
            .await;
    }

    let config_file = test_utils::write_config(&format!(
        r#"
        providers:
          countries:
            base_url: {}
          frankfurter:
            base_url: {}
        rates:
          strategy: pairwise
        budget:
          parallel_lookups: true
    "#,
        countries.uri(),
        frankfurter.uri()
    ));
    let config = AppConfig::load_from_path(config_file.path()).unwrap();

    let (status, body) = send(
        &config,
        budget_request(
            r#"{"homeCurrency":"usd","dailyBudget":100,"tripDays":7,"destinationCountries":["gb","jp"]}"#,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    let results = body.as_array().unwrap();
    assert_eq!(results[0]["countryCode"], "GB");
    assert_eq!(results[0]["exchangeRate"], 0.7912);
    assert_eq!(results[0]["totalBudgetLocal"], 553.86);
    assert_eq!(results[1]["countryCode"], "JP");
}

#[test_log::test(tokio::test)]
async fn test_preloaded_countries_skip_live_lookups() {
    let countries = wiremock::MockServer::start().await;
    test_utils::mount_json(
        &countries,
        "/v3.1/all",
        r#"[{"cca2": "GB", "name": {"common": "United Kingdom"}, "currencies": {"GBP": {"name": "British pound", "symbol": "£"}}, "flags": {}}]"#,
        1,
    )
    .await;
    test_utils::mount_json(&countries, "/v3.1/alpha/GB", test_utils::GB_JSON, 0).await;

    let rates = wiremock::MockServer::start().await;
    test_utils::mount_json(
        &rates,
        "/v6/latest/USD",
        r#"{"result": "success", "base_code": "USD", "rates": {"GBP": 0.79}}"#,
        1,
    )
    .await;

    let config_file = test_utils::write_config(&format!(
        r#"
        providers:
          countries:
            base_url: {}
          rates:
            base_url: {}
        countries:
          preload: true
    "#,
        countries.uri(),
        rates.uri()
    ));
    let config = AppConfig::load_from_path(config_file.path()).unwrap();

    let (status, body) = send(
        &config,
        budget_request(
            r#"{"homeCurrency":"USD","dailyBudget":10,"tripDays":1,"destinationCountries":["GB"]}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    assert_eq!(body[0]["totalBudgetLocal"], 7.9);
}

#[test_log::test(tokio::test)]
async fn test_history_flow() {
    use wiremock::matchers::{method, path_regex, query_param};
    use wiremock::{Mock, ResponseTemplate};

    let frankfurter = wiremock::MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/\d{4}-\d{2}-\d{2}\.\.\d{4}-\d{2}-\d{2}$"))
        .and(query_param("from", "USD"))
        .and(query_param("to", "EUR"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{
                "amount": 1.0,
                "base": "USD",
                "start_date": "2024-01-02",
                "end_date": "2024-01-04",
                "rates": {
                    "2024-01-04": {"EUR": 0.9139},
                    "2024-01-02": {"EUR": 0.9146},
                    "2024-01-03": {"EUR": 0.9152}
                }
            }"#,
        ))
        .expect(1)
        .mount(&frankfurter)
        .await;

    let config_file = test_utils::write_config(&format!(
        r#"
        providers:
          frankfurter:
            base_url: {}
    "#,
        frankfurter.uri()
    ));
    let config = AppConfig::load_from_path(config_file.path()).unwrap();

    let request = Request::builder()
        .uri("/api/v1/history/rates?from=usd&to=eur&days=90")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&config, request).await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    let dates: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|point| point["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-01-02", "2024-01-03", "2024-01-04"]);
}

#[test_log::test(tokio::test)]
async fn test_rate_provider_outage_is_reported() {
    let countries = test_utils::create_countries_mock_server().await;
    let rates = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(503))
        .mount(&rates)
        .await;

    let config_file = test_utils::write_config(&format!(
        r#"
        providers:
          countries:
            base_url: {}
          rates:
            base_url: {}
          retries: 0
    "#,
        countries.uri(),
        rates.uri()
    ));
    let config = AppConfig::load_from_path(config_file.path()).unwrap();

    let (status, body) = send(
        &config,
        budget_request(
            r#"{"homeCurrency":"USD","dailyBudget":100,"tripDays":7,"destinationCountries":["GB"]}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "upstream_error");
}

#[test_log::test(tokio::test)]
async fn test_setup_writes_loadable_config() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");

    travel_budget::setup::setup_at_path(&config_path).unwrap();

    let contents = fs::read_to_string(&config_path).unwrap();
    info!(bytes = contents.len(), "Wrote example config");
    let config = AppConfig::load_from_path(&config_path).unwrap();
    assert_eq!(config.server.port, 8080);
}

#[test_log::test(tokio::test)]
#[ignore = "talks to the public Frankfurter API"]
async fn test_real_frankfurter_api() {
    use travel_budget::core::currency::CurrencyRateProvider;
    use travel_budget::providers::{FrankfurterProvider, HttpSettings};

    let provider =
        FrankfurterProvider::new("https://api.frankfurter.app", HttpSettings::default()).unwrap();

    let from_currency = "USD";
    let to_currency = "EUR";
    info!(
        ?from_currency,
        ?to_currency,
        "Fetching currency rate from Frankfurter"
    );

    match provider.get_rate(from_currency, to_currency).await {
        Ok(rate) => {
            info!(?rate, "Received successful currency rate response");
            let rate = rate.expect("USD to EUR should be quoted");
            assert!(rate > rust_decimal::Decimal::ZERO, "Currency rate should be positive");
        }
        Err(e) => {
            error!("Currency rate API request failed: {e}\n{e:?}");
            panic!("Currency rate API request failed: {e}");
        }
    }
}
