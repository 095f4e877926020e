use chrono::{DateTime, TimeZone, Utc};
use race_finder::aggregator::{Aggregator, SearchParams};
use race_finder::apis::{HeroLeagueCrawler, RunCCrawler, RussiaRunningCrawler, TimermanCrawler};
use race_finder::common::types::CompetitionApi;
use race_finder::domain::{ServiceKind, SportCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 13, 0, 0, 0).unwrap()
}

async fn russia_running_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "rr-late", "code": "late", "title": "Новогодний забег", "cityName": "Москва",
             "disciplineCode": "run", "beginDate": "2025-12-31T10:00:00Z"},
            {"id": "rr-undated", "code": "undated", "title": "Забег без даты", "cityName": "Москва",
             "disciplineCode": "run"},
            {"id": "rr-early", "code": "early", "title": "Осенний забег", "cityName": "Москва",
             "disciplineCode": "run", "beginDate": "2025-11-16T10:00:00Z"}
        ])))
        .mount(&server)
        .await;
    server
}

async fn hero_league_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/event/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": [{
            "public_id": "zabeg",
            "title": "Забег Героев",
            "event_type": {"public_id": "zabeg"},
            "event_city": [
                {"public_id": "hl-msk", "city": {"name_ru": "Москва"}, "start_time": "2025-11-16T10:00:00Z"}
            ]
        }]})))
        .mount(&server)
        .await;
    server
}

async fn failing_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_merged_output_is_sorted_with_priority_ties() {
    let rr = russia_running_server().await;
    let hl = hero_league_server().await;
    let down = failing_server().await;

    let apis: Vec<Arc<dyn CompetitionApi>> = vec![
        Arc::new(RussiaRunningCrawler::with_base_url(rr.uri())),
        Arc::new(TimermanCrawler::with_base_url(down.uri())),
        Arc::new(HeroLeagueCrawler::with_base_url(hl.uri())),
        Arc::new(RunCCrawler::with_base_url(down.uri())),
    ];
    let aggregator = Aggregator::with_apis(apis);

    let result = aggregator.fetch_all_at(&SearchParams::default(), now()).await;
    let ids: Vec<&str> = result.iter().map(|c| c.id.as_str()).collect();
    // Same start instant: RussiaRunning outranks HeroLeague
    assert_eq!(ids, vec!["rr-early", "hl-msk", "rr-late", "rr-undated"]);

    for pair in result.windows(2) {
        if let (Some(a), Some(b)) = (pair[0].begin_date, pair[1].begin_date) {
            assert!(a <= b);
        }
    }
    assert!(result
        .iter()
        .filter_map(|c| c.begin_date)
        .all(|start| start >= now()));
    assert!(result.iter().all(|c| SportCode::ALL.contains(&c.sport_code)));
}

#[tokio::test]
async fn test_limit_applies_after_merge() {
    let rr = russia_running_server().await;
    let hl = hero_league_server().await;
    let apis: Vec<Arc<dyn CompetitionApi>> = vec![
        Arc::new(RussiaRunningCrawler::with_base_url(rr.uri())),
        Arc::new(HeroLeagueCrawler::with_base_url(hl.uri())),
    ];
    let aggregator = Aggregator::with_apis(apis);

    let params = SearchParams {
        limit: 2,
        ..Default::default()
    };
    let result = aggregator.fetch_all_at(&params, now()).await;
    let ids: Vec<&str> = result.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["rr-early", "hl-msk"]);
}

#[tokio::test]
async fn test_single_service_selection() {
    let rr = russia_running_server().await;
    let hl = hero_league_server().await;
    let apis: Vec<Arc<dyn CompetitionApi>> = vec![
        Arc::new(RussiaRunningCrawler::with_base_url(rr.uri())),
        Arc::new(HeroLeagueCrawler::with_base_url(hl.uri())),
    ];
    let aggregator = Aggregator::with_apis(apis);

    let params = SearchParams {
        service: Some("Лига Героев".into()),
        ..Default::default()
    };
    let result = aggregator.fetch_all_at(&params, now()).await;
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].service, ServiceKind::HeroLeague);
}

#[tokio::test]
async fn test_slow_provider_is_cut_off() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/event/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"values": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&slow)
        .await;
    let rr = russia_running_server().await;

    let apis: Vec<Arc<dyn CompetitionApi>> = vec![
        Arc::new(RussiaRunningCrawler::with_base_url(rr.uri())),
        Arc::new(HeroLeagueCrawler::with_base_url(slow.uri())),
    ];
    let aggregator = Aggregator::with_apis(apis).with_provider_timeout(Duration::from_millis(500));

    let result = aggregator.fetch_all_at(&SearchParams::default(), now()).await;
    assert_eq!(result.len(), 3);
    assert!(result.iter().all(|c| c.service == ServiceKind::RussiaRunning));
}

#[tokio::test]
async fn test_every_provider_down_returns_empty() {
    let down = failing_server().await;
    let apis: Vec<Arc<dyn CompetitionApi>> = vec![
        Arc::new(RussiaRunningCrawler::with_base_url(down.uri())),
        Arc::new(TimermanCrawler::with_base_url(down.uri())),
        Arc::new(HeroLeagueCrawler::with_base_url(down.uri())),
        Arc::new(RunCCrawler::with_base_url(down.uri())),
    ];
    let aggregator = Aggregator::with_apis(apis);

    let result = aggregator.fetch_all_at(&SearchParams::default(), now()).await;
    assert!(result.is_empty());
}
