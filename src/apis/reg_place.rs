use crate::classify::{matches_sport_type, DisciplineSurface, REG_PLACE_CLASSIFIER};
use crate::common::constants::{REG_PLACE_API, REG_PLACE_API_BASE_URL, REG_PLACE_SITE_URL, REG_PLACE_TIMEOUT_SECS};
use crate::common::error::{Result, ScraperError};
use crate::common::types::{CompetitionQuery, EventSource};
use crate::domain::{Competition, Distance, ServiceKind, SportFilter};
use crate::infra::http_client::{build_client, Accept};
use crate::window::parse_timestamp;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Distances above this are given in meters.
const METERS_THRESHOLD: f64 = 100.0;

/// Candidate list endpoints, tried in order.
pub fn default_endpoints() -> Vec<String> {
    vec![
        format!("{}/events", REG_PLACE_API_BASE_URL),
        format!("{}/event/list", REG_PLACE_API_BASE_URL),
        format!("{}/search", REG_PLACE_API_BASE_URL),
        format!("{}/api/events", REG_PLACE_SITE_URL),
    ]
}

pub struct RegPlaceCrawler {
    endpoints: Vec<String>,
    site_url: String,
}

impl Default for RegPlaceCrawler {
    fn default() -> Self {
        Self::new()
    }
}

impl RegPlaceCrawler {
    pub fn new() -> Self {
        Self::with_endpoints(default_endpoints(), REG_PLACE_SITE_URL)
    }

    pub fn with_endpoints(endpoints: Vec<String>, site_url: impl Into<String>) -> Self {
        Self {
            endpoints,
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Accepts a bare list or an object holding the list under a known key.
    fn event_list(body: Value) -> Option<Vec<Value>> {
        match body {
            Value::Array(events) => Some(events),
            Value::Object(mut map) => ["events", "items", "data", "results"]
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(Value::Array(events)) => Some(events),
                    _ => None,
                }),
            _ => None,
        }
    }

    async fn try_endpoint(client: &reqwest::Client, endpoint: &str) -> Result<Vec<Value>> {
        let response = client.get(endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                service: REG_PLACE_API,
                status: status.as_u16(),
                url: endpoint.to_string(),
            });
        }

        let body: Value = response.json().await?;
        Self::event_list(body).ok_or_else(|| ScraperError::Shape("no event list in response".into()))
    }

    fn event_url(&self, event: &Value, url_id: &str) -> String {
        match first_str(event, &["url", "link"]) {
            Some(url) if url.starts_with("http") => url.to_string(),
            Some(path) if path.starts_with('/') => format!("{}{}", self.site_url, path),
            Some(path) => format!("{}/{}", self.site_url, path),
            None => format!("{}/event/{}", self.site_url, url_id),
        }
    }
}

/// First non-empty string among `keys`.
fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn first_id(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|key| value.get(*key)).find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn sport_slug(event: &Value) -> String {
    let from_sports = event
        .get("sports")
        .and_then(Value::as_array)
        .and_then(|sports| sports.first())
        .and_then(|sport| first_str(sport, &["slug", "name"]));
    from_sports
        .or_else(|| first_str(event, &["sport_type", "sport", "type"]))
        .unwrap_or_default()
        .to_string()
}

fn city_name(event: &Value) -> String {
    match event.get("city") {
        Some(Value::String(city)) => city.trim().to_string(),
        Some(city @ Value::Object(_)) => first_str(city, &["name", "title"]).unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

fn races(event: &Value) -> &[Value] {
    ["races", "distances", "items"]
        .iter()
        .filter_map(|key| event.get(*key).and_then(Value::as_array))
        .find(|list| !list.is_empty())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl EventSource for RegPlaceCrawler {
    type Raw = Value;

    fn kind(&self) -> ServiceKind {
        ServiceKind::RegPlace
    }

    #[instrument(skip(self))]
    async fn get_event_list(&self, _query: &CompetitionQuery) -> Result<Vec<Value>> {
        let client = build_client(REG_PLACE_TIMEOUT_SECS, Accept::Json, None)?;

        for endpoint in &self.endpoints {
            debug!("Trying {} endpoint {}", REG_PLACE_API, endpoint);
            match Self::try_endpoint(&client, endpoint).await {
                Ok(events) => {
                    if let Some(first) = events.iter().find_map(Value::as_object) {
                        let keys: Vec<&str> = first.keys().map(String::as_str).collect();
                        info!("{} event structure keys: {:?}", REG_PLACE_API, keys);
                    }
                    info!(
                        "Successfully fetched {} events from {} via {}",
                        events.len(),
                        REG_PLACE_API,
                        endpoint
                    );
                    return Ok(events);
                }
                Err(e) => warn!("{} endpoint {} failed: {}", REG_PLACE_API, endpoint, e),
            }
        }

        warn!("No working endpoint found for {}", REG_PLACE_API);
        Ok(Vec::new())
    }

    fn get_competition(&self, raw: &Value, _query: &CompetitionQuery) -> Result<Competition> {
        let slug = first_str(raw, &["slug"]);
        let event_id = first_id(raw, &["id", "event_id"]);
        let short_id = event_id
            .or_else(|| slug.map(str::to_string))
            .ok_or_else(|| ScraperError::MissingField("id".into()))?;
        let title = first_str(raw, &["name", "title"]).ok_or_else(|| ScraperError::MissingField("name".into()))?;

        let start = first_str(raw, &["start_time", "date", "start_date"])
            .ok_or_else(|| ScraperError::MissingField("start_time".into()))?;
        let begin_date = parse_timestamp(start).ok_or_else(|| ScraperError::InvalidDate(start.to_string()))?;

        let sport_code = REG_PLACE_CLASSIFIER.classify(&sport_slug(raw));
        let distances = races(raw)
            .iter()
            .filter_map(|race| {
                let distance = ["distance", "length", "distance_km"]
                    .iter()
                    .filter_map(|key| race.get(*key))
                    .find_map(number)
                    .filter(|d| *d > 0.0)?;
                let distance_km = if distance > METERS_THRESHOLD {
                    distance / 1000.0
                } else {
                    distance
                };
                let name = first_str(race, &["name", "title", "distance_name"])
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{} км", distance_km));
                Some(Distance {
                    name,
                    distance_km,
                    sport_code,
                    participants_count: None,
                })
            })
            .collect();

        let city = city_name(raw);
        let url_id = slug.map(str::to_string).unwrap_or_else(|| short_id.clone());

        Ok(Competition {
            place: city.clone(),
            city,
            sport_code,
            begin_date: Some(begin_date),
            end_date: Some(begin_date),
            distances,
            url: self.event_url(raw, &url_id),
            ..Competition::new(self.kind(), format!("regplace_{}", short_id), title)
        })
    }

    /// The stated sport decides first; title keywords and race names can
    /// still admit a multi-sport event.
    fn matches_sport(&self, raw: &Value, competition: &Competition, sport: SportFilter) -> bool {
        if let SportFilter::Only(code) = sport {
            if competition.sport_code == code {
                return true;
            }
        }
        let slug = sport_slug(raw);
        matches_sport_type(
            sport,
            &REG_PLACE_CLASSIFIER,
            DisciplineSurface::new(&slug, ""),
            &competition.title,
            competition.distances.iter().map(|d| DisciplineSurface::new("", &d.name)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SportCode;
    use chrono::TimeZone;
    use serde_json::json;

    fn query() -> CompetitionQuery {
        CompetitionQuery::new(chrono::Utc.with_ymd_and_hms(2025, 11, 13, 0, 0, 0).unwrap(), 50)
    }

    #[test]
    fn test_event_list_shapes() {
        assert_eq!(RegPlaceCrawler::event_list(json!([{}])).unwrap().len(), 1);
        assert_eq!(RegPlaceCrawler::event_list(json!({"data": [{}, {}]})).unwrap().len(), 2);
        assert_eq!(RegPlaceCrawler::event_list(json!({"results": []})).unwrap().len(), 0);
        assert!(RegPlaceCrawler::event_list(json!({"count": 0})).is_none());
    }

    #[test]
    fn test_event_mapping() {
        let crawler = RegPlaceCrawler::new();
        let event = json!({
            "id": 4412,
            "slug": "open-water-kazan",
            "name": "Заплыв на открытой воде",
            "start_time": "2025-11-30T09:00:00",
            "city": {"name": "Казань"},
            "sports": [{"slug": "swimming", "name": "Плавание"}],
            "races": [
                {"distance": 1500, "name": "1.5 км"},
                {"distance": 5},
                {"name": "без дистанции"}
            ]
        });
        let comp = crawler.get_competition(&event, &query()).unwrap();
        assert_eq!(comp.id, "regplace_4412");
        assert_eq!(comp.url, "https://reg.place/event/open-water-kazan");
        assert_eq!(comp.city, "Казань");
        assert_eq!(comp.sport_code, SportCode::Swim);
        assert_eq!(comp.distances.len(), 2);
        assert_eq!(comp.distances[0].distance_km, 1.5);
        assert_eq!(comp.distances[1].distance_km, 5.0);
        assert_eq!(comp.distances[1].name, "5 км");
    }

    #[test]
    fn test_missing_sport_defaults_to_run_and_relative_url() {
        let crawler = RegPlaceCrawler::new();
        let event = json!({
            "event_id": "abc",
            "title": "Осенний забег",
            "date": "2025-12-07",
            "city": "Пермь",
            "link": "/event/abc"
        });
        let comp = crawler.get_competition(&event, &query()).unwrap();
        assert_eq!(comp.sport_code, SportCode::Run);
        assert_eq!(comp.url, "https://reg.place/event/abc");
        assert!(crawler.matches_sport(&event, &comp, SportFilter::Only(SportCode::Run)));
        assert!(!crawler.matches_sport(&event, &comp, SportFilter::Only(SportCode::Swim)));
    }

    #[test]
    fn test_title_admits_second_sport() {
        let crawler = RegPlaceCrawler::new();
        let event = json!({
            "id": 90,
            "name": "Заплыв и забег",
            "start_time": "2025-11-29T08:00:00",
            "city": "Казань",
            "sports": [{"slug": "running"}]
        });
        let comp = crawler.get_competition(&event, &query()).unwrap();
        assert_eq!(comp.sport_code, SportCode::Run);
        assert!(crawler.matches_sport(&event, &comp, SportFilter::Only(SportCode::Run)));
        assert!(crawler.matches_sport(&event, &comp, SportFilter::Only(SportCode::Swim)));
        assert!(!crawler.matches_sport(&event, &comp, SportFilter::Only(SportCode::Ski)));
    }

    #[test]
    fn test_records_without_date_are_skipped() {
        let crawler = RegPlaceCrawler::new();
        let undated = json!({"id": 1, "name": "Без даты"});
        assert!(crawler.get_competition(&undated, &query()).unwrap_err().is_record_scoped());
        let garbled = json!({"id": 1, "name": "Кривая дата", "start_time": "завтра"});
        assert!(crawler.get_competition(&garbled, &query()).unwrap_err().is_record_scoped());
    }
}
