use crate::apis::paged::{self, PagedEvent, RaceItem};
use crate::common::constants::{PAGED_POST_TIMEOUT_SECS, TIMERMAN_API, TIMERMAN_BASE_URL, TIMERMAN_LIST_PATH};
use crate::common::error::Result;
use crate::common::types::{CompetitionQuery, EventSource};
use crate::domain::{Competition, ServiceKind, SportFilter};
use crate::infra::http_client::{build_client, Accept};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

/// Timerman's abbreviated event record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimermanEvent {
    #[serde(rename = "c")]
    pub code: Option<String>,
    #[serde(rename = "t")]
    pub title: Option<String>,
    #[serde(rename = "p")]
    pub place: Option<String>,
    #[serde(rename = "dc")]
    pub discipline_code: Option<String>,
    #[serde(rename = "dn")]
    pub discipline_name: Option<String>,
    #[serde(rename = "ri")]
    pub race_items: Vec<TimermanRace>,
    #[serde(rename = "pc")]
    pub participants_count: Option<u32>,
    #[serde(rename = "d")]
    pub date: Option<String>,
    #[serde(rename = "ed")]
    pub end_date: Option<String>,
    #[serde(rename = "on")]
    pub organizer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimermanRace {
    #[serde(rename = "n")]
    pub name: Option<String>,
    #[serde(rename = "d")]
    pub distance: Option<f64>,
    #[serde(rename = "dc")]
    pub discipline_code: Option<String>,
    #[serde(rename = "dn")]
    pub discipline_name: Option<String>,
    #[serde(rename = "pc")]
    pub participants_count: Option<u32>,
    #[serde(rename = "sd")]
    pub start_date: Option<String>,
}

impl From<TimermanRace> for RaceItem {
    fn from(race: TimermanRace) -> Self {
        RaceItem {
            name: race.name,
            distance: race.distance,
            discipline_code: race.discipline_code,
            discipline_name: race.discipline_name,
            participants_count: race.participants_count,
            race_date: race.start_date,
        }
    }
}

impl From<TimermanEvent> for PagedEvent {
    fn from(event: TimermanEvent) -> Self {
        PagedEvent {
            id: event.code.clone(),
            code: event.code,
            title: event.title,
            city_name: None,
            place: event.place,
            address: None,
            discipline_code: event.discipline_code,
            discipline_name: event.discipline_name,
            race_items: event.race_items.into_iter().map(RaceItem::from).collect(),
            participants_count: event.participants_count,
            begin_date: event.date,
            end_date: event.end_date,
            organizer_name: event.organizer,
        }
    }
}

pub struct TimermanCrawler {
    base_url: String,
}

impl Default for TimermanCrawler {
    fn default() -> Self {
        Self::new()
    }
}

impl TimermanCrawler {
    pub fn new() -> Self {
        Self::with_base_url(TIMERMAN_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request_body(skip: usize, take: usize) -> Value {
        json!({
            "EventsLoaderType": 0,
            "UseTenantBeneficiaryCode": true,
            "Skip": skip,
            "Take": take,
            "DisciplinesCodes": null,
            "DateFrom": null,
            "DateTo": null,
            "HidePastEvents": false,
            "OnlyWithOpenRegistration": false,
            "SortRule": { "Type": 0, "Direction": 1 },
            "StarRaitings": [],
        })
    }
}

#[async_trait::async_trait]
impl EventSource for TimermanCrawler {
    type Raw = PagedEvent;

    fn kind(&self) -> ServiceKind {
        ServiceKind::Timerman
    }

    #[instrument(skip(self))]
    async fn get_event_list(&self, _query: &CompetitionQuery) -> Result<Vec<PagedEvent>> {
        let client = build_client(PAGED_POST_TIMEOUT_SECS, Accept::Json, None)?;
        let url = format!("{}{}", self.base_url, TIMERMAN_LIST_PATH);

        let items = paged::fetch_pages(&client, self.kind(), &url, Self::request_body).await;
        let events: Vec<PagedEvent> = paged::decode_items::<TimermanEvent>(self.kind(), items)
            .into_iter()
            .map(PagedEvent::from)
            .collect();

        info!("Successfully fetched {} events from {}", events.len(), TIMERMAN_API);
        Ok(events)
    }

    fn get_competition(&self, raw: &PagedEvent, _query: &CompetitionQuery) -> Result<Competition> {
        paged::to_competition(self.kind(), &self.base_url, raw)
    }

    fn matches_sport(&self, raw: &PagedEvent, _competition: &Competition, sport: SportFilter) -> bool {
        paged::matches_sport(raw, sport)
    }

    fn city_fields<'a>(&self, raw: &'a PagedEvent, _competition: &'a Competition) -> Vec<&'a str> {
        paged::city_fields(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SportCode;
    use chrono::TimeZone;

    #[test]
    fn test_abbreviated_fields_translate() {
        let raw: TimermanEvent = serde_json::from_value(json!({
            "c": "kazan-swim-2025",
            "t": "Казанский заплыв",
            "p": "Казань, Кремлевская набережная",
            "dc": "swim",
            "dn": "Плавание",
            "d": "2025-11-22T09:00:00",
            "on": "Timerman Kazan",
            "ri": [{"n": "1 км", "d": 1.0, "dc": "swim", "pc": 40, "sd": "2025-11-22T09:00:00"}]
        }))
        .unwrap();
        let event = PagedEvent::from(raw);
        assert_eq!(event.id.as_deref(), Some("kazan-swim-2025"));
        assert_eq!(event.race_items[0].participants_count, Some(40));

        let crawler = TimermanCrawler::new();
        let now = chrono::Utc.with_ymd_and_hms(2025, 11, 13, 0, 0, 0).unwrap();
        let comp = crawler
            .get_competition(&event, &CompetitionQuery::new(now, 5))
            .unwrap();
        assert_eq!(comp.url, "https://timerman.org/event/kazan-swim-2025");
        assert_eq!(comp.sport_code, SportCode::Swim);
        assert_eq!(comp.city, "Казань, Кремлевская набережная");
        assert_eq!(comp.organizer, "Timerman Kazan");
        assert_eq!(
            comp.begin_date,
            Some(chrono::Utc.with_ymd_and_hms(2025, 11, 22, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_request_body() {
        let body = TimermanCrawler::request_body(100, 100);
        assert_eq!(body["Skip"], 100);
        assert_eq!(body["Take"], 100);
    }
}
