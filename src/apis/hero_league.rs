use crate::classify::{matches_sport_type, Bucket, DisciplineSurface, HERO_LEAGUE_CLASSIFIER};
use crate::common::constants::{
    HERO_LEAGUE_API, HERO_LEAGUE_BASE_URL, HERO_LEAGUE_LIST_PATH, HERO_LEAGUE_ORGANIZER,
    HERO_LEAGUE_TIMEOUT_SECS,
};
use crate::common::error::{Result, ScraperError};
use crate::apis::paged::decode_items;
use crate::common::types::{CompetitionQuery, EventSource};
use crate::domain::{Competition, ServiceKind, SportFilter};
use crate::infra::http_client::{build_client, Accept};
use crate::window::parse_timestamp;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

// Events and their city entries stay raw until decoded one by one, so a
// malformed entry only costs itself.
#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    values: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HeroEvent {
    public_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    event_type: Option<EventType>,
    event_city: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventType {
    public_id: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CityEvent {
    public_id: Option<String>,
    city: Option<CityName>,
    start_time: Option<String>,
    address: Option<String>,
    registration_open: Option<String>,
    registration_close: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CityName {
    name_ru: Option<String>,
}

/// One event type held in one city: the unit HeroLeague competitions are
/// built from.
#[derive(Debug, Clone, Default)]
pub struct HeroOccurrence {
    pub id: String,
    pub event_code: String,
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub event_type_title: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub start_time: Option<String>,
    pub registration_open: Option<String>,
    pub registration_close: Option<String>,
}

fn flatten(events: Vec<Value>) -> Vec<HeroOccurrence> {
    decode_items::<HeroEvent>(ServiceKind::HeroLeague, events)
        .into_iter()
        .flat_map(|event| {
            let HeroEvent {
                public_id,
                title,
                description,
                event_type,
                event_city,
            } = event;
            let event_type = event_type.unwrap_or_default();
            let cities: Vec<CityEvent> = decode_items(ServiceKind::HeroLeague, event_city.unwrap_or_default());
            cities.into_iter().map(move |city_event| HeroOccurrence {
                id: city_event.public_id.unwrap_or_default(),
                event_code: public_id.clone().unwrap_or_default(),
                title: title.clone().unwrap_or_default(),
                description: description.clone().filter(|d| !d.trim().is_empty()),
                event_type: event_type.public_id.clone().unwrap_or_default(),
                event_type_title: event_type.title.clone(),
                city: city_event
                    .city
                    .and_then(|c| c.name_ru)
                    .filter(|c| !c.trim().is_empty()),
                address: city_event.address.filter(|a| !a.trim().is_empty()),
                start_time: city_event.start_time.filter(|s| !s.trim().is_empty()),
                registration_open: city_event.registration_open,
                registration_close: city_event.registration_close,
            })
        })
        .collect()
}

pub struct HeroLeagueCrawler {
    base_url: String,
}

impl Default for HeroLeagueCrawler {
    fn default() -> Self {
        Self::new()
    }
}

impl HeroLeagueCrawler {
    pub fn new() -> Self {
        Self::with_base_url(HERO_LEAGUE_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl EventSource for HeroLeagueCrawler {
    type Raw = HeroOccurrence;

    fn kind(&self) -> ServiceKind {
        ServiceKind::HeroLeague
    }

    #[instrument(skip(self))]
    async fn get_event_list(&self, _query: &CompetitionQuery) -> Result<Vec<HeroOccurrence>> {
        let client = build_client(HERO_LEAGUE_TIMEOUT_SECS, Accept::Json, Some(&self.base_url))?;
        let url = format!("{}{}", self.base_url, HERO_LEAGUE_LIST_PATH);

        let response = client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                service: HERO_LEAGUE_API,
                status: status.as_u16(),
                url,
            });
        }

        let body: EventListResponse = response.json().await?;
        let events = body.values.unwrap_or_default();
        debug!("Received {} event types from {}", events.len(), HERO_LEAGUE_API);

        let occurrences = flatten(events);
        info!("Successfully fetched {} events from {}", occurrences.len(), HERO_LEAGUE_API);
        Ok(occurrences)
    }

    fn get_competition(&self, raw: &HeroOccurrence, _query: &CompetitionQuery) -> Result<Competition> {
        let id = raw.id.trim();
        if id.is_empty() {
            return Err(ScraperError::MissingField("event_city.public_id".into()));
        }
        let title = raw.title.trim();
        if title.is_empty() {
            return Err(ScraperError::MissingField("title".into()));
        }
        let city = raw
            .city
            .as_deref()
            .ok_or_else(|| ScraperError::MissingField("event_city.city.name_ru".into()))?;
        let start_time = raw
            .start_time
            .as_deref()
            .ok_or_else(|| ScraperError::MissingField("event_city.start_time".into()))?;
        let begin_date =
            parse_timestamp(start_time).ok_or_else(|| ScraperError::InvalidDate(start_time.to_string()))?;

        Ok(Competition {
            city: city.to_string(),
            place: raw.address.clone().unwrap_or_else(|| city.to_string()),
            address: raw.address.clone(),
            sport_code: HERO_LEAGUE_CLASSIFIER.classify(&raw.event_type),
            begin_date: Some(begin_date),
            end_date: Some(begin_date),
            distances_text: raw.description.clone(),
            description: raw.description.clone(),
            organizer: HERO_LEAGUE_ORGANIZER.to_string(),
            url: format!("{}/city_event/{}", self.base_url, id),
            registration_open: raw.registration_open.as_deref().and_then(parse_timestamp),
            registration_close: raw.registration_close.as_deref().and_then(parse_timestamp),
            ..Competition::new(self.kind(), id, title)
        })
    }

    /// Camps and expeditions are not competitions: any explicit sport filter,
    /// `all` included, drops them.
    fn matches_sport(&self, raw: &HeroOccurrence, _competition: &Competition, sport: SportFilter) -> bool {
        if HERO_LEAGUE_CLASSIFIER.bucket(&raw.event_type) == Bucket::NonSport {
            return false;
        }
        matches_sport_type(
            sport,
            &HERO_LEAGUE_CLASSIFIER,
            DisciplineSurface::new(&raw.event_type, ""),
            &raw.title,
            std::iter::empty(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SportCode;
    use chrono::TimeZone;
    use serde_json::json;

    fn occurrences() -> Vec<HeroOccurrence> {
        let body: EventListResponse = serde_json::from_value(json!({
            "values": [
                {
                    "public_id": "gonka-2025",
                    "title": "Гонка Героев",
                    "description": "Дистанции 5 и 10 км",
                    "event_type": {"public_id": "gonka", "title": "Гонка"},
                    "event_city": [
                        {
                            "public_id": "msk-1",
                            "city": {"name_ru": "Москва"},
                            "start_time": "2025-11-22T08:00:00Z",
                            "address": "Алабино",
                            "registration_open": "2025-06-01T00:00:00Z"
                        },
                        {"public_id": "spb-1", "city": {"name_ru": "Санкт-Петербург"}},
                        {"public_id": "nocity", "start_time": "2025-11-29T08:00:00Z"}
                    ]
                },
                {
                    "public_id": "camp-2025",
                    "title": "Лагерь Героев",
                    "event_type": {"public_id": "camp"},
                    "event_city": [
                        {"public_id": "camp-1", "city": {"name_ru": "Сочи"}, "start_time": "2025-12-01T08:00:00Z"}
                    ]
                }
            ]
        }))
        .unwrap();
        flatten(body.values.unwrap_or_default())
    }

    fn query() -> CompetitionQuery {
        CompetitionQuery::new(chrono::Utc.with_ymd_and_hms(2025, 11, 13, 0, 0, 0).unwrap(), 50)
    }

    #[test]
    fn test_one_occurrence_per_city() {
        let occ = occurrences();
        assert_eq!(occ.len(), 4);
        assert_eq!(occ[0].event_code, "gonka-2025");
        assert_eq!(occ[1].title, "Гонка Героев");
    }

    #[test]
    fn test_occurrence_mapping() {
        let crawler = HeroLeagueCrawler::new();
        let comp = crawler.get_competition(&occurrences()[0], &query()).unwrap();
        assert_eq!(comp.id, "msk-1");
        assert_eq!(comp.url, "https://heroleague.ru/city_event/msk-1");
        assert_eq!(comp.organizer, "Лига Героев");
        assert_eq!(comp.place, "Алабино");
        assert_eq!(comp.sport_code, SportCode::Other);
        assert_eq!(comp.distances_text.as_deref(), Some("Дистанции 5 и 10 км"));
        assert_eq!(comp.end_date, comp.begin_date);
        assert!(comp.registration_open.is_some());
    }

    #[test]
    fn test_incomplete_occurrences_are_record_errors() {
        let crawler = HeroLeagueCrawler::new();
        let occ = occurrences();
        assert!(crawler.get_competition(&occ[1], &query()).unwrap_err().is_record_scoped());
        assert!(crawler.get_competition(&occ[2], &query()).unwrap_err().is_record_scoped());
    }

    #[test]
    fn test_null_fields_only_cost_their_own_record() {
        let occ = flatten(vec![
            json!({"public_id": "broken", "event_type": null, "event_city": null}),
            json!({"public_id": "typo", "title": 42}),
            json!({
                "public_id": "zabeg",
                "title": "Забег Героев",
                "event_type": {"public_id": "zabeg"},
                "event_city": [
                    {"public_id": "bad-time", "city": {"name_ru": "Казань"}, "start_time": 20251122},
                    {"public_id": "msk-2", "city": {"name_ru": "Москва"}, "start_time": "2025-11-16T10:00:00Z"}
                ]
            }),
        ]);
        let ids: Vec<&str> = occ.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["msk-2"]);
    }

    #[test]
    fn test_blank_id_or_title_is_skipped() {
        let crawler = HeroLeagueCrawler::new();
        let occ = flatten(vec![json!({
            "public_id": "untitled",
            "event_type": {"public_id": "zabeg"},
            "event_city": [
                {"city": {"name_ru": "Москва"}, "start_time": "2025-11-16T10:00:00Z"},
                {"public_id": "msk-3", "city": {"name_ru": "Москва"}, "start_time": "2025-11-16T10:00:00Z"}
            ]
        })]);
        assert_eq!(occ.len(), 2);
        for o in &occ {
            let err = crawler.get_competition(o, &query()).unwrap_err();
            assert!(matches!(err, ScraperError::MissingField(_)));
        }

        let mut named = occ[0].clone();
        named.title = "Забег Героев".into();
        assert!(matches!(
            crawler.get_competition(&named, &query()),
            Err(ScraperError::MissingField(ref field)) if field == "event_city.public_id"
        ));
    }

    #[test]
    fn test_camp_excluded_by_any_sport_filter() {
        let crawler = HeroLeagueCrawler::new();
        let camp = &occurrences()[3];
        let comp = crawler.get_competition(camp, &query()).unwrap();
        assert_eq!(comp.sport_code, SportCode::Other);
        assert!(!crawler.matches_sport(camp, &comp, SportFilter::All));
        assert!(!crawler.matches_sport(camp, &comp, SportFilter::Only(SportCode::Other)));

        let gonka = &occurrences()[0];
        let comp = crawler.get_competition(gonka, &query()).unwrap();
        assert!(crawler.matches_sport(gonka, &comp, SportFilter::All));
        assert!(crawler.matches_sport(gonka, &comp, SportFilter::Only(SportCode::Other)));
        assert!(!crawler.matches_sport(gonka, &comp, SportFilter::Only(SportCode::Run)));
    }
}
