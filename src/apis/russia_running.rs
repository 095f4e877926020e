use crate::apis::paged::{self, PagedEvent};
use crate::common::constants::{
    PAGED_POST_TIMEOUT_SECS, RUSSIA_RUNNING_API, RUSSIA_RUNNING_BASE_URL, RUSSIA_RUNNING_LIST_PATH,
};
use crate::common::error::Result;
use crate::common::types::{CompetitionQuery, EventSource};
use crate::domain::{Competition, ServiceKind, SportCode, SportFilter};
use crate::infra::http_client::{build_client, Accept};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

pub struct RussiaRunningCrawler {
    base_url: String,
}

impl Default for RussiaRunningCrawler {
    fn default() -> Self {
        Self::new()
    }
}

impl RussiaRunningCrawler {
    pub fn new() -> Self {
        Self::with_base_url(RUSSIA_RUNNING_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Discipline code the service understands for a server-side filter.
    fn discipline_code(sport: Option<SportFilter>) -> Option<&'static str> {
        match sport? {
            SportFilter::Only(SportCode::Other) | SportFilter::All => None,
            SportFilter::Only(code) => Some(code.as_str()),
        }
    }

    fn request_body(query: &CompetitionQuery, skip: usize, take: usize) -> Value {
        let mut filter = Map::new();
        filter.insert("EventsLoaderType".into(), json!(0));
        if let Some(city) = query.city.as_deref().filter(|c| !c.eq_ignore_ascii_case("all")) {
            filter.insert("CityName".into(), json!(city));
        }
        if let Some(code) = Self::discipline_code(query.sport) {
            filter.insert("DisciplineCode".into(), json!(code));
        }

        json!({
            "Page": { "Skip": skip, "Take": take },
            "Filter": filter,
            "Language": "ru",
        })
    }
}

#[async_trait::async_trait]
impl EventSource for RussiaRunningCrawler {
    type Raw = PagedEvent;

    fn kind(&self) -> ServiceKind {
        ServiceKind::RussiaRunning
    }

    #[instrument(skip(self))]
    async fn get_event_list(&self, query: &CompetitionQuery) -> Result<Vec<PagedEvent>> {
        let client = build_client(PAGED_POST_TIMEOUT_SECS, Accept::Json, None)?;
        let url = format!("{}{}", self.base_url, RUSSIA_RUNNING_LIST_PATH);

        let items = paged::fetch_pages(&client, self.kind(), &url, |skip, take| {
            Self::request_body(query, skip, take)
        })
        .await;
        let events: Vec<PagedEvent> = paged::decode_items(self.kind(), items);

        info!("Successfully fetched {} events from {}", events.len(), RUSSIA_RUNNING_API);
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
