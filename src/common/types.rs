use crate::common::error::Result;
use crate::domain::{Competition, ServiceKind, SportFilter};
use crate::window::{window, Period, TimeWindow};
use chrono::{DateTime, Utc};

/// Filters a provider applies locally before returning records.
#[derive(Debug, Clone)]
pub struct CompetitionQuery {
    pub city: Option<String>,
    /// `None` means the caller did not ask for any sport filter
    pub sport: Option<SportFilter>,
    pub limit: usize,
    pub period: Period,
    /// Invocation instant. Nothing starting before it is returned.
    pub now: DateTime<Utc>,
}

impl CompetitionQuery {
    pub fn new(now: DateTime<Utc>, limit: usize) -> Self {
        Self {
            city: None,
            sport: None,
            limit,
            period: Period::Rolling,
            now,
        }
    }

    pub fn with_city(mut self, city: Option<String>) -> Self {
        self.city = city.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_sport(mut self, sport: Option<SportFilter>) -> Self {
        self.sport = sport;
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn window(&self) -> TimeWindow {
        window(self.period, self.now)
    }
}

/// Core trait every competition provider exposes to the aggregator
#[async_trait::async_trait]
pub trait CompetitionApi: Send + Sync {
    /// Unique identifier for this provider
    fn api_name(&self) -> &'static str;

    fn service(&self) -> ServiceKind;

    /// Fetch, normalize and filter this provider's competitions
    async fn fetch_competitions(&self, query: &CompetitionQuery) -> Result<Vec<Competition>>;
}

/// Provider-specific half of an adapter: transport plus raw-to-canonical
/// mapping. Filtering and truncation are shared, see
/// [`crate::filters::select_competitions`].
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// One raw listing entry as the provider shapes it
    type Raw: Send + Sync;

    fn kind(&self) -> ServiceKind;

    /// Fetch all raw listing entries. Transport and shape failures end up here.
    async fn get_event_list(&self, query: &CompetitionQuery) -> Result<Vec<Self::Raw>>;

    /// Map one entry. Errors are record-scoped: the entry is skipped.
    fn get_competition(&self, raw: &Self::Raw, query: &CompetitionQuery) -> Result<Competition>;

    /// Whether the entry contains the requested sport on any of its surfaces
    fn matches_sport(&self, raw: &Self::Raw, competition: &Competition, sport: SportFilter)
        -> bool;

    /// Free-text fields searched by the city filter
    fn city_fields<'a>(&self, _raw: &'a Self::Raw, competition: &'a Competition) -> Vec<&'a str> {
        let mut fields = vec![
            competition.place.as_str(),
            competition.city.as_str(),
            competition.title.as_str(),
        ];
        if let Some(address) = competition.address.as_deref() {
            fields.insert(0, address);
        }
        fields
    }
}

#[async_trait::async_trait]
impl<T: EventSource> CompetitionApi for T {
    fn api_name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn service(&self) -> ServiceKind {
        self.kind()
    }

    async fn fetch_competitions(&self, query: &CompetitionQuery) -> Result<Vec<Competition>> {
        let raw = self.get_event_list(query).await?;
        Ok(crate::filters::select_competitions(self, raw, query))
    }
}
