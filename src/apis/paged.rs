//! Shared pieces of the two registration services that page through a POST
//! endpoint (RussiaRunning and Timerman): the pagination loop, the
//! canonical event shape both are mapped onto, and the mapping itself.

use crate::classify::{matches_sport_type, DisciplineSurface, DISCIPLINE_CLASSIFIER};
use crate::common::constants::{MAX_PAGE_REQUESTS, PAGE_SIZE};
use crate::common::error::{Result, ScraperError};
use crate::domain::{Competition, Distance, ServiceKind, SportFilter};
use crate::window::parse_timestamp;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Event as the paged services describe it, with RussiaRunning's field names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagedEvent {
    pub id: Option<String>,
    pub code: Option<String>,
    pub title: Option<String>,
    pub city_name: Option<String>,
    pub place: Option<String>,
    pub address: Option<String>,
    pub discipline_code: Option<String>,
    pub discipline_name: Option<String>,
    pub race_items: Vec<RaceItem>,
    pub participants_count: Option<u32>,
    pub begin_date: Option<String>,
    pub end_date: Option<String>,
    pub organizer_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaceItem {
    pub name: Option<String>,
    /// Kilometers
    pub distance: Option<f64>,
    pub discipline_code: Option<String>,
    pub discipline_name: Option<String>,
    pub participants_count: Option<u32>,
    pub race_date: Option<String>,
}

/// Pull the event list out of one page. Services answer either with a bare
/// list or with an object wrapping it.
pub fn page_items(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => ["list", "Items", "items", "events"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }),
        _ => None,
    }
}

/// POST pages of `PAGE_SIZE` with an increasing offset until a short or
/// empty page, or until `MAX_PAGE_REQUESTS`. A failed or malformed page ends
/// pagination; pages already received are kept.
pub async fn fetch_pages<F>(
    client: &reqwest::Client,
    service: ServiceKind,
    url: &str,
    make_body: F,
) -> Vec<Value>
where
    F: Fn(usize, usize) -> Value,
{
    let mut all_items = Vec::new();
    let mut requests = 0;

    while requests < MAX_PAGE_REQUESTS {
        let skip = requests * PAGE_SIZE;
        requests += 1;

        let items = match fetch_page(client, service, url, &make_body(skip, PAGE_SIZE)).await {
            Ok(items) => items,
            Err(e) => {
                warn!(service = %service, skip, "Stopping pagination: {}", e);
                break;
            }
        };

        let received = items.len();
        debug!(service = %service, skip, received, "Fetched page");
        all_items.extend(items);

        if received < PAGE_SIZE {
            break;
        }
    }

    info!(
        service = %service,
        "Fetched {} events in {} requests",
        all_items.len(),
        requests
    );
    all_items
}

async fn fetch_page(
    client: &reqwest::Client,
    service: ServiceKind,
    url: &str,
    body: &Value,
) -> Result<Vec<Value>> {
    let response = client.post(url).json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            service: service.as_str(),
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body: Value = response.json().await?;
    page_items(body).ok_or_else(|| ScraperError::Shape("page without an event list".into()))
}

/// Deserialize every item on its own so that one odd record does not sink
/// the batch.
pub fn decode_items<T: serde::de::DeserializeOwned>(service: ServiceKind, items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(service = %service, "Dropping undecodable event: {}", e);
                None
            }
        })
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub fn to_competition(
    service: ServiceKind,
    event_url_base: &str,
    event: &PagedEvent,
) -> Result<Competition> {
    let id = non_empty(&event.id)
        .or_else(|| non_empty(&event.code))
        .ok_or_else(|| ScraperError::MissingField("id".into()))?;
    let title = non_empty(&event.title).ok_or_else(|| ScraperError::MissingField("title".into()))?;

    let place = non_empty(&event.place).unwrap_or_default();
    let city = non_empty(&event.city_name).unwrap_or(place);

    let main_discipline = format!(
        "{} {}",
        event.discipline_code.as_deref().unwrap_or_default(),
        event.discipline_name.as_deref().unwrap_or_default()
    );

    let distances = event
        .race_items
        .iter()
        .map(|race| {
            let race_discipline = format!(
                "{} {}",
                race.discipline_code.as_deref().unwrap_or_default(),
                race.discipline_name.as_deref().unwrap_or_default()
            );
            let sport_code = if race_discipline.trim().is_empty() {
                DISCIPLINE_CLASSIFIER.classify(&main_discipline)
            } else {
                DISCIPLINE_CLASSIFIER.classify(&race_discipline)
            };
            Distance {
                name: race.name.clone().unwrap_or_default(),
                distance_km: race.distance.unwrap_or_default(),
                sport_code,
                participants_count: race.participants_count,
            }
        })
        .collect();

    let begin_date = event.begin_date.as_deref().and_then(parse_timestamp);
    let end_date = event
        .end_date
        .as_deref()
        .and_then(parse_timestamp)
        .or(begin_date);

    let url = match non_empty(&event.code) {
        Some(code) => format!("{}/event/{}", event_url_base.trim_end_matches('/'), code),
        None => String::new(),
    };

    Ok(Competition {
        city: city.to_string(),
        place: place.to_string(),
        address: non_empty(&event.address).map(str::to_string),
        sport_code: DISCIPLINE_CLASSIFIER.classify(&main_discipline),
        begin_date,
        end_date,
        distances,
        organizer: non_empty(&event.organizer_name)
            .unwrap_or(service.as_str())
            .to_string(),
        url,
        participants_count: event.participants_count,
        ..Competition::new(service, id, title)
    })
}

pub fn matches_sport(event: &PagedEvent, sport: SportFilter) -> bool {
    let main = DisciplineSurface::new(
        event.discipline_code.as_deref().unwrap_or_default(),
        event.discipline_name.as_deref().unwrap_or_default(),
    );
    let races = event.race_items.iter().flat_map(|race| {
        [
            DisciplineSurface::new(
                race.discipline_code.as_deref().unwrap_or_default(),
                race.discipline_name.as_deref().unwrap_or_default(),
            ),
            DisciplineSurface::new("", race.name.as_deref().unwrap_or_default()),
        ]
    });
    matches_sport_type(
        sport,
        &DISCIPLINE_CLASSIFIER,
        main,
        event.title.as_deref().unwrap_or_default(),
        races,
    )
}

/// City filter candidates in the order the services are most precise about:
/// address, place, title, city name.
pub fn city_fields(event: &PagedEvent) -> Vec<&str> {
    [&event.address, &event.place, &event.title, &event.city_name]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .collect()
}
