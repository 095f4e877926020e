//! RunC ("Беговое Сообщество") has no API: events are read off the anchors
//! of its landing page. Each anchor label is a handful of loosely ordered
//! lines (city, distances, title, date) that are told apart by keywords.

use crate::classify::{matches_sport_type, DisciplineSurface, RUNC_CLASSIFIER};
use crate::common::constants::{RUNC_API, RUNC_BASE_URL, RUNC_ORGANIZER, RUNC_TIMEOUT_SECS};
use crate::common::error::{Result, ScraperError};
use crate::common::types::{CompetitionQuery, EventSource};
use crate::domain::{Competition, Distance, ServiceKind, SportCode, SportFilter};
use crate::infra::http_client::{build_client, Accept};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

const KNOWN_CITIES: [&str; 5] = ["Москва", "Санкт-Петербург", "Казань", "Екатеринбург", "Новосибирск"];
const DEFAULT_CITY: &str = "Москва";
const TITLE_KEYWORDS: [&str; 5] = ["соревнован", "кросс", "марафон", "забег", "эстафет"];
const DISTANCE_MARKERS: [&str; 5] = [" км", " м", "метр", "от ", "до "];
const NOT_DISTANCE: [&str; 3] = ["соревнован", "кросс", "марафон"];
const MONTHS: [&str; 12] = [
    "января", "февраля", "марта", "апреля", "мая", "июня", "июля", "августа", "сентября", "октября",
    "ноября", "декабря",
];
const KM_PER_MILE: f64 = 1.60934;

fn event_href() -> Result<&'static Regex> {
    static CELL: OnceCell<Regex> = OnceCell::new();
    Ok(CELL.get_or_try_init(|| Regex::new(r"^(?:https?://(?:www\.)?runc\.run)?/event/(\d+)/overview/?"))?)
}

fn russian_date() -> Result<&'static Regex> {
    static CELL: OnceCell<Regex> = OnceCell::new();
    Ok(CELL.get_or_try_init(|| {
        Regex::new(r"(?i)(\d{1,2})(?:\s*[-–]\s*(\d{1,2}))?\s+([а-яё]+)(?:\s+(\d{4}))?")
    })?)
}

fn distance_value() -> Result<&'static Regex> {
    static CELL: OnceCell<Regex> = OnceCell::new();
    Ok(CELL.get_or_try_init(|| {
        Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(миля|мили|миль|mile|км|km|метр\w*|м|m)\b")
    })?)
}

/// One deduplicated event anchor from the landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCListing {
    pub id: String,
    pub href: String,
    pub lines: Vec<String>,
}

/// Begin and end of a (possibly multi-day) event, at midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == name)
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

fn midnight(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse `"22 ноября 2025"`, `"21-22 февраля 2026"` or a yearless
/// `"21-22 февраля"`. A yearless date that already passed this year is
/// taken to be next year's.
pub fn parse_russian_date(text: &str, now: DateTime<Utc>) -> Result<Option<DateSpan>> {
    let Some(caps) = russian_date()?.captures(text) else {
        return Ok(None);
    };

    let day: u32 = caps[1].parse().unwrap_or_default();
    let end_day: u32 = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(day);
    let Some(month) = month_number(&caps[3]) else {
        return Ok(None);
    };

    let year = match caps.get(4).and_then(|m| m.as_str().parse::<i32>().ok()) {
        Some(year) => year,
        None if (month, day) < (now.month(), now.day()) => now.year() + 1,
        None => now.year(),
    };

    let span = midnight(year, month, day).map(|begin| DateSpan {
        begin,
        end: midnight(year, month, end_day).filter(|end| *end >= begin).unwrap_or(begin),
    });
    Ok(span)
}

/// Split a distances line such as `"60 м, 600 м, 1 миля"` into distances in
/// kilometers. Items without a recognizable unit are dropped.
pub fn parse_distances(text: &str, sport_code: SportCode) -> Result<Vec<Distance>> {
    let pattern = distance_value()?;
    let distances = text
        .split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            let caps = pattern.captures(item)?;
            let value: f64 = caps[1].replace(',', ".").parse().ok()?;
            let unit = caps[2].to_lowercase();
            let distance_km = match unit.as_str() {
                "миля" | "мили" | "миль" | "mile" => value * KM_PER_MILE,
                "км" | "km" => value,
                _ => value / 1000.0,
            };
            Some(Distance {
                name: item.to_string(),
                distance_km,
                sport_code,
                participants_count: None,
            })
        })
        .collect();
    Ok(distances)
}

fn label_lines<'a>(text: impl Iterator<Item = &'a str>) -> Vec<String> {
    text.flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collect event anchors, first occurrence of each id wins.
pub fn parse_listing(html: &str) -> Result<Vec<RunCListing>> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").map_err(|e| ScraperError::Shape(format!("bad selector: {}", e)))?;
    let href_pattern = event_href()?;

    let mut seen = HashSet::new();
    let mut listings = Vec::new();
    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(caps) = href_pattern.captures(href) else {
            continue;
        };
        let id = caps[1].to_string();
        if !seen.insert(id.clone()) {
            continue;
        }
        listings.push(RunCListing {
            id,
            href: href.to_string(),
            lines: label_lines(anchor.text()),
        });
    }
    Ok(listings)
}

fn find_line<'a>(lines: &'a [String], pred: impl Fn(&str) -> bool) -> Option<&'a str> {
    lines.iter().map(String::as_str).find(|line| pred(line))
}

fn title_line(lines: &[String]) -> Option<&str> {
    find_line(lines, |line| {
        let lower = line.to_lowercase();
        line.contains(['"', '«', '»']) || TITLE_KEYWORDS.iter().any(|k| lower.contains(k))
    })
    .or_else(|| lines.first().map(String::as_str))
}

fn distances_line(lines: &[String]) -> Option<&str> {
    find_line(lines, |line| {
        let lower = line.to_lowercase();
        DISTANCE_MARKERS.iter().any(|m| lower.contains(m)) && !NOT_DISTANCE.iter().any(|s| lower.contains(s))
    })
}

fn city_line(lines: &[String]) -> Option<&str> {
    find_line(lines, |line| KNOWN_CITIES.iter().any(|city| line.contains(city)))
}

fn date_line(lines: &[String]) -> Option<&str> {
    find_line(lines, |line| {
        let lower = line.to_lowercase();
        MONTHS.iter().any(|m| lower.contains(m))
    })
}

pub struct RunCCrawler {
    base_url: String,
}

impl Default for RunCCrawler {
    fn default() -> Self {
        Self::new()
    }
}

impl RunCCrawler {
    pub fn new() -> Self {
        Self::with_base_url(RUNC_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl EventSource for RunCCrawler {
    type Raw = RunCListing;

    fn kind(&self) -> ServiceKind {
        ServiceKind::RunC
    }

    #[instrument(skip(self))]
    async fn get_event_list(&self, _query: &CompetitionQuery) -> Result<Vec<RunCListing>> {
        let client = build_client(RUNC_TIMEOUT_SECS, Accept::Html, Some(&self.base_url))?;
        let url = format!("{}/", self.base_url);

        let response = client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                service: RUNC_API,
                status: status.as_u16(),
                url,
            });
        }

        let html = response.text().await?;
        let listings = parse_listing(&html)?;
        info!("Successfully fetched {} events from {}", listings.len(), RUNC_API);
        Ok(listings)
    }

    fn get_competition(&self, raw: &RunCListing, query: &CompetitionQuery) -> Result<Competition> {
        if raw.lines.len() < 3 {
            return Err(ScraperError::MissingField(format!("label of event {}", raw.id)));
        }

        let title = title_line(&raw.lines).unwrap_or_default();
        let distances_text = distances_line(&raw.lines).map(str::to_string);
        let city = city_line(&raw.lines).unwrap_or(DEFAULT_CITY);

        let span = match date_line(&raw.lines) {
            Some(line) => parse_russian_date(line, query.now)?,
            None => None,
        };
        if span.is_none() {
            debug!("No date for {} event {}", RUNC_API, raw.id);
        }

        let sport_code = RUNC_CLASSIFIER.classify(&format!(
            "{} {}",
            title,
            distances_text.as_deref().unwrap_or_default()
        ));
        let distances = match distances_text.as_deref() {
            Some(text) => parse_distances(text, sport_code)?,
            None => Vec::new(),
        };

        Ok(Competition {
            city: city.to_string(),
            place: city.to_string(),
            sport_code,
            begin_date: span.map(|s| s.begin),
            end_date: span.map(|s| s.end),
            distances,
            description: distances_text.clone(),
            distances_text,
            organizer: RUNC_ORGANIZER.to_string(),
            url: format!("{}/event/{}/overview/", self.base_url, raw.id),
            ..Competition::new(self.kind(), format!("runc_{}", raw.id), title)
        })
    }

    fn matches_sport(&self, _raw: &RunCListing, competition: &Competition, sport: SportFilter) -> bool {
        let distances_text = competition.distances_text.as_deref().unwrap_or_default();
        matches_sport_type(
            sport,
            &RUNC_CLASSIFIER,
            DisciplineSurface::new(&competition.title, distances_text),
            &competition.title,
            competition
                .distances
                .iter()
                .map(|d| DisciplineSurface::new("", &d.name)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PAGE: &str = r#"
        <html><body>
          <nav>
            <a href="/event/812/overview/">
              <span>Москва</span>
              <span>от 5 до 21.1 км</span>
              <span>«Зеленый марафон»</span>
              <span>Москва, Лужники</span>
              <span>22 ноября 2025</span>
            </a>
            <a href="https://runc.run/event/812/overview/">duplicate</a>
            <a href="/event/907/overview/">
              <span>Манеж</span>
              <span>60 м, 600 м, 1 миля</span>
              <span>Зимние соревнования по бегу</span>
              <span>21-22 февраля</span>
            </a>
            <a href="/about/">О нас</a>
            <a href="https://results.runc.run/">Результаты</a>
            <a href="https://results.runc.run/event/640/overview/">
              <span>Москва</span>
              <span>10 км</span>
              <span>Итоги забега</span>
              <span>1 декабря 2025</span>
            </a>
          </nav>
        </body></html>
    "#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 13, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_listing_dedupes_by_event_id() {
        let listings = parse_listing(PAGE).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, "812");
        assert_eq!(listings[0].lines.len(), 5);
        assert_eq!(listings[1].id, "907");
    }

    #[test]
    fn test_label_heuristics() {
        let crawler = RunCCrawler::new();
        let listings = parse_listing(PAGE).unwrap();
        let query = CompetitionQuery::new(now(), 10);

        let comp = crawler.get_competition(&listings[0], &query).unwrap();
        assert_eq!(comp.id, "runc_812");
        assert_eq!(comp.title, "«Зеленый марафон»");
        assert_eq!(comp.city, "Москва");
        assert_eq!(comp.distances_text.as_deref(), Some("от 5 до 21.1 км"));
        assert_eq!(comp.begin_date, Some(Utc.with_ymd_and_hms(2025, 11, 22, 0, 0, 0).unwrap()));
        assert_eq!(comp.url, "https://runc.run/event/812/overview/");
        assert_eq!(comp.organizer, "Беговое Сообщество");
        assert_eq!(comp.sport_code, SportCode::Run);

        let comp = crawler.get_competition(&listings[1], &query).unwrap();
        assert_eq!(comp.title, "Зимние соревнования по бегу");
        assert_eq!(comp.city, "Москва");
        assert_eq!(comp.distances.len(), 3);
        assert!((comp.distances[0].distance_km - 0.06).abs() < 1e-9);
        assert!((comp.distances[2].distance_km - 1.60934).abs() < 1e-9);
    }

    #[test]
    fn test_short_labels_are_skipped() {
        let crawler = RunCCrawler::new();
        let listing = RunCListing {
            id: "1".into(),
            href: "/event/1/overview/".into(),
            lines: vec!["Забег".into()],
        };
        let err = crawler
            .get_competition(&listing, &CompetitionQuery::new(now(), 10))
            .unwrap_err();
        assert!(err.is_record_scoped());
    }

    #[test]
    fn test_yearless_date_rolls_to_next_year() {
        let span = parse_russian_date("21-22 февраля", now()).unwrap().unwrap();
        assert_eq!(span.begin, Utc.with_ymd_and_hms(2026, 2, 21, 0, 0, 0).unwrap());
        assert_eq!(span.end, Utc.with_ymd_and_hms(2026, 2, 22, 0, 0, 0).unwrap());

        let span = parse_russian_date("30 ноября", now()).unwrap().unwrap();
        assert_eq!(span.begin, Utc.with_ymd_and_hms(2025, 11, 30, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_unparsable_dates() {
        assert!(parse_russian_date("дата уточняется", now()).unwrap().is_none());
        assert!(parse_russian_date("31 февраля 2026", now()).unwrap().is_none());
        assert!(parse_russian_date("5 km", now()).unwrap().is_none());
    }

    #[test]
    fn test_distance_units() {
        let distances = parse_distances("5 км, 800 метров, 2.5 km, эстафета 4×200 м", SportCode::Run).unwrap();
        let km: Vec<f64> = distances.iter().map(|d| d.distance_km).collect();
        assert_eq!(distances.len(), 4);
        assert!((km[0] - 5.0).abs() < 1e-9);
        assert!((km[1] - 0.8).abs() < 1e-9);
        assert!((km[3] - 0.2).abs() < 1e-9);
        assert_eq!(distances[3].name, "эстафета 4×200 м");
    }
}
