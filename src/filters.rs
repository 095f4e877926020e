//! Local filtering every adapter applies to its own batch: city, sport,
//! time window, then the caller's limit.

use crate::common::types::{CompetitionQuery, EventSource};
use crate::domain::Competition;
use crate::window::TimeWindow;
use tracing::{debug, info};

/// Case-insensitive substring match of the requested city against any of the
/// candidate fields. No city (or `all`) matches everything.
pub fn matches_city(city: Option<&str>, candidates: &[&str]) -> bool {
    let city = match city.map(str::trim) {
        None | Some("") => return true,
        Some(c) if c.eq_ignore_ascii_case("all") => return true,
        Some(c) => c.to_lowercase(),
    };

    candidates
        .iter()
        .any(|field| field.to_lowercase().contains(&city))
}

/// Records without a start date are not subject to the window.
pub fn matches_window(
    begin: Option<chrono::DateTime<chrono::Utc>>,
    window: &TimeWindow,
    now: chrono::DateTime<chrono::Utc>,
) -> bool {
    begin.map_or(true, |start| window.admits(start, now))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub kept: usize,
    pub malformed: usize,
    pub by_city: usize,
    pub by_sport: usize,
    pub by_period: usize,
}

/// Map and filter a provider's raw batch. Malformed entries are skipped one
/// by one; the batch always survives.
pub fn select_competitions<S>(source: &S, raw: Vec<S::Raw>, query: &CompetitionQuery) -> Vec<Competition>
where
    S: EventSource + ?Sized,
{
    let service = source.kind();
    let window = query.window();
    let mut stats = FilterStats::default();
    let mut competitions = Vec::new();

    for entry in &raw {
        if competitions.len() >= query.limit {
            break;
        }

        let competition = match source.get_competition(entry, query) {
            Ok(c) => c,
            Err(e) => {
                debug!(service = %service, "Skipping malformed record: {}", e);
                stats.malformed += 1;
                continue;
            }
        };

        if !matches_city(query.city.as_deref(), &source.city_fields(entry, &competition)) {
            stats.by_city += 1;
            continue;
        }

        if let Some(sport) = query.sport {
            if !source.matches_sport(entry, &competition, sport) {
                stats.by_sport += 1;
                continue;
            }
        }

        if !matches_window(competition.begin_date, &window, query.now) {
            debug!(
                service = %service,
                "Skipping '{}' outside {} .. {}",
                competition.title, window.start, window.end
            );
            stats.by_period += 1;
            continue;
        }

        competitions.push(competition);
    }

    stats.kept = competitions.len();
    info!(
        service = %service,
        received = raw.len(),
        kept = stats.kept,
        malformed = stats.malformed,
        by_city = stats.by_city,
        by_sport = stats.by_sport,
        by_period = stats.by_period,
        "Filtered provider batch"
    );
    competitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{window, Period};

    #[test]
    fn test_city_match_is_case_insensitive_substring() {
        assert!(matches_city(
            Some("москва"),
            &["г. Москва, Лужники", "", "Забег", ""]
        ));
        assert!(!matches_city(Some("Казань"), &["", "", "", "Казанский марафон"]));
        assert!(matches_city(Some("казан"), &["", "", "", "Казанский марафон"]));
    }

    #[test]
    fn test_city_match_checks_every_field() {
        let fields = ["Лужники", "Парк Горького", "Москва", "Ночной забег"];
        assert!(matches_city(Some("москва"), &fields));
        assert!(matches_city(Some("ГОРЬКОГО"), &fields));
        assert!(!matches_city(Some("Сочи"), &fields));
    }

    #[test]
    fn test_city_absent_or_all_matches() {
        assert!(matches_city(None, &[]));
        assert!(matches_city(Some("  "), &[]));
        assert!(matches_city(Some("all"), &["Сочи"]));
    }

    #[test]
    fn test_undated_records_pass_window() {
        let now = chrono::DateTime::parse_from_rfc3339("2025-11-13T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let w = window(Period::CurrentMonth, now);
        assert!(matches_window(None, &w, now));
        let past = now - chrono::Duration::days(1);
        assert!(!matches_window(Some(past), &w, now));
    }
}
