//! Canonical record shapes every provider adapter produces.

use crate::common::constants::{
    HERO_LEAGUE_API, REG_PLACE_API, RUNC_API, RUSSIA_RUNNING_API, TIMERMAN_API,
};
use crate::common::error::ScraperError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed sport taxonomy. Provider vocabularies never leak past an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SportCode {
    Run,
    Swim,
    Bike,
    Ski,
    Triathlon,
    Other,
}

impl SportCode {
    pub const ALL: [SportCode; 6] = [
        SportCode::Run,
        SportCode::Swim,
        SportCode::Bike,
        SportCode::Ski,
        SportCode::Triathlon,
        SportCode::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SportCode::Run => "run",
            SportCode::Swim => "swim",
            SportCode::Bike => "bike",
            SportCode::Ski => "ski",
            SportCode::Triathlon => "triathlon",
            SportCode::Other => "other",
        }
    }
}

impl fmt::Display for SportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SportCode {
    type Err = ScraperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SportCode::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScraperError::Config(format!("unknown sport code '{s}'")))
    }
}

/// Sport requested by a caller: a single taxonomy member, or every sport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SportFilter {
    All,
    Only(SportCode),
}

impl FromStr for SportFilter {
    type Err = ScraperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(SportFilter::All)
        } else {
            s.parse().map(SportFilter::Only)
        }
    }
}

impl fmt::Display for SportFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SportFilter::All => f.write_str("all"),
            SportFilter::Only(code) => code.fmt(f),
        }
    }
}

/// The provider a record came from. Variant order is merge priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceKind {
    #[serde(rename = "RussiaRunning")]
    RussiaRunning,
    #[serde(rename = "Timerman")]
    Timerman,
    #[serde(rename = "HeroLeague")]
    HeroLeague,
    #[serde(rename = "reg.place")]
    RegPlace,
    #[serde(rename = "RunC")]
    RunC,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::RussiaRunning,
        ServiceKind::Timerman,
        ServiceKind::HeroLeague,
        ServiceKind::RegPlace,
        ServiceKind::RunC,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::RussiaRunning => RUSSIA_RUNNING_API,
            ServiceKind::Timerman => TIMERMAN_API,
            ServiceKind::HeroLeague => HERO_LEAGUE_API,
            ServiceKind::RegPlace => REG_PLACE_API,
            ServiceKind::RunC => RUNC_API,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let canonical = crate::common::constants::canonical_api_name(name)?;
        ServiceKind::ALL.into_iter().find(|s| s.as_str() == canonical)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One race of an event, always in kilometers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub name: String,
    pub distance_km: f64,
    pub sport_code: SportCode,
    pub participants_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub id: String,
    pub title: String,
    pub city: String,
    pub place: String,
    pub address: Option<String>,
    pub sport_code: SportCode,
    pub begin_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub distances: Vec<Distance>,
    /// Free-text distance description for providers without structured races
    pub distances_text: Option<String>,
    pub organizer: String,
    pub service: ServiceKind,
    pub url: String,
    pub description: Option<String>,
    pub participants_count: Option<u32>,
    pub registration_open: Option<DateTime<Utc>>,
    pub registration_close: Option<DateTime<Utc>>,
}

impl Competition {
    /// Minimal record; adapters fill the rest with struct-update syntax.
    pub fn new(service: ServiceKind, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            city: String::new(),
            place: String::new(),
            address: None,
            sport_code: SportCode::Other,
            begin_date: None,
            end_date: None,
            distances: Vec::new(),
            distances_text: None,
            organizer: service.as_str().to_string(),
            service,
            url: String::new(),
            description: None,
            participants_count: None,
            registration_open: None,
            registration_close: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_filter_parses_all_and_codes() {
        assert_eq!("all".parse::<SportFilter>().unwrap(), SportFilter::All);
        assert_eq!(
            "Swim".parse::<SportFilter>().unwrap(),
            SportFilter::Only(SportCode::Swim)
        );
        assert!("hockey".parse::<SportFilter>().is_err());
    }

    #[test]
    fn test_service_kind_serializes_as_provider_name() {
        let json = serde_json::to_string(&ServiceKind::RegPlace).unwrap();
        assert_eq!(json, "\"reg.place\"");
        assert_eq!(ServiceKind::from_name("regplace"), Some(ServiceKind::RegPlace));
    }

    #[test]
    fn test_new_competition_defaults() {
        let comp = Competition::new(ServiceKind::Timerman, "abc", "Зимний забег");
        assert_eq!(comp.sport_code, SportCode::Other);
        assert_eq!(comp.organizer, "Timerman");
        assert!(comp.begin_date.is_none());
        assert!(comp.distances.is_empty());
    }
}
