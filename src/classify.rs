//! Heuristic sport classification.
//!
//! Every provider names disciplines in its own vocabulary, so each one gets
//! an ordered keyword table. Tables are evaluated top to bottom and the first
//! group with a substring hit wins: specific groups (ski, triathlon) must sit
//! above the generic running catch-alls, otherwise tokens like `skirun` or
//! `marathon` land in the wrong bucket.

use crate::domain::{SportCode, SportFilter};

/// Outcome of a table lookup. `NonSport` covers provider categories that are
/// not competitions at all (training camps, expeditions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Sport(SportCode),
    NonSport,
}

impl Bucket {
    pub fn sport_code(self) -> SportCode {
        match self {
            Bucket::Sport(code) => code,
            Bucket::NonSport => SportCode::Other,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub keywords: &'static [&'static str],
    pub bucket: Bucket,
}

const fn rule(keywords: &'static [&'static str], bucket: Bucket) -> KeywordRule {
    KeywordRule { keywords, bucket }
}

const fn sport(code: SportCode) -> Bucket {
    Bucket::Sport(code)
}

#[derive(Debug, Clone, Copy)]
pub struct SportClassifier {
    /// Whole-token matches checked before the keyword rules
    pub exact: &'static [(&'static str, Bucket)],
    pub rules: &'static [KeywordRule],
    /// Result for blank input
    pub empty: Bucket,
    /// Result when nothing matched
    pub fallback: Bucket,
}

impl SportClassifier {
    pub fn bucket(&self, raw: &str) -> Bucket {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() {
            return self.empty;
        }

        if let Some((_, bucket)) = self.exact.iter().find(|(token, _)| *token == lowered) {
            return *bucket;
        }

        self.rules
            .iter()
            .find(|r| r.keywords.iter().any(|k| lowered.contains(k)))
            .map(|r| r.bucket)
            .unwrap_or(self.fallback)
    }

    pub fn classify(&self, raw: &str) -> SportCode {
        self.bucket(raw).sport_code()
    }
}

/// Discipline codes and names of the paged registration services
/// (RussiaRunning, Timerman).
pub const DISCIPLINE_CLASSIFIER: SportClassifier = SportClassifier {
    exact: &[],
    rules: &[
        rule(&["ski", "лыж"], sport(SportCode::Ski)),
        rule(
            &["triathlon", "триатлон", "duathlon", "дуатлон", "aquathlon", "акватлон"],
            sport(SportCode::Triathlon),
        ),
        rule(&["swim", "плав", "заплыв", "open-water"], sport(SportCode::Swim)),
        rule(&["bike", "cycl", "велос", "вело"], sport(SportCode::Bike)),
        rule(
            &["run", "бег", "trail", "трейл", "забег", "марафон", "marathon"],
            sport(SportCode::Run),
        ),
    ],
    empty: sport(SportCode::Other),
    fallback: sport(SportCode::Other),
};

/// HeroLeague event-type slugs such as `skirun`, `gonka`, `zabeg`.
pub const HERO_LEAGUE_CLASSIFIER: SportClassifier = SportClassifier {
    exact: &[],
    rules: &[
        rule(&["skirun", "snowrun", "ski", "лыж"], sport(SportCode::Ski)),
        rule(&["camp", "expedition", "экспедиц"], Bucket::NonSport),
        rule(&["gonka"], sport(SportCode::Other)),
        rule(
            &["zabeg", "race", "run", "marathon", "doroga", "arctic", "trail"],
            sport(SportCode::Run),
        ),
        rule(&["bike", "велос", "lastrada"], sport(SportCode::Bike)),
        rule(&["swim", "плав"], sport(SportCode::Swim)),
        rule(&["triathlon", "триатлон"], sport(SportCode::Triathlon)),
    ],
    empty: sport(SportCode::Other),
    fallback: sport(SportCode::Other),
};

/// reg.place sport slugs (`swimming`, `cycling`, ...) with a keyword fallback
/// for free-text sport names.
pub const REG_PLACE_CLASSIFIER: SportClassifier = SportClassifier {
    exact: &[
        ("swimming", sport(SportCode::Swim)),
        ("cycling", sport(SportCode::Bike)),
        ("skiing", sport(SportCode::Ski)),
        ("running", sport(SportCode::Run)),
        ("triathlon", sport(SportCode::Triathlon)),
        ("duathlon", sport(SportCode::Triathlon)),
        ("other", sport(SportCode::Other)),
    ],
    rules: &[
        rule(&["ski", "лыж"], sport(SportCode::Ski)),
        rule(
            &["triathlon", "триатлон", "duathlon", "дуатлон"],
            sport(SportCode::Triathlon),
        ),
        rule(&["swim", "плав", "заплыв"], sport(SportCode::Swim)),
        rule(&["bike", "cycling", "велос", "вело", "cycle"], sport(SportCode::Bike)),
        rule(
            &["run", "бег", "марафон", "забег", "trail", "трейл"],
            sport(SportCode::Run),
        ),
    ],
    empty: sport(SportCode::Run),
    fallback: sport(SportCode::Run),
};

/// RunC labels: event titles plus distance descriptions in Russian.
pub const RUNC_CLASSIFIER: SportClassifier = SportClassifier {
    exact: &[],
    rules: &[
        rule(&["лыж", "ski"], sport(SportCode::Ski)),
        rule(&["велос", "bike", "вело"], sport(SportCode::Bike)),
        rule(&["плав", "swim", "заплыв"], sport(SportCode::Swim)),
        rule(&["триатлон", "triathlon", "акватлон"], sport(SportCode::Triathlon)),
        rule(
            &["бег", "забег", "кросс", "марафон", "эстафет", "спринт", "run", "race"],
            sport(SportCode::Run),
        ),
    ],
    empty: sport(SportCode::Run),
    fallback: sport(SportCode::Run),
};

/// Title keywords that mark an event as containing the given sport.
pub fn title_keywords(code: SportCode) -> &'static [&'static str] {
    match code {
        SportCode::Run => &["бег", "run", "trail", "трейл", "забег", "марафон"],
        SportCode::Swim => &["плав", "swim", "заплыв"],
        SportCode::Bike => &["bike", "cycle", "cycling", "велосипед", "велоспорт", "велогонка"],
        SportCode::Ski => &["лыж", "ski"],
        SportCode::Triathlon => &["триатлон", "triathlon", "дуатлон", "акватлон"],
        SportCode::Other => &[],
    }
}

/// One place an event states a discipline: the event itself or one race.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisciplineSurface<'a> {
    pub code: &'a str,
    pub name: &'a str,
}

impl<'a> DisciplineSurface<'a> {
    pub fn new(code: &'a str, name: &'a str) -> Self {
        Self { code, name }
    }

    fn is_blank(&self) -> bool {
        self.code.trim().is_empty() && self.name.trim().is_empty()
    }

    fn classify(&self, classifier: &SportClassifier) -> SportCode {
        classifier.classify(&format!("{} {}", self.code, self.name))
    }
}

/// Whether an event contains the requested sport anywhere: its main
/// discipline, any of its races, or its title.
pub fn matches_sport_type<'a>(
    requested: SportFilter,
    classifier: &SportClassifier,
    main: DisciplineSurface<'a>,
    title: &str,
    races: impl IntoIterator<Item = DisciplineSurface<'a>>,
) -> bool {
    let target = match requested {
        SportFilter::All => return true,
        SportFilter::Only(code) => code,
    };

    if !main.is_blank() && main.classify(classifier) == target {
        return true;
    }

    let title = title.to_lowercase();
    if title_keywords(target).iter().any(|k| title.contains(k)) {
        return true;
    }

    races
        .into_iter()
        .filter(|race| !race.is_blank())
        .any(|race| race.classify(classifier) == target)
}
