/// Service name constants to ensure consistency across the codebase.
/// These are the names callers pass as the service selector.
pub const RUSSIA_RUNNING_API: &str = "RussiaRunning";
pub const TIMERMAN_API: &str = "Timerman";
pub const HERO_LEAGUE_API: &str = "HeroLeague";
pub const REG_PLACE_API: &str = "reg.place";
pub const RUNC_API: &str = "RunC";

/// Selector value meaning "every provider"
pub const ALL_SERVICES: &str = "all";

// Organizer names shown when a provider does not expose one
pub const HERO_LEAGUE_ORGANIZER: &str = "Лига Героев";
pub const RUNC_ORGANIZER: &str = "Беговое Сообщество";

// Endpoints
pub const RUSSIA_RUNNING_BASE_URL: &str = "https://reg.russiarunning.com";
pub const RUSSIA_RUNNING_LIST_PATH: &str = "/api/events/list";
pub const TIMERMAN_BASE_URL: &str = "https://timerman.org";
pub const TIMERMAN_LIST_PATH: &str = "/api/events/list/ru";
pub const HERO_LEAGUE_BASE_URL: &str = "https://heroleague.ru";
pub const HERO_LEAGUE_LIST_PATH: &str = "/api/event/list";
pub const REG_PLACE_API_BASE_URL: &str = "https://api.reg.place/v1";
pub const REG_PLACE_SITE_URL: &str = "https://reg.place";
pub const RUNC_BASE_URL: &str = "https://runc.run";

// Per-request timeouts, seconds
pub const PAGED_POST_TIMEOUT_SECS: u64 = 30;
pub const HERO_LEAGUE_TIMEOUT_SECS: u64 = 15;
pub const REG_PLACE_TIMEOUT_SECS: u64 = 10;
pub const RUNC_TIMEOUT_SECS: u64 = 15;

// Paged POST providers
pub const PAGE_SIZE: usize = 100;
pub const MAX_PAGE_REQUESTS: usize = 20;

/// Per-provider limit used when several providers are merged, so that one
/// provider's cap cannot starve the others before sorting.
pub const RELAXED_LIMIT: usize = 1000;
pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

pub const ROLLING_WINDOW_DAYS: i64 = 180;

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Get all supported service names, in merge priority order
pub fn get_supported_apis() -> Vec<&'static str> {
    vec![
        RUSSIA_RUNNING_API,
        TIMERMAN_API,
        HERO_LEAGUE_API,
        REG_PLACE_API,
        RUNC_API,
    ]
}

/// Resolve a user supplied service name (case-insensitive, display names
/// accepted) to its canonical constant.
pub fn canonical_api_name(name: &str) -> Option<&'static str> {
    let lowered = name.trim().to_lowercase();
    match lowered.as_str() {
        "russiarunning" | "russia_running" => Some(RUSSIA_RUNNING_API),
        "timerman" => Some(TIMERMAN_API),
        "heroleague" | "hero_league" | "лига героев" => Some(HERO_LEAGUE_API),
        "reg.place" | "regplace" | "reg_place" => Some(REG_PLACE_API),
        "runc" | "беговое сообщество" => Some(RUNC_API),
        _ => None,
    }
}
