pub mod hero_league;
pub mod paged;
pub mod reg_place;
pub mod runc;
pub mod russia_running;
pub mod timerman;

use crate::common::constants::*;
use crate::common::types::CompetitionApi;
use std::sync::Arc;

pub use hero_league::HeroLeagueCrawler;
pub use reg_place::RegPlaceCrawler;
pub use runc::RunCCrawler;
pub use russia_running::RussiaRunningCrawler;
pub use timerman::TimermanCrawler;

/// Factory function to create a provider adapter by name. Names are matched
/// case-insensitively.
pub fn create_api(api_name: &str) -> Option<Arc<dyn CompetitionApi>> {
    match canonical_api_name(api_name)? {
        RUSSIA_RUNNING_API => Some(Arc::new(RussiaRunningCrawler::new())),
        TIMERMAN_API => Some(Arc::new(TimermanCrawler::new())),
        HERO_LEAGUE_API => Some(Arc::new(HeroLeagueCrawler::new())),
        REG_PLACE_API => Some(Arc::new(RegPlaceCrawler::new())),
        RUNC_API => Some(Arc::new(RunCCrawler::new())),
        _ => None,
    }
}

/// Every adapter, in merge priority order.
pub fn default_apis() -> Vec<Arc<dyn CompetitionApi>> {
    get_supported_apis()
        .into_iter()
        .filter_map(create_api)
        .collect()
}
