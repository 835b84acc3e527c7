use crate::coordinator::CoordinatorSettings;
use crate::registry::Registry;
use crate::store::Store;
use deuce_core::config::MatchFormat;

pub struct AppState {
    pub matches: Registry,
    pub umpire_secret: Option<String>,
    /// Used when a create request carries no format of its own.
    pub default_format: MatchFormat,
}

impl AppState {
    pub fn new(
        store: Store,
        settings: CoordinatorSettings,
        umpire_secret: Option<String>,
        default_format: MatchFormat,
    ) -> Self {
        Self {
            matches: Registry::new(store, settings),
            umpire_secret: umpire_secret.filter(|s| !s.is_empty()),
            default_format,
        }
    }
}
