use axum::extract::FromRef;

use crate::catalog::CatalogService;
use crate::library::LibraryStore;
use crate::mailer::Mailer;
use crate::player::PlayerManager;
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::stream::AudioResolver;
use super::ServerConfig;

pub type GuardedCatalog = Arc<CatalogService>;
pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedPlayerManager = Arc<PlayerManager>;
pub type GuardedLibrary = Arc<dyn LibraryStore>;
pub type GuardedMailer = Arc<dyn Mailer>;
pub type OptionalResolver = Option<Arc<AudioResolver>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub catalog: GuardedCatalog,
    pub user_manager: GuardedUserManager,
    pub player_manager: GuardedPlayerManager,
    pub library: GuardedLibrary,
    pub mailer: GuardedMailer,
    pub resolver: OptionalResolver,
}

impl FromRef<ServerState> for GuardedCatalog {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedPlayerManager {
    fn from_ref(input: &ServerState) -> Self {
        input.player_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedLibrary {
    fn from_ref(input: &ServerState) -> Self {
        input.library.clone()
    }
}

impl FromRef<ServerState> for GuardedMailer {
    fn from_ref(input: &ServerState) -> Self {
        input.mailer.clone()
    }
}

impl FromRef<ServerState> for OptionalResolver {
    fn from_ref(input: &ServerState) -> Self {
        input.resolver.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
