pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod engine;

pub use db::DbPool;

use auth::{AuthService, SessionManager};
use config::Config;
use engine::{DiagnosisEngine, IntakeService};

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub auth: AuthService,
    pub intake: IntakeService,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let sessions = SessionManager::new(db.clone(), config.auth.session_ttl_hours);
        let auth = AuthService::new(db.clone(), sessions.clone());
        let intake =
            IntakeService::new(db.clone(), sessions, DiagnosisEngine::with_default_rules());
        Self {
            config,
            db,
            auth,
            intake,
        }
    }
}
