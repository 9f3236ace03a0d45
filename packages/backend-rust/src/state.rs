use std::sync::Arc;
use std::time::Instant;

use crate::auth::KeycloakVerifier;
use crate::config::Config;
use crate::db::Database;
use crate::response::AppError;
use crate::services::content::ContentGenerator;
use crate::services::llm_provider::LlmProvider;
use crate::services::tts::TtsService;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    config: Arc<Config>,
    db: Option<Database>,
    llm: LlmProvider,
    content: ContentGenerator,
    tts: TtsService,
    verifier: Option<Arc<KeycloakVerifier>>,
}

impl AppState {
    pub fn new(config: Config, db: Option<Database>, llm: LlmProvider) -> Self {
        let content = ContentGenerator::new(llm.clone());
        let tts = TtsService::new(config.tts_cache_dir.clone(), config.tts_endpoint.clone());
        let verifier = config.keycloak.as_ref().map(|kc| Arc::new(KeycloakVerifier::new(kc)));
        Self {
            started_at: Instant::now(),
            config: Arc::new(config),
            db,
            llm,
            content,
            tts,
            verifier,
        }
    }

    pub fn with_content(mut self, content: ContentGenerator) -> Self {
        self.content = content;
        self
    }

    pub fn with_tts(mut self, tts: TtsService) -> Self {
        self.tts = tts;
        self
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> Option<&Database> {
        self.db.as_ref()
    }

    /// The database, or a 503 when it failed to open at startup
    pub fn db(&self) -> Result<&Database, AppError> {
        self.db
            .as_ref()
            .ok_or_else(|| AppError::service_unavailable("Database unavailable"))
    }

    pub fn llm(&self) -> &LlmProvider {
        &self.llm
    }

    pub fn content(&self) -> &ContentGenerator {
        &self.content
    }

    pub fn tts(&self) -> &TtsService {
        &self.tts
    }

    pub fn verifier(&self) -> Option<&KeycloakVerifier> {
        self.verifier.as_deref()
    }
}
