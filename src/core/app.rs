//! Wiring shared by the terminal UI and the one-shot commands.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::config::Config;
use crate::core::conversation::ConversationStore;
use crate::core::credentials::{self, Startup};
use crate::core::inference::EndpointSettings;
use crate::core::knowledge::KnowledgeBase;
use crate::core::paths::{path_display, DataPaths};
use crate::core::profile::ProfileStore;
use crate::core::prompt::PromptAssembler;
use crate::core::session::SessionController;

pub const ENV_FILE: &str = ".env";

/// Resolved configuration and on-disk locations for one run.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub paths: DataPaths,
    pub model_override: Option<String>,
}

impl AppContext {
    /// Load the config file and resolve the data directory. `data_dir` wins
    /// over the configured one.
    pub fn load(data_dir: Option<&Path>, model: Option<String>) -> Result<Self, Box<dyn Error>> {
        Self::from_config(Config::load()?, data_dir, model)
    }

    pub fn from_config(
        config: Config,
        data_dir: Option<&Path>,
        model: Option<String>,
    ) -> Result<Self, Box<dyn Error>> {
        let override_dir = data_dir
            .map(Path::to_path_buf)
            .or_else(|| config.data_dir.clone());
        let paths = DataPaths::resolve(override_dir.as_deref())?
            .with_knowledge_dir(config.knowledge_dir.clone());

        // The only startup failure that halts: nowhere to keep documents.
        fs::create_dir_all(&paths.data_dir).map_err(|err| {
            format!(
                "Cannot create data directory {}: {err}",
                path_display(&paths.data_dir)
            )
        })?;

        Ok(Self {
            config,
            paths,
            model_override: model,
        })
    }

    pub fn endpoint_settings(&self) -> EndpointSettings {
        self.config
            .endpoint_settings(self.model_override.as_deref())
    }

    pub fn api_key_env(&self) -> &str {
        self.config.api_key_env()
    }

    pub fn startup(&self) -> Startup {
        credentials::resolve_from_env(self.api_key_env())
    }

    pub fn env_file(&self) -> PathBuf {
        PathBuf::from(ENV_FILE)
    }

    pub fn conversation_store(&self) -> ConversationStore {
        ConversationStore::new(&self.paths.conversations)
    }

    pub fn profile_store(&self) -> ProfileStore {
        ProfileStore::new(&self.paths.profile)
    }

    pub fn controller(&self) -> SessionController {
        let knowledge = KnowledgeBase::load(&self.paths.knowledge_dir);
        info!(
            data_dir = %path_display(&self.paths.data_dir),
            snippets = knowledge.len(),
            "session ready"
        );
        SessionController::new(
            self.profile_store(),
            self.conversation_store(),
            PromptAssembler::new(self.config.history_window()),
            knowledge,
            self.config.retrieval_limit(),
        )
    }
}
