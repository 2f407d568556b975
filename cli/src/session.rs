use crate::config::Config;
use crate::error::CliError;
use crate::storage::JsonStore;
use anyhow::Result;
use hearth_core::{ChangeNotifier, MembershipCoordinator, User};
use std::sync::Arc;

/// Everything a command needs: the coordination core wired to the
/// file-backed store, plus the CLI's own settings.
pub struct App {
    store: Arc<JsonStore>,
    coordinator: MembershipCoordinator,
    notifier: ChangeNotifier,
    config: Config,
    config_dir: Option<String>,
}

impl App {
    pub fn new(config_dir: Option<&str>) -> Result<Self> {
        let store = Arc::new(JsonStore::new(config_dir)?);
        let coordinator = MembershipCoordinator::new(store.clone());
        let notifier = ChangeNotifier::new(store.clone());
        let config = Config::load(config_dir)?;

        Ok(Self {
            store,
            coordinator,
            notifier,
            config,
            config_dir: config_dir.map(str::to_string),
        })
    }

    pub fn store(&self) -> &Arc<JsonStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &MembershipCoordinator {
        &self.coordinator
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// The user id commands act as.
    pub fn active_user_id(&self) -> Result<&str> {
        self.config
            .active_user
            .as_deref()
            .ok_or_else(|| CliError::NoActiveUser.into())
    }

    pub async fn active_user(&self) -> Result<User> {
        let id = self.active_user_id()?;
        Ok(self.coordinator.directory().require_user(id).await?)
    }

    pub fn set_active_user(&mut self, user_id: &str) -> Result<()> {
        self.config.active_user = Some(user_id.to_string());
        self.config.save(self.config_dir.as_deref())
    }
}
