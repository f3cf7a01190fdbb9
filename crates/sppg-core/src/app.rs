//! Application container
//!
//! The UI layer constructs one `App` at startup and reads session state
//! through it; nothing else touches the session storage entries.

use std::sync::Arc;

use sppg_api::{HttpTransport, Transport};
use sppg_auth::{AuthorizedClient, SessionManager};
use sppg_storage::{Database, KeyValueStore};

use crate::config::Config;
use crate::Result;

pub struct App {
    config: Config,
    session: SessionManager,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&config.database_path)?;
        let transport =
            HttpTransport::with_timeout(&config.api_base_url, config.request_timeout())?;

        tracing::info!(
            api = %transport.base_url(),
            database = %config.database_path.display(),
            "Created app"
        );

        Ok(Self::with_parts(config, Arc::new(db), Arc::new(transport)))
    }

    /// Build from explicit collaborators, e.g. an alternative store or transport.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            session: SessionManager::new(store, transport),
        }
    }

    /// Restore the persisted session. Completes even when the stored session
    /// was unusable; check `session().is_authenticated()` afterwards.
    pub async fn initialize(&self) -> Result<()> {
        self.session.initialize().await?;
        Ok(())
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// HTTP client for the rest of the backend API (schools, menus, reports...)
    pub fn client(&self) -> AuthorizedClient {
        self.session.client()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispose(&self) {
        self.session.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_data_dir(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("sppg-core-{name}-{nanos}"))
    }

    #[tokio::test]
    async fn test_app_starts_logged_out() {
        let dir = temp_data_dir("fresh");
        let config = Config::new(dir.join("nested"));

        let app = App::new(config).unwrap();
        app.initialize().await.unwrap();

        assert!(app.session().is_initialized());
        assert!(!app.session().is_authenticated());
        assert!(dir.join("nested").join("session.db").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_app_restores_persisted_session() {
        let dir = temp_data_dir("restore");
        let config = Config::new(dir.clone());

        // What a previous run left behind
        {
            std::fs::create_dir_all(&dir).unwrap();
            let db = Database::open(&config.database_path).unwrap();
            db.set_many(&[
                ("token", "h.eyJzdWIiOiJ1MSJ9.s"),
                ("user", r#"{"id":"u1","username":"pic1","role":"pic","schoolId":"12"}"#),
            ])
            .unwrap();
        }

        let app = App::new(config).unwrap();
        app.initialize().await.unwrap();

        assert!(app.session().is_authenticated());
        assert!(app.session().is_pic());
        assert_eq!(
            app.session().current_user().unwrap().school_id.as_deref(),
            Some("12")
        );

        app.dispose();
        assert!(!app.session().is_authenticated());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_api_url() {
        let dir = temp_data_dir("badurl");
        let mut config = Config::new(dir.clone());
        config.api_base_url = "not a url".to_string();

        assert!(matches!(
            App::new(config),
            Err(crate::CoreError::Transport(_))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
