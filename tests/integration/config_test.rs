//! Integration tests for configuration management
//!
//! These tests verify that the configuration system works correctly
//! across module boundaries.

use jellyresume::config::{ReportingSettings, Settings};
use jellyresume::jellyfin::JellyfinClient;
use jellyresume::playback::{ReportingPolicy, SessionManager};
use jellyresume::storage::MemoryStore;
use std::error::Error;
use std::sync::Arc;
use tempfile::tempdir;

#[cfg(test)]
mod config_integration_tests {
    use super::*;

    /// Test complete configuration workflow
    #[test]
    fn test_config_lifecycle() -> Result<(), Box<dyn Error>> {
        // Create a temporary directory for test
        let dir = tempdir()?;
        let config_path = dir.path().join("nested").join("config.json");

        // Create settings with test values
        let mut settings = Settings::default();
        settings.server_url = "https://jellyfin-server.example.com".to_string();
        settings.api_key = Some("integration-test-api-key".to_string());
        settings.username = Some("integration-test-user".to_string());
        settings.user_id = Some("integration-test-user-id".to_string());
        settings.resume_store_path = dir.path().join("resume.json");
        settings.reporting.seek_threshold_secs = 5;

        // Validate and save settings
        settings.validate()?;
        settings.save(&config_path)?;

        // Load settings back
        let loaded_settings = Settings::load(&config_path)?;
        assert_eq!(loaded_settings, settings);
        assert_eq!(loaded_settings.reporting.seek_threshold_secs, 5);

        // Test overriding settings
        let mut updated_settings = loaded_settings;
        updated_settings.server_url = "https://updated-server.example.com".to_string();
        updated_settings.save(&config_path)?;

        // Load again and verify updates
        let reloaded_settings = Settings::load(&config_path)?;
        assert_eq!(reloaded_settings.server_url, "https://updated-server.example.com");

        Ok(())
    }

    /// An older config file without a reporting section picks up the defaults
    #[test]
    fn test_partial_config_uses_reporting_defaults() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"server_url": "http://nas:8096", "api_key": "k", "user_id": "u"}"#,
        )?;

        let settings = Settings::load(&config_path)?;
        assert_eq!(settings.reporting, ReportingSettings::default());
        assert_eq!(settings.reporting.progress_interval_secs, 10);
        assert!((settings.reporting.completion_threshold - 0.95).abs() < f64::EPSILON);
        settings.validate()?;
        Ok(())
    }

    /// Test invalid configuration handling
    #[test]
    fn test_invalid_config_validation() {
        // Test with empty server URL
        let invalid_settings = Settings {
            server_url: "".to_string(),
            api_key: Some("test-key".to_string()),
            ..Settings::default()
        };

        let result = invalid_settings.validate();
        assert!(result.is_err());

        if let Err(e) = result {
            assert!(e.to_string().contains("URL cannot be empty"));
        }

        // Test with missing authentication
        let no_auth_settings = Settings {
            server_url: "https://example.com".to_string(),
            api_key: None,
            username: None,
            ..Settings::default()
        };

        // Validation requires either API key or username
        assert!(no_auth_settings.validate().is_err());

        let mut bad_threshold = Settings {
            server_url: "https://example.com".to_string(),
            api_key: Some("test-key".to_string()),
            ..Settings::default()
        };
        bad_threshold.reporting.completion_threshold = 1.5;
        assert!(bad_threshold.validate().is_err());
    }

    /// Reporting settings flow into the sessions built from them
    #[test]
    fn test_settings_build_sessions() {
        let settings = Settings {
            server_url: "https://example.com".to_string(),
            api_key: Some("test-key".to_string()),
            user_id: Some("test-user".to_string()),
            ..Settings::default()
        };

        let client = JellyfinClient::new(&settings.server_url)
            .with_api_key("test-key")
            .with_user_id("test-user");
        let remote = SessionManager::remote(Arc::new(client), "item-1", &settings.reporting);
        assert!(remote.is_ok());

        let unauthenticated = JellyfinClient::new(&settings.server_url);
        assert!(SessionManager::remote(Arc::new(unauthenticated), "item-1", &settings.reporting).is_err());

        let local = SessionManager::local(Arc::new(MemoryStore::new()), "/media/a.mkv", &settings.reporting);
        assert!(local.is_ok());

        assert_eq!(
            ReportingPolicy::cadence(&settings.reporting),
            ReportingPolicy::Cadence { every_secs: settings.reporting.local_save_interval_secs }
        );
    }
}
