//! Session configuration.

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the library auto-discovery directory.
pub const LIBRARY_DIR_ENV: &str = "GROOVYLS_LIB_PATH";

/// Configuration that shapes a compiler session's classpath.
///
/// Any change to these values requires a full rebuild of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Additional classpath entries: archive paths, or directories suffixed
    /// with `*`.
    pub classpath: Vec<String>,
    /// Directory scanned for archives before the configured entries.
    pub library_dir: Option<PathBuf>,
}

/// The `groovy` section of the client's configuration payload.
#[derive(Debug, Deserialize)]
struct ClientSettings {
    #[serde(default)]
    groovy: Option<GroovySection>,
}

#[derive(Debug, Deserialize)]
struct GroovySection {
    #[serde(default)]
    classpath: Option<Vec<String>>,
}

impl Settings {
    /// Create empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings with the library directory taken from [`LIBRARY_DIR_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        let library_dir = std::env::var_os(LIBRARY_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self {
            classpath: Vec::new(),
            library_dir,
        }
    }

    /// Set the classpath entries.
    #[must_use]
    pub fn with_classpath<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classpath = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Set the library auto-discovery directory.
    #[must_use]
    pub fn with_library_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.library_dir = dir;
        self
    }

    /// Apply a `workspace/didChangeConfiguration` payload of the form
    /// `{ "groovy": { "classpath": [...] } }`.
    ///
    /// A payload without a classpath leaves the settings untouched. Returns
    /// whether the classpath changed.
    pub fn apply_client_settings(
        &mut self,
        payload: &serde_json::Value,
    ) -> Result<bool, SettingsError> {
        let client = ClientSettings::deserialize(payload)?;
        let Some(classpath) = client.groovy.and_then(|g| g.classpath) else {
            return Ok(false);
        };
        if classpath == self.classpath {
            return Ok(false);
        }
        self.classpath = classpath;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_client_settings() {
        let mut settings = Settings::new();
        let payload = json!({ "groovy": { "classpath": ["/libs/*", "/extra/a.jar"] } });

        assert!(settings.apply_client_settings(&payload).unwrap());
        assert_eq!(settings.classpath, vec!["/libs/*", "/extra/a.jar"]);

        // Same payload again is not a change.
        assert!(!settings.apply_client_settings(&payload).unwrap());
    }

    #[test]
    fn test_apply_client_settings_without_section() {
        let mut settings = Settings::new().with_classpath(["/a.jar"]);
        assert!(!settings.apply_client_settings(&json!({})).unwrap());
        assert!(!settings
            .apply_client_settings(&json!({ "groovy": {} }))
            .unwrap());
        assert_eq!(settings.classpath, vec!["/a.jar"]);
    }

    #[test]
    fn test_apply_client_settings_malformed() {
        let mut settings = Settings::new();
        let payload = json!({ "groovy": { "classpath": "not-a-list" } });
        assert!(matches!(
            settings.apply_client_settings(&payload),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_settings_serde_camel_case() {
        let settings: Settings =
            serde_json::from_value(json!({ "classpath": ["x.jar"], "libraryDir": "/lib" }))
                .unwrap();
        assert_eq!(settings.classpath, vec!["x.jar"]);
        assert_eq!(settings.library_dir, Some(PathBuf::from("/lib")));
    }
}
