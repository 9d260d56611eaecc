use crate::core::ConfigProvider;
use crate::utils::error::{PlcError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Newest language level this implementation understands.
pub const MAX_SOURCE_LEVEL: u32 = 23;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    pub language: LanguageConfig,
    pub run: Option<RunConfig>,
    pub logging: Option<LoggingConfig>,
    pub environment: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    pub group: String,
    pub version: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub source_level: u32,
    #[serde(default = "default_analyze")]
    pub analyze: bool,
}

fn default_analyze() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub entry: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl Default for ProjectConfig {
    /// Used when no manifest is present.
    fn default() -> Self {
        Self {
            project: ProjectSection {
                group: "plc.project".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
            },
            language: LanguageConfig {
                source_level: MAX_SOURCE_LEVEL,
                analyze: true,
            },
            run: None,
            logging: None,
            environment: None,
        }
    }
}

impl ProjectConfig {
    /// Loads `path`, or the defaults when it does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            tracing::debug!(path = %path.as_ref().display(), "no manifest, using defaults");
            return Ok(Self::default());
        }
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PlcError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let defaults = Self::environment_defaults(content);
        let processed_content = Self::substitute_env_vars(content, &defaults)?;

        toml::from_str(&processed_content).map_err(|e| PlcError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// The raw `[environment]` table, read before substitution. Empty when
    /// the unsubstituted text does not parse.
    fn environment_defaults(content: &str) -> HashMap<String, String> {
        #[derive(Deserialize)]
        struct EnvironmentOnly {
            #[serde(default)]
            environment: HashMap<String, String>,
        }

        toml::from_str::<EnvironmentOnly>(content)
            .map(|raw| raw.environment)
            .unwrap_or_default()
    }

    /// Replaces `${VAR}` with the process environment value, falling back to
    /// `defaults`. Unknown variables are left as written.
    fn substitute_env_vars(content: &str, defaults: &HashMap<String, String>) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| PlcError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name)
                .ok()
                .or_else(|| defaults.get(var_name).cloned())
                .unwrap_or_else(|| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("project.group", &self.project.group)?;
        validation::validate_non_empty_string("project.version", &self.project.version)?;
        validation::validate_range(
            "language.source_level",
            self.language.source_level,
            1,
            MAX_SOURCE_LEVEL,
        )?;

        if let Some(entry) = self.entry() {
            validation::validate_path("run.entry", entry)?;
            validation::validate_file_extension("run.entry", entry, &["plc"])?;
        }

        if let Some(format) = self.log_format() {
            validation::validate_one_of("logging.format", format, &["compact", "json"])?;
        }

        Ok(())
    }

    /// Default program for `plc run`.
    pub fn entry(&self) -> Option<&str> {
        self.run.as_ref().and_then(|r| r.entry.as_deref())
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn log_format(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.format.as_deref())
    }
}

impl ConfigProvider for ProjectConfig {
    fn analyze(&self) -> bool {
        self.language.analyze
    }

    fn source_level(&self) -> u32 {
        self.language.source_level
    }
}

impl Validate for ProjectConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SHIPPED: &str = include_str!("../../plc.toml");

    #[test]
    fn test_shipped_manifest_identity() {
        let config = ProjectConfig::from_toml_str(SHIPPED).unwrap();
        assert_eq!(config.project.group, "plc.project");
        assert_eq!(config.project.version, "1.0.0");
        assert_eq!(config.project.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.language.source_level, 23);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = ProjectConfig::from_toml_str(
            r#"
[project]
group = "demo"
version = "0.1.0"

[language]
source_level = 17
"#,
        )
        .unwrap();

        assert!(config.analyze());
        assert_eq!(config.source_level(), 17);
        assert!(config.entry().is_none());
        assert!(config.log_format().is_none());
    }

    #[test]
    fn test_rejects_unsupported_source_level() {
        let config = ProjectConfig::from_toml_str(
            r#"
[project]
group = "demo"
version = "0.1.0"

[language]
source_level = 24
"#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, PlcError::InvalidConfigValueError { ref field, .. } if field == "language.source_level"));
    }

    #[test]
    fn test_rejects_non_plc_entry_and_unknown_format() {
        let base = r#"
[project]
group = "demo"
version = "0.1.0"

[language]
source_level = 23
"#;
        let entry = ProjectConfig::from_toml_str(&format!("{}\n[run]\nentry = \"main.txt\"\n", base)).unwrap();
        assert!(entry.validate().is_err());

        let format = ProjectConfig::from_toml_str(&format!("{}\n[logging]\nformat = \"xml\"\n", base)).unwrap();
        assert!(format.validate().is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PLC_TEST_GROUP", "from.env");
        let config = ProjectConfig::from_toml_str(
            r#"
[project]
group = "${PLC_TEST_GROUP}"
version = "1.0.0"

[language]
source_level = 23
"#,
        )
        .unwrap();
        assert_eq!(config.project.group, "from.env");
        std::env::remove_var("PLC_TEST_GROUP");
    }

    #[test]
    fn test_unknown_env_var_is_kept() {
        let result = ProjectConfig::substitute_env_vars("entry = \"${PLC_SURELY_UNSET_VAR}\"", &HashMap::new()).unwrap();
        assert_eq!(result, "entry = \"${PLC_SURELY_UNSET_VAR}\"");
    }

    #[test]
    fn test_environment_table_fills_unset_variables() {
        std::env::set_var("PLC_TEST_SET_LEVEL", "info");
        std::env::remove_var("PLC_TEST_UNSET_ENTRY");
        let config = ProjectConfig::from_toml_str(
            r#"
[project]
group = "demo"
version = "0.1.0"

[language]
source_level = 23

[run]
entry = "${PLC_TEST_UNSET_ENTRY}"

[logging]
level = "${PLC_TEST_SET_LEVEL}"

[environment]
PLC_TEST_UNSET_ENTRY = "src/app.plc"
PLC_TEST_SET_LEVEL = "error"
"#,
        )
        .unwrap();
        assert_eq!(config.entry(), Some("src/app.plc"));
        assert_eq!(config.log_level(), Some("info"));
        std::env::remove_var("PLC_TEST_SET_LEVEL");
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[project]
group = "file.project"
version = "2.0.0"

[language]
source_level = 20
analyze = false

[run]
entry = "src/main.plc"
"#
        )
        .unwrap();

        let config = ProjectConfig::from_file(file.path()).unwrap();
        assert_eq!(config.project.group, "file.project");
        assert!(!config.analyze());
        assert_eq!(config.entry(), Some("src/main.plc"));
    }

    #[test]
    fn test_missing_manifest_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load_or_default(dir.path().join("plc.toml")).unwrap();
        assert_eq!(config.project.group, "plc.project");
        assert_eq!(config.source_level(), MAX_SOURCE_LEVEL);
        assert!(config.analyze());
    }

    #[test]
    fn test_invalid_toml() {
        let result = ProjectConfig::from_toml_str("[project\ngroup = ");
        assert!(matches!(result, Err(PlcError::ConfigError { .. })));
    }
}
