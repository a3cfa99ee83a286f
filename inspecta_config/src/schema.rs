use std::path::{Path, PathBuf};

use inspecta_core::DispatchConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
        }
    }
}

impl DatabaseConfig {
    fn default_url() -> String {
        "sqlite://inspecta.db?mode=rwc".to_string()
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub zhipu: ProviderConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
}

impl ProviderConfig {
    /// Whether a real key was filled in over the template placeholder.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_key.starts_with("your-")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EscalationConfig {
    /// Empty means the provider's default model.
    #[serde(default)]
    pub model: String,
    #[serde(default = "EscalationConfig::default_temperature")]
    pub temperature: f32,
    /// Overrides `dispatch.escalation_timeout_ms` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: Self::default_temperature(),
            timeout_secs: None,
        }
    }
}

impl EscalationConfig {
    const fn default_temperature() -> f32 {
        0.3
    }
}

pub const CONFIG_TEMPLATE: &str = r#"{
  "database": {
    "url": "sqlite://inspecta.db?mode=rwc"
  },
  "providers": {
    "zhipu": {
      "api_key": "your-zhipu-api-key-here"
    }
  },
  "escalation": {
    "model": "glm-4-flash",
    "temperature": 0.3,
    "timeout_secs": 30
  },
  "dispatch": {
    "min_confidence": 50,
    "top_k": 5,
    "row_cap": 50,
    "display_cap": 20,
    "execution_timeout_ms": 5000,
    "context_history": 5
  }
}"#;

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("inspecta"))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'inspecta init' to create config.",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    /// Load the config file, or fall back to defaults when none exists.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!(
                "No config at {}, using defaults",
                config_path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Dispatch settings with the escalation timeout override applied.
    #[must_use]
    pub fn dispatch_config(&self) -> DispatchConfig {
        let mut dispatch = self.dispatch.clone();
        if let Some(secs) = self.escalation.timeout_secs {
            dispatch.escalation_timeout_ms = secs.saturating_mul(1000);
        }
        dispatch
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, CONFIG_TEMPLATE)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Set database.url (SQLite file or PostgreSQL URL)");
        println!("   2. Add your Zhipu API key to enable escalation");
        println!("   3. Run 'inspecta seed-demo' to load demo rules and records");
        println!("   4. Run 'inspecta query' to start asking questions");
        println!();
        println!("🔧 Configuration options:");
        println!("   - dispatch.min_confidence: score a rule needs before it answers");
        println!("   - dispatch.row_cap: rows fetched per query (10 to 50)");
        println!("   - dispatch.category_keywords: override category-defining keywords");
        println!();
        Ok(())
    }
}
