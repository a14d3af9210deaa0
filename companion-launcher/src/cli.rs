use backend::completion::{ProviderConfig, ProviderKind};
use backend::store::StoreConfig;
use backend::{AppOptions, DEFAULT_CONTACT_URL};
use clap::{Parser, ValueEnum};
use shared::models::CompletionSettings;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StoreKind {
    /// JSON file, or memory only when no path is given
    Local,
    Sqlite,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Provider {
    Gemini,
    Openai,
}

#[derive(Parser)]
#[command(about = "Companion chat server")]
pub struct Cli {
    #[arg(long, env = "COMPANION_PORT", default_value_t = 8080)]
    pub port: u16,
    #[arg(long, env = "COMPANION_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,
    /// Static client build to serve next to the API
    #[arg(long, env = "COMPANION_DIST_DIR")]
    pub dist_dir: Option<PathBuf>,

    #[arg(long, value_enum, env = "COMPANION_STORE", default_value = "local")]
    pub store: StoreKind,
    #[arg(long, env = "COMPANION_STORE_PATH")]
    pub local_store_path: Option<PathBuf>,
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://companion.db?mode=rwc")]
    pub database_url: String,

    #[arg(long, value_enum, env = "COMPANION_PROVIDER", default_value = "gemini")]
    pub provider: Provider,
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    #[arg(long, env = "COMPANION_MODEL")]
    pub model: Option<String>,
    #[arg(long, env = "COMPANION_API_BASE")]
    pub api_base: Option<String>,

    #[arg(long, env = "COMPANION_ADMIN_PASSPHRASE", hide_env_values = true)]
    pub admin_passphrase: String,
    #[arg(long, env = "COMPANION_CONTACT_URL", default_value = DEFAULT_CONTACT_URL)]
    pub contact_url: String,
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        match self.store {
            StoreKind::Local => StoreConfig::Local {
                path: self.local_store_path.clone(),
            },
            StoreKind::Sqlite => StoreConfig::Sqlite {
                url: self.database_url.clone(),
            },
        }
    }

    /// Falls back to the provider's usual key variable when `--api-key` is unset.
    pub fn provider_config(&self) -> ProviderConfig {
        let (kind, key_var) = match self.provider {
            Provider::Gemini => (ProviderKind::Gemini, "GEMINI_API_KEY"),
            Provider::Openai => (ProviderKind::OpenAi, "OPENAI_API_KEY"),
        };
        let api_key = self.api_key.clone().or_else(|| std::env::var(key_var).ok());

        let mut settings = CompletionSettings::default();
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        settings.api_base = self.api_base.clone();

        ProviderConfig {
            kind,
            api_key,
            settings,
        }
    }

    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            admin_passphrase: self.admin_passphrase.clone(),
            contact_url: self.contact_url.clone(),
        }
    }
}
