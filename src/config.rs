use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which remote store implementation the console talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgREST / Supabase REST endpoint
    Postgrest,
    /// Direct PostgreSQL connection
    Postgres,
    /// In-process store, for demos and tests
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Base URL of the REST endpoint (postgrest backend)
    pub url: Option<String>,
    /// Public access key sent as `apikey` and bearer token (postgrest backend)
    pub access_key: Option<String>,
    /// PostgreSQL connection string (postgres backend)
    pub connection_string: Option<String>,
    pub max_connections: u32,
    pub timeout_secs: u64,
    /// Load the sample data set at startup
    pub seed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub page_size: usize,
    pub search_debounce_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgrest,
            url: None,
            access_key: None,
            connection_string: None,
            max_connections: 20,
            timeout_secs: 30,
            seed: false,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            search_debounce_ms: 300,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `config` file and
    /// `WMS_` environment variables (`WMS_STORE__BACKEND=memory`)
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        config = config.add_source(
            config::Environment::with_prefix("WMS")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject settings the console cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.console.page_size == 0 {
            anyhow::bail!("console.page_size must be at least 1");
        }
        Ok(())
    }

    /// REST endpoint and access key, falling back to the conventional
    /// `SUPABASE_URL` / `SUPABASE_ANON_KEY` variables
    pub fn rest_credentials(&self) -> anyhow::Result<(String, String)> {
        let url = self
            .store
            .url
            .clone()
            .or_else(|| std::env::var("SUPABASE_URL").ok())
            .filter(|url| !url.trim().is_empty());
        let key = self
            .store
            .access_key
            .clone()
            .or_else(|| std::env::var("SUPABASE_ANON_KEY").ok())
            .filter(|key| !key.trim().is_empty());

        match (url, key) {
            (Some(url), Some(key)) => Ok((url, key)),
            (None, _) => anyhow::bail!(
                "missing store URL: set WMS_STORE__URL or SUPABASE_URL"
            ),
            (_, None) => anyhow::bail!(
                "missing store access key: set WMS_STORE__ACCESS_KEY or SUPABASE_ANON_KEY"
            ),
        }
    }

    /// Get the database URL from config or environment
    pub fn database_url(&self) -> anyhow::Result<String> {
        if let Some(connection_string) = &self.store.connection_string {
            return Ok(connection_string.clone());
        }

        std::env::var("DATABASE_URL").map_err(|_| {
            anyhow::anyhow!(
                "missing connection string: set WMS_STORE__CONNECTION_STRING or DATABASE_URL"
            )
        })
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.store.timeout_secs)
    }

    pub fn search_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.console.search_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server_address(), "127.0.0.1:3001");
        assert_eq!(config.store.backend, StoreBackend::Postgrest);
        assert_eq!(config.console.page_size, 10);
        assert_eq!(config.search_debounce().as_millis(), 300);
    }

    #[test]
    fn test_configured_credentials_win() {
        let mut config = AppConfig::default();
        config.store.url = Some("https://x.supabase.co".to_string());
        config.store.access_key = Some("anon".to_string());

        let (url, key) = config.rest_credentials().unwrap();
        assert_eq!(url, "https://x.supabase.co");
        assert_eq!(key, "anon");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = AppConfig::default();
        config.console.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_names() {
        let backend: StoreBackend = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(backend, StoreBackend::Memory);
    }
}
