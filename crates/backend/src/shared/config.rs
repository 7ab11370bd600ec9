use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::path::{Path, PathBuf};

static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub dealership: DealershipConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "target/db/dealerdesk.db".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub access_token_hours: i64,
    pub refresh_token_days: i64,
    /// Credentials of the account created when `sys_users` is empty
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_hours: 24,
            refresh_token_days: 90,
            admin_username: "admin".into(),
            admin_password: "admin".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DealershipConfig {
    pub sale_prefix: String,
    pub ticket_prefix: String,
    pub lead_prefix: String,
    pub customer_prefix: String,
    /// Credited to the referrer when a referred lead buys
    pub referral_reward: f64,
    /// Default Uptime Pass duration
    pub uptime_pass_months: u32,
    /// Local time of the showroom as minutes east of UTC (330 for IST).
    /// Attendance days and "today" follow this offset.
    pub utc_offset_minutes: i32,
}

impl Default for DealershipConfig {
    fn default() -> Self {
        Self {
            sale_prefix: "SALE".into(),
            ticket_prefix: "SRV".into(),
            lead_prefix: "LEAD".into(),
            customer_prefix: "CUST".into(),
            referral_reward: 1000.0,
            uptime_pass_months: 12,
            utc_offset_minutes: 0,
        }
    }
}

impl DealershipConfig {
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar date of `at` on the showroom clock
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.local_offset()).date_naive()
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/dealerdesk.db"

[server]
host = "0.0.0.0"
port = 3000

[auth]
access_token_hours = 24
refresh_token_days = 90

[dealership]
sale_prefix = "SALE"
ticket_prefix = "SRV"
lead_prefix = "LEAD"
customer_prefix = "CUST"
referral_reward = 1000.0
uptime_pass_months = 12
utc_offset_minutes = 0
"#;

fn candidate_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("config.toml"));
        }
    }
    paths.push(PathBuf::from("config.toml"));
    paths
}

/// Load configuration from config.toml
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Current directory (for development)
/// 3. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    for config_path in candidate_config_paths() {
        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            return parse_config(&contents);
        }
    }

    tracing::info!("Using default embedded configuration");
    parse_config(DEFAULT_CONFIG)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(contents)?;
    if config.dealership.uptime_pass_months == 0 {
        anyhow::bail!("dealership.uptime_pass_months must be at least 1");
    }
    if config.dealership.referral_reward < 0.0 {
        anyhow::bail!("dealership.referral_reward cannot be negative");
    }
    if config.dealership.utc_offset_minutes.abs() > 14 * 60 {
        anyhow::bail!("dealership.utc_offset_minutes must be within +/-840");
    }
    Ok(config)
}

/// Make `config` the process-wide configuration. Only the first call wins.
pub fn install(config: Config) {
    if CONFIG.set(config).is_err() {
        tracing::warn!("Configuration already installed; ignoring the new one");
    }
}

/// Process-wide configuration, or defaults when nothing was installed (tests)
pub fn current() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

/// Today's date on the showroom clock
pub fn today() -> NaiveDate {
    current().dealership.local_date(Utc::now())
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> PathBuf {
    let db_path = Path::new(&config.database.path);

    if db_path.is_absolute() {
        return db_path.to_path_buf();
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return exe_dir.join(db_path);
        }
    }

    PathBuf::from(&config.database.path)
}
