use anyhow::{bail, Context};

pub const DEFAULT_WINDOW_DAYS: i64 = 180;
pub const DEFAULT_THRESHOLD_RATIO: f64 = 0.8;
pub const DEFAULT_CV_CUTOFF: f64 = 20.0;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// One hundred years of history.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Tunables for the threshold evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub window_days: i64,
    pub threshold_ratio: f64,
    pub cv_cutoff: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            threshold_ratio: DEFAULT_THRESHOLD_RATIO,
            cv_cutoff: DEFAULT_CV_CUTOFF,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub engine: EngineSettings,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let window_days = parse_or(&lookup, "UPLOAD_WATCH_WINDOW_DAYS", DEFAULT_WINDOW_DAYS)?;
        let threshold_ratio =
            parse_or(&lookup, "UPLOAD_WATCH_THRESHOLD_RATIO", DEFAULT_THRESHOLD_RATIO)?;
        let cv_cutoff = parse_or(&lookup, "UPLOAD_WATCH_CV_CUTOFF", DEFAULT_CV_CUTOFF)?;

        if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
            bail!("UPLOAD_WATCH_WINDOW_DAYS must be between 1 and {MAX_WINDOW_DAYS}, got {window_days}");
        }
        if !(threshold_ratio > 0.0 && threshold_ratio <= 1.0) {
            bail!("UPLOAD_WATCH_THRESHOLD_RATIO must be in (0, 1], got {threshold_ratio}");
        }
        if !cv_cutoff.is_finite() || cv_cutoff < 0.0 {
            bail!("UPLOAD_WATCH_CV_CUTOFF must be a non-negative number, got {cv_cutoff}");
        }
        if max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be positive");
        }

        Ok(Self {
            database_url,
            max_connections,
            engine: EngineSettings {
                window_days,
                threshold_ratio,
                cv_cutoff,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
