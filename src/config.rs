use anyhow::{Context, Result};
use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::ai::{HttpAiClientConfig, RetryPolicy};
use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL_MS};
use crate::rate::QuotaPolicy;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub server: ServerConfig,
    /// `None` leaves the service permanently offline for AI routing.
    pub ai: Option<HttpAiClientConfig>,
    pub cache_ttl_ms: u64,
    pub cache_capacity: usize,
    pub history_limit: usize,
    pub quota: QuotaPolicy,
    pub state_dir: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:9199".to_string(),
                workers: 1,
            },
            ai: None,
            cache_ttl_ms: DEFAULT_TTL_MS,
            cache_capacity: DEFAULT_CAPACITY,
            history_limit: DEFAULT_HISTORY_LIMIT,
            quota: QuotaPolicy::default(),
            state_dir: None,
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            env::var("HEALTH_ROUTER_BIND").unwrap_or_else(|_| "0.0.0.0:9199".to_string());
        let workers = parsed("HEALTH_ROUTER_WORKERS").unwrap_or_else(num_cpus::get_physical);

        let ai = match env::var("HEALTH_ROUTER_AI_BASE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => {
                let key_env = env::var("HEALTH_ROUTER_AI_KEY_ENV")
                    .unwrap_or_else(|_| "HEALTH_ROUTER_AI_KEY".to_string());
                let api_key = env::var(&key_env).ok().filter(|key| !key.is_empty());
                if api_key.is_none() {
                    tracing::warn!(key_env, "no ai api key set; calling ai service unauthenticated");
                }
                Some(HttpAiClientConfig {
                    base_url: base_url.trim().to_string(),
                    api_key,
                    timeout: Duration::from_millis(
                        parsed("HEALTH_ROUTER_AI_TIMEOUT_MS").unwrap_or(30_000),
                    ),
                    retry: RetryPolicy {
                        max_attempts: parsed("HEALTH_ROUTER_AI_MAX_ATTEMPTS").unwrap_or(3),
                        base_delay: Duration::from_millis(
                            parsed("HEALTH_ROUTER_AI_BACKOFF_MS").unwrap_or(500),
                        ),
                        ..RetryPolicy::default()
                    },
                })
            }
            _ => {
                tracing::info!("HEALTH_ROUTER_AI_BASE_URL not set; ai routing disabled");
                None
            }
        };

        let quota = match env::var("HEALTH_ROUTER_QUOTA_PATH") {
            Ok(path) if !path.is_empty() => load_quota(Path::new(&path))?,
            _ => QuotaPolicy::default(),
        };

        Ok(Self {
            server: ServerConfig { bind_addr, workers },
            ai,
            cache_ttl_ms: parsed("HEALTH_ROUTER_CACHE_TTL_MS").unwrap_or(DEFAULT_TTL_MS),
            cache_capacity: parsed("HEALTH_ROUTER_CACHE_CAPACITY").unwrap_or(DEFAULT_CAPACITY),
            history_limit: parsed("HEALTH_ROUTER_HISTORY_LIMIT").unwrap_or(DEFAULT_HISTORY_LIMIT),
            quota,
            state_dir: env::var("HEALTH_ROUTER_STATE_DIR")
                .ok()
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Quota policy from a JSON document, falling back to YAML.
pub fn load_quota(path: &Path) -> Result<QuotaPolicy> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read quota policy at {:?}", path))?;
    parse_quota(&raw)
}

pub fn parse_quota(raw: &str) -> Result<QuotaPolicy> {
    let policy: QuotaPolicy = serde_json::from_str(raw)
        .or_else(|_| serde_yaml::from_str(raw))
        .with_context(|| "parse quota policy document")?;
    anyhow::ensure!(
        policy.monthly_budget >= 0.0,
        "monthly_budget must be non-negative"
    );
    anyhow::ensure!(
        (0.0..=1.0).contains(&policy.critical_reserve),
        "critical_reserve must be within [0, 1]"
    );
    Ok(policy)
}
