use std::env;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

/// Process configuration, read from the environment once at first use.
pub static CONFIG: LazyLock<ServerConfig> = LazyLock::new(ServerConfig::from_env);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port the HTTP/WebSocket listener binds (`PORT`).
    pub port: u16,
    /// Shared GM password; `None` disables the whole GM surface (`GM_PASSWORD`).
    pub gm_password: Option<String>,
    /// Verbose logging (`DEBUG=true`).
    pub debug: bool,
    /// Public URL to self-ping so free-tier hosting never idles us out
    /// (`RENDER_EXTERNAL_URL`).
    pub external_url: Option<String>,
    /// Monster simulation cadence. The movement constants were tuned against
    /// this value together with `SPEED_MULTIPLIER`; change both or neither.
    pub tick_hz: u32,
    /// Hard ceiling on how long a silent player stays in a room.
    pub player_timeout: Duration,
    /// Cadence of the inactivity sweep.
    pub sweep_interval: Duration,
    /// Cadence of the self-ping when `external_url` is set.
    pub self_ping_interval: Duration,
    pub rate: RateCaps,
    pub drops: DropTuning,
}

/// Per-second admission caps for the sliding-window rate limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateCaps {
    pub attacks: usize,
    pub pickups: usize,
    pub positions: usize,
}

#[derive(Debug, Clone)]
pub struct DropTuning {
    /// Horizontal scatter velocity range for minted drops.
    pub velocity_x: (f64, f64),
    /// Vertical pop velocity range. Earlier client builds expected
    /// `[-10, -7)`; current ones integrate `[-5, -3)`.
    pub velocity_y: (f64, f64),
    /// Celebration drops: catalog-key prefix -> guaranteed item name.
    pub celebration: Vec<(String, String)>,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            port: env_parsed("PORT", 3001),
            gm_password: env::var("GM_PASSWORD").ok().filter(|p| !p.is_empty()),
            debug: env::var("DEBUG").is_ok_and(|v| v == "true"),
            external_url: env::var("RENDER_EXTERNAL_URL")
                .ok()
                .filter(|u| !u.is_empty()),
            tick_hz: env_parsed("EMBER_TICK_HZ", 20),
            player_timeout: Duration::from_secs(env_parsed("EMBER_PLAYER_TIMEOUT_SECS", 120)),
            sweep_interval: Duration::from_secs(10),
            self_ping_interval: Duration::from_secs(14 * 60),
            rate: RateCaps {
                attacks: 10,
                pickups: 20,
                positions: 30,
            },
            drops: DropTuning {
                velocity_x: (-2.0, 2.0),
                velocity_y: (-5.0, -3.0),
                celebration: vec![("babySlime".into(), "Salami Stick".into())],
            },
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.tick_hz.max(1)))
    }
}

fn env_parsed<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("ignoring unparseable {key}={raw:?}");
            default
        }),
        Err(_) => default,
    }
}
