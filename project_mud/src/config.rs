use std::path::{Path, PathBuf};

use mud::Settings;
use persistence::StartLocation;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "server.toml";
pub const STATIC_ENV: &str = "MUD_STATIC";
pub const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub telnet_addr: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            telnet_addr: "0.0.0.0:4000".to_string(),
        }
    }
}

/// Where new characters start.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    pub start_area: String,
    pub start_room: String,
    pub start_position: String,
}

impl Default for WorldSection {
    fn default() -> Self {
        let start = StartLocation::default();
        Self {
            start_area: start.area,
            start_room: start.room,
            start_position: start.position,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    pub handshake_capacity: usize,
    pub event_capacity: usize,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            handshake_capacity: 1000,
            event_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginSection {
    pub max_attempts: u32,
}

impl Default for LoginSection {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One TOML file per player.
    #[default]
    Toml,
    Sqlite,
    /// Nothing survives a restart.
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub backend: StoreBackend,
    /// Relative to the static directory. Defaults to `player/` for TOML
    /// files and `player.db` for SQLite.
    pub path: Option<String>,
}

impl DatabaseSection {
    pub fn resolved_path(&self, static_dir: &Path) -> PathBuf {
        let default = match self.backend {
            StoreBackend::Sqlite => "player.db",
            StoreBackend::Toml | StoreBackend::Memory => "player",
        };
        static_dir.join(self.path.as_deref().unwrap_or(default))
    }
}

/// Top-level MUD server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub net: NetConfig,
    pub world: WorldSection,
    pub queues: QueueSection,
    pub login: LoginSection,
    pub database: DatabaseSection,
}

impl ServerConfig {
    /// Load configuration from a TOML file. The file must exist.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn start_location(&self) -> StartLocation {
        StartLocation {
            area: self.world.start_area.clone(),
            room: self.world.start_room.clone(),
            position: self.world.start_position.clone(),
        }
    }

    pub fn to_settings(&self) -> Settings {
        Settings {
            start: self.start_location(),
            max_attempts: self.login.max_attempts,
            handshake_capacity: self.queues.handshake_capacity,
            event_capacity: self.queues.event_capacity,
        }
    }

    /// Listen address, with the port replaced when `port` is given.
    pub fn listen_addr(&self, port: Option<u16>) -> String {
        let addr = &self.net.telnet_addr;
        match port {
            Some(port) => {
                let host = addr.rsplit_once(':').map_or(addr.as_str(), |(host, _)| host);
                format!("{}:{}", host, port)
            }
            None => addr.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub static_dir: PathBuf,
    pub port: Option<u16>,
}

impl CliArgs {
    pub fn config_path(&self) -> PathBuf {
        self.static_dir.join(CONFIG_FILE)
    }
}

/// Parse `--static <dir>` and `--port <n>`. Without `--static`, falls back to
/// `env_static`, then to `./static`.
pub fn parse_args(args: &[String], env_static: Option<String>) -> Result<CliArgs, String> {
    let mut static_dir = None;
    let mut port = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--static" => {
                let val = args.get(i + 1).ok_or("--static requires a directory argument")?;
                static_dir = Some(PathBuf::from(val));
                i += 2;
            }
            "--port" => {
                let val = args.get(i + 1).ok_or("--port requires a port number")?;
                port = Some(
                    val.parse::<u16>()
                        .map_err(|_| format!("invalid port: {}", val))?,
                );
                i += 2;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    let static_dir = static_dir
        .or_else(|| env_static.filter(|s| !s.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
    Ok(CliArgs { static_dir, port })
}

/// Parse process arguments, exiting with status 1 on bad input.
pub fn parse_cli_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args, std::env::var(STATIC_ENV).ok()) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("usage: mud_server [--static <dir>] [--port <n>]");
            std::process::exit(1);
        }
    }
}
