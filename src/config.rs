use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "yatube", about = "A small blogging platform")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the web server (the default)
    Serve,
    /// Create a group posts can be filed under
    AddGroup(AddGroupArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct AddGroupArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub slug: String,

    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
    pub cache: CacheConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Where uploaded post images are written.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FeedConfig {
    /// Posts per page, shared by every listing.
    pub page_size: usize,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub index_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "yatube_session".to_string(),
            session_hours: 336,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { index_ttl_secs: 20 }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if config.feed.page_size == 0 {
            anyhow::bail!("feed.page_size must be at least 1");
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("yatube.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("media"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".yatube")
        })
    }

    pub fn db_path(&self) -> &Path {
        self.database
            .path
            .as_deref()
            .unwrap_or_else(|| Path::new("yatube.db"))
    }

    pub fn uploads_path(&self) -> &Path {
        self.storage
            .path
            .as_deref()
            .unwrap_or_else(|| Path::new("media"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_dir(dir: &Path) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(dir.to_path_buf()),
            command: None,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.cookie_name, "yatube_session");
        assert_eq!(config.feed.page_size, 10);
        assert_eq!(config.cache.index_ttl_secs, 20);
        assert!(config.database.path.is_none());
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with_dir(Path::new("/tmp/test-yatube"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-yatube"));
    }

    #[test]
    fn data_dir_defaults_to_dot_yatube() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
            command: None,
        };
        assert!(Config::data_dir(&cli).ends_with(".yatube"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_with_dir(tmp.path())).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.db_path(), tmp.path().join("yatube.db"));
        assert_eq!(config.uploads_path(), tmp.path().join("media"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[feed]
page_size = 5

[cache]
index_ttl_secs = 60
"#,
        )
        .unwrap();

        let mut cli = cli_with_dir(tmp.path());
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.feed.page_size, 5);
        assert_eq!(config.cache.index_ttl_secs, 60);
        assert_eq!(config.auth.session_hours, 336);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[server]\nhost = \"192.168.1.1\"\nport = 9000\n").unwrap();

        let mut cli = cli_with_dir(tmp.path());
        cli.config = Some(config_path);
        cli.host = Some("10.0.0.1".to_string());
        cli.port = Some(4000);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[feed]\npage_size = 0\n").unwrap();

        let mut cli = cli_with_dir(tmp.path());
        cli.config = Some(config_path);
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn add_group_subcommand_parses() {
        let cli = Cli::parse_from([
            "yatube",
            "add-group",
            "--title",
            "Cats",
            "--slug",
            "cats",
        ]);
        assert_eq!(
            cli.command,
            Some(Command::AddGroup(AddGroupArgs {
                title: "Cats".into(),
                slug: "cats".into(),
                description: String::new(),
            }))
        );
    }
}
