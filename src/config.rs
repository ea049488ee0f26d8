//! Process configuration.
//!
//! Parsed once from the command line and shared read-only as
//! `Arc<Config>`. `CONFIG GET` reads parameters from it by name.

use clap::Parser;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone, Parser)]
#[command(name = "ferrokv", version, about = "A small Redis-compatible in-memory key-value server")]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = crate::DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = crate::DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding the RDB snapshot
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// RDB snapshot file name inside --dir
    #[arg(long, default_value = "dump.rdb")]
    pub dbfilename: String,

    /// Log verbosity: 0 debug, 1 info, 2 warning, 3 error, 4 fatal, 5 off
    #[arg(long, default_value_t = 1)]
    pub loglevel: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            dir: PathBuf::from("."),
            dbfilename: "dump.rdb".to_string(),
            loglevel: 1,
        }
    }
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `<dir>/<dbfilename>`
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(&self.dbfilename)
    }

    /// Looks up a parameter for `CONFIG GET`. Names are case-insensitive.
    pub fn get(&self, name: &str) -> Option<String> {
        match name.to_ascii_lowercase().as_str() {
            "bind" | "host" => Some(self.host.clone()),
            "port" => Some(self.port.to_string()),
            "dir" => Some(self.dir.display().to_string()),
            "dbfilename" => Some(self.dbfilename.clone()),
            "loglevel" => Some(self.loglevel.to_string()),
            _ => None,
        }
    }

    pub fn log_filter(&self) -> LevelFilter {
        match self.loglevel {
            0 => LevelFilter::DEBUG,
            1 => LevelFilter::INFO,
            2 => LevelFilter::WARN,
            3 | 4 => LevelFilter::ERROR,
            _ => LevelFilter::OFF,
        }
    }
}
