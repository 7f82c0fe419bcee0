use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "WORMHOLE_LISTEN_ADDR";
pub const DOMAIN_ENV: &str = "WORMHOLE_DOMAIN";
pub const CODE_LENGTH_ENV: &str = "WORMHOLE_CODE_LENGTH";
pub const MAX_ATTEMPTS_ENV: &str = "WORMHOLE_MAX_ATTEMPTS";
pub const STORAGE_BACKEND_ENV: &str = "WORMHOLE_STORAGE_BACKEND";
pub const DATABASE_URL_ENV: &str = "WORMHOLE_DATABASE_URL";
pub const IO_TIMEOUT_ENV: &str = "WORMHOLE_IO_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "WORMHOLE_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DOMAIN: &str = "localhost:5000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://urls.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "sqlite")]
    Sqlite,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "wormhole", about = "Plain-text HTTP URL shortener")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Public prefix of returned short URLs.
    #[arg(long, env = DOMAIN_ENV, default_value = DEFAULT_DOMAIN)]
    pub domain: String,

    #[arg(
        long,
        env = CODE_LENGTH_ENV,
        default_value_t = wormhole_generator::DEFAULT_CODE_LENGTH as u16,
        value_parser = clap::value_parser!(u16).range(1..),
    )]
    pub code_length: u16,

    #[arg(
        long,
        env = MAX_ATTEMPTS_ENV,
        default_value_t = wormhole_shortener::DEFAULT_MAX_ATTEMPTS,
    )]
    pub max_attempts: usize,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Sqlite
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = DATABASE_URL_ENV, default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    #[arg(long, env = IO_TIMEOUT_ENV, default_value_t = 30)]
    pub io_timeout_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}
