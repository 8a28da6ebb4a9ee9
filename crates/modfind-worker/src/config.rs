use clap::Parser;

/// Worker configuration, from flags or environment.
#[derive(Parser, Debug)]
#[command(name = "modfind-worker", about = "modfind background maintenance worker")]
pub struct Config {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Connection pool size.
    #[arg(long, env = "MODFIND_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Seconds between imported-by recomputation sweeps.
    #[arg(long, env = "MODFIND_IMPORTED_BY_INTERVAL_SECS", default_value_t = 3600)]
    pub imported_by_interval_secs: u64,

    /// Seconds between excluded-prefix refreshes.
    #[arg(long, env = "MODFIND_EXCLUDED_REFRESH_SECS", default_value_t = 600)]
    pub excluded_refresh_secs: u64,

    /// Apply schema migrations on startup.
    #[arg(
        long,
        env = "MODFIND_MIGRATE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub migrate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["modfind-worker", "--database-url", "postgres://x"]);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.imported_by_interval_secs, 3600);
        assert_eq!(config.excluded_refresh_secs, 600);
        assert!(config.migrate);
    }
}
