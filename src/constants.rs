/// HTTP defaults
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Database defaults
pub const DEFAULT_DB_PATH: &str = "tools.db";
pub const DB_PRAGMAS: &[&str] = &[
    "PRAGMA journal_mode = WAL",
    "PRAGMA synchronous = NORMAL",
    "PRAGMA busy_timeout = 5000",
];

/// Logging defaults
pub const DEFAULT_LOG_FILTER: &str = "toolforge=debug,tower_http=info";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "toolforge.log";
