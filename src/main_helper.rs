use crate::constants::{
    DEFAULT_API_URL, DEFAULT_DB_PATH, DEFAULT_HOST, DEFAULT_LOG_DIR, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_PORT,
};
use crate::db::DbPool;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    #[arg(long, env = "TOOLFORGE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    #[arg(long, env = "DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub database: String,
    /// Base URL of the CRUD service used by the client commands.
    #[arg(long, env = "TOOLFORGE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    #[arg(long, env = "TOOLFORGE_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_SIZE)]
    pub max_body_size: usize,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the CRUD service.
    Serve,
    /// Print the function-calling specification for a tool file.
    Assemble { file: PathBuf },
    /// Check a tool file the way the editor does before saving.
    Validate { file: PathBuf },
    /// Convert a function-calling specification into an editable tool file.
    Import { file: PathBuf },
    /// Validate sample input against a tool file and print a mock result.
    Test {
        file: PathBuf,
        /// JSON object with the sample arguments.
        #[arg(long)]
        input: String,
    },
    /// List tools stored by the CRUD service.
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Derive parameters from a TypeScript/JavaScript function signature.
    ParseSignature { signature: String },
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub args: Arc<Args>,
}
