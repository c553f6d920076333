#![allow(clippy::manual_unwrap_or_default)]
#![allow(clippy::manual_unwrap_or)]
use toolforge::assembler::to_pretty_json;
use toolforge::client::HttpToolApi;
use toolforge::db::init_db;
use toolforge::dependency::{missing_required_inputs, EditorValues};
use toolforge::logging::{init_tracing, setup_panic_hook};
use toolforge::payload::{EditorState, DEFAULT_CATEGORY};
use toolforge::signature::parse_function_signature;
use toolforge::store::ToolStore;
use toolforge::tool::{Tool, ToolStatus};
use toolforge::tool_schema::import_specification;
use toolforge::*;

use clap::Parser;
use colored::*;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args = Arc::new(Args::parse());
    let _guard = init_tracing(&args.log_dir);
    setup_panic_hook();

    let outcome = match args.command() {
        Command::Serve => serve(args.clone()).await,
        Command::Assemble { file } => assemble_file(&file),
        Command::Validate { file } => validate_file(&file),
        Command::Import { file } => import_file(&file),
        Command::Test { file, input } => test_file(&file, &input),
        Command::List { search, category } => {
            list_tools(&args, search.as_deref().unwrap_or_default(), category.as_deref()).await
        }
        Command::ParseSignature { signature } => parse_signature(&signature),
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn serve(args: Arc<Args>) -> Result<()> {
    let db = init_db(&args.database).await?;
    let state = Arc::new(AppState {
        db,
        args: args.clone(),
    });
    let app = toolforge::server::router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        tracing::info!("Toolforge listening on {}", addr);
        use futures_util::FutureExt;

        let server_future = async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        };

        match std::panic::AssertUnwindSafe(server_future)
            .catch_unwind()
            .await
        {
            Ok(result) => {
                if let Err(e) = result {
                    tracing::error!("Server error: {}", e);
                }
            }
            Err(panic_payload) => {
                let message = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                    *s
                } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                    s.as_str()
                } else {
                    "Unknown panic"
                };
                tracing::error!(target: "panic", "CRITICAL: Server task panicked: {}", message);
            }
        }
    });

    if let Err(e) = server_handle.await {
        return Err(ToolforgeError::internal(format!("Server task failed: {}", e)).into());
    }
    tracing::info!("Toolforge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn read_json_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Tool files are saved tool records (or anything shaped like one).
fn read_tool_file(path: &Path) -> Result<EditorState> {
    let tool: Tool = serde_json::from_value(read_json_file(path)?)?;
    Ok(EditorState::from_tool(&tool))
}

fn editor_file_json(state: &EditorState) -> Result<String> {
    Ok(serde_json::to_string_pretty(&json!({
        "name": state.name,
        "description": state.description,
        "category": state.category,
        "parameters": state.parameters,
    }))?)
}

fn assemble_file(path: &Path) -> Result<()> {
    let state = read_tool_file(path)?;
    println!("{}", to_pretty_json(&state.specification())?);
    Ok(())
}

fn validate_file(path: &Path) -> Result<()> {
    let state = read_tool_file(path)?;
    let report = state.validate();

    for warning in &report.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }
    for error in &report.errors {
        println!("{} {}", "invalid:".red().bold(), error);
    }

    if report.is_valid() {
        println!("{} {}", "ok:".green().bold(), state.name);
        Ok(())
    } else {
        let fields: Vec<&str> = report.fields_to_highlight.iter().map(String::as_str).collect();
        println!("fields: {}", fields.join(", ").dimmed());
        Err(ToolforgeError::Validation(report.errors).into())
    }
}

fn import_file(path: &Path) -> Result<()> {
    let spec = read_json_file(path)?;
    let Some(imported) = import_specification(&spec) else {
        return Err(ToolforgeError::InvalidSpecification(vec![
            "function.name must be a string".into(),
        ])
        .into());
    };

    let state = EditorState {
        name: imported.name,
        description: imported.description,
        parameters: imported.parameters,
        ..EditorState::new()
    };
    println!("{}", editor_file_json(&state)?);
    Ok(())
}

fn test_file(path: &Path, input: &str) -> Result<()> {
    let state = read_tool_file(path)?;
    let input: Value = serde_json::from_str(input)?;
    let Some(fields) = input.as_object() else {
        return Err(ToolforgeError::BadRequest("--input must be a JSON object".into()).into());
    };

    let values: EditorValues = state
        .parameters
        .iter()
        .filter_map(|p| {
            let value = fields.get(&p.name)?;
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((p.id.clone(), text))
        })
        .collect();

    for name in missing_required_inputs(&state.parameters, &values) {
        println!("{} {} is required here", "missing:".yellow().bold(), name);
    }

    let spec = serde_json::to_value(state.specification())?;
    let response = toolforge::tester::run_test(&spec, &input)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn list_tools(args: &Args, search: &str, category: Option<&str>) -> Result<()> {
    let api = HttpToolApi::new(
        args.api_url.clone(),
        Duration::from_secs(args.request_timeout_secs),
    )?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut store = ToolStore::with_cancellation(api, cancel);
    store.load_tool_specifications().await?;

    let tools = store.search(search, category);
    for tool in &tools {
        let status = match tool.status {
            ToolStatus::Active => tool.status.as_str().green(),
            ToolStatus::Inactive => tool.status.as_str().red(),
            ToolStatus::Draft => tool.status.as_str().yellow(),
        };
        let category = if tool.category.is_empty() {
            DEFAULT_CATEGORY
        } else {
            tool.category.as_str()
        };
        println!(
            "{}  {}  [{}]  {}  {}",
            tool.id.dimmed(),
            tool.name.bold(),
            category,
            status,
            tool.last_modified.dimmed()
        );
    }

    let stats = store.stats();
    println!(
        "{} shown, {} total, {} active, {} updated in the last 30 days",
        tools.len(),
        stats.total_tools,
        stats.active_tools,
        stats.recently_updated
    );
    Ok(())
}

fn parse_signature(signature: &str) -> Result<()> {
    let Some(parsed) = parse_function_signature(signature) else {
        return Err(ToolforgeError::BadRequest("Could not parse function signature".into()).into());
    };

    let state = EditorState {
        name: parsed.name.clone(),
        parameters: parsed.to_parameters(),
        ..EditorState::new()
    };
    println!("{}", editor_file_json(&state)?);
    Ok(())
}
