use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use opentool_core::{OpenToolConfig, ToolOutput, ToolResponse};
use opentool_openapi::{OpenApiToolset, ToolGenOptions};
use opentool_telemetry::{LogFormat, init_telemetry};
use opentool_tool::DefaultToolContext;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// `opentool` - call the operations of an OpenAPI document as tools.
#[derive(Parser, Debug)]
#[command(name = "opentool")]
#[command(version)]
#[command(about = "Call OpenAPI operations as tools.", long_about = None)]
struct Cli {
    /// OpenAPI document: a file path or an http(s) URL
    #[arg(long, global = true)]
    spec: Option<String>,

    /// Configuration file (defaults to opentool.toml in this or a parent directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the servers declared by the document
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Only expose operations with this tag (repeatable)
    #[arg(long = "tag", global = true)]
    tags: Vec<String>,

    /// Pretty-print JSON response bodies
    #[arg(long, global = true)]
    pretty: bool,

    /// Require confirmation before PUT/POST/PATCH/DELETE calls
    #[arg(long, global = true)]
    confirm_destructive: bool,

    /// Log output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the tools the document would produce, without registering them
    List,

    /// Print the full tool catalog with input schemas
    Describe,

    /// Print the input schema of one tool
    Schema {
        /// Tool name
        tool: String,
    },

    /// Call a tool with JSON arguments
    #[command(long_about = "\
Call a tool with JSON arguments.

Examples:
  opentool --spec petstore.yaml call getPet '{\"petId\": 42}'
  opentool --spec petstore.yaml --confirm-destructive call deletePet '{\"petId\": 42}' --confirm")]
    Call {
        /// Tool name
        tool: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,

        /// Confirm a mutating call up front
        #[arg(long)]
        confirm: bool,
    },

    /// Check the document for problems that degrade the generated tools
    Check {
        /// Also report warnings and informational findings
        #[arg(long)]
        detailed: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_telemetry(cli.log_format);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => OpenToolConfig::load_from(path)?,
        None => OpenToolConfig::load()?,
    };

    let mut options = ToolGenOptions::from_config(&config.generation);
    if cli.base_url.is_some() {
        options.base_url = cli.base_url.clone();
    }
    if !cli.tags.is_empty() {
        options.tag_filter = cli.tags.clone();
    }
    options.pretty |= cli.pretty;
    options.confirm_destructive |= cli.confirm_destructive;
    options.dry_run = matches!(cli.command, Commands::List);
    debug!(?options, "Generation options");

    let source = cli
        .spec
        .clone()
        .or_else(|| config.spec.path.clone())
        .or_else(|| config.spec.url.clone())
        .context("No OpenAPI document given; pass --spec or set [spec] in opentool.toml")?;
    let toolset = load_toolset(&source, options).await?;
    info!(
        "Loaded '{}' {} ({} operations)",
        toolset.document().title(),
        toolset.document().version(),
        toolset.operations().len()
    );

    match cli.command {
        Commands::List => {
            for summary in &toolset.catalog().summaries {
                if summary.tags.is_empty() {
                    println!("{}\t{}", summary.name, summary.description);
                } else {
                    println!(
                        "{}\t{} [{}]",
                        summary.name,
                        summary.description,
                        summary.tags.join(", ")
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Describe => {
            let response = toolset
                .call("describe", new_context(&config, CancellationToken::new()), Value::Null)
                .await?;
            Ok(print_response(&response))
        }
        Commands::Schema { tool } => {
            let Some(tool) = toolset.get_tool(&tool) else {
                bail!("Unknown tool '{}'. Use `opentool list` to see the available tools.", tool);
            };
            println!("{}", serde_json::to_string_pretty(&tool.schema())?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Call {
            tool,
            args,
            confirm,
        } => {
            let mut arguments: Value =
                serde_json::from_str(&args).context("Arguments must be a JSON object")?;
            if confirm {
                match arguments.as_object_mut() {
                    Some(map) => {
                        map.insert("confirm".to_string(), Value::Bool(true));
                    }
                    None => bail!("Arguments must be a JSON object"),
                }
            }

            let token = CancellationToken::new();
            let watcher = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling the call");
                    watcher.cancel();
                }
            });

            let response = toolset
                .call(&tool, new_context(&config, token), arguments)
                .await?;
            Ok(print_response(&response))
        }
        Commands::Check { detailed } => {
            let report = toolset.check(detailed);
            println!("{}", report);
            Ok(if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn load_toolset(source: &str, options: ToolGenOptions) -> Result<OpenApiToolset> {
    let toolset = if source.starts_with("http://") || source.starts_with("https://") {
        OpenApiToolset::from_url(source, options).await
    } else {
        OpenApiToolset::from_file(source, options)
    };
    toolset.map_err(|e| {
        let hint = e.remediation();
        anyhow::Error::new(e).context(format!("Failed to load '{}' ({})", source, hint))
    })
}

fn new_context(config: &OpenToolConfig, token: CancellationToken) -> Arc<DefaultToolContext> {
    Arc::new(
        DefaultToolContext::new(
            uuid::Uuid::new_v4().to_string(),
            uuid::Uuid::new_v4().to_string(),
        )
        .with_credentials(config.credentials())
        .with_cancellation_token(token),
    )
}

/// Write the result to stdout; error results map to a failing exit code
fn print_response(response: &ToolResponse) -> ExitCode {
    match &response.output {
        ToolOutput::Text { text } => println!("{}", text),
        ToolOutput::Json { value } => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            )
        }
        ToolOutput::File {
            mime_type,
            filename,
            size,
            ..
        } => println!(
            "[file {} {} bytes{}]",
            mime_type,
            size,
            filename
                .as_deref()
                .map(|name| format!(" {}", name))
                .unwrap_or_default()
        ),
        ToolOutput::ConfirmationRequired { message, .. } => println!("{}", message),
        ToolOutput::Partial { text, resume_token } => {
            println!("{}", text);
            println!("\nresumeToken: {}", resume_token);
        }
    }

    if let Some(usage) = &response.usage {
        println!("\nUsage: {}", usage);
    }
    for step in &response.next_steps {
        println!("Next: {}", step);
    }

    if response.is_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "opentool",
            "call",
            "getPet",
            "{\"petId\": 1}",
            "--spec",
            "pets.yaml",
            "--tag",
            "pets",
            "--tag",
            "store",
            "--confirm",
        ])
        .unwrap();

        assert_eq!(cli.spec.as_deref(), Some("pets.yaml"));
        assert_eq!(cli.tags, vec!["pets", "store"]);
        match cli.command {
            Commands::Call { tool, confirm, .. } => {
                assert_eq!(tool, "getPet");
                assert!(confirm);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_format_flag() {
        let cli = Cli::try_parse_from(["opentool", "--log-format", "json", "check", "--detailed"])
            .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Commands::Check { detailed: true }));
    }
}
