use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use zinnia_client::{ProxyClient, Session, VfsClient};
use zinnia_config::WorkflowDef;
use zinnia_engine::{EngineConfig, ExecutionManager, RunReport};
use zinnia_executors::builtin_registry;
use zinnia_node::DefinitionStore;
use zinnia_workflow::Workflow;

/// Zinnia - a workflow execution engine over a remote virtual file system
#[derive(Parser)]
#[command(name = "zinnia")]
#[command(version, about, long_about = None)]
struct Cli {
  /// VFS path of the workflow JSON (e.g. /workflows/daily.json)
  workflow_path: String,

  /// Server base URL
  #[arg(default_value = "http://localhost:5000")]
  server_url: String,

  /// Session token sent as X-Session-Token on every request
  #[arg(long, env = "ZINNIA_SESSION_TOKEN", default_value = "", hide_env_values = true)]
  token: String,

  /// Maximum concurrent node executions
  #[arg(long, default_value_t = 10)]
  concurrency: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
  let cancel = CancellationToken::new();
  let signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      eprintln!("interrupt received, cancelling workflow");
      signal.cancel();
    }
  });

  let mut session =
    Session::new(&cli.server_url, &cli.token).context("failed to build http session")?;
  session.bind_cancellation(cancel.clone());
  let session = Arc::new(session);
  let vfs = Arc::new(VfsClient::new(session.clone()));
  let proxy = Arc::new(ProxyClient::new(session.clone()));

  eprintln!("Loading workflow from: {}", cli.workflow_path);
  let content = vfs
    .read(&cli.workflow_path)
    .await
    .with_context(|| format!("failed to load workflow: {}", cli.workflow_path))?;
  let def: WorkflowDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow: {}", cli.workflow_path))?;

  eprintln!(
    "Loaded workflow with {} nodes, {} connections",
    def.nodes.len(),
    def.connections.len()
  );

  // Node definitions drive classification; fetch one per distinct type.
  let store = Arc::new(DefinitionStore::new(vfs.clone()));
  let mut definitions = HashMap::new();
  for node in &def.nodes {
    if !definitions.contains_key(&node.node_type) {
      let definition = store.get(&node.node_type).await;
      definitions.insert(node.node_type.clone(), (*definition).clone());
    }
  }

  let node_types: HashMap<String, String> = def
    .nodes
    .iter()
    .map(|n| (n.id.clone(), n.node_type.clone()))
    .collect();
  let frontend_skipped: Vec<String> = def
    .nodes
    .iter()
    .filter(|n| {
      definitions
        .get(&n.node_type)
        .map(|d| d.is_frontend_only())
        .unwrap_or(false)
    })
    .map(|n| n.id.clone())
    .collect();

  let workflow =
    Arc::new(Workflow::classify(def, &definitions).context("failed to classify workflow")?);

  let registry = Arc::new(builtin_registry(session, vfs, proxy, store.clone()));
  let manager = ExecutionManager::new(
    workflow,
    registry,
    store,
    EngineConfig {
      concurrency: cli.concurrency,
    },
  );

  let report = manager
    .run(cancel)
    .await
    .context("workflow execution failed")?;

  print_summary(&report, &node_types, &frontend_skipped);
  Ok(())
}

fn print_summary(
  report: &RunReport,
  node_types: &HashMap<String, String>,
  frontend_skipped: &[String],
) {
  println!();
  println!("Execution Summary:");
  println!("{}", "=".repeat(50));

  for record in &report.records {
    let node_type = node_types
      .get(&record.node_id)
      .map(String::as_str)
      .unwrap_or("unknown");

    if let Some(error) = record.error_message() {
      println!("  ✗ {} ({}): {}", record.node_id, node_type, error);
    } else {
      let ports: Vec<&str> = record.output.keys().map(String::as_str).take(3).collect();
      let mut summary = ports.join(", ");
      if record.output.len() > 3 {
        summary.push_str(&format!(" (+{} more)", record.output.len() - 3));
      }
      println!("  ✓ {} ({}) → {}", record.node_id, node_type, summary);
    }
  }

  println!();
  println!(
    "Results: {} successful, {} errors",
    report.success_count(),
    report.error_count()
  );
  if report.stopped {
    println!("Run stopped early by a gate node.");
  }
  if report.cancelled {
    println!("Run cancelled; partial results above.");
  }
  for node_id in frontend_skipped {
    let node_type = node_types
      .get(node_id)
      .map(String::as_str)
      .unwrap_or("unknown");
    println!("  ⚡ {} ({}): frontend-only, skipped", node_id, node_type);
  }

  println!();
  println!("Execution Order:");
  for (i, record) in report.records.iter().enumerate() {
    let node_type = node_types
      .get(&record.node_id)
      .map(String::as_str)
      .unwrap_or("unknown");
    match &record.iteration {
      Some(tag) => println!(
        "  {:2}. {} ({}) [iteration {} of {}]",
        i + 1,
        record.node_id,
        node_type,
        tag.index + 1,
        tag.for_each_node
      ),
      None => println!("  {:2}. {} ({})", i + 1, record.node_id, node_type),
    }
  }

  println!(
    "\nCompleted in {:.2} seconds",
    report.duration.as_secs_f64()
  );
}
