mod journal;

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flowline_config::WorkflowDef;
use flowline_engine::{EngineConfig, WorkflowEngine};
use flowline_workflow::Workflow;

use crate::journal::JournalStore;

/// Flowline - a sequential workflow engine with durable steps
#[derive(Parser)]
#[command(name = "flowline")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.flowline)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow. The trigger payload is read from stdin.
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Replay the steps a previous failed run completed
    #[arg(long)]
    resume: bool,
  },

  /// Print the order the workflow's nodes run in, with each node's neighbours
  Order {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".flowline"),
  };

  match cli.command {
    Some(Commands::Run {
      workflow_file,
      resume,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_workflow(&workflow_file, &data_dir, resume))?;
    }
    Some(Commands::Order { workflow_file }) => {
      print_order(&workflow_file)?;
    }
    None => {
      println!("flowline - use --help to see available commands");
    }
  }

  Ok(())
}

async fn run_workflow(workflow_file: &Path, data_dir: &Path, resume: bool) -> Result<()> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;
  let workflow = parse_workflow(&content, workflow_file)?;
  info!(workflow_id = %workflow.workflow_id, name = %workflow.name, "loaded workflow");

  let payload = read_payload_from_stdin()?;

  let store = JournalStore::new(data_dir);
  let journal = store.start_run(&workflow.workflow_id, resume).await?;
  if resume {
    info!(steps = journal.len(), "resuming from saved journal");
  }

  let config = EngineConfig::default().for_workflow(&workflow);
  let engine = WorkflowEngine::new(config).context("failed to create workflow engine")?;

  let (result, journal) = engine.resume(&workflow, payload, journal).await;
  match result {
    Ok(result) => {
      store.remove(&workflow.workflow_id).await?;
      info!(
        execution_id = %result.execution_id,
        nodes_executed = result.nodes_executed.len(),
        "execution completed"
      );
      println!("{}", serde_json::to_string_pretty(&result.context)?);
      Ok(())
    }
    Err(e) => {
      if !journal.is_empty() {
        let path = store.save(&workflow.workflow_id, &journal).await?;
        warn!(
          path = %path.display(),
          "saved journal; rerun with --resume to continue"
        );
      }
      Err(anyhow::Error::new(e).context("workflow execution failed"))
    }
  }
}

fn print_order(workflow_file: &Path) -> Result<()> {
  let content = std::fs::read_to_string(workflow_file)
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;
  let workflow = parse_workflow(&content, workflow_file)?;

  for line in order_lines(&workflow)? {
    println!("{}", line);
  }
  Ok(())
}

/// One tab-separated line per node in execution order: id, type, then notes
/// on where the node sits in the graph.
fn order_lines(workflow: &Workflow) -> Result<Vec<String>> {
  let order = workflow
    .execution_order()
    .context("failed to order workflow")?;
  let graph = workflow.graph();

  let lines = order
    .into_iter()
    .map(|node| {
      let id = node.id.as_str();
      let mut notes = Vec::new();
      if graph.is_isolated(id) {
        notes.push("isolated".to_string());
      } else if graph.entry_points().iter().any(|entry| entry == id) {
        notes.push("entry".to_string());
      }
      let upstream = graph.upstream(id);
      if graph.is_join_point(id) {
        notes.push(format!("join after {}", upstream.join(", ")));
      } else if !upstream.is_empty() {
        notes.push(format!("after {}", upstream.join(", ")));
      }
      let downstream = graph.downstream(id);
      if !downstream.is_empty() {
        notes.push(format!("before {}", downstream.join(", ")));
      }

      let mut line = format!("{}\t{}", node.id, node.node_type);
      if !notes.is_empty() {
        line.push('\t');
        line.push_str(&notes.join("; "));
      }
      line
    })
    .collect();
  Ok(lines)
}

fn parse_workflow(content: &str, workflow_file: &Path) -> Result<Workflow> {
  let def: WorkflowDef = serde_json::from_str(content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;
  Workflow::from_def(def)
    .with_context(|| format!("invalid workflow: {}", workflow_file.display()))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}
