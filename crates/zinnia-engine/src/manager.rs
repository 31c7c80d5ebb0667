use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use zinnia_data::{Value, ValueMap};
use zinnia_node::{
  has_error, is_for_each_control, is_stop_signal, DefinitionStore, ExecutorRegistry,
  IterationScope, RunContext, ERROR_PORT,
};
use zinnia_workflow::Workflow;

use crate::error::EngineError;
use crate::inputs::assemble_input;
use crate::report::{IterationTag, NodeRecord, RunReport};

/// Engine tuning knobs.
pub struct EngineConfig {
  /// Concurrent node executions per run.
  pub concurrency: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { concurrency: 10 }
  }
}

/// How a scheduler scope ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
  Completed,
  Stopped,
  Cancelled,
}

/// A parsed loop-control marker from a `for_each` driver.
struct ForEachControl {
  driver_id: String,
  items: Vec<serde_json::Value>,
  stop_on_error: bool,
  iteration_delay: Duration,
}

impl ForEachControl {
  fn parse(node_id: &str, output: &ValueMap) -> Option<Self> {
    let items = output.get("array_data")?.as_array()?.clone();
    let stop_on_error = output
      .get("stop_on_error")
      .map(|v| v.is_truthy())
      .unwrap_or(true);
    let delay_ms = output
      .get("iteration_delay")
      .and_then(Value::as_f64)
      .unwrap_or(0.0)
      .max(0.0) as u64;
    let driver_id = output
      .get("node_id")
      .and_then(|v| v.as_str().map(str::to_string))
      .unwrap_or_else(|| node_id.to_string());

    Some(Self {
      driver_id,
      items,
      stop_on_error,
      iteration_delay: Duration::from_millis(delay_ms),
    })
  }
}

/// Mutable state of one scheduler scope.
struct ScopeState<'a> {
  results: &'a mut HashMap<String, ValueMap>,
  records: &'a mut Vec<NodeRecord>,
  executed: &'a mut HashSet<String>,
}

/// The workflow execution manager.
///
/// Owns the scheduling loop over a classified workflow: ready-set
/// computation, per-port input assembly, bounded-parallel dispatch, loop
/// expansion, and the stop/cancel paths.
pub struct ExecutionManager {
  workflow: Arc<Workflow>,
  registry: Arc<ExecutorRegistry>,
  definitions: Arc<DefinitionStore>,
  semaphore: Arc<Semaphore>,
}

impl ExecutionManager {
  pub fn new(
    workflow: Arc<Workflow>,
    registry: Arc<ExecutorRegistry>,
    definitions: Arc<DefinitionStore>,
    config: EngineConfig,
  ) -> Self {
    Self {
      workflow,
      registry,
      definitions,
      semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
    }
  }

  /// Execute the workflow to completion, stop signal, or cancellation.
  #[instrument(name = "workflow_run", skip(self, cancel))]
  pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport, EngineError> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let started = Instant::now();

    info!(
      execution_id = %execution_id,
      nodes = self.workflow.node_count(),
      executable = self.workflow.executable().len(),
      "workflow_started"
    );

    let mut results = HashMap::new();
    let mut records = Vec::new();
    let mut executed = HashSet::new();

    let flow = if let Some(repeater_id) = self.workflow.repeaters().first() {
      self
        .run_repeater(
          repeater_id,
          &execution_id,
          &mut results,
          &mut records,
          &mut executed,
          &cancel,
        )
        .await?
    } else {
      let mut state = ScopeState {
        results: &mut results,
        records: &mut records,
        executed: &mut executed,
      };
      self
        .run_scope(
          self.workflow.executable().to_vec(),
          &mut state,
          None,
          &execution_id,
          &cancel,
        )
        .await?
    };

    let report = RunReport {
      execution_id: execution_id.clone(),
      records,
      results,
      stopped: flow == Flow::Stopped,
      cancelled: flow == Flow::Cancelled,
      duration: started.elapsed(),
    };

    match flow {
      Flow::Cancelled => warn!(execution_id = %execution_id, "workflow_cancelled"),
      _ => info!(
        execution_id = %execution_id,
        executed = report.records.len(),
        errors = report.error_count(),
        duration_ms = report.duration.as_millis() as u64,
        "workflow_completed"
      ),
    }

    Ok(report)
  }

  /// Cycle the whole executable subset per the repeater's configuration.
  async fn run_repeater(
    &self,
    repeater_id: &str,
    execution_id: &str,
    results: &mut HashMap<String, ValueMap>,
    records: &mut Vec<NodeRecord>,
    executed: &mut HashSet<String>,
    cancel: &CancellationToken,
  ) -> Result<Flow, EngineError> {
    let repeater = self
      .workflow
      .get_node(repeater_id)
      .expect("repeater id comes from classification");
    let interval = Duration::from_millis(repeater.config_i64("interval", 0).max(0) as u64);
    let max_count = repeater.config_i64("count", 0).max(0) as u64;

    info!(
      execution_id,
      repeater_id,
      interval_ms = interval.as_millis() as u64,
      max_count,
      "repeater_mode"
    );

    let mut cycle = 0u64;
    loop {
      cycle += 1;
      info!(execution_id, cycle, "repeater_cycle_started");

      // Every cycle re-runs everything against fresh results.
      executed.clear();
      results.clear();

      let mut state = ScopeState {
        results,
        records,
        executed,
      };
      let flow = self
        .run_scope(
          self.workflow.executable().to_vec(),
          &mut state,
          None,
          execution_id,
          cancel,
        )
        .await?;
      if flow != Flow::Completed {
        return Ok(flow);
      }

      if max_count != 0 && cycle >= max_count {
        info!(execution_id, cycles = cycle, "repeater_finished");
        return Ok(Flow::Completed);
      }

      tokio::select! {
        _ = tokio::time::sleep(interval) => {}
        _ = cancel.cancelled() => return Ok(Flow::Cancelled),
      }
    }
  }

  /// Run the ready-set loop over one scope of nodes.
  ///
  /// Boxed because for-each expansion recurses into nested scopes.
  fn run_scope<'a>(
    &'a self,
    scope: Vec<String>,
    state: &'a mut ScopeState<'_>,
    iteration: Option<&'a IterationTag>,
    execution_id: &'a str,
    cancel: &'a CancellationToken,
  ) -> Pin<Box<dyn Future<Output = Result<Flow, EngineError>> + Send + 'a>> {
    Box::pin(async move {
      let mut remaining = scope;

      loop {
        if cancel.is_cancelled() {
          return Ok(Flow::Cancelled);
        }
        if remaining.is_empty() {
          return Ok(Flow::Completed);
        }

        let ready: Vec<String> = remaining
          .iter()
          .filter(|id| self.is_ready(id, state))
          .cloned()
          .collect();

        if ready.is_empty() {
          warn!(execution_id, remaining = ?remaining, "unreachable nodes, stopping scheduler");
          return Ok(Flow::Completed);
        }

        info!(execution_id, ready = ?ready, "executing ready set");

        // Nodes in one set see the same snapshot, not each other.
        let snapshot = Arc::new(state.results.clone());
        let mut handles = Vec::with_capacity(ready.len());

        for node_id in &ready {
          remaining.retain(|id| id != node_id);

          let node = self
            .workflow
            .get_node(node_id)
            .expect("scheduled ids come from the workflow")
            .clone();

          let assembled = match assemble_input(node_id, self.workflow.graph(), &snapshot) {
            Ok(assembled) => assembled,
            Err(missing) => {
              let mut output = ValueMap::new();
              output.insert(
                ERROR_PORT.to_string(),
                Value::Text(missing.message(node_id)),
              );
              error!(execution_id, node_id = %node_id, "input assembly failed");
              state.executed.insert(node_id.clone());
              state.results.insert(node_id.clone(), output.clone());
              state.records.push(NodeRecord {
                node_id: node_id.clone(),
                output,
                iteration: iteration.cloned(),
              });
              continue;
            }
          };

          let ctx = RunContext {
            results: snapshot.clone(),
            parent_node_id: assembled.parent_node_id,
            iteration: iteration.map(|tag| IterationScope {
              index: tag.index,
              item: tag.item.clone(),
            }),
          };

          let registry = self.registry.clone();
          let definitions = self.definitions.clone();
          let semaphore = self.semaphore.clone();
          let input = assembled.input;
          let task_node_id = node_id.clone();

          handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let node_def = definitions.get(&node.node_type).await;
            let output = registry.dispatch(&node, &node_def, input, &ctx).await;
            (task_node_id, output)
          }));
        }

        // Dropping a JoinHandle detaches its task; cancellation must abort
        // them so in-flight HTTP calls and sleeps stop too.
        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        let joined = tokio::select! {
          joined = futures::future::join_all(handles) => joined,
          _ = cancel.cancelled() => {
            warn!(execution_id, "cancelled during ready-set execution");
            for handle in abort_handles {
              handle.abort();
            }
            return Ok(Flow::Cancelled);
          }
        };

        for outcome in joined {
          let (node_id, output) = outcome.map_err(|e| EngineError::Join {
            message: e.to_string(),
          })?;
          state.executed.insert(node_id.clone());

          if is_for_each_control(&output) {
            match ForEachControl::parse(&node_id, &output) {
              Some(control) => {
                let downstream: Vec<String> = {
                  let closure = self.workflow.graph().downstream_closure(&control.driver_id);
                  remaining
                    .iter()
                    .filter(|id| closure.contains(*id))
                    .cloned()
                    .collect()
                };
                remaining.retain(|id| !downstream.contains(id));

                let flow = self
                  .expand_for_each(control, downstream, state, execution_id, cancel)
                  .await?;
                if flow != Flow::Completed {
                  return Ok(flow);
                }
              }
              None => {
                let mut failed = ValueMap::new();
                failed.insert(
                  ERROR_PORT.to_string(),
                  Value::Text("malformed for_each control result".to_string()),
                );
                state.results.insert(node_id.clone(), failed.clone());
                state.records.push(NodeRecord {
                  node_id,
                  output: failed,
                  iteration: iteration.cloned(),
                });
              }
            }
            continue;
          }

          let stop = is_stop_signal(&output);
          state.results.insert(node_id.clone(), output.clone());
          state.records.push(NodeRecord {
            node_id: node_id.clone(),
            output,
            iteration: iteration.cloned(),
          });

          if stop {
            info!(execution_id, node_id = %node_id, "execution stopped by node");
            return Ok(Flow::Stopped);
          }
        }
      }
    })
  }

  /// Run the downstream set once per array element.
  async fn expand_for_each(
    &self,
    control: ForEachControl,
    downstream: Vec<String>,
    state: &mut ScopeState<'_>,
    execution_id: &str,
    cancel: &CancellationToken,
  ) -> Result<Flow, EngineError> {
    let total = control.items.len();
    info!(
      execution_id,
      driver = %control.driver_id,
      items = total,
      downstream = downstream.len(),
      "for_each_started"
    );

    for (index, item) in control.items.iter().enumerate() {
      if cancel.is_cancelled() {
        return Ok(Flow::Cancelled);
      }

      let item_value = Value::from_json(item.clone());

      let mut iteration_output = ValueMap::new();
      iteration_output.insert("current_item".to_string(), item_value.clone());
      iteration_output.insert("current_index".to_string(), Value::Number(index as f64));
      iteration_output.insert("completed".to_string(), Value::Bool(false));
      state
        .results
        .insert(control.driver_id.clone(), iteration_output);

      // Iterations run against an overlay so outer results stay clean, and
      // the downstream set re-arms for every element.
      let mut overlay = state.results.clone();
      let mut scoped_executed: HashSet<String> = state
        .executed
        .iter()
        .filter(|id| !downstream.contains(*id))
        .cloned()
        .collect();
      let mut iteration_records = Vec::new();

      let tag = IterationTag {
        index,
        item: item_value,
        for_each_node: control.driver_id.clone(),
      };

      let mut scoped = ScopeState {
        results: &mut overlay,
        records: &mut iteration_records,
        executed: &mut scoped_executed,
      };
      let flow = self
        .run_scope(downstream.clone(), &mut scoped, Some(&tag), execution_id, cancel)
        .await?;

      let iteration_failed = iteration_records.iter().any(|r| has_error(&r.output));
      state.records.extend(iteration_records);

      match flow {
        Flow::Completed => {}
        other => return Ok(other),
      }

      if iteration_failed && control.stop_on_error {
        warn!(
          execution_id,
          driver = %control.driver_id,
          iteration = index + 1,
          "for_each stopping on error"
        );
        break;
      }

      if !control.iteration_delay.is_zero() && index + 1 < total {
        tokio::select! {
          _ = tokio::time::sleep(control.iteration_delay) => {}
          _ = cancel.cancelled() => return Ok(Flow::Cancelled),
        }
      }
    }

    let mut terminal = ValueMap::new();
    terminal.insert("current_item".to_string(), Value::Null);
    terminal.insert("current_index".to_string(), Value::Number(total as f64));
    terminal.insert("completed".to_string(), Value::Bool(true));
    state
      .results
      .insert(control.driver_id.clone(), terminal.clone());
    state.records.push(NodeRecord {
      node_id: control.driver_id.clone(),
      output: terminal,
      iteration: None,
    });

    info!(execution_id, driver = %control.driver_id, "for_each_completed");
    Ok(Flow::Completed)
  }

  /// A node is ready when every connected input port has at least one
  /// completed source.
  fn is_ready(&self, node_id: &str, state: &ScopeState<'_>) -> bool {
    let graph = self.workflow.graph();
    for port in graph.required_ports(node_id) {
      let satisfied = graph.incoming(node_id).any(|edge| {
        edge.to.port_name == port
          && (state.executed.contains(&edge.from.node_id)
            || state.results.contains_key(&edge.from.node_id))
      });
      if !satisfied {
        return false;
      }
    }
    true
  }
}
