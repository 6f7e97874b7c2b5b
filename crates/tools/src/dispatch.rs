//! Bounded concurrent dispatch of enabled tools.
//!
//! Every dispatched tool yields exactly one `(tool, outcome)` pair on the
//! results channel. Runners never touch the result bundle themselves.

use crate::r#trait::{RunContext, ToolCall};
use crate::registry::ToolRegistry;
use crate::ToolError;
use osintmaster_core::{ToolName, ToolOutcome};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default number of tools run at once.
pub const DEFAULT_WORKERS: usize = 5;

/// Sender half of the results channel.
pub type OutcomeTx = mpsc::Sender<(ToolName, ToolOutcome)>;

/// Dispatcher configuration.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Max tools running concurrently
    pub workers: NonZeroUsize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: NonZeroUsize::new(DEFAULT_WORKERS).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Runs enabled tools on a fixed-size worker pool.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(registry: Arc<ToolRegistry>, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    /// Run `tools` and send each outcome on `tx`.
    ///
    /// Tools disabled in the run configuration are ignored. Returns the tools
    /// actually dispatched, once every one of them has reported.
    pub async fn dispatch(&self, ctx: Arc<RunContext>, tools: &[ToolName], tx: OutcomeTx) -> Vec<ToolName> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers.get()));
        let mut set = JoinSet::new();
        let mut dispatched = Vec::new();

        for tool in tools.iter().copied() {
            if !ctx.config.is_enabled(tool) {
                debug!("[{}] disabled, not dispatching", tool);
                continue;
            }
            if dispatched.contains(&tool) {
                continue;
            }
            let proxy = ctx.config.proxy.pick(dispatched.len()).map(str::to_string);
            dispatched.push(tool);

            let ctx = ctx.clone();
            let registry = self.registry.clone();
            let semaphore = semaphore.clone();
            let tx = tx.clone();

            set.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => run_one(tool, ctx, registry, proxy).await,
                    Err(_) => ToolOutcome::failed("worker pool closed", None, Default::default()),
                };
                log_outcome(tool, &outcome);
                if tx.send((tool, outcome)).await.is_err() {
                    warn!("[{}] result receiver dropped", tool);
                }
            });
        }
        drop(tx);

        info!(
            "Dispatched {} tool(s) on {} worker(s)",
            dispatched.len(),
            self.config.workers
        );

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!("Dispatch task failed: {}", e);
            }
        }

        dispatched
    }
}

async fn run_one(
    tool: ToolName,
    ctx: Arc<RunContext>,
    registry: Arc<ToolRegistry>,
    proxy: Option<String>,
) -> ToolOutcome {
    let started = Instant::now();

    let Some(target) = ctx.identifier.for_kind(tool.descriptor().input).map(str::to_string) else {
        return ToolError::MissingIdentifier(tool.descriptor().input).into_outcome(started.elapsed());
    };
    let Some(runner) = registry.get(tool) else {
        return ToolError::UnknownTool(tool).into_outcome(started.elapsed());
    };

    let call = ToolCall {
        tool,
        target,
        settings: ctx.config.settings(tool),
        timeout: ctx.config.timeout(tool),
        proxy,
    };
    info!("[{}] starting", tool);

    // A panicking runner is contained in its own task.
    let handle = tokio::spawn(async move { runner.run(&ctx, &call).await });
    match handle.await {
        Ok(Ok(report)) => ToolOutcome::succeeded(report, started.elapsed()),
        Ok(Err(e)) => e.into_outcome(started.elapsed()),
        Err(join) => ToolError::Join(join.to_string()).into_outcome(started.elapsed()),
    }
}

fn log_outcome(tool: ToolName, outcome: &ToolOutcome) {
    match &outcome.error {
        None => info!("[{}] {} in {:?}", tool, outcome.state, outcome.duration),
        Some(e) => warn!("[{}] {}: {}", tool, outcome.state, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r#trait::ToolRunner;
    use async_trait::async_trait;
    use osintmaster_core::{Identifier, Layout, OutcomeState, RunConfig, ToolSettings};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Runner that sleeps briefly and tracks concurrency.
    struct ProbeRunner {
        tool: ToolName,
        calls: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
        behaviour: Behaviour,
    }

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    #[async_trait]
    impl ToolRunner for ProbeRunner {
        fn name(&self) -> ToolName {
            self.tool
        }

        async fn run(&self, _ctx: &RunContext, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.behaviour {
                Behaviour::Succeed => Ok(serde_json::json!({"target": call.target, "proxy": call.proxy})),
                Behaviour::Fail => Err(ToolError::NonZeroExit {
                    code: 1,
                    output: serde_json::json!({"stderr": "boom"}),
                }),
                Behaviour::Panic => panic!("runner exploded"),
            }
        }
    }

    struct Harness {
        registry: ToolRegistry,
        calls: HashMap<ToolName, Arc<AtomicUsize>>,
        in_flight: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    impl Harness {
        fn new(behaviours: &[(ToolName, Behaviour)]) -> Self {
            let in_flight = Arc::new(AtomicUsize::new(0));
            let max_seen = Arc::new(AtomicUsize::new(0));
            let mut registry = ToolRegistry::new();
            let mut calls = HashMap::new();
            for (tool, behaviour) in behaviours {
                let counter = Arc::new(AtomicUsize::new(0));
                calls.insert(*tool, counter.clone());
                registry.register(Arc::new(ProbeRunner {
                    tool: *tool,
                    calls: counter,
                    in_flight: in_flight.clone(),
                    max_seen: max_seen.clone(),
                    behaviour: *behaviour,
                }));
            }
            Self {
                registry,
                calls,
                in_flight,
                max_seen,
            }
        }

        fn calls(&self, tool: ToolName) -> usize {
            self.calls[&tool].load(Ordering::SeqCst)
        }
    }

    fn config(enabled: &[ToolName]) -> RunConfig {
        let tools = ToolName::ALL
            .into_iter()
            .map(|t| {
                (
                    t.as_str().to_string(),
                    ToolSettings {
                        enabled: enabled.contains(&t),
                        ..Default::default()
                    },
                )
            })
            .collect();
        RunConfig {
            tools,
            proxy: Default::default(),
        }
    }

    fn context(config: RunConfig, email: Option<&str>, username: Option<&str>) -> Arc<RunContext> {
        Arc::new(RunContext {
            identifier: Identifier::new(email.map(str::to_string), username.map(str::to_string)).unwrap(),
            config: Arc::new(config),
            layout: Layout::new("."),
            env: Default::default(),
        })
    }

    async fn run(
        harness: &Harness,
        ctx: Arc<RunContext>,
        workers: usize,
    ) -> (Vec<ToolName>, BTreeMap<ToolName, ToolOutcome>) {
        let dispatcher = Dispatcher::new(
            Arc::new(harness.registry.clone()),
            DispatchConfig {
                workers: NonZeroUsize::new(workers).unwrap(),
            },
        );
        let (tx, mut rx) = mpsc::channel(16);
        let tools = ToolName::ALL;
        let dispatched = dispatcher.dispatch(ctx, &tools, tx).await;

        let mut outcomes = BTreeMap::new();
        while let Some((tool, outcome)) = rx.recv().await {
            assert!(outcomes.insert(tool, outcome).is_none(), "duplicate outcome for {}", tool);
        }
        (dispatched, outcomes)
    }

    #[tokio::test]
    async fn test_disabled_tools_never_run() {
        let harness = Harness::new(&[
            (ToolName::Sherlock, Behaviour::Succeed),
            (ToolName::Maigret, Behaviour::Succeed),
        ]);
        let ctx = context(config(&[ToolName::Sherlock]), None, Some("alice"));

        let (dispatched, outcomes) = run(&harness, ctx, 3).await;

        assert_eq!(dispatched, vec![ToolName::Sherlock]);
        assert_eq!(harness.calls(ToolName::Sherlock), 1);
        assert_eq!(harness.calls(ToolName::Maigret), 0);
        assert!(!outcomes.contains_key(&ToolName::Maigret));
        assert_eq!(outcomes[&ToolName::Sherlock].state, OutcomeState::Succeeded);
        assert_eq!(outcomes[&ToolName::Sherlock].output.as_ref().unwrap()["target"], "alice");
    }

    #[tokio::test]
    async fn test_respects_worker_limit() {
        let tools = [
            ToolName::Sherlock,
            ToolName::Maigret,
            ToolName::WhatsMyName,
            ToolName::Blackbird,
        ];
        let behaviours: Vec<_> = tools.iter().map(|t| (*t, Behaviour::Succeed)).collect();
        let harness = Harness::new(&behaviours);
        let ctx = context(config(&tools), None, Some("alice"));

        let (dispatched, outcomes) = run(&harness, ctx, 2).await;

        assert_eq!(dispatched.len(), 4);
        assert_eq!(outcomes.len(), 4);
        assert_eq!(harness.max_seen.load(Ordering::SeqCst), 2);
        assert_eq!(harness.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failures_and_panics_do_not_cancel_siblings() {
        let harness = Harness::new(&[
            (ToolName::Sherlock, Behaviour::Fail),
            (ToolName::Maigret, Behaviour::Panic),
            (ToolName::Blackbird, Behaviour::Succeed),
        ]);
        let ctx = context(
            config(&[ToolName::Sherlock, ToolName::Maigret, ToolName::Blackbird]),
            None,
            Some("alice"),
        );

        let (dispatched, outcomes) = run(&harness, ctx, 3).await;

        assert_eq!(dispatched.len(), 3);
        assert_eq!(outcomes[&ToolName::Sherlock].state, OutcomeState::Failed);
        assert_eq!(
            outcomes[&ToolName::Sherlock].output,
            Some(serde_json::json!({"stderr": "boom"}))
        );
        assert_eq!(outcomes[&ToolName::Maigret].state, OutcomeState::Failed);
        assert!(outcomes[&ToolName::Maigret]
            .error
            .as_deref()
            .unwrap()
            .starts_with("runner task failed"));
        assert_eq!(outcomes[&ToolName::Blackbird].state, OutcomeState::Succeeded);
    }

    #[tokio::test]
    async fn test_email_tools_skipped_without_email() {
        let harness = Harness::new(&[
            (ToolName::Holehe, Behaviour::Succeed),
            (ToolName::Sherlock, Behaviour::Succeed),
        ]);
        let ctx = context(config(&[ToolName::Holehe, ToolName::Sherlock]), None, Some("alice"));

        let (dispatched, outcomes) = run(&harness, ctx, 2).await;

        assert_eq!(dispatched, vec![ToolName::Sherlock, ToolName::Holehe]);
        assert_eq!(outcomes[&ToolName::Holehe].state, OutcomeState::Skipped);
        assert_eq!(harness.calls(ToolName::Holehe), 0);
    }

    #[tokio::test]
    async fn test_unregistered_tool_fails() {
        let harness = Harness::new(&[]);
        let ctx = context(config(&[ToolName::Blackbird]), None, Some("alice"));

        let (_, outcomes) = run(&harness, ctx, 1).await;

        assert_eq!(outcomes[&ToolName::Blackbird].state, OutcomeState::Failed);
    }

    #[tokio::test]
    async fn test_proxies_assigned_round_robin() {
        let harness = Harness::new(&[
            (ToolName::Sherlock, Behaviour::Succeed),
            (ToolName::Maigret, Behaviour::Succeed),
            (ToolName::Blackbird, Behaviour::Succeed),
        ]);
        let mut cfg = config(&[ToolName::Sherlock, ToolName::Maigret, ToolName::Blackbird]);
        cfg.proxy.enabled = true;
        cfg.proxy.list = vec!["http://p1".to_string(), "http://p2".to_string()];
        let ctx = context(cfg, None, Some("alice"));

        let (_, outcomes) = run(&harness, ctx, 3).await;

        let proxy = |t: ToolName| outcomes[&t].output.as_ref().unwrap()["proxy"].clone();
        assert_eq!(proxy(ToolName::Sherlock), "http://p1");
        assert_eq!(proxy(ToolName::Maigret), "http://p2");
        assert_eq!(proxy(ToolName::Blackbird), "http://p1");
    }
}
