//! Pipeline executor: wires stages with bounded channels and runs them.
//!
//! One runner thread per stage. Stage *i* reads the edge written by stage
//! *i-1* (or the source) and writes the edge read by stage *i+1* (or the
//! sink). The calling thread feeds the source while a dedicated thread drains
//! the sink, so a slow consumer never deadlocks the feeder.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;

use crate::channel::{self, EdgeCounters, EdgeStats, Inbox, Outbox};
use crate::error::{PipelineError, SourceError};
use crate::progress::{SharedProgress, fmt_num};
use crate::shutdown::shutdown_flag;

/// Default slots per inter-stage channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// A unit of work in the pipeline.
///
/// `run` consumes `input` until it is exhausted and emits through `output`.
/// The output edge closes when the last `Outbox` clone is dropped, so a stage
/// that hands clones to worker threads must join them before returning.
pub trait Stage: Send + Sync {
    /// Short name used for thread names, logs and edge labels
    fn name(&self) -> &str;

    fn run(&self, input: Inbox, output: Outbox);
}

/// Stage backed by a closure
pub struct FnStage<F> {
    name: String,
    f: F,
}

impl<F> Stage for FnStage<F>
where
    F: Fn(Inbox, Outbox) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: Inbox, output: Outbox) {
        (self.f)(input, output)
    }
}

/// Wrap a closure as a named stage.
pub fn stage_fn<F>(name: impl Into<String>, f: F) -> FnStage<F>
where
    F: Fn(Inbox, Outbox) + Send + Sync,
{
    FnStage {
        name: name.into(),
        f,
    }
}

/// Executor settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Slots per bounded channel
    pub channel_capacity: usize,
    /// Pause between starting successive stage runners (keeps debug logs readable)
    pub stagger: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            stagger: Duration::ZERO,
        }
    }
}

/// Result of a completed run
#[derive(Debug)]
pub struct RunReport {
    /// Items drained from the last stage
    pub output: Vec<String>,
    /// Accounting per edge, source edge first
    pub edges: Vec<EdgeStats>,
    pub elapsed: Duration,
}

impl RunReport {
    /// The single combined item, if the sink received exactly one
    pub fn digest(&self) -> Option<&str> {
        match self.output.as_slice() {
            [one] => Some(one),
            _ => None,
        }
    }

    /// Items fed by the source
    pub fn items_in(&self) -> usize {
        self.edges.first().map_or(0, |e| e.sent)
    }

    /// One-line summary: items in, items out, elapsed
    pub fn summary(&self) -> String {
        format!(
            "{} items in, {} out in {:.2}s",
            fmt_num(self.items_in()),
            fmt_num(self.output.len()),
            self.elapsed.as_secs_f64()
        )
    }

    pub fn log(&self) {
        log::info!("=== Pipeline Summary ===");
        log::info!(
            "Items: {} in, {} out",
            fmt_num(self.items_in()),
            fmt_num(self.output.len())
        );
        for edge in &self.edges {
            log::debug!(
                "{}: sent {}, received {}, rejected {}",
                edge.name,
                edge.sent,
                edge.received,
                edge.rejected
            );
        }
        log::info!("Time: {:.2}s", self.elapsed.as_secs_f64());
    }
}

/// An ordered, non-empty list of stages plus executor settings.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    config: PipelineConfig,
    progress: Option<SharedProgress>,
    shutdown: &'static AtomicBool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("Pipeline")
            .field("stages", &names)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validate and build a pipeline. Fails on an empty stage list or a
    /// zero channel capacity.
    pub fn new(
        stages: Vec<Box<dyn Stage>>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        if stages.is_empty() {
            return Err(PipelineError::NoStages);
        }
        if config.channel_capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "channel_capacity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            stages,
            config,
            progress: None,
            shutdown: shutdown_flag(),
        })
    }

    /// Show one status line per stage
    pub fn with_progress(mut self, progress: SharedProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Watch `flag` instead of the process-wide shutdown flag
    pub fn with_shutdown_flag(mut self, flag: &'static AtomicBool) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Obtain the source items first, then run. A failing `open` returns
    /// [`PipelineError::Source`] before any stage is started.
    pub fn run_from<T, E, F>(&self, open: F) -> Result<RunReport, PipelineError>
    where
        F: FnOnce() -> Result<Vec<T>, E>,
        E: Into<SourceError>,
        T: ToString,
    {
        let items = open().map_err(|e| PipelineError::Source(e.into()))?;
        self.run(items)
    }

    /// Run every stage to completion over `items`.
    ///
    /// Returns once all runners have terminated. Fails if a runner panicked
    /// or if any edge ended with unconsumed items.
    pub fn run<I>(&self, items: I) -> Result<RunReport, PipelineError>
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let start = Instant::now();
        let capacity = self.config.channel_capacity;
        let counters: Vec<Arc<EdgeCounters>> = (0..=self.stages.len())
            .map(|_| Arc::new(EdgeCounters::default()))
            .collect();

        let (source, mut upstream) =
            channel::edge(capacity, counters[0].clone(), ProgressBar::hidden());
        let mut wiring = Vec::with_capacity(self.stages.len());
        for (stage, edge_counters) in self.stages.iter().zip(&counters[1..]) {
            let pb = self.status_line(stage.name());
            let (output, next) = channel::edge(capacity, edge_counters.clone(), pb.clone());
            let input = std::mem::replace(&mut upstream, next);
            wiring.push((stage.as_ref(), input, output, pb));
        }
        let sink = upstream;

        let (output, spawn_error, panicked) = thread::scope(|s| {
            let drain = thread::Builder::new()
                .name("pipeline-sink".into())
                .spawn_scoped(s, move || sink.collect::<Vec<String>>());

            let mut runners = Vec::with_capacity(wiring.len());
            let mut spawn_error = None;
            for (idx, (stage, input, output, pb)) in wiring.into_iter().enumerate() {
                if idx > 0 && !self.config.stagger.is_zero() {
                    thread::sleep(self.config.stagger);
                }
                let name = stage.name();
                let spawned = thread::Builder::new()
                    .name(format!("stage-{name}"))
                    .spawn_scoped(s, move || {
                        log::debug!("{name}: started");
                        stage.run(input, output);
                        pb.finish_with_message("done");
                        log::debug!("{name}: finished");
                    });
                match spawned {
                    Ok(handle) => runners.push((name, handle)),
                    Err(e) => {
                        log::error!("{name}: failed to start: {e}");
                        spawn_error = Some(e);
                        break;
                    }
                }
            }

            if spawn_error.is_none() {
                self.feed(source, items);
            } else {
                drop(source);
            }

            let mut panicked = None;
            for (name, handle) in runners {
                if handle.join().is_err() {
                    log::error!("{name}: runner panicked");
                    panicked.get_or_insert_with(|| name.to_string());
                }
            }
            let output = match drain {
                Ok(handle) => handle.join().unwrap_or_default(),
                Err(e) => {
                    spawn_error.get_or_insert(e);
                    Vec::new()
                }
            };
            (output, spawn_error, panicked)
        });

        if let Some(e) = spawn_error {
            return Err(PipelineError::Spawn(e));
        }
        if let Some(stage) = panicked {
            return Err(PipelineError::StagePanicked { stage });
        }

        let edges: Vec<EdgeStats> = counters
            .iter()
            .enumerate()
            .map(|(i, c)| c.snapshot(self.edge_name(i)))
            .collect();
        if let Some(edge) = edges.iter().find(|e| e.lost() > 0) {
            log::error!("{}: {} items lost", edge.name, edge.lost());
            return Err(PipelineError::ItemsLost {
                edge: edge.name.clone(),
                lost: edge.lost(),
            });
        }

        let report = RunReport {
            output,
            edges,
            elapsed: start.elapsed(),
        };
        report.log();
        Ok(report)
    }

    /// Push source items into the first edge, then close it.
    fn feed<I>(&self, source: Outbox, items: I)
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let mut refused = 0usize;
        for item in items {
            if self.shutdown.load(Ordering::Relaxed) {
                log::warn!("Shutdown requested, no more items fed");
                break;
            }
            if source.send(item.to_string()).is_err() {
                refused += 1;
            }
        }
        if refused > 0 {
            log::warn!("source: {refused} items refused by first stage");
        }
    }

    /// Label of edge `i`: 0 is source → first stage, last is final stage → sink
    fn edge_name(&self, i: usize) -> String {
        let from = if i == 0 {
            "source"
        } else {
            self.stages[i - 1].name()
        };
        let to = self.stages.get(i).map_or("sink", |s| s.name());
        format!("{from} -> {to}")
    }

    fn status_line(&self, name: &str) -> ProgressBar {
        match &self.progress {
            Some(progress) => progress.stage_line(name),
            None => ProgressBar::hidden(),
        }
    }
}
