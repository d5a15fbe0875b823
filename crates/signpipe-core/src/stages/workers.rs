//! Bounded per-item workers shared by the hashing stages
//!
//! The runner takes a permit before pulling the next item into a worker, so at
//! most `max_in_flight` items are being signed at once. While all permits are
//! out the runner stops reading its input, which lets the bounded channel
//! upstream fill and block the previous stage.

use std::thread;

use crate::channel::{Inbox, Outbox};
use crate::semaphore::Semaphore;

/// Default number of items a hashing stage signs at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Run `work` on every input item in its own named worker thread, with at most
/// `max_in_flight` workers alive. Returns after every worker has finished.
///
/// Workers are named `{stage}-{n}` where `n` is the item's arrival index. If
/// the OS refuses a thread, the item is signed on the runner thread instead.
pub(crate) fn fan_out<F>(
    stage: &str,
    max_in_flight: usize,
    input: Inbox,
    output: &Outbox,
    work: F,
) where
    F: Fn(&str) -> String + Sync,
{
    let limit = Semaphore::new(max_in_flight.max(1));
    let work = &work;

    thread::scope(|s| {
        for (n, data) in input.enumerate() {
            let permit = limit.acquire();
            let worker = {
                let output = output.clone();
                let data = data.clone();
                move || {
                    let _permit = permit;
                    emit(stage, &data, work(&data), &output);
                }
            };
            let spawned = thread::Builder::new()
                .name(format!("{stage}-{n}"))
                .spawn_scoped(s, worker);
            if let Err(e) = spawned {
                log::error!("{stage}: failed to spawn worker for {data}: {e}, signing inline");
                emit(stage, &data, work(&data), output);
            }
        }
    });
}

fn emit(stage: &str, data: &str, result: String, output: &Outbox) {
    log::debug!("{data} {stage} result {result}");
    if output.send(result).is_err() {
        log::warn!("{data}: {stage} result dropped, downstream closed");
    }
}

/// Run `f` on a named helper thread while `g` runs on the current one.
///
/// If the helper cannot be spawned, `f` runs inline after `g`. A panic in the
/// helper is resumed on the caller.
pub(crate) fn join_pair<A, B, FA, FB>(helper: String, f: FA, g: FB) -> (A, B)
where
    A: Send,
    FA: Fn() -> A + Sync,
    FB: FnOnce() -> B,
{
    let f = &f;
    thread::scope(|s| {
        let spawned = thread::Builder::new()
            .name(helper.clone())
            .spawn_scoped(s, move || f());
        match spawned {
            Ok(handle) => {
                let b = g();
                match handle.join() {
                    Ok(a) => (a, b),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            Err(e) => {
                log::error!("{helper}: failed to spawn, running inline: {e}");
                let b = g();
                (f(), b)
            }
        }
    })
}

/// Name of the calling thread, or `fallback` if it has none
pub(crate) fn current_name(fallback: &str) -> String {
    thread::current().name().unwrap_or(fallback).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::pipeline::{Pipeline, PipelineConfig, Stage, stage_fn};

    #[test]
    fn live_workers_never_exceed_limit() {
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (l, p) = (live.clone(), peak.clone());
        let bounded = stage_fn("bounded", move |input, output| {
            fan_out("bounded", 3, input, &output, |data| {
                let now = l.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                l.fetch_sub(1, Ordering::SeqCst);
                data.to_string()
            });
        });
        let stages: Vec<Box<dyn Stage>> = vec![Box::new(bounded)];
        let pipeline = Pipeline::new(stages, PipelineConfig::default()).unwrap();

        let report = pipeline.run(0..40).unwrap();
        assert_eq!(report.output.len(), 40);
        let peak = peak.load(Ordering::SeqCst);
        assert!((2..=3).contains(&peak), "peak live workers {peak}");
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn workers_named_after_stage_and_index() {
        let names = Arc::new(Mutex::new(BTreeSet::new()));
        let seen = names.clone();
        let tagged = stage_fn("tagged", move |input, output| {
            fan_out("tagged", 2, input, &output, |data| {
                let name = thread::current().name().map(String::from);
                seen.lock().unwrap().extend(name);
                data.to_string()
            });
        });
        let stages: Vec<Box<dyn Stage>> = vec![Box::new(tagged)];
        let pipeline = Pipeline::new(stages, PipelineConfig::default()).unwrap();
        pipeline.run(0..5).unwrap();

        let want: BTreeSet<String> = (0..5).map(|n| format!("tagged-{n}")).collect();
        assert_eq!(*names.lock().unwrap(), want);
    }

    #[test]
    fn join_pair_runs_helper_on_named_thread() {
        let (helper, here) = join_pair(
            "pair.helper".to_string(),
            || thread::current().name().map(String::from),
            || 7,
        );
        assert_eq!(helper.as_deref(), Some("pair.helper"));
        assert_eq!(here, 7);
    }
}
