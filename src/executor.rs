//! The fan-out/fan-in engine behind [`try_map`].
//!
//! One dispatcher feeds index-tagged inputs to a set of worker threads over a
//! rendezvous channel. Each worker routes its outcome to one of two collector
//! threads; each collector is the sole owner and sole mutator of the
//! structure it writes (output vector, error map), so no locking is needed on
//! either. The caller blocks on a counted completion barrier, one signal per
//! input item, and only reads the structures after joining the collectors.

use std::sync::mpsc::{channel, sync_channel, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::error::ErrMap;

/// Concurrency configuration for [`try_map_with`].
///
/// The default strategy spawns one worker thread per input item, mirroring
/// the "process every item concurrently" contract. That scales linearly with
/// input size; for large batches use a bounded pool instead:
///
/// ```
/// use parmap::{try_map_with, MapConfig};
///
/// let inputs: Vec<u64> = (0..1000).collect();
/// let (squares, failed) =
///     try_map_with(inputs, |n| Ok::<_, String>(n * n), MapConfig::bounded());
/// assert_eq!(squares.len(), 1000);
/// assert!(failed.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Maximum number of worker threads. `None` spawns one worker per input
    /// item; `Some(n)` runs a fixed pool of `n` workers pulling from the
    /// shared input feed. Either way the worker count never exceeds the
    /// input length.
    pub max_workers: Option<usize>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self { max_workers: None }
    }
}

impl MapConfig {
    /// Fixed pool sized to the number of logical CPUs.
    pub fn bounded() -> Self {
        Self {
            max_workers: Some(num_cpus::get()),
        }
    }

    /// Fixed pool of exactly `workers` threads (minimum 1).
    pub fn with_workers(workers: usize) -> Self {
        Self {
            max_workers: Some(workers.max(1)),
        }
    }
}

/// An input or outcome paired with its position in the original sequence.
struct Tagged<T> {
    index: usize,
    value: T,
}

/// Applies `transform` to every input concurrently, preserving input order.
///
/// Returns the output vector, always exactly as long as `inputs`, together
/// with `None` when every item succeeded or `Some(ErrMap)` describing the
/// failures otherwise. Slots whose item failed hold `O::default()`.
///
/// One worker thread is spawned per input item; see [`try_map_with`] and
/// [`MapConfig`] for a bounded alternative. All threads are torn down before
/// the call returns. There is no timeout and no cancellation: a `transform`
/// that never returns hangs the call.
///
/// `transform` may run concurrently against many items at once, so it must
/// not rely on caller-visible shared mutable state.
///
/// ```
/// use parmap::try_map;
///
/// let (doubled, failed) = try_map(vec![1, 2, 3], |n| Ok::<_, String>(n * 2));
/// assert_eq!(doubled, vec![2, 4, 6]);
/// assert!(failed.is_none());
/// ```
///
/// Failed items keep their slot, and the error map reports them by index:
///
/// ```
/// use parmap::try_map;
///
/// let (out, failed) = try_map(vec![1, 2, 3], |n| {
///     if n == 2 {
///         Err(format!("bad {n}"))
///     } else {
///         Ok(n)
///     }
/// });
/// assert_eq!(out, vec![1, 0, 3]);
/// assert_eq!(failed.unwrap().join(), "1: bad 2");
/// ```
pub fn try_map<I, O, E, F>(inputs: Vec<I>, transform: F) -> (Vec<O>, Option<ErrMap<E>>)
where
    I: Send,
    O: Default + Send,
    E: Send,
    F: Fn(I) -> Result<O, E> + Sync,
{
    try_map_with(inputs, transform, MapConfig::default())
}

/// Like [`try_map`], with an explicit concurrency strategy.
pub fn try_map_with<I, O, E, F>(
    inputs: Vec<I>,
    transform: F,
    config: MapConfig,
) -> (Vec<O>, Option<ErrMap<E>>)
where
    I: Send,
    O: Default + Send,
    E: Send,
    F: Fn(I) -> Result<O, E> + Sync,
{
    let len = inputs.len();
    if len == 0 {
        return (Vec::new(), None);
    }

    let workers = config.max_workers.map_or(len, |n| n.clamp(1, len));
    tracing::debug!(items = len, workers, "starting parallel map");

    thread::scope(|scope| {
        // Rendezvous channels: a send completes only once a receiver has
        // taken the item, so a worker's emission is observed by its collector
        // before the matching completion signal can exist.
        let (input_tx, input_rx) = sync_channel::<Tagged<I>>(0);
        let (result_tx, result_rx) = sync_channel::<Tagged<O>>(0);
        let (err_tx, err_rx) = sync_channel::<Tagged<E>>(0);

        // Completion signals are only counted, never answered. An
        // asynchronous channel keeps a collector from blocking on the signal
        // send while the dispatcher is still feeding a bounded pool.
        let (done_tx, done_rx) = channel::<()>();

        // The input receiver is shared by every worker.
        let input_rx = Arc::new(Mutex::new(input_rx));

        let result_collector = scope.spawn({
            let done_tx = done_tx.clone();
            move || run_result_collector(len, result_rx, done_tx)
        });
        let error_collector = scope.spawn(move || run_error_collector(err_rx, done_tx));

        for _ in 0..workers {
            let feed = Arc::clone(&input_rx);
            let result_tx = result_tx.clone();
            let err_tx = err_tx.clone();
            let transform = &transform;
            scope.spawn(move || run_worker(feed, transform, result_tx, err_tx));
        }
        // The workers now hold the only live senders the collectors wait on.
        drop(result_tx);
        drop(err_tx);

        for (index, value) in inputs.into_iter().enumerate() {
            input_tx
                .send(Tagged { index, value })
                .expect("worker set exited before the feed was drained");
        }
        // Closing the feed tells idle workers to exit.
        drop(input_tx);

        // Completion barrier: exactly one signal arrives per input item, and
        // each signal causally follows the corresponding collector write.
        for _ in 0..len {
            done_rx
                .recv()
                .expect("collectors exited before all items completed");
        }

        let results = result_collector
            .join()
            .expect("result collector panicked");
        let failures = error_collector.join().expect("error collector panicked");

        if failures.is_empty() {
            (results, None)
        } else {
            tracing::debug!(failed = failures.len(), "parallel map recorded failures");
            (results, Some(failures))
        }
    })
}

/// Worker loop: pull one tagged input at a time, transform it exactly once,
/// and route the outcome to exactly one collector. Exits when the feed
/// closes.
fn run_worker<I, O, E, F>(
    feed: Arc<Mutex<Receiver<Tagged<I>>>>,
    transform: &F,
    result_tx: SyncSender<Tagged<O>>,
    err_tx: SyncSender<Tagged<E>>,
) where
    F: Fn(I) -> Result<O, E>,
{
    loop {
        // The lock is held across the blocking recv; that serializes item
        // pickup but never the transforms themselves, and the dispatcher is
        // always able to complete the rendezvous with whichever worker holds
        // the lock.
        let next = feed.lock().recv();
        let Ok(item) = next else {
            break;
        };
        let index = item.index;
        match transform(item.value) {
            Ok(value) => result_tx
                .send(Tagged { index, value })
                .expect("result collector exited early"),
            Err(error) => err_tx
                .send(Tagged {
                    index,
                    value: error,
                })
                .expect("error collector exited early"),
        }
    }
}

/// Result collector: sole owner of the output vector. Writes each success at
/// its tagged index, signals completion, and returns the vector once every
/// result sender has been dropped.
fn run_result_collector<O: Default>(
    len: usize,
    result_rx: Receiver<Tagged<O>>,
    done_tx: Sender<()>,
) -> Vec<O> {
    let mut output: Vec<O> = Vec::with_capacity(len);
    output.resize_with(len, O::default);

    while let Ok(item) = result_rx.recv() {
        output[item.index] = item.value;
        done_tx.send(()).expect("completion barrier went away");
    }

    output
}

/// Error collector: sole owner of the error map. Records each failure under
/// its tagged index, signals completion, and returns the map once every
/// error sender has been dropped.
fn run_error_collector<E>(err_rx: Receiver<Tagged<E>>, done_tx: Sender<()>) -> ErrMap<E> {
    let mut failures = ErrMap::new();

    while let Ok(item) = err_rx.recv() {
        failures.insert(item.index, item.value);
        done_tx.send(()).expect("completion barrier went away");
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_map_basic() {
        let (results, failed) = try_map(vec![1, 2, 3], |n| Ok::<_, String>(n * 2));
        assert_eq!(results, vec![2, 4, 6]);
        assert!(failed.is_none());
    }

    #[test]
    fn test_try_map_empty() {
        let (results, failed) = try_map(Vec::<i32>::new(), |n| Ok::<_, String>(n));
        assert!(results.is_empty());
        assert!(failed.is_none());
    }

    #[test]
    fn test_try_map_single_item() {
        let (results, failed) = try_map(vec![7], |n| Ok::<_, String>(n + 1));
        assert_eq!(results, vec![8]);
        assert!(failed.is_none());
    }

    #[test]
    fn test_try_map_collects_all_failures() {
        let (results, failed) = try_map(vec![1, 2, 3, 4], |n| {
            if n % 2 == 0 {
                Err(format!("even {n}"))
            } else {
                Ok(n * 10)
            }
        });

        assert_eq!(results, vec![10, 0, 30, 0]);
        let failed = failed.expect("two items should have failed");
        assert_eq!(failed.len(), 2);
        assert_eq!(failed.join(), "1: even 2\n3: even 4");
    }

    #[test]
    fn test_try_map_all_failures() {
        let (results, failed) = try_map(vec![1, 2], |n: i32| Err::<i32, _>(format!("no {n}")));
        assert_eq!(results, vec![0, 0]);
        assert_eq!(failed.expect("all failed").len(), 2);
    }

    #[test]
    fn test_bounded_pool_preserves_order() {
        let inputs: Vec<usize> = (0..100).collect();
        let (results, failed) =
            try_map_with(inputs, |n| Ok::<_, String>(n + 1), MapConfig::with_workers(3));
        assert_eq!(results, (1..=100).collect::<Vec<_>>());
        assert!(failed.is_none());
    }

    #[test]
    fn test_zero_workers_clamped_to_one() {
        let config = MapConfig {
            max_workers: Some(0),
        };
        let (results, failed) = try_map_with(vec![1, 2, 3], |n| Ok::<_, String>(n), config);
        assert_eq!(results, vec![1, 2, 3]);
        assert!(failed.is_none());
    }

    #[test]
    fn test_pool_larger_than_input_is_capped() {
        let (results, failed) = try_map_with(
            vec![5, 6],
            |n| Ok::<_, String>(n),
            MapConfig::with_workers(64),
        );
        assert_eq!(results, vec![5, 6]);
        assert!(failed.is_none());
    }
}
