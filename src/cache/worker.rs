use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use crossbeam::channel::{select, tick, Receiver, Sender};
use log::{debug, warn};
use crate::cache::{now_ms, CacheState};
use crate::cache::item::CacheItem;

/// Starts `count` build workers. Each exits once every build sender is gone
/// and the queue is drained.
pub(crate) fn spawn_builders(
    count: usize,
    builds: Receiver<Arc<CacheItem>>,
    state: Arc<CacheState>,
    lru_tx: Sender<Arc<CacheItem>>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|_| {
            let builds = builds.clone();
            let state = state.clone();
            let lru_tx = lru_tx.clone();
            thread::spawn(move || build_worker(builds, state, lru_tx))
        })
        .collect()
}

fn build_worker(builds: Receiver<Arc<CacheItem>>, state: Arc<CacheState>, lru_tx: Sender<Arc<CacheItem>>) {
    while let Ok(item) = builds.recv() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| state.build(&item)));
        match outcome {
            Ok(Ok(true)) => {
                state.counters.completed();
                debug!("cache item {} built with {} ids", item.key, item.result().len());
                // maintenance thread is behind; track it from here
                if let Err(err) = lru_tx.try_send(item) {
                    state.track(&err.into_inner());
                }
            }
            Ok(Ok(false)) => debug!("cache item {} left the lookup before its build", item.key),
            Ok(Err(e)) => {
                state.counters.failed();
                warn!("cache build for {} failed: {}", item.key, e);
            }
            Err(_) => {
                state.counters.failed();
                state.discard(&item);
                warn!("cache build for {} panicked; entry discarded", item.key);
            }
        }
    }
}

/// Starts the maintenance thread: LRU insertion plus the periodic sweep.
pub(crate) fn spawn_maintenance(
    state: Arc<CacheState>,
    lru_rx: Receiver<Arc<CacheItem>>,
    shutdown: Receiver<()>,
    interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let ticker = tick(interval);
        loop {
            select! {
                recv(lru_rx) -> msg => match msg {
                    Ok(item) => state.track(&item),
                    Err(_) => break,
                },
                recv(ticker) -> _ => {
                    let evicted = state.sweep(now_ms());
                    if evicted > 0 {
                        debug!("cache sweep evicted {} items", evicted);
                    }
                },
                recv(shutdown) -> _ => break,
            }
        }
    })
}
