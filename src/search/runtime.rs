//! Event loop around [`TypeAheadSearch`].
//!
//! The state machine lives on the caller's thread and is only ever mutated
//! there. Lookups run on short-lived worker threads against the shared
//! catalog; each completion comes back as a [`SearchMsg`] over a channel and
//! is applied by [`SearchRuntime::pump`] / [`SearchRuntime::settle`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, warn};

use super::typeahead::{LookupRequest, SearchCmd, SearchMsg, SearchSettings, TypeAheadSearch};
use crate::catalog::Catalog;
use crate::route::Navigator;

/// How [`SearchCmd::Lookup`] is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupExecutor {
    /// One worker thread per lookup.
    #[default]
    Threaded,
    /// Run the query on the calling thread; the completion is still queued
    /// and only applied on the next pump.
    Inline,
}

pub struct SearchRuntime {
    search: TypeAheadSearch,
    catalog: Arc<dyn Catalog>,
    navigator: Arc<dyn Navigator>,
    executor: LookupExecutor,
    tx: Sender<SearchMsg>,
    rx: Receiver<SearchMsg>,
    in_flight: usize,
}

impl SearchRuntime {
    pub fn new(
        settings: SearchSettings,
        catalog: Arc<dyn Catalog>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (tx, rx) = unbounded();
        Self {
            search: TypeAheadSearch::new(settings),
            catalog,
            navigator,
            executor: LookupExecutor::default(),
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn with_executor(mut self, executor: LookupExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn state(&self) -> &TypeAheadSearch {
        &self.search
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Apply one message and run whatever effect it asks for.
    pub fn dispatch(&mut self, msg: SearchMsg) {
        let cmd = self.search.update(msg);
        self.run(cmd);
    }

    fn run(&mut self, cmd: SearchCmd) {
        match cmd {
            SearchCmd::None => {}
            SearchCmd::Navigate(route) => self.navigator.navigate(route),
            SearchCmd::Lookup(req) => self.spawn_lookup(req),
        }
    }

    fn spawn_lookup(&mut self, req: LookupRequest) {
        self.in_flight += 1;
        match self.executor {
            LookupExecutor::Inline => {
                let msg = req.execute(self.catalog.as_ref());
                // The receiver lives in `self`, so this cannot fail.
                let _ = self.tx.send(msg);
            }
            LookupExecutor::Threaded => {
                let catalog = Arc::clone(&self.catalog);
                let tx = self.tx.clone();
                let fallback = req.clone();
                let spawned = std::thread::Builder::new()
                    .name(format!("profsearch-lookup-{}", req.seq))
                    .spawn(move || {
                        let msg = req.execute(catalog.as_ref());
                        let _ = tx.send(msg);
                    });
                if let Err(e) = spawned {
                    warn!(seq = fallback.seq, error = %e, "could not spawn lookup thread");
                    let _ = self
                        .tx
                        .send(fallback.failed(format!("could not spawn lookup: {e}")));
                }
            }
        }
    }

    fn complete(&mut self, msg: SearchMsg) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.dispatch(msg);
    }

    /// Apply every completion that has already arrived. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.rx.try_recv() {
            self.complete(msg);
            applied += 1;
        }
        applied
    }

    /// Wait for all outstanding lookups, applying them as they land.
    ///
    /// Returns `false` if `timeout` elapsed first; late completions stay queued
    /// for a later pump.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(msg) => self.complete(msg),
                Err(RecvTimeoutError::Timeout) => {
                    debug!(in_flight = self.in_flight, "settle timed out");
                    return false;
                }
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }
}
