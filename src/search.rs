//! Off-thread verse search.
//!
//! Each submitted query gets a new generation number. Results travel back over
//! a channel tagged with that number, and only results for the newest
//! generation are handed to the caller; anything older is dropped on receipt.
//! An in-flight scan is not interrupted, it simply loses.

use std::cell::Cell;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::corpus::Corpus;
use crate::models::Verse;

/// Handle for a submitted search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    pub generation: u64,
}

/// Results of one completed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub generation: u64,
    pub query: String,
    pub verses: Vec<Verse>,
}

/// Runs corpus searches on background threads and keeps only the latest.
///
/// The worker itself belongs to one thread; the searches it spawns share the
/// corpus through an `Arc`.
pub struct SearchWorker {
    corpus: Arc<Corpus>,
    generation: Cell<u64>,
    sender: Sender<SearchResults>,
    receiver: Receiver<SearchResults>,
}

impl SearchWorker {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            corpus,
            generation: Cell::new(0),
            sender,
            receiver,
        }
    }

    /// Generation of the most recently submitted search (0 before any).
    pub fn current_generation(&self) -> u64 {
        self.generation.get()
    }

    /// Starts searching for `query` in the background.
    ///
    /// Any earlier search still running becomes stale.
    pub fn submit(&self, query: &str) -> SearchTicket {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let corpus = Arc::clone(&self.corpus);
        let sender = self.sender.clone();
        let query = query.to_string();
        let job = move || {
            let verses = corpus.search(&query);
            // A closed channel means the worker is gone and nobody is waiting.
            let _ = sender.send(SearchResults {
                generation,
                query,
                verses,
            });
        };

        let spawned = thread::Builder::new()
            .name(format!("lamp-search-{generation}"))
            .spawn(job.clone());
        if let Err(err) = spawned {
            warn!(error = %err, "search thread unavailable, searching inline");
            job();
        }

        debug!(generation, "search submitted");
        SearchTicket { generation }
    }

    /// Returns the current search's results if they have arrived.
    pub fn try_recv_latest(&self) -> Option<SearchResults> {
        let mut latest = None;
        while let Ok(results) = self.receiver.try_recv() {
            if let Some(results) = self.keep_if_current(results) {
                latest = Some(results);
            }
        }
        latest
    }

    /// Waits up to `timeout` for the current search's results.
    pub fn recv_latest_timeout(&self, timeout: Duration) -> Option<SearchResults> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(results) => {
                    if let Some(results) = self.keep_if_current(results) {
                        return Some(results);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn keep_if_current(&self, results: SearchResults) -> Option<SearchResults> {
        if results.generation == self.generation.get() {
            Some(results)
        } else {
            debug!(
                stale = results.generation,
                current = self.generation.get(),
                "discarding stale search results"
            );
            None
        }
    }
}
