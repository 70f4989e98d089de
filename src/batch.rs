//! Bounded-concurrency batch runner with partial-failure aggregation.
//!
//! The runner uses a semaphore to cap how many item tasks are in flight.
//! Items are admitted in list order: the next one starts as soon as any
//! running item finishes, whatever order they finish in. A failing item never
//! stops its siblings; its error is captured and reported once the whole
//! batch has drained.
//!
//! # Example
//!
//! ```no_run
//! use leankit_client::batch::BatchDownloader;
//!
//! # async fn example() -> Result<(), leankit_client::Error> {
//! let downloader = BatchDownloader::new(10)?;
//! downloader
//!     .download_all(vec![1_u64, 2, 3], |id| async move {
//!         println!("fetching {id}");
//!         Ok(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::config::ConfigError;
use crate::constants::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY};
use crate::error::Error;

/// Runs per-item download tasks with at most `concurrency` in flight.
#[derive(Debug, Clone)]
pub struct BatchDownloader {
    concurrency: usize,
}

impl Default for BatchDownloader {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl BatchDownloader {
    /// Creates a runner with the given concurrency cap.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConcurrency`] outside 1-100.
    pub fn new(concurrency: usize) -> Result<Self, ConfigError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(ConfigError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self { concurrency })
    }

    /// Returns the configured concurrency cap.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs `task` for every item and waits for all of them.
    ///
    /// `task` is only invoked once a slot is free, so any work it does
    /// eagerly is also bounded by the cap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Batch`] with every captured per-item error when at
    /// least one item failed. A panicking item is captured as
    /// [`Error::TaskAborted`].
    #[instrument(skip(self, items, task), fields(items = items.len(), concurrency = self.concurrency))]
    pub async fn download_all<I, F, Fut>(&self, items: Vec<I>, task: F) -> Result<(), Error>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let total = items.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(total);

        info!("starting batch");

        for (index, item) in items.into_iter().enumerate() {
            // Blocks while `concurrency` items are in flight.
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| Error::Precondition("batch semaphore closed"))?;

            debug!(index, "admitting item");
            let future = task(item);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                future.await
            }));
        }

        let mut failures = Vec::new();
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(index, error = %e, "batch item failed");
                    failures.push(e);
                }
                Err(join_error) => {
                    warn!(index, error = %join_error, "batch item task aborted");
                    failures.push(Error::TaskAborted(join_error));
                }
            }
        }

        info!(
            total,
            failed = failures.len(),
            succeeded = total - failures.len(),
            "batch complete"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Batch { total, failures })
        }
    }
}
