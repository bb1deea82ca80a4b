// DocScan - core/blocking.rs
//
// Bridge from the synchronous callers (worker threads, the CLI, tests) to
// the async waits on tokio's sync primitives.

use std::future::Future;
use std::time::Duration;

/// Drive `future` to completion on a throwaway current-thread runtime,
/// giving up after `timeout`.
///
/// Must not be called from inside a tokio runtime.
pub(crate) fn block_on_timeout<F: Future>(timeout: Duration, future: F) -> Option<F::Output> {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Cannot build runtime for a blocking wait");
            return None;
        }
    };
    runtime.block_on(async { tokio::time::timeout(timeout, future).await.ok() })
}
