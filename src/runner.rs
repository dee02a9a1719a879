use log::{error, info};

use crate::client::Retrieve;
use crate::request::RetrievalRequest;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Leave requests alone whose target file already exists.
    pub skip_existing: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_existing: usize,
}

/// Retrieve every request in order. A failed retrieval is logged and counted;
/// the remaining requests still run.
pub fn retrieve_all<R: Retrieve + ?Sized>(
    retriever: &R,
    requests: &[RetrievalRequest],
    opts: &RunOptions,
) -> Summary {
    let mut summary = Summary::default();

    for request in requests {
        if opts.skip_existing && request.target_path().exists() {
            info!("{} exists, skipping", request.target_path().display());
            summary.skipped_existing += 1;
            continue;
        }

        summary.attempted += 1;
        match retriever.retrieve(request) {
            Ok(done) => {
                info!(
                    "retrieved {} ({} bytes)",
                    done.target.display(),
                    done.size_bytes
                );
                summary.succeeded += 1;
            }
            Err(e) => {
                error!(
                    "Error retrieving data for {}, {}, {}, {}: {e}",
                    request.date(),
                    request.variable(),
                    request.init_time(),
                    request.forecast_type()
                );
                summary.failed += 1;
            }
        }
    }

    summary
}
