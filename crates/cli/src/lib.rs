//! Command-line front ends for the toolbelt clients.
//!
//! Each binary in `src/bin` parses its arguments, sets up logging and hands
//! off to the matching module under [`tools`].

pub mod logging;
pub mod tools;

use std::future::Future;
use std::process::ExitCode;

/// Run `command` on a current-thread runtime and turn its result into an exit code.
///
/// Errors are printed to stderr as `Error: <message>` with their causes.
pub fn block_on_main<F>(command: F) -> ExitCode
where
    F: Future<Output = anyhow::Result<()>>,
{
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: could not start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
