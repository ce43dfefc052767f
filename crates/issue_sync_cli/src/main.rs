//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `issue_sync_core` linkage without a host application.
//! - Check that an in-memory store opens and serves a snapshot.

use issue_sync_core::{CoreConfig, IssueStore};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("issue_sync_core ping={}", issue_sync_core::ping());
    println!("issue_sync_core version={}", issue_sync_core::core_version());

    let smoke = CoreConfig::default()
        .open_store()
        .and_then(|store| store.snapshot());
    match smoke {
        Ok(snapshot) => {
            println!(
                "issue_sync_core store=ok revision={} issues={}",
                snapshot.revision,
                snapshot.len()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("issue_sync_core store=error error={err}");
            ExitCode::FAILURE
        }
    }
}
