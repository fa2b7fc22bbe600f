use crate::support::{Session, block_on_or_exit, print_json, print_report};
use revgate_driver::PassOutcome;
use std::process;

pub fn run(
    snapshot: String,
    census: Option<String>,
    config: String,
    write: bool,
    json_output: bool,
) {
    let session = Session::open_or_exit(&snapshot, census.as_deref(), &config);

    let outcome = block_on_or_exit(session.reconciler.run_pass(&session.id)).unwrap_or_else(|e| {
        eprintln!("error: pass failed for change request {}: {e}", session.id);
        process::exit(1);
    });
    let PassOutcome::Completed(report) = outcome else {
        eprintln!("error: pass for change request {} was superseded", session.id);
        process::exit(1);
    };

    if write {
        session.persist_or_exit();
    }

    if json_output {
        print_json(&report);
        return;
    }

    println!("revgate evaluate {}", session.id);
    println!("  Source: {}", session.snapshot_display());
    print_report(&report);
    if write {
        println!("  Snapshot updated");
    }
}
