use crate::support::{Session, block_on_or_exit, print_json};
use revgate_driver::GateResponse;
use revgate_kernel::GateAction;
use std::process;

/// Exits 1 when the gate is blocked.
pub fn run(
    snapshot: String,
    action: GateAction,
    census: Option<String>,
    config: String,
    write: bool,
    json_output: bool,
) {
    let session = Session::open_or_exit(&snapshot, census.as_deref(), &config);

    let response = block_on_or_exit(session.reconciler.check_gate(&session.id, action))
        .unwrap_or_else(|e| {
            eprintln!("error: gate check failed for change request {}: {e}", session.id);
            process::exit(1);
        });

    if write {
        session.persist_or_exit();
    }

    if json_output {
        print_json(&response);
    } else {
        println!("revgate gate {} --action {}", session.id, action.as_str());
        match &response {
            GateResponse::Allowed => println!("  Allowed"),
            GateResponse::Blocked { message, .. } => {
                println!("  Blocked");
                println!();
                println!("{message}");
            }
        }
    }

    if !response.is_allowed() {
        process::exit(1);
    }
}
