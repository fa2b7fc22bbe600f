use crate::support::{Session, block_on_or_exit};
use revgate_driver::PollWorker;
use std::process;
use std::time::Duration;

pub struct Args {
    pub snapshot: String,
    pub census: Option<String>,
    pub config: String,
    pub passes: Option<u64>,
    pub interval_secs: Option<u64>,
    pub write: bool,
}

pub fn run(args: Args) {
    let session = Session::open_or_exit(&args.snapshot, args.census.as_deref(), &args.config);

    let interval = match args.interval_secs {
        Some(0) => {
            eprintln!("error: --interval-secs must be at least 1");
            process::exit(1);
        }
        Some(secs) => Duration::from_secs(secs),
        None => session.reconciler.config().poll_interval(),
    };

    eprintln!("revgate watch {}", session.id);
    eprintln!("  source: {}", session.snapshot_display());
    eprintln!("  interval: {}s", interval.as_secs());

    let (worker, _trigger) = PollWorker::new(session.reconciler.clone(), interval);
    let worker = match args.passes {
        Some(passes) => worker.with_max_ticks(passes),
        None => worker,
    };

    let summary = block_on_or_exit(async move {
        worker
            .run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl-c");
                    std::future::pending::<()>().await;
                }
            })
            .await
    });

    if args.write {
        session.persist_or_exit();
    }

    println!("revgate watch {}", session.id);
    println!("  Ticks: {}", summary.ticks);
    println!("  Passes completed: {}", summary.passes.completed);
    println!("  Passes superseded: {}", summary.passes.superseded);
    println!("  Passes failed: {}", summary.passes.failed);
    let ready = session
        .forge
        .snapshot(&session.id)
        .is_some_and(|snapshot| snapshot.change.has_label(&session.reconciler.config().ready_label));
    println!("  Ready: {}", if ready { "yes" } else { "no" });
}
