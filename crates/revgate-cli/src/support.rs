use revgate_driver::{
    ChangeRequestSnapshot, GateConfig, InMemoryForge, PassReport, Reconciler, StaticCensus,
    load_config,
};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout stays parseable; `RUST_LOG` overrides `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn block_on_or_exit<F: Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
    runtime.block_on(future)
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization")
    );
}

/// A snapshot file loaded into an in-memory forge, ready for passes.
pub struct Session {
    pub id: String,
    pub snapshot_path: PathBuf,
    pub forge: Arc<InMemoryForge>,
    pub reconciler: Arc<Reconciler>,
}

impl Session {
    pub fn open_or_exit(snapshot: &str, census: Option<&str>, config: &str) -> Self {
        let config = load_config_or_exit(config);
        let census = match census {
            Some(path) => StaticCensus::load(path).unwrap_or_else(|e| {
                eprintln!("error: {e}");
                process::exit(1);
            }),
            None => StaticCensus::new(),
        };

        let snapshot_path = PathBuf::from(snapshot);
        let loaded = ChangeRequestSnapshot::load(&snapshot_path).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        });
        let id = loaded.change.id.clone();

        let forge = Arc::new(InMemoryForge::with_snapshot(
            config.bot_account.clone(),
            loaded,
        ));
        let reconciler = Arc::new(Reconciler::new(forge.clone(), Arc::new(census), config));
        reconciler.track(&id);

        Self {
            id,
            snapshot_path,
            forge,
            reconciler,
        }
    }

    /// Write the forge state back to the snapshot file.
    pub fn persist_or_exit(&self) {
        let Some(snapshot) = self.forge.snapshot(&self.id) else {
            eprintln!("error: change request {} disappeared from the forge", self.id);
            process::exit(1);
        };
        if let Err(e) = snapshot.save(&self.snapshot_path) {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }

    pub fn snapshot_display(&self) -> String {
        self.snapshot_path.display().to_string()
    }
}

fn load_config_or_exit(path: &str) -> GateConfig {
    load_config(Path::new(path)).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

pub fn print_report(report: &PassReport) {
    let policy = &report.policy;
    println!("  Required approvals: {}", policy.required_total());
    for (role, minimum) in policy.per_role_minimum().iter().rev() {
        println!("    of role {role}: {minimum}");
    }
    println!("  Policy digest: {}", report.readiness.explanation.policy_digest);
    println!("  Approvals: {}", report.tally.total);
    println!(
        "  Ready: {}",
        if report.readiness.ready { "yes" } else { "no" }
    );
    println!("  Replies posted: {}", report.replies.len());
    for source in &report.replies {
        println!("    - {source}");
    }
    let label = match report.label_change {
        Some(true) => "set",
        Some(false) => "cleared",
        None => "unchanged",
    };
    println!("  Ready label: {label}");
}
