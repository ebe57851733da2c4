//! Demo application: two screen actions requesting permissions concurrently.

mod simulated;

use anyhow::Context;
use clap::Parser;
use log::info;
use permit_rs::{PermissionGateway, init_logging};
use permit_rs_config::PermitConfig;
use permit_rs_core::{Container, GrantOutcome, LifecycleEvent};
use permit_rs_protocol::permission_list;
use simulated::{DemoContainer, DialogHost, LogSink, run_dialogs};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Command-line options for the demo.
#[derive(Parser)]
#[command(name = "permit-demo", version)]
struct Cli {
    /// Optional path to a permit.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Permission already granted before the demo starts (repeatable)
    #[arg(long = "granted", value_name = "PERMISSION")]
    granted: Vec<String>,
    /// Permission the simulated dialog denies (repeatable)
    #[arg(long = "deny", value_name = "PERMISSION")]
    deny: Vec<String>,
    /// Milliseconds the simulated dialog stays open
    #[arg(long, default_value_t = 200)]
    dialog_delay_ms: u64,
    /// Destroy the container while the first dialog is showing
    #[arg(long)]
    teardown: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let delay = Duration::from_millis(cli.dialog_delay_ms);

    let (host, dialogs) = DialogHost::new(cli.granted, cli.deny);
    let host = Arc::new(host);
    let gateway = Arc::new(
        PermissionGateway::new(host.clone(), config)
            .context("invalid permit config")?
            .with_event_sink(Arc::new(LogSink)),
    );
    let dialog_task = tokio::spawn(run_dialogs(
        dialogs,
        host,
        Arc::downgrade(&gateway),
        delay,
    ));

    let screen = DemoContainer::new();
    let container: Arc<dyn Container> = screen.clone();
    screen.attach();
    for event in [
        LifecycleEvent::Attach,
        LifecycleEvent::Created,
        LifecycleEvent::ViewReady,
    ] {
        gateway.on_lifecycle_event(container.id(), event);
    }

    let location = spawn_request(&gateway, &container, &["LOCATION_FINE", "LOCATION_COARSE"]);
    let record = spawn_request(&gateway, &container, &["RECORD_AUDIO"]);

    if cli.teardown {
        tokio::time::sleep(delay / 2).await;
        info!("tearing down container (container_id={})", container.id());
        screen.tear_down();
        for event in [
            LifecycleEvent::ViewDestroyed,
            LifecycleEvent::Detach,
            LifecycleEvent::Destroy,
        ] {
            gateway.on_lifecycle_event(container.id(), event);
        }
    }

    report("location", location.await.context("location request task failed")?);
    report("record", record.await.context("record request task failed")?);
    dialog_task.abort();
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<PermitConfig> {
    if let Some(path) = &cli.config {
        return PermitConfig::load_from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let layered = PermitConfig::load_layered(&cwd).context("failed to load layered config")?;
    Ok(layered.config)
}

fn spawn_request(
    gateway: &Arc<PermissionGateway>,
    container: &Arc<dyn Container>,
    ids: &[&str],
) -> JoinHandle<GrantOutcome> {
    let gateway = gateway.clone();
    let container = container.clone();
    let permissions = permission_list(ids.iter().copied());
    tokio::spawn(async move { gateway.request_permissions(&container, permissions).await })
}

fn report(label: &str, outcome: GrantOutcome) {
    match outcome {
        Ok(results) => println!("request {label} permissions: {results:?}"),
        Err(err) => println!("request {label} permissions: {err}"),
    }
}
