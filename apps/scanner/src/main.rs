use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use camera::{CameraDevice, MissingCamera, VirtualCamera};
use clap::Parser;
use client_core::{
    DashboardNotifier, DetectionSource, FeedbackKind, GateScanController, HttpDashboardNotifier,
    HttpScanValidator, LoggingDashboard, ManualDetection, MissingScanValidator, ScanEvent,
    ScanOutcome, ScanRecord, ScanValidator, SimulatedDetection,
};
use shared::domain::Gate;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast,
};
use tracing::{debug, info, warn};

mod commands;
mod config;

use commands::{parse_command, Command, HELP};
use config::{load_settings, Settings, SETTINGS_FILE};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    gate: Option<Gate>,
    #[arg(long)]
    guard_id: Option<i64>,
    /// Use a virtual camera and feed sample permits every few seconds.
    #[arg(long)]
    simulate: bool,
    #[arg(long)]
    auth_token: Option<String>,
    /// Log nothing when the server explicitly rejects a permit.
    #[arg(long)]
    discard_rejected: bool,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(url) = self.server_url {
            settings.server_url = Some(url);
        }
        if let Some(gate) = self.gate {
            settings.gate = gate;
        }
        if let Some(guard_id) = self.guard_id {
            settings.guard_id = Some(guard_id);
        }
        if let Some(token) = self.auth_token {
            settings.auth_token = Some(token);
        }
        settings.simulate |= self.simulate;
        settings.discard_rejected |= self.discard_rejected;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = load_settings(&args.config);
    args.apply(&mut settings);

    let controller = build_controller(&settings)?;
    let printer = tokio::spawn(print_events(controller.subscribe_events()));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        match command {
            Command::Toggle => controller.toggle_scanning().await,
            Command::Stop => controller.stop_scanning().await,
            Command::SetGate(gate) => controller.set_gate(gate).await,
            Command::Clear => controller.clear_results().await,
            Command::Status => {
                let snapshot = controller.snapshot().await;
                println!(
                    "phase={:?} gate={} camera_live={} entry={} exit={} total={} last_scan={}",
                    snapshot.phase,
                    snapshot.gate,
                    snapshot.camera_live,
                    snapshot.counters.entry,
                    snapshot.counters.exit,
                    snapshot.counters.total(),
                    snapshot
                        .last_scan_at
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string()),
                );
            }
            Command::Records => {
                let records = controller.records().await;
                if records.is_empty() {
                    println!("no scans logged");
                }
                for record in &records {
                    println!("{}", describe_record(record));
                }
            }
            Command::Qr(raw) => match controller.handle_qr_detected(&raw).await {
                ScanOutcome::Ignored => println!("not scanning; run `scan` first"),
                ScanOutcome::Rejected { message } => println!(
                    "rejected: {}",
                    message.as_deref().unwrap_or("Permit could not be validated")
                ),
                ScanOutcome::Stale => println!("session changed before validation finished"),
                ScanOutcome::InvalidCode | ScanOutcome::Logged(_) => {}
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    controller.stop_scanning().await;
    printer.abort();
    info!("scanner shutting down");
    Ok(())
}

fn build_controller(settings: &Settings) -> Result<Arc<GateScanController>> {
    let (validator, dashboard): (Arc<dyn ScanValidator>, Arc<dyn DashboardNotifier>) =
        match settings.server_url.as_deref() {
            Some(url) => {
                let validator = HttpScanValidator::new(url, settings.auth_token.clone())
                    .context("failed to configure validation client")?;
                info!(endpoint = %validator.endpoint(), "validating scans against gate server");
                let dashboard = HttpDashboardNotifier::new(url, settings.auth_token.clone())
                    .context("failed to configure live feed client")?;
                (Arc::new(validator), Arc::new(dashboard))
            }
            None => {
                warn!("no server url configured; every scan is logged from fallback data");
                (Arc::new(MissingScanValidator), Arc::new(LoggingDashboard))
            }
        };

    let (camera, detection): (Arc<dyn CameraDevice>, Arc<dyn DetectionSource>) =
        if settings.simulate {
            (
                Arc::new(VirtualCamera::new()),
                Arc::new(SimulatedDetection::new(settings.simulated_delay())),
            )
        } else {
            (Arc::new(MissingCamera), Arc::new(ManualDetection))
        };

    Ok(GateScanController::new_with_dependencies(
        settings.session_config(),
        camera,
        validator,
        dashboard,
        detection,
    ))
}

fn describe_record(record: &ScanRecord) -> String {
    format!(
        "[{}] {} {} ({}) {} {} via {:?}",
        record.time.format("%H:%M:%S"),
        record.gate.label(),
        record.name,
        record.id_number,
        record.gp_number,
        record.item_purpose,
        record.source,
    )
}

async fn print_events(mut events: broadcast::Receiver<ScanEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "scanner output fell behind controller events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        println!("{}", describe_event(event));
    }
}

fn describe_event(event: ScanEvent) -> String {
    match event {
        ScanEvent::PhaseChanged(phase) => format!("scanner: {phase:?}"),
        ScanEvent::GateChanged(gate) => format!("gate: {}", gate.label()),
        ScanEvent::CameraUnavailable { reason } => {
            debug!(%reason, "camera: no live feed");
            "no live feed; waiting for codes".to_string()
        }
        ScanEvent::Overlay(feedback) => {
            let marker = match feedback.kind {
                FeedbackKind::Success => "OK",
                FeedbackKind::Error => "!!",
            };
            format!("[{marker}] {}", feedback.title)
        }
        ScanEvent::Toast(feedback) => match feedback.detail {
            Some(detail) => format!("  {}: {detail}", feedback.title),
            None => format!("  {}", feedback.title),
        },
        ScanEvent::ScanLogged(record) => format!("logged {}", describe_record(&record)),
        ScanEvent::CountersChanged(counters) => format!(
            "counters: entry={} exit={} total={}",
            counters.entry,
            counters.exit,
            counters.total()
        ),
        ScanEvent::Cleared => "scan log cleared".to_string(),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
