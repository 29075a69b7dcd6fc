//! Regen command-line driver.
//!
//! Loads each template into an in-memory workspace, lets the background
//! generator regenerate them, then prints the generated code.

mod cli;
mod generator;

use std::collections::HashSet;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use cli::{Cli, Output};
use generator::TemplateGenerator;
use regen_pipeline::{
	BackgroundGenerator, DocumentKey, GeneratorConfig, ProjectContext, ProjectKey, ProjectModel, RegenerationEvent, Rope, Severity, Workspace,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Upper bound on a run once the quiet period has elapsed.
const RUN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	setup_tracing(cli.verbose);

	let config = load_config(&cli)?;
	debug!(?config, "regen.cli.config");

	let workspace = Arc::new(Workspace::new(Arc::new(TemplateGenerator)));
	let project = ProjectKey::new(std::env::current_dir().context("cannot determine working directory")?);
	workspace.add_project(ProjectContext::new(project.clone()).with_root_namespace(cli.namespace.clone()));

	let scheduler = BackgroundGenerator::spawn(workspace.clone(), &config);
	let mut events = scheduler.subscribe();
	scheduler.attach(workspace.subscribe());

	let keys = load_documents(&workspace, &scheduler, &project, &cli.files)?;
	info!(files = keys.len(), quiet_period_ms = config.quiet_period_ms, "regen.cli.loaded");

	let failed = tokio::time::timeout(config.quiet_period() + RUN_TIMEOUT, collect_outcomes(&mut events, &keys))
		.await
		.context("timed out waiting for regeneration")?;

	for key in &keys {
		if let Some(cached) = workspace.resolve_current_document(key).and_then(|d| d.output().try_get_cached()) {
			for diagnostic in cached.artifact().diagnostics() {
				match diagnostic.severity {
					Severity::Error => error!(doc = %key, span = ?diagnostic.span, "{}", diagnostic.message),
					Severity::Warning => warn!(doc = %key, span = ?diagnostic.span, "{}", diagnostic.message),
					Severity::Info => info!(doc = %key, span = ?diagnostic.span, "{}", diagnostic.message),
				}
			}
		}
	}

	if cli.output == Output::Stdout {
		for key in keys.iter().filter(|key| !failed.contains(*key)) {
			let loaded = scheduler.request_artifact_text(key).await?;
			let mut stdout = std::io::stdout().lock();
			writeln!(stdout, "// ==> {} ({}, {})", loaded.file_path.display(), loaded.version, loaded.encoding.name())?;
			stdout.write_all(&loaded.to_bytes())?;
			stdout.flush()?;
		}
	}

	scheduler.shutdown().await;

	if !failed.is_empty() {
		bail!("{} of {} files failed to generate", failed.len(), keys.len());
	}
	Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<GeneratorConfig> {
	let mut config = match &cli.config {
		Some(path) => GeneratorConfig::load(path)?,
		None => GeneratorConfig::default(),
	};
	if let Some(ms) = cli.quiet_period_ms {
		config = config.with_quiet_period(Duration::from_millis(ms));
	}
	Ok(config)
}

/// Adds each file to `project` and enqueues it.
///
/// The explicit enqueue keeps loading independent of the change broadcast,
/// which can drop notifications when it lags.
fn load_documents(workspace: &Workspace, scheduler: &BackgroundGenerator, project: &ProjectKey, files: &[PathBuf]) -> anyhow::Result<Vec<DocumentKey>> {
	let mut keys = Vec::with_capacity(files.len());
	for path in files {
		let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
		let document = workspace
			.add_document(project, path.clone(), Rope::from(text))
			.context("workspace project disappeared")?;
		keys.push(document.key().clone());
		scheduler.enqueue(document);
	}
	Ok(keys)
}

/// Waits for one outcome per key; returns the keys that failed.
async fn collect_outcomes(events: &mut broadcast::Receiver<RegenerationEvent>, keys: &[DocumentKey]) -> HashSet<DocumentKey> {
	let mut remaining: HashSet<&DocumentKey> = keys.iter().collect();
	let mut failed = HashSet::new();
	while !remaining.is_empty() {
		let event = match events.recv().await {
			Ok(event) => event,
			Err(broadcast::error::RecvError::Lagged(missed)) => {
				warn!(missed, "regen.cli.events_lagged");
				continue;
			}
			Err(broadcast::error::RecvError::Closed) => break,
		};
		remaining.remove(event.key());
		match event {
			RegenerationEvent::Completed { key, output_version } => info!(doc = %key, %output_version, "regen.cli.generated"),
			RegenerationEvent::Failed { key, error } => {
				error!(doc = %key, %error, "regen.cli.failed");
				failed.insert(key);
			}
		}
	}
	failed
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("regen=debug,regen_pipeline=debug,regen_worker=debug,info")
		} else {
			EnvFilter::new("info")
		}
	});

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}
