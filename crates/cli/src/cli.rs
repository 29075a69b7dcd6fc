use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "regen")]
#[command(about = "Regenerate template files in the background and print the generated code")]
#[command(version)]
pub struct Cli {
	/// Template files to generate
	#[arg(required = true, value_name = "FILE")]
	pub files: Vec<PathBuf>,

	/// Configuration file (TOML)
	#[arg(long, short = 'c', value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Override the quiet period before a run starts
	#[arg(long, value_name = "MS")]
	pub quiet_period_ms: Option<u64>,

	/// Root namespace passed to the generator
	#[arg(long, default_value = "App")]
	pub namespace: String,

	/// Where to write generated code
	#[arg(long, value_enum, default_value_t = Output::Stdout)]
	pub output: Output,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,
}

/// Destination for generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Output {
	/// Print each generated file to stdout.
	Stdout,
	/// Only report per-file outcomes.
	Summary,
}
