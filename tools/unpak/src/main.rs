use std::{fs, path::PathBuf};

use anyhow::Context;
use bsp2json::prelude::*;
use clap::Parser;

/// Extracts PAK archives.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Directory to extract into, created if missing
	#[arg(short, long, value_name = "DIR", default_value = "output")]
	output: PathBuf,

	/// PAK files to extract, in order. Later archives overwrite files of earlier ones
	#[arg(required = true, value_name = "PAK")]
	paks: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	for pak in &args.paks {
		log::info!("Extracting {} into {}", pak.display(), args.output.display());

		let data = fs::read(pak).with_context(|| format!("Failed to read {}", pak.display()))?;
		let archive = PakArchive::parse(&data).with_context(|| format!("Invalid PAK {}", pak.display()))?;
		archive
			.unpack(&args.output)
			.with_context(|| format!("Failed to extract {}", pak.display()))?;
	}

	Ok(())
}
