use std::{
	ffi::OsString,
	fs,
	io::Write,
	path::{Path, PathBuf},
	process::ExitCode,
};

use anyhow::Context;
use bsp2json::prelude::*;
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

/// Converts BSP maps into JSON scenes, written next to each input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// BSP files to convert
	#[arg(required = true, value_name = "BSP")]
	inputs: Vec<PathBuf>,

	/// Write `<input>.vertices.json` and `<input>.indices.json` instead of `<input>.json`
	#[arg(long)]
	split: bool,

	/// Write entities as an array of key/value objects instead of the raw lump text
	#[arg(long)]
	parse_entities: bool,

	/// Index of the model to convert, 0 is the world
	#[arg(long, value_name = "INDEX", default_value_t = 0)]
	model: usize,

	/// Negate the normals of faces on the back side of their plane
	#[arg(long)]
	flip_back_faces: bool,

	/// Divide texture coordinates by the size of each face's texture
	#[arg(long)]
	normalize_uvs: bool,

	/// Also write the vertex, edge, surface edge, face, node and lighting lumps as plain records under `raw`
	#[arg(long)]
	raw: bool,

	/// Indent the output
	#[arg(long)]
	pretty: bool,

	/// Carry on with the next file if one fails
	#[arg(long)]
	keep_going: bool,
}

impl Args {
	fn scene_settings(&self) -> SceneSettings {
		SceneSettings {
			model_idx: self.model,
			flip_back_side_normals: self.flip_back_faces,
			normalize_uvs: self.normalize_uvs,
			raw_records: self.raw,
			..Default::default()
		}
	}
}

fn main() -> ExitCode {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let mut failed = 0;
	for input in &args.inputs {
		if let Err(err) = convert(input, &args) {
			log::error!("{err:?}");
			failed += 1;
			if !args.keep_going {
				return ExitCode::FAILURE;
			}
		}
	}

	if failed > 0 {
		log::error!("{failed} of {} files failed to convert", args.inputs.len());
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	}
}

fn convert(input: &Path, args: &Args) -> anyhow::Result<()> {
	log::info!("Reading {}", input.display());
	let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;

	let bsp = BspData::parse(&bytes).with_context(|| format!("Failed to parse {}", input.display()))?;
	let scene = bsp
		.assemble_scene(&args.scene_settings())
		.with_context(|| format!("Failed to assemble scene of {}", input.display()))?;

	let outputs = if args.split {
		vec![
			(output_path(input, "vertices.json"), to_json(&json!({ "vertices": scene.interleaved_vertices() }), args.pretty)?),
			(output_path(input, "indices.json"), to_json(&json!({ "indices": scene.indices }), args.pretty)?),
		]
	} else {
		let mut document = serde_json::to_value(&scene).context("Failed to serialize scene")?;
		if args.parse_entities {
			let entities = parse_entities(&scene.entities).with_context(|| format!("Failed to parse entities of {}", input.display()))?;
			document["entities"] = serde_json::to_value(entities)?;
		}
		vec![(output_path(input, "json"), to_json(&document, args.pretty)?)]
	};

	write_outputs(&outputs)
}

/// `maps/start.bsp` with `json` becomes `maps/start.bsp.json`.
fn output_path(input: &Path, extension: &str) -> PathBuf {
	let mut name = OsString::from(input.as_os_str());
	name.push(".");
	name.push(extension);
	PathBuf::from(name)
}

fn to_json(value: &impl Serialize, pretty: bool) -> anyhow::Result<Vec<u8>> {
	let json = if pretty { serde_json::to_vec_pretty(value) } else { serde_json::to_vec(value) };
	json.context("Failed to serialize JSON")
}

/// Writes every output to a temporary file next to its destination, and only moves them into place once all of
/// them were written, so a failed write never leaves a partial conversion behind.
fn write_outputs(outputs: &[(PathBuf, Vec<u8>)]) -> anyhow::Result<()> {
	let staged = outputs
		.iter()
		.map(|(path, contents)| -> anyhow::Result<_> { Ok((stage(path, contents)?, path, contents.len())) })
		.collect::<anyhow::Result<Vec<_>>>()?;

	for (file, path, len) in staged {
		file.persist(path).with_context(|| format!("Failed to write {}", path.display()))?;
		log::info!("Wrote {} ({len} bytes)", path.display());
	}

	Ok(())
}

fn stage(path: &Path, contents: &[u8]) -> anyhow::Result<NamedTempFile> {
	let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
	let mut file = NamedTempFile::new_in(dir).with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
	file.write_all(contents)
		.with_context(|| format!("Failed to write {}", path.display()))?;
	Ok(file)
}
