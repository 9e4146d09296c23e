// So the derive macro's `::bsp2json` paths resolve inside this crate too.
extern crate self as bsp2json;

pub mod prelude;

pub mod data;
pub mod entities;
pub mod mesh;
pub mod pak;
pub mod reader;
pub mod scene;

#[cfg(test)]
mod loading_tests;

use data::LumpEntry;
use thiserror::Error;

// Re-exports
pub use data::BspData;
pub use glam;

#[derive(Debug, Clone, Error)]
pub enum BspParseError {
	#[error("Lump \"{lump}\" ({entry:?}) out of bounds of data with size {size}! Malformed/corrupted BSP?")]
	LumpOutOfBounds { lump: &'static str, entry: LumpEntry, size: usize },
	#[error("Lump \"{lump}\" has length {len}, which is not a multiple of its record size {record_size}")]
	MalformedLump { lump: &'static str, record_size: usize, len: usize },
	#[error("Tried to read bytes from {from} to {to} from buffer of size {size}")]
	BufferOutOfBounds { from: usize, to: usize, size: usize },
	#[error("Failed to parse string at index {index}, invalid utf-8 sequence: {sequence:?}")]
	InvalidString { index: usize, sequence: Vec<u8> },
	#[error("Invalid {kind} index {index}, valid range is 0..{len}")]
	InvalidIndex { kind: &'static str, index: i64, len: usize },
	#[error("Invalid surface edge {value}, edge indices must be non-zero and their magnitude below {num_edges}")]
	InvalidEdgeIndex { value: i32, num_edges: usize },
	#[error("Node {node} is reachable more than once, the node tree contains a cycle")]
	CyclicNodeTree { node: u32 },
	#[error("Invalid entities lump at line {line}: {message}")]
	InvalidEntities { line: usize, message: String },

	/// For telling the user exactly where the error occurred in the process.
	#[error("{0} - {1}")]
	DoingJob(String, Box<BspParseError>),
}

impl BspParseError {
	/// The error behind any [`BspParseError::DoingJob`].
	pub fn root(&self) -> &BspParseError {
		let mut err = self;
		loop {
			match err {
				Self::DoingJob(_, child) => err = child,
				_ => return err,
			}
		}
	}

	#[inline]
	pub fn map_utf8_error(data: &[u8]) -> impl FnOnce(std::str::Utf8Error) -> Self + '_ {
		|err| BspParseError::InvalidString {
			index: err.valid_up_to(),
			sequence: data[err.valid_up_to()..err.valid_up_to() + err.error_len().unwrap_or(1)].to_vec(),
		}
	}

	/// Shorthand for building an [`BspParseError::InvalidIndex`].
	#[inline]
	pub(crate) fn invalid_index(kind: &'static str, index: impl Into<i64>, len: usize) -> Self {
		Self::InvalidIndex { kind, index: index.into(), len }
	}
}

pub type BspResult<T> = Result<T, BspParseError>;

pub trait BspParseResultDoingJobExt {
	/// Like `map_err`, but specifically for adding messages to BSP errors to tell the user exactly what was going on when the error occurred.
	fn job(self, job: impl ToString) -> Self;
}

impl<T> BspParseResultDoingJobExt for BspResult<T> {
	#[inline]
	fn job(self, job: impl ToString) -> Self {
		self.map_err(|err| BspParseError::DoingJob(job.to_string(), Box::new(err)))
	}
}
