//! Reading and extracting PAK archives, the flat file bundles maps and other assets ship in.

use std::{
	fs, io,
	path::{Path, PathBuf},
};

use bsp2json_macros::BspValue;
use thiserror::Error;

use crate::{
	reader::{BspByteReader, BspValue},
	BspParseError,
};

#[derive(Debug, Error)]
pub enum PakError {
	#[error("Invalid signature {0:?}, expected \"PACK\"")]
	InvalidSignature([u8; 4]),
	#[error("Directory length {len} is not a multiple of the entry size {}", PakEntryRecord::BSP_STRUCT_SIZE)]
	MalformedDirectory { len: u32 },
	#[error("Tried to read bytes from {from} to {to} from archive of size {size}")]
	BufferOutOfBounds { from: usize, to: usize, size: usize },
	#[error("Entry {name:?} ({position}..{position}+{length}) extends past the end of the archive (size {size})")]
	TruncatedEntry { name: String, position: u32, length: u32, size: usize },
	#[error("Entry name {name:?} is not a safe relative path")]
	UnsafePath { name: String },
	#[error("Entry name is not valid UTF-8: {0:?}")]
	InvalidName(Vec<u8>),
	#[error(transparent)]
	Parse(#[from] BspParseError),
	#[error("Failed to write {path:?}: {source}")]
	Io { path: PathBuf, source: io::Error },
}

const PAK_SIGNATURE: [u8; 4] = *b"PACK";

#[derive(BspValue, Debug, Clone, Copy)]
struct PakHeader {
	signature: [u8; 4],
	directory_offset: u32,
	directory_length: u32,
}

#[derive(BspValue, Debug, Clone, Copy)]
struct PakEntryRecord {
	name: [u8; 56],
	position: u32,
	length: u32,
}

/// A file stored in a [`PakArchive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PakEntry {
	/// `/` separated path of the file inside the archive.
	pub name: String,
	pub position: u32,
	pub length: u32,
}

impl PakEntry {
	/// The path of this entry relative to the directory the archive is extracted into.
	///
	/// Returns [`PakError::UnsafePath`] for anything that could end up outside of it, or that means something different
	/// on another platform: absolute paths, drive prefixes, backslashes, and `.`, `..` or empty components.
	pub fn relative_path(&self) -> Result<PathBuf, PakError> {
		let unsafe_path = || PakError::UnsafePath { name: self.name.clone() };

		if self.name.is_empty() || self.name.contains(['\\', ':']) {
			return Err(unsafe_path());
		}

		let mut path = PathBuf::new();
		for component in self.name.split('/') {
			if matches!(component, "" | "." | "..") {
				return Err(unsafe_path());
			}
			path.push(component);
		}

		Ok(path)
	}
}

/// A parsed PAK archive, borrowing the archive data.
#[derive(Debug, Clone)]
pub struct PakArchive<'a> {
	data: &'a [u8],
	pub entries: Vec<PakEntry>,
}

impl<'a> PakArchive<'a> {
	/// Parses the header and directory, checking that every entry's data lies within `data`.
	pub fn parse(data: &'a [u8]) -> Result<Self, PakError> {
		let header: PakHeader = BspByteReader::new(data).read()?;
		if header.signature != PAK_SIGNATURE {
			return Err(PakError::InvalidSignature(header.signature));
		}
		if header.directory_length as usize % PakEntryRecord::BSP_STRUCT_SIZE != 0 {
			return Err(PakError::MalformedDirectory {
				len: header.directory_length,
			});
		}

		let (from, to) = (
			header.directory_offset as usize,
			header.directory_offset as usize + header.directory_length as usize,
		);
		let Some(directory) = data.get(from..to) else {
			return Err(PakError::BufferOutOfBounds { from, to, size: data.len() });
		};

		let mut reader = BspByteReader::new(directory);
		let mut entries = Vec::with_capacity(directory.len() / PakEntryRecord::BSP_STRUCT_SIZE);
		while !reader.is_empty() {
			let record: PakEntryRecord = reader.read()?;
			let name_len = record.name.iter().position(|b| *b == 0).unwrap_or(record.name.len());
			let name = std::str::from_utf8(&record.name[..name_len])
				.map_err(|_| PakError::InvalidName(record.name[..name_len].to_vec()))?
				.to_string();

			if record.position as usize + record.length as usize > data.len() {
				return Err(PakError::TruncatedEntry {
					name,
					position: record.position,
					length: record.length,
					size: data.len(),
				});
			}

			entries.push(PakEntry {
				name,
				position: record.position,
				length: record.length,
			});
		}

		log::debug!("Parsed PAK directory with {} entries", entries.len());

		Ok(Self { data, entries })
	}

	/// The contents of `entry`, which must be one of this archive's entries.
	pub fn entry_data(&self, entry: &PakEntry) -> &'a [u8] {
		let from = entry.position as usize;
		&self.data[from..from + entry.length as usize]
	}

	/// Extracts every entry into `destination`, creating directories along the way.
	///
	/// Every entry path is checked before anything is written, so an archive with a single bad entry leaves the
	/// filesystem untouched.
	pub fn unpack(&self, destination: &Path) -> Result<(), PakError> {
		let paths = self.entries.iter().map(PakEntry::relative_path).collect::<Result<Vec<_>, _>>()?;

		let io_error = |path: &Path| {
			let path = path.to_path_buf();
			move |source| PakError::Io { path, source }
		};

		fs::create_dir_all(destination).map_err(io_error(destination))?;

		for (entry, relative_path) in self.entries.iter().zip(paths) {
			log::info!("{} ({} bytes)", entry.name, entry.length);

			let path = destination.join(relative_path);
			if let Some(parent) = path.parent() {
				fs::create_dir_all(parent).map_err(io_error(parent))?;
			}
			fs::write(&path, self.entry_data(entry)).map_err(io_error(&path))?;
		}

		Ok(())
	}
}
