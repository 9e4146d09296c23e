//! BSP file data parsing.

pub mod models;
pub mod nodes;
pub mod texture;
pub mod util;

use std::marker::PhantomData;

use bsp2json_macros::BspValue;
use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
	reader::{BspByteReader, BspValue},
	BspParseError, BspParseResultDoingJobExt, BspResult,
};
use models::{BspEdge, BspFace, BspModel, BspTexInfo};
use nodes::{BspLeaf, BspNode, BspPlane};
use texture::{read_texture_lump, BspMipTexture};

/// Version number written by the original Quake 1 tools, also the one most real files carry.
pub const BSP29_VERSION: i32 = 29;
/// Version number listed by the Unofficial Quake Specs (0x17).
pub const BSP23_VERSION: i32 = 0x17;

/// Points to the chunk of data in the file a lump resides in.
#[derive(BspValue, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LumpEntry {
	pub offset: u32,
	pub len: u32,
}

impl LumpEntry {
	/// Returns the slice of `data` (BSP file input) that this entry points to.
	pub fn get<'a>(&self, data: &'a [u8], lump: &'static str) -> BspResult<&'a [u8]> {
		let (from, to) = (self.offset as usize, self.offset as usize + self.len as usize);
		if to > data.len() {
			Err(BspParseError::LumpOutOfBounds {
				lump,
				entry: *self,
				size: data.len(),
			})
		} else {
			Ok(&data[from..to])
		}
	}
}

/// Contains the list of lump entries
#[derive(BspValue, Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LumpDirectory {
	pub entities: LumpEntry,
	pub planes: LumpEntry,
	pub textures: LumpEntry,
	pub vertices: LumpEntry,
	pub visibility: LumpEntry,
	pub nodes: LumpEntry,
	pub tex_info: LumpEntry,
	pub faces: LumpEntry,
	pub lighting: LumpEntry,
	pub clip_nodes: LumpEntry,
	pub leaves: LumpEntry,
	pub mark_surfaces: LumpEntry,
	pub edges: LumpEntry,
	pub surf_edges: LumpEntry,
	pub models: LumpEntry,
}

/// The fixed header at the very start of a BSP file.
#[derive(BspValue, Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspHeader {
	pub version: i32,
	pub lumps: LumpDirectory,
}

impl BspHeader {
	/// Whether `version` is one this crate knows the layout of.
	#[inline]
	pub fn is_known_version(&self) -> bool {
		matches!(self.version, BSP29_VERSION | BSP23_VERSION)
	}
}

/// A read-only view of a lump as an array of fixed-size records of type `T`.
///
/// Records are decoded on access straight from the borrowed file data, nothing is copied up front.
/// Creating a view guarantees the lump lies within the file and holds a whole number of records.
pub struct LumpView<'a, T> {
	lump: &'static str,
	data: &'a [u8],
	_marker: PhantomData<fn() -> T>,
}

impl<'a, T: BspValue> LumpView<'a, T> {
	/// Views the lump `entry` points to inside `bsp`. `lump` is used for error messages.
	pub fn new(bsp: &'a [u8], entry: LumpEntry, lump: &'static str) -> BspResult<Self> {
		Self::from_bytes(entry.get(bsp, lump)?, lump)
	}

	/// Views already-sliced lump data.
	pub fn from_bytes(data: &'a [u8], lump: &'static str) -> BspResult<Self> {
		if T::BSP_STRUCT_SIZE == 0 || data.len() % T::BSP_STRUCT_SIZE != 0 {
			return Err(BspParseError::MalformedLump {
				lump,
				record_size: T::BSP_STRUCT_SIZE,
				len: data.len(),
			});
		}

		Ok(Self {
			lump,
			data,
			_marker: PhantomData,
		})
	}

	/// Number of records in the lump.
	#[inline]
	pub fn len(&self) -> usize {
		self.data.len() / T::BSP_STRUCT_SIZE
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Decodes the record at `idx`, returning [`BspParseError::InvalidIndex`] if there isn't one.
	pub fn get(&self, idx: usize) -> BspResult<T> {
		if idx >= self.len() {
			return Err(BspParseError::invalid_index(self.lump, idx as i64, self.len()));
		}

		let from = idx * T::BSP_STRUCT_SIZE;
		BspByteReader::new(&self.data[from..from + T::BSP_STRUCT_SIZE])
			.read()
			.job(format!("Parsing {} lump entry {idx}", self.lump))
	}

	/// Decodes every record in order.
	pub fn iter(&self) -> impl Iterator<Item = BspResult<T>> + '_ {
		(0..self.len()).map(|i| self.get(i))
	}

	/// Decodes the whole lump into an owned vector.
	pub fn to_vec(&self) -> BspResult<Vec<T>> {
		self.iter().collect()
	}
}

impl<T> Clone for LumpView<'_, T> {
	fn clone(&self) -> Self {
		*self
	}
}
impl<T> Copy for LumpView<'_, T> {}

impl<T> std::fmt::Debug for LumpView<'_, T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "LumpView<{}>({} bytes)", self.lump, self.data.len())
	}
}

/// The data parsed from a BSP file.
///
/// Everything except the entities and texture headers borrows from the file data, so this is also the context
/// every conversion of a single file runs against.
#[derive(Debug, Clone)]
pub struct BspData<'a> {
	pub header: BspHeader,

	/// Essentially an embedded .map file, the differences being:
	/// - Brush data has been stripped.
	/// - Brush entities have a `model` property indexing into the `models` field of this struct.
	pub entities: String,
	pub planes: LumpView<'a, BspPlane>,
	pub textures: Vec<Option<BspMipTexture>>,
	/// All vertex positions.
	pub vertices: LumpView<'a, Vec3>,
	pub nodes: LumpView<'a, BspNode>,
	pub tex_info: LumpView<'a, BspTexInfo>,
	pub faces: LumpView<'a, BspFace>,
	/// Grayscale lightmap samples, faces point into this with [`BspFace::lightmap_offset`].
	pub lighting: &'a [u8],
	pub leaves: LumpView<'a, BspLeaf>,
	pub mark_surfaces: LumpView<'a, u16>,
	pub edges: LumpView<'a, BspEdge>,
	/// Signed indices into `edges`, the sign encodes which way round the edge is walked.
	pub surface_edges: LumpView<'a, i32>,
	pub models: LumpView<'a, BspModel>,
}

impl<'a> BspData<'a> {
	/// Parses the data from BSP input.
	pub fn parse(bsp: &'a [u8]) -> BspResult<Self> {
		let header: BspHeader = BspByteReader::new(bsp).read().job("Reading header")?;
		if !header.is_known_version() {
			log::warn!(
				"Unexpected BSP version {}, expected {BSP29_VERSION} or {BSP23_VERSION}. Continuing anyway",
				header.version
			);
		}
		let lumps = header.lumps;

		// Not decoded, but still has to lie within the file.
		lumps.visibility.get(bsp, "visibility")?;
		lumps.clip_nodes.get(bsp, "clip nodes")?;

		let data = Self {
			header,
			entities: read_entities(lumps.entities.get(bsp, "entities")?).job("Reading entities lump")?,
			planes: LumpView::new(bsp, lumps.planes, "planes")?,
			textures: read_texture_lump(&mut BspByteReader::new(lumps.textures.get(bsp, "textures")?)).job("Reading texture lump")?,
			vertices: LumpView::new(bsp, lumps.vertices, "vertices")?,
			nodes: LumpView::new(bsp, lumps.nodes, "nodes")?,
			tex_info: LumpView::new(bsp, lumps.tex_info, "texture infos")?,
			faces: LumpView::new(bsp, lumps.faces, "faces")?,
			lighting: lumps.lighting.get(bsp, "lighting")?,
			leaves: LumpView::new(bsp, lumps.leaves, "leaves")?,
			mark_surfaces: LumpView::new(bsp, lumps.mark_surfaces, "mark surfaces")?,
			edges: LumpView::new(bsp, lumps.edges, "edges")?,
			surface_edges: LumpView::new(bsp, lumps.surf_edges, "surface edges")?,
			models: LumpView::new(bsp, lumps.models, "models")?,
		};

		log::debug!(
			"Parsed BSP version {}: {} vertices, {} edges, {} surface edges, {} faces, {} nodes, {} models, {} textures",
			data.header.version,
			data.vertices.len(),
			data.edges.len(),
			data.surface_edges.len(),
			data.faces.len(),
			data.nodes.len(),
			data.models.len(),
			data.textures.len(),
		);

		Ok(data)
	}
}

fn read_entities(bytes: &[u8]) -> BspResult<String> {
	let mut entities_bytes = bytes.to_vec();
	for (i, byte) in entities_bytes.iter_mut().enumerate() {
		if *byte > 127 {
			// For some reason some characters in the entities lump are offset to the second half of byte values, no idea why.
			*byte -= 128;
		} else if *byte == 0 {
			// Also, sometimes the entity lump ends early, so this just truncates it if that is the case.
			entities_bytes.truncate(i);
			break;
		}
	}

	String::from_utf8(entities_bytes).map_err(|err| BspParseError::map_utf8_error(err.as_bytes())(err.utf8_error()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn view_counts_records() {
		let bytes: Vec<u8> = (0..12u8).collect();
		let view = LumpView::<u32>::from_bytes(&bytes, "test").unwrap();

		assert_eq!(view.len(), 3);
		assert_eq!(view.get(1).unwrap(), u32::from_le_bytes([4, 5, 6, 7]));
		assert!(matches!(
			view.get(3),
			Err(BspParseError::InvalidIndex { kind: "test", index: 3, len: 3 })
		));
	}

	#[test]
	fn view_stays_within_lump() {
		// The lump is bytes 4..12, surrounded by bytes that would decode to something else.
		let mut bytes = vec![0xFF; 16];
		bytes[4..12].copy_from_slice(&[1, 0, 2, 0, 3, 0, 4, 0]);
		let view = LumpView::<u16>::new(&bytes, LumpEntry { offset: 4, len: 8 }, "test").unwrap();

		assert_eq!(view.to_vec().unwrap(), vec![1, 2, 3, 4]);
	}

	#[test]
	fn malformed_lump_length() {
		let bytes = [0; 10];
		match LumpView::<BspEdge>::from_bytes(&bytes, "edges") {
			Err(BspParseError::MalformedLump { lump, record_size, len }) => {
				assert_eq!(lump, "edges");
				assert_eq!(record_size, 4);
				assert_eq!(len, 10);
			}
			other => panic!("unexpected result: {other:?}"),
		}
	}

	#[test]
	fn lump_out_of_bounds() {
		let bytes = [0; 8];
		assert!(matches!(
			LumpView::<u16>::new(&bytes, LumpEntry { offset: 4, len: 8 }, "test"),
			Err(BspParseError::LumpOutOfBounds { lump: "test", .. })
		));
	}

	#[test]
	fn entities_are_cleaned() {
		let bytes = [b'{', b'a' + 128, b'}', 0, b'x'];
		assert_eq!(read_entities(&bytes).unwrap(), "{a}");
	}

	#[test]
	fn header_size() {
		assert_eq!(BspHeader::BSP_STRUCT_SIZE, 4 + 15 * 8);
	}
}
