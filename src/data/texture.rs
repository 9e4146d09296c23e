//! Data definitions for embedded mip textures.

use bsp2json_macros::BspValue;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
	data::util::FixedStr,
	reader::BspByteReader,
	BspParseResultDoingJobExt, BspResult,
};

/// Header of an embedded texture. The pixel data itself isn't decoded.
#[derive(BspValue, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspMipTexture {
	pub name: FixedStr<16>,

	/// Width of the full resolution image, a multiple of 8.
	pub width: u32,
	/// Height of the full resolution image, a multiple of 8.
	pub height: u32,

	/// Offsets from the start of this header to the full, half, quarter and eighth resolution pixels.
	pub offsets: [u32; 4],
}

/// The texture lump is more complex than just a vector of the same type of item, so it needs its own function.
///
/// It starts with a texture count, followed by that many offsets (relative to the start of the lump) to each
/// [`BspMipTexture`]. Negative offsets mark missing textures.
pub fn read_texture_lump(reader: &mut BspByteReader) -> BspResult<Vec<Option<BspMipTexture>>> {
	// Maps with no textures at all can leave the lump empty.
	if reader.is_empty() {
		return Ok(Vec::new());
	}

	let num_mip_textures: u32 = reader.read().job("Reading texture count")?;
	let mut textures = Vec::new();

	for i in 0..num_mip_textures {
		let offset: i32 = reader.read().job(format!("Reading offset of texture {i}"))?;
		if offset.is_negative() {
			textures.push(None);
			continue;
		}
		textures.push(Some(
			reader
				.with_pos(offset as usize)
				.read()
				.job(format!("Reading texture {i} at offset {offset}"))?,
		));
	}

	Ok(textures)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn mip_texture(name: &str, size: u32) -> Vec<u8> {
		let mut bytes = [0u8; 16].to_vec();
		bytes[..name.len()].copy_from_slice(name.as_bytes());
		for value in [size, size, 40, 0, 0, 0] {
			bytes.extend(value.to_le_bytes());
		}
		bytes
	}

	#[test]
	fn texture_lump() {
		let mut lump = Vec::new();
		lump.extend(3u32.to_le_bytes());
		lump.extend(16i32.to_le_bytes());
		lump.extend((-1i32).to_le_bytes());
		lump.extend(56i32.to_le_bytes());
		lump.extend(mip_texture("+0button", 64));
		lump.extend(mip_texture("sky4", 128));

		let textures = read_texture_lump(&mut BspByteReader::new(&lump)).unwrap();
		assert_eq!(textures.len(), 3);
		assert_eq!(textures[0].as_ref().unwrap().name.as_str(), "+0button");
		assert!(textures[1].is_none());
		assert_eq!(textures[2].as_ref().unwrap().width, 128);
	}

	#[test]
	fn empty_lump() {
		assert!(read_texture_lump(&mut BspByteReader::new(&[])).unwrap().is_empty());
	}

	#[test]
	fn offset_past_lump() {
		let mut lump = Vec::new();
		lump.extend(1u32.to_le_bytes());
		lump.extend(1000i32.to_le_bytes());

		assert!(read_texture_lump(&mut BspByteReader::new(&lump)).is_err());
	}
}
