//! Data definitions for the BSP node tree.

use bsp2json_macros::BspValue;
use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
	data::util::ShortBoundingBox,
	reader::{BspByteReader, BspValue},
	BspResult,
};

/// A reference to a child of a [`BspNode`], or to the root of a model.
///
/// Decoded once when read, so nothing past the reader needs to know about the bit tricks the format uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BspNodeRef {
	/// A reference to another node.
	Node(u32),
	/// A reference to a leaf. Leaf 0 is the shared solid leaf outside the map.
	Leaf(u32),
	/// No child at all.
	None,
}

impl BspNodeRef {
	/// Bit marking a 16-bit child reference as a leaf.
	pub const LEAF_BIT: u16 = 0x8000;

	/// Decodes a 16-bit node child. If bit 15 is set, `!value` is the index of a leaf.
	///
	/// A raw value of `0` is read as [`BspNodeRef::None`]. Node 0 is the root of the world, so it never shows up as a
	/// child in practice, but note that the format itself has no way of telling the two apart.
	pub const fn from_child(value: u16) -> Self {
		if value & Self::LEAF_BIT != 0 {
			Self::Leaf(!value as u32)
		} else if value == 0 {
			Self::None
		} else {
			Self::Node(value as u32)
		}
	}

	/// Decodes a 32-bit model root. Negative values are leaves (`!value`), anything else is a node, including 0.
	pub const fn from_root(value: i32) -> Self {
		if value.is_negative() {
			// Bitwise not handles integer asymmetry and overflow.
			Self::Leaf(!value as u32)
		} else {
			Self::Node(value as u32)
		}
	}

	/// If this reference points to a node, get the index of the node.
	#[inline]
	pub fn node(&self) -> Option<u32> {
		match *self {
			Self::Node(i) => Some(i),
			_ => None,
		}
	}

	/// If this reference points to a leaf, get the index of the leaf.
	#[inline]
	pub fn leaf(&self) -> Option<u32> {
		match *self {
			Self::Leaf(i) => Some(i),
			_ => None,
		}
	}
}

/// A 16-bit node child, see [`BspNodeRef::from_child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Deref)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspNodeChild(pub BspNodeRef);

impl BspValue for BspNodeChild {
	const BSP_STRUCT_SIZE: usize = u16::BSP_STRUCT_SIZE;

	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		Ok(Self(BspNodeRef::from_child(reader.read()?)))
	}
}

#[derive(BspValue, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspNode {
	/// Index of the [`BspPlane`] that splits the node.
	pub plane_idx: i32,

	pub front: BspNodeChild,
	pub back: BspNodeChild,

	/// Bounding box of the node and all its children.
	pub bound: ShortBoundingBox,
	/// Index of the first [`BspFace`](crate::data::models::BspFace) the node contains.
	pub face_idx: u16,
	/// Number of faces this node contains.
	pub face_num: u16,
}

impl BspNode {
	/// Range of face indices this node owns.
	#[inline]
	pub fn face_range(&self) -> std::ops::Range<u32> {
		self.face_idx as u32..self.face_idx as u32 + self.face_num as u32
	}
}

#[derive(BspValue, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspLeaf {
	/// Special type of leaf (empty, solid, water, etc.), negative in practice.
	pub contents: i32,
	/// Beginning of visibility lists, or `-1`.
	pub vis_list: i32,

	pub bound: ShortBoundingBox,

	/// Index in the `mark_surfaces` list.
	pub face_idx: u16,
	/// Number of elements in the `mark_surfaces` list.
	pub face_num: u16,

	/// Ambient sound levels for water, sky, slime and lava, in that order.
	pub ambience: [u8; 4],
}

#[derive(BspValue, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspPlane {
	pub normal: Vec3,
	/// Signed distance of the plane from the origin, along `normal`.
	pub dist: f32,
	/// Type of plane depending on normal vector. 0..=2 are axial in X, Y and Z, 3..=5 are roughly toward them.
	pub ty: i32,
}
