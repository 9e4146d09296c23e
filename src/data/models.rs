//! Data definitions related to model and mesh data.

use bsp2json_macros::BspValue;
use glam::{dvec2, Vec2, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::data::{nodes::BspNodeRef, util::BoundingBox};

/// A single edge in a BSP model.
#[derive(BspValue, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspEdge {
	/// The index to the first vertex this edge connects
	pub a: u16,
	/// The index to the second vertex this edge connects
	pub b: u16,
}

#[derive(BspValue, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspFace {
	/// Index of the plane the face is parallel to
	pub plane_idx: u16,
	/// 0 if the face is in front of the plane, 1 if behind it
	pub plane_side: u16,

	/// Index of the first edge (in the surface edge array)
	pub first_edge: i32,
	/// Number of consecutive edges (in the surface edge array)
	pub num_edges: u16,

	/// Index of the texture info structure
	pub texture_info_idx: u16,

	/// The kind of lighting that should be applied to the face.
	/// - value 0 is the normal value, to be used with a light map.
	/// - value 0xFF is to be used when there is no light map.
	/// - value 1 produces a fast pulsating light
	/// - value 2 produces a slow pulsating light
	/// - value 3 to 10 produce various other lighting effects.
	pub light_type: u8,
	/// Gives the base light level for the face, that is the minimum light level for the light map, or the constant light level in the absence of light map.
	/// Curiously, value 0xFF codes for minimum light, and value 0 codes for maximum light.
	pub base_light: u8,
	/// Two additional light models.
	pub light_models: [u8; 2],

	/// Offset of the lightmap (in bytes) in the lighting lump, or -1 if no lightmap
	pub lightmap_offset: i32,
}

impl BspFace {
	/// The faces of the source format are convex polygons, anything below 3 edges can't be drawn.
	pub const MIN_EDGES: u16 = 3;

	#[inline]
	pub fn is_degenerate(&self) -> bool {
		self.num_edges < Self::MIN_EDGES
	}

	/// Whether the face is on the back side of its plane.
	#[inline]
	pub fn is_back_side(&self) -> bool {
		self.plane_side != 0
	}
}

#[derive(BspValue, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanarTextureProjection {
	/// The S vector, horizontal in texture space.
	pub u_axis: Vec3,
	pub u_offset: f32,

	/// The T vector, vertical in texture space.
	pub v_axis: Vec3,
	pub v_offset: f32,
}

impl PlanarTextureProjection {
	/// Projects a position onto this plane.
	///
	/// Converts to double for calculation to minimise floating-point imprecision as demonstrated [here](https://github.com/Novum/vkQuake/blob/b6eb0cf5812c09c661d51e3b95fc08d88da2288a/Quake/gl_model.c#L1315).
	pub fn project(&self, point: Vec3) -> Vec2 {
		dvec2(
			point.as_dvec3().dot(self.u_axis.as_dvec3()) + self.u_offset as f64,
			point.as_dvec3().dot(self.v_axis.as_dvec3()) + self.v_offset as f64,
		)
		.as_vec2()
	}
}

#[derive(BspValue, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspTexInfo {
	pub projection: PlanarTextureProjection,

	/// Index of the mip texture in the textures lump.
	pub texture_idx: u32,
	/// 0 for ordinary textures, 1 for animated/special surfaces such as water.
	pub flags: u32,
}

/// A single model in the BSP file. Model 0 is worldspawn, other models
/// are used for entities using `*N` where N is the model number.
#[derive(BspValue, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspModel {
	/// The bounding box of the model. Unlike other bounding boxes in BSP files, this is always floating-point-based.
	pub bound: BoundingBox,
	/// Origin of model, usually (0,0,0)
	pub origin: Vec3,

	/// The first is the root of the drawable node tree, the others are clip node roots, the last one usually zero.
	pub head_nodes: [i32; 4],

	/// Number of visleafs, not including the solid leaf 0.
	pub visleafs: i32,
	pub first_face: i32,
	pub num_faces: i32,
}

impl BspModel {
	/// Root of the node tree holding this model's drawable faces.
	#[inline]
	pub fn root(&self) -> BspNodeRef {
		BspNodeRef::from_root(self.head_nodes[0])
	}
}
