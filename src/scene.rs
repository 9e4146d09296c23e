//! Assembling the resolved geometry of a model and the passthrough metadata of a file into one [`Scene`].

use glam::{Vec2, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
	data::{
		models::{BspEdge, BspFace, BspModel, BspTexInfo},
		nodes::{BspNode, BspPlane},
		texture::BspMipTexture,
	},
	mesh::fan_triangles,
	BspData, BspParseError, BspParseResultDoingJobExt, BspResult,
};

/// Settings for [`BspData::assemble_scene`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SceneSettings {
	/// Which model's node tree to take the geometry from. Model 0 is the world.
	pub model_idx: usize,
	/// Negate the plane normal for faces on the back side of their plane.
	///
	/// Off by default, as the plane normal is written as-is for every face.
	pub flip_back_side_normals: bool,
	/// Divide texture coordinates by the size of the face's texture, resulting in 0..1 coordinates for a single repeat.
	/// Faces with a missing texture keep raw coordinates.
	pub normalize_uvs: bool,
	/// Light level of faces without a lightmap.
	pub default_light: f32,
	/// Also copy the undecoded geometry records into [`Scene::raw`].
	pub raw_records: bool,
}

impl Default for SceneSettings {
	fn default() -> Self {
		Self {
			model_idx: 0,
			flip_back_side_normals: false,
			normalize_uvs: false,
			default_light: 0.,
			raw_records: false,
		}
	}
}

/// A single output vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneVertex {
	pub position: Vec3,
	pub normal: Vec3,
	/// 0..1, sampled from the lighting lump.
	pub light: f32,
	pub uv: Vec2,
}

impl SceneVertex {
	/// Number of floats [`Scene::interleaved_vertices`] writes per vertex.
	pub const STRIDE: usize = 9;

	/// `[px, py, pz, nx, ny, nz, light, s, t]`
	pub fn to_array(&self) -> [f32; Self::STRIDE] {
		let [px, py, pz] = self.position.to_array();
		let [nx, ny, nz] = self.normal.to_array();
		let [s, t] = self.uv.to_array();
		[px, py, pz, nx, ny, nz, self.light, s, t]
	}
}

/// Name and size of an embedded texture.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneTexture {
	pub name: String,
	pub width: u32,
	pub height: u32,
}

impl From<&BspMipTexture> for SceneTexture {
	fn from(value: &BspMipTexture) -> Self {
		Self {
			name: value.name.to_string(),
			width: value.width,
			height: value.height,
		}
	}
}

/// Everything extracted from a single BSP file. Owns all of its data, so it can outlive the file it came from.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scene {
	pub version: i32,
	/// One vertex per surface edge of every drawn face, in traversal order.
	pub vertices: Vec<SceneVertex>,
	/// Triangle list, every 3 indices form a triangle. Every index is a valid index into `vertices`.
	pub indices: Vec<u32>,
	/// The raw entities lump, see [`parse_entities`](crate::entities::parse_entities) to read it.
	pub entities: String,
	pub planes: Vec<BspPlane>,
	pub models: Vec<BspModel>,
	pub tex_info: Vec<BspTexInfo>,
	pub textures: Vec<Option<SceneTexture>>,
	/// Index of every drawn face, in the order their vertices were written.
	pub faces: Vec<u32>,
	/// Only present if [`SceneSettings::raw_records`] is set.
	#[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
	pub raw: Option<RawRecords>,
}

/// The geometry lumps of a file as plain records, for consumers that resolve faces themselves.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawRecords {
	pub vertices: Vec<Vec3>,
	pub edges: Vec<BspEdge>,
	pub surface_edges: Vec<i32>,
	pub faces: Vec<BspFace>,
	pub nodes: Vec<BspNode>,
	pub lighting: Vec<u8>,
}

impl BspData<'_> {
	/// Copies the geometry lumps out of the file data.
	pub fn raw_records(&self) -> BspResult<RawRecords> {
		Ok(RawRecords {
			vertices: self.vertices.to_vec()?,
			edges: self.edges.to_vec()?,
			surface_edges: self.surface_edges.to_vec()?,
			faces: self.faces.to_vec()?,
			nodes: self.nodes.to_vec()?,
			lighting: self.lighting.to_vec(),
		})
	}
}

impl Scene {
	/// Flattens the vertices into a single stream of [`SceneVertex::STRIDE`] floats per vertex.
	pub fn interleaved_vertices(&self) -> Vec<f32> {
		self.vertices.iter().flat_map(SceneVertex::to_array).collect()
	}

	pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
		self.indices.chunks_exact(3).map(|tri| [tri[0], tri[1], tri[2]])
	}
}

impl BspData<'_> {
	/// Builds the [`Scene`] of the model `settings` points to.
	///
	/// Any out-of-range reference fails the whole scene, the only thing skipped is faces with too few edges to draw.
	pub fn assemble_scene(&self, settings: &SceneSettings) -> BspResult<Scene> {
		let mut scene = Scene {
			version: self.header.version,
			entities: self.entities.clone(),
			planes: self.planes.to_vec()?,
			models: self.models.to_vec()?,
			tex_info: self.tex_info.to_vec()?,
			textures: self.textures.iter().map(|texture| texture.as_ref().map(SceneTexture::from)).collect(),
			raw: if settings.raw_records { Some(self.raw_records()?) } else { None },
			..Default::default()
		};

		let face_indices = self.model_faces(settings.model_idx).job(format!("Walking node tree of model {}", settings.model_idx))?;
		let mut skipped = 0;

		for face_idx in face_indices {
			let face = self.faces.get(face_idx as usize)?;
			if face.is_degenerate() {
				log::warn!("Skipping face {face_idx}, it only has {} edges", face.num_edges);
				skipped += 1;
				continue;
			}

			let base = scene.vertices.len() as u32;
			self.push_face_vertices(&mut scene.vertices, &face, settings)
				.job(format!("Resolving face {face_idx}"))?;
			scene.indices.extend(fan_triangles(base, scene.vertices.len() as u32 - base).flatten());
			scene.faces.push(face_idx);
		}

		debug_assert!(scene.indices.iter().all(|i| (*i as usize) < scene.vertices.len()));

		log::info!(
			"Assembled model {}: {} faces ({skipped} skipped), {} vertices, {} triangles",
			settings.model_idx,
			scene.faces.len(),
			scene.vertices.len(),
			scene.indices.len() / 3,
		);

		Ok(scene)
	}

	/// Writes one vertex per surface edge of `face`.
	fn push_face_vertices(&self, vertices: &mut Vec<SceneVertex>, face: &BspFace, settings: &SceneSettings) -> BspResult<()> {
		let plane = self.planes.get(face.plane_idx as usize)?;
		let tex_info = self.tex_info.get(face.texture_info_idx as usize)?;
		let positions = self.face_vertices(face)?;

		let normal = if settings.flip_back_side_normals && face.is_back_side() { -plane.normal } else { plane.normal };

		let light = if face.lightmap_offset > 0 {
			let sample = self
				.lighting
				.get(face.lightmap_offset as usize)
				.ok_or_else(|| BspParseError::invalid_index("lighting", face.lightmap_offset, self.lighting.len()))?;
			*sample as f32 / 255.
		} else {
			settings.default_light
		};

		let texture_size = if settings.normalize_uvs { self.texture_size(&tex_info) } else { Vec2::ONE };

		vertices.extend(positions.into_iter().map(|position| SceneVertex {
			position,
			normal,
			light,
			uv: tex_info.projection.project(position) / texture_size,
		}));

		Ok(())
	}

	/// Size of the texture `tex_info` uses, or [`Vec2::ONE`] if it's missing.
	fn texture_size(&self, tex_info: &BspTexInfo) -> Vec2 {
		match self.textures.get(tex_info.texture_idx as usize) {
			Some(Some(texture)) if texture.width != 0 && texture.height != 0 => Vec2::new(texture.width as f32, texture.height as f32),
			_ => Vec2::ONE,
		}
	}
}
