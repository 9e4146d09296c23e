use glam::Vec3;

use crate::{
	data::{
		models::PlanarTextureProjection,
		util::{BoundingBox, ShortBoundingBox},
	},
	prelude::*,
	reader::BspValue,
};

/// Writes a value in its on-disk layout.
trait Put {
	fn put(&self, out: &mut Vec<u8>);
}

macro_rules! impl_put_primitive {
	($($ty:ty),*) => {$(
		impl Put for $ty {
			fn put(&self, out: &mut Vec<u8>) {
				out.extend(self.to_le_bytes());
			}
		}
	)*};
}
impl_put_primitive!(u8, u16, i16, u32, i32, f32);

impl Put for Vec3 {
	fn put(&self, out: &mut Vec<u8>) {
		self.to_array().put(out);
	}
}

impl<T: Put, const N: usize> Put for [T; N] {
	fn put(&self, out: &mut Vec<u8>) {
		self.iter().for_each(|x| x.put(out));
	}
}

macro_rules! impl_put_struct {
	($ty:ty { $($field:ident),* }) => {
		impl Put for $ty {
			fn put(&self, out: &mut Vec<u8>) {
				$(self.$field.put(out);)*
			}
		}
	};
}
impl_put_struct!(BspPlane { normal, dist, ty });
impl_put_struct!(PlanarTextureProjection { u_axis, u_offset, v_axis, v_offset });
impl_put_struct!(BspTexInfo { projection, texture_idx, flags });
impl_put_struct!(BspFace { plane_idx, plane_side, first_edge, num_edges, texture_info_idx, light_type, base_light, light_models, lightmap_offset });
impl_put_struct!(BoundingBox { min, max });
impl_put_struct!(ShortBoundingBox { min, max });
impl_put_struct!(BspModel { bound, origin, head_nodes, visleafs, first_face, num_faces });
impl_put_struct!(BspLeaf { contents, vis_list, bound, face_idx, face_num, ambience });
impl_put_struct!(TestNode { plane_idx, front, back, bound, face_idx, face_num });

/// A node with its children left in their raw 16-bit form.
#[derive(Debug, Clone, Copy)]
pub struct TestNode {
	pub plane_idx: i32,
	pub front: u16,
	pub back: u16,
	pub bound: ShortBoundingBox,
	pub face_idx: u16,
	pub face_num: u16,
}

impl TestNode {
	/// A node whose children are both leaves.
	pub fn with_faces(face_idx: u16, face_num: u16) -> Self {
		Self {
			plane_idx: 0,
			front: 0xFFFE,
			back: 0xFFFF,
			bound: ShortBoundingBox::default(),
			face_idx,
			face_num,
		}
	}
}

/// Builds a BSP file in memory, so tests can describe exactly the geometry they need.
#[derive(Debug, Clone)]
pub struct TestBsp {
	pub version: i32,
	pub entities: String,
	pub planes: Vec<BspPlane>,
	/// Name and size of square textures.
	pub textures: Vec<Option<(&'static str, u32)>>,
	pub vertices: Vec<Vec3>,
	pub nodes: Vec<TestNode>,
	pub tex_info: Vec<BspTexInfo>,
	pub faces: Vec<BspFace>,
	pub lighting: Vec<u8>,
	pub leaves: Vec<BspLeaf>,
	pub mark_surfaces: Vec<u16>,
	pub edges: Vec<[u16; 2]>,
	pub surface_edges: Vec<i32>,
	pub models: Vec<BspModel>,
}

impl TestBsp {
	pub const QUAD: [Vec3; 4] = [
		Vec3::new(0., 0., 0.),
		Vec3::new(64., 0., 0.),
		Vec3::new(64., 64., 0.),
		Vec3::new(0., 64., 0.),
	];

	fn face(first_edge: i32, num_edges: u16) -> BspFace {
		BspFace {
			plane_idx: 0,
			plane_side: 0,
			first_edge,
			num_edges,
			texture_info_idx: 0,
			light_type: 0,
			base_light: 0,
			light_models: [0; 2],
			lightmap_offset: -1,
		}
	}

	/// A single 64x64 floor quad on the Z = 0 plane, owned by the only node of the world.
	pub fn quad() -> Self {
		Self {
			version: 29,
			entities: "{\n\"classname\" \"worldspawn\"\n\"wad\" \"gfx/base.wad\"\n}\n{\n\"classname\" \"info_player_start\"\n\"origin\" \"32 32 24\"\n}\n"
				.to_string(),
			planes: vec![BspPlane {
				normal: Vec3::Z,
				dist: 0.,
				ty: 2,
			}],
			textures: vec![Some(("ground1_6", 64))],
			vertices: Self::QUAD.to_vec(),
			nodes: vec![TestNode::with_faces(0, 1)],
			tex_info: vec![BspTexInfo {
				projection: PlanarTextureProjection {
					u_axis: Vec3::X,
					u_offset: 0.,
					v_axis: Vec3::Y,
					v_offset: 0.,
				},
				texture_idx: 0,
				flags: 0,
			}],
			faces: vec![Self::face(0, 4)],
			lighting: Vec::new(),
			leaves: vec![
				BspLeaf {
					contents: -2,
					vis_list: -1,
					bound: ShortBoundingBox::default(),
					face_idx: 0,
					face_num: 0,
					ambience: [0; 4],
				},
				BspLeaf {
					contents: -1,
					vis_list: -1,
					bound: ShortBoundingBox {
						min: [0, 0, 0],
						max: [64, 64, 64],
					},
					face_idx: 0,
					face_num: 1,
					ambience: [0, 0, 255, 0],
				},
			],
			mark_surfaces: vec![0],
			// Edge 0 can't be referenced by surface edges.
			edges: vec![[0, 0], [0, 1], [1, 2], [2, 3], [3, 0]],
			surface_edges: vec![1, 2, 3, 4],
			models: vec![BspModel {
				bound: BoundingBox {
					min: Vec3::ZERO,
					max: Vec3::new(64., 64., 0.),
				},
				origin: Vec3::ZERO,
				head_nodes: [0; 4],
				visleafs: 1,
				first_face: 0,
				num_faces: 1,
			}],
		}
	}

	/// Three copies of the quad, spread over a root node (face 1), its front child (face 2) and its back child (face 0).
	pub fn three_nodes() -> Self {
		let mut test_bsp = Self::quad();
		test_bsp.faces = vec![Self::face(0, 4); 3];
		test_bsp.nodes = vec![
			TestNode {
				front: 1,
				back: 2,
				..TestNode::with_faces(1, 1)
			},
			TestNode::with_faces(2, 1),
			TestNode::with_faces(0, 1),
		];
		test_bsp.models[0].num_faces = 3;
		test_bsp
	}

	fn textures_lump(&self) -> Vec<u8> {
		let mut out = Vec::new();
		if self.textures.is_empty() {
			return out;
		}

		(self.textures.len() as u32).put(&mut out);
		let mut offset = 4 + 4 * self.textures.len() as i32;
		for texture in &self.textures {
			match texture {
				Some(_) => {
					offset.put(&mut out);
					offset += BspMipTexture::BSP_STRUCT_SIZE as i32;
				}
				None => (-1i32).put(&mut out),
			}
		}
		for (name, size) in self.textures.iter().flatten() {
			let mut name_bytes = [0u8; 16];
			name_bytes[..name.len()].copy_from_slice(name.as_bytes());
			name_bytes.put(&mut out);
			// Pixel data isn't included, but the offsets point where it would be.
			[*size, *size, 40, 40 + size * size, 40 + size * size * 5 / 4, 40 + size * size * 21 / 16].put(&mut out);
		}
		out
	}

	/// Writes the file, lumps in directory order straight after the header.
	pub fn build(&self) -> Vec<u8> {
		fn lump<T: Put>(items: &[T]) -> Vec<u8> {
			let mut out = Vec::new();
			items.iter().for_each(|x| x.put(&mut out));
			out
		}

		let mut entities = self.entities.as_bytes().to_vec();
		entities.push(0);

		let lumps: [Vec<u8>; 15] = [
			entities,
			lump(&self.planes),
			self.textures_lump(),
			lump(&self.vertices),
			Vec::new(),
			lump(&self.nodes),
			lump(&self.tex_info),
			lump(&self.faces),
			self.lighting.clone(),
			Vec::new(),
			lump(&self.leaves),
			lump(&self.mark_surfaces),
			lump(&self.edges),
			lump(&self.surface_edges),
			lump(&self.models),
		];

		let mut out = Vec::new();
		self.version.put(&mut out);
		let mut offset = BspHeader::BSP_STRUCT_SIZE as u32;
		for lump in &lumps {
			offset.put(&mut out);
			(lump.len() as u32).put(&mut out);
			offset += lump.len() as u32;
		}
		for lump in lumps {
			out.extend(lump);
		}
		out
	}
}

#[test]
fn quad_counts() {
	let bytes = TestBsp::quad().build();
	let bsp = BspData::parse(&bytes).unwrap();

	assert_eq!(bsp.header.version, 29);
	assert_eq!(bsp.vertices.len(), 4);
	assert_eq!(bsp.edges.len(), 5);
	assert_eq!(bsp.surface_edges.len(), 4);
	assert_eq!(bsp.planes.len(), 1);
	assert_eq!(bsp.faces.len(), 1);
	assert_eq!(bsp.nodes.len(), 1);
	assert_eq!(bsp.leaves.len(), 2);
	assert_eq!(bsp.mark_surfaces.to_vec().unwrap(), vec![0]);
	assert_eq!(bsp.models.len(), 1);
	assert!(bsp.lighting.is_empty());
	assert_eq!(bsp.textures.len(), 1);
	assert_eq!(bsp.textures[0].as_ref().unwrap().name.as_str(), "ground1_6");
}

#[test]
fn decoded_records() {
	let bytes = TestBsp::three_nodes().build();
	let bsp = BspData::parse(&bytes).unwrap();

	let root = bsp.nodes.get(0).unwrap();
	assert_eq!(*root.front, BspNodeRef::Node(1));
	assert_eq!(*root.back, BspNodeRef::Node(2));
	assert_eq!(root.face_range(), 1..2);

	let leaf_node = bsp.nodes.get(1).unwrap();
	assert_eq!(*leaf_node.front, BspNodeRef::Leaf(1));
	assert_eq!(*leaf_node.back, BspNodeRef::Leaf(0));

	let leaf = bsp.leaves.get(1).unwrap();
	assert_eq!(leaf.contents, -1);
	assert_eq!(leaf.bound.max, [64, 64, 64]);
	assert_eq!(leaf.ambience, [0, 0, 255, 0]);

	assert_eq!(bsp.models.get(0).unwrap().root(), BspNodeRef::Node(0));
	assert_eq!(bsp.tex_info.get(0).unwrap().projection.u_axis, Vec3::X);
}

#[test]
fn quad_scene() {
	let bytes = TestBsp::quad().build();
	let scene = BspData::parse(&bytes).unwrap().assemble_scene(&SceneSettings::default()).unwrap();

	assert_eq!(scene.vertices.len(), 4);
	assert_eq!(scene.indices, vec![0, 1, 2, 0, 2, 3]);
	assert_eq!(scene.triangles().collect::<Vec<_>>(), vec![[0, 1, 2], [0, 2, 3]]);
	assert_eq!(scene.faces, vec![0]);

	for (vertex, position) in scene.vertices.iter().zip(TestBsp::QUAD) {
		assert_eq!(vertex.position, position);
		assert_eq!(vertex.normal, Vec3::Z);
		assert_eq!(vertex.light, 0.);
	}
	assert_eq!(scene.interleaved_vertices().len(), 4 * 9);
}

#[test]
fn scene_follows_traversal_order() {
	let mut test_bsp = TestBsp::three_nodes();
	// Give each face its own plane, so their vertices can be told apart.
	test_bsp.planes = [Vec3::X, Vec3::Y, Vec3::Z]
		.into_iter()
		.map(|normal| BspPlane { normal, dist: 0., ty: 0 })
		.collect();
	for (i, face) in test_bsp.faces.iter_mut().enumerate() {
		face.plane_idx = i as u16;
	}
	let bytes = test_bsp.build();
	let scene = BspData::parse(&bytes).unwrap().assemble_scene(&SceneSettings::default()).unwrap();

	assert_eq!(scene.faces, vec![2, 1, 0]);
	assert_eq!(scene.vertices.len(), 12);
	assert_eq!(&scene.indices[6..12], &[4, 5, 6, 4, 6, 7]);
	assert_eq!(scene.vertices[0].normal, Vec3::Z);
	assert_eq!(scene.vertices[4].normal, Vec3::Y);
	assert_eq!(scene.vertices[8].normal, Vec3::X);

	assert!(scene.indices.iter().all(|i| (*i as usize) < scene.vertices.len()));
}

#[test]
fn degenerate_face_keeps_indices_valid() {
	let mut test_bsp = TestBsp::three_nodes();
	// Face 1 is visited second, the face after it still has to index its own vertices.
	test_bsp.faces[1].num_edges = 2;
	let bytes = test_bsp.build();
	let scene = BspData::parse(&bytes).unwrap().assemble_scene(&SceneSettings::default()).unwrap();

	assert_eq!(scene.faces, vec![2, 0]);
	assert_eq!(scene.vertices.len(), 8);
	assert_eq!(scene.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
}

#[test]
fn entities() {
	let bytes = TestBsp::quad().build();
	let bsp = BspData::parse(&bytes).unwrap();
	let entities = parse_entities(&bsp.entities).unwrap();

	assert_eq!(entities.len(), 2);
	assert_eq!(entities[0].get("wad"), Some("gfx/base.wad"));
	assert_eq!(entities[1].classname(), Some("info_player_start"));
}

#[test]
fn missing_textures() {
	let mut test_bsp = TestBsp::quad();
	test_bsp.textures = vec![None, Some(("+0button", 32))];
	test_bsp.tex_info[0].texture_idx = 1;
	let bytes = test_bsp.build();
	let bsp = BspData::parse(&bytes).unwrap();

	assert!(bsp.textures[0].is_none());
	assert_eq!(bsp.textures[1].as_ref().unwrap().width, 32);

	let scene = bsp
		.assemble_scene(&SceneSettings {
			normalize_uvs: true,
			..Default::default()
		})
		.unwrap();
	assert_eq!(scene.vertices[2].uv, glam::Vec2::new(2., 2.));
}

#[test]
fn no_textures() {
	let mut test_bsp = TestBsp::quad();
	test_bsp.textures.clear();
	let bytes = test_bsp.build();

	assert!(BspData::parse(&bytes).unwrap().textures.is_empty());
}

#[test]
fn unknown_version_still_parses() {
	let mut test_bsp = TestBsp::quad();
	test_bsp.version = 30;
	let bytes = test_bsp.build();
	let bsp = BspData::parse(&bytes).unwrap();

	assert!(!bsp.header.is_known_version());
	assert_eq!(bsp.faces.len(), 1);
}

#[test]
fn truncated_file() {
	let bytes = TestBsp::quad().build();

	assert!(matches!(
		BspData::parse(&bytes[..bytes.len() - 4]),
		Err(BspParseError::LumpOutOfBounds { lump: "models", .. })
	));
	assert!(BspData::parse(&bytes[..64]).is_err());
}

#[test]
fn malformed_edges_lump() {
	let mut bytes = TestBsp::quad().build();
	// Length of the edges lump, the 13th directory entry.
	let len_pos = 4 + 12 * 8 + 4;
	bytes[len_pos..len_pos + 4].copy_from_slice(&6u32.to_le_bytes());

	assert!(matches!(
		BspData::parse(&bytes),
		Err(BspParseError::MalformedLump { lump: "edges", record_size: 4, len: 6 })
	));
}

#[test]
fn zero_surface_edge() {
	let mut test_bsp = TestBsp::quad();
	test_bsp.surface_edges[2] = 0;
	let bytes = test_bsp.build();
	let err = BspData::parse(&bytes).unwrap().assemble_scene(&SceneSettings::default()).unwrap_err();

	assert!(matches!(err.root(), BspParseError::InvalidEdgeIndex { value: 0, num_edges: 5 }));
	assert!(err.to_string().starts_with("Resolving face 0"));
}

#[test]
fn vertex_out_of_range() {
	let mut test_bsp = TestBsp::quad();
	test_bsp.edges[2] = [9, 2];
	let bytes = test_bsp.build();
	let err = BspData::parse(&bytes).unwrap().assemble_scene(&SceneSettings::default()).unwrap_err();

	assert!(matches!(err.root(), BspParseError::InvalidIndex { kind: "vertices", index: 9, len: 4 }));
}

#[test]
fn plane_out_of_range() {
	let mut test_bsp = TestBsp::quad();
	test_bsp.faces[0].plane_idx = 1;
	let bytes = test_bsp.build();
	let err = BspData::parse(&bytes).unwrap().assemble_scene(&SceneSettings::default()).unwrap_err();

	assert!(matches!(err.root(), BspParseError::InvalidIndex { kind: "planes", index: 1, len: 1 }));
}

#[test]
fn tex_info_out_of_range() {
	let mut test_bsp = TestBsp::quad();
	test_bsp.faces[0].texture_info_idx = 5;
	let bytes = test_bsp.build();
	let err = BspData::parse(&bytes).unwrap().assemble_scene(&SceneSettings::default()).unwrap_err();

	assert!(matches!(err.root(), BspParseError::InvalidIndex { kind: "texture infos", index: 5, len: 1 }));
	assert!(err.to_string().starts_with("Resolving face 0"));
}

#[test]
fn negative_first_edge() {
	let mut test_bsp = TestBsp::quad();
	test_bsp.faces[0].first_edge = -1;
	let bytes = test_bsp.build();
	let err = BspData::parse(&bytes).unwrap().assemble_scene(&SceneSettings::default()).unwrap_err();

	assert!(matches!(err.root(), BspParseError::InvalidIndex { kind: "surface edges", index: -1, len: 4 }));
}

#[test]
fn undecoded_lumps_are_bounds_checked() {
	// Length fields of the visibility and clip nodes lumps, the 5th and 10th directory entries.
	for (entry, lump) in [(4, "visibility"), (9, "clip nodes")] {
		let mut bytes = TestBsp::quad().build();
		let len_pos = 4 + entry * 8 + 4;
		bytes[len_pos..len_pos + 4].copy_from_slice(&10_000u32.to_le_bytes());

		assert!(matches!(
			BspData::parse(&bytes),
			Err(BspParseError::LumpOutOfBounds { lump: l, .. }) if l == lump
		));
	}
}

#[test]
fn scene_outlives_file() {
	let scene = {
		let bytes = TestBsp::quad().build();
		BspData::parse(&bytes).unwrap().assemble_scene(&SceneSettings::default()).unwrap()
	};

	assert_eq!(scene.vertices.len(), 4);
}
