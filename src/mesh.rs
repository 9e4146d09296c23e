//! Resolving the cross-referencing indices of [`BspData`] into vertex loops and triangles.

use glam::Vec3;
use smallvec::SmallVec;

use crate::{
	data::{models::BspFace, nodes::BspNodeRef},
	BspData, BspParseError, BspResult,
};

/// The vertex loop of a single face. Most faces of real maps have 8 or fewer edges.
pub type FaceLoop = SmallVec<[Vec3; 8]>;

impl BspData<'_> {
	/// Resolves a surface edge into the pair of vertex indices it connects, in winding order.
	///
	/// A positive value walks the edge from `a` to `b`, a negative one from `b` to `a`.
	/// Edge 0 can't be referenced, as it has no sign.
	pub fn resolve_surface_edge(&self, surface_edge: i32) -> BspResult<(u32, u32)> {
		let num_edges = self.edges.len();
		let edge_idx = surface_edge.unsigned_abs() as usize;
		if surface_edge == 0 || edge_idx >= num_edges {
			return Err(BspParseError::InvalidEdgeIndex {
				value: surface_edge,
				num_edges,
			});
		}

		let edge = self.edges.get(edge_idx)?;
		Ok(if surface_edge.is_negative() {
			(edge.b as u32, edge.a as u32)
		} else {
			(edge.a as u32, edge.b as u32)
		})
	}

	/// Returns the vertex positions of `face` in winding order, one for each of its surface edges.
	pub fn face_vertices(&self, face: &BspFace) -> BspResult<FaceLoop> {
		if face.first_edge.is_negative() {
			return Err(BspParseError::invalid_index("surface edges", face.first_edge, self.surface_edges.len()));
		}
		let first_edge = face.first_edge as usize;

		(first_edge..first_edge + face.num_edges as usize)
			.map(|i| {
				let (leading, _) = self.resolve_surface_edge(self.surface_edges.get(i)?)?;
				self.vertices.get(leading as usize)
			})
			.collect()
	}

	/// Collects the faces of a model by walking its node tree, front child first, then the node's own faces, then
	/// the back child.
	///
	/// Leaves end the walk, the faces they reference are the same ones nodes already own.
	pub fn model_faces(&self, model_idx: usize) -> BspResult<Vec<u32>> {
		enum Step {
			Node(u32),
			Faces(std::ops::Range<u32>),
		}

		let model = self.models.get(model_idx)?;
		let mut faces = Vec::new();
		let mut visited = vec![false; self.nodes.len()];
		let mut stack: Vec<Step> = model.root().node().map(Step::Node).into_iter().collect();

		while let Some(step) = stack.pop() {
			match step {
				Step::Node(node_idx) => {
					let node = self.nodes.get(node_idx as usize)?;
					let seen = &mut visited[node_idx as usize];
					if *seen {
						return Err(BspParseError::CyclicNodeTree { node: node_idx });
					}
					*seen = true;

					// Pushed in reverse, so the front child comes off first.
					if let BspNodeRef::Node(back) = *node.back {
						stack.push(Step::Node(back));
					}
					stack.push(Step::Faces(node.face_range()));
					if let BspNodeRef::Node(front) = *node.front {
						stack.push(Step::Node(front));
					}
				}
				Step::Faces(range) => {
					for face_idx in range {
						if face_idx as usize >= self.faces.len() {
							return Err(BspParseError::invalid_index("faces", face_idx, self.faces.len()));
						}
						faces.push(face_idx);
					}
				}
			}
		}

		log::debug!(
			"Model {model_idx}: visited {} nodes, collected {} faces",
			visited.iter().filter(|v| **v).count(),
			faces.len()
		);

		Ok(faces)
	}
}

/// Triangulates a convex polygon of `num_vertices` vertices starting at `base` as a fan around its first vertex.
///
/// Polygons with fewer than 3 vertices produce nothing.
pub fn fan_triangles(base: u32, num_vertices: u32) -> impl Iterator<Item = [u32; 3]> {
	(1..num_vertices.saturating_sub(1)).map(move |f| [base, base + f, base + f + 1])
}
