pub use crate::{
	data::{
		models::{BspEdge, BspFace, BspModel, BspTexInfo},
		nodes::{BspLeaf, BspNode, BspNodeRef, BspPlane},
		texture::BspMipTexture,
		BspHeader, LumpView,
	},
	entities::{parse_entities, BspEntity},
	pak::{PakArchive, PakEntry, PakError},
	scene::{RawRecords, Scene, SceneSettings, SceneTexture, SceneVertex},
	BspData, BspParseError, BspResult,
};
