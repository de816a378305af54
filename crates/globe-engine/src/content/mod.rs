//! Scene content: the globe's map, terrain settings, sky and the ECS
//! systems group.
//!
//! Content internals (tiling, layer drivers, system rendering) live behind
//! these surfaces; the shell only sequences their update passes.

mod ellipsoid;
mod import;
mod map;
mod systems;

use crate::scene::{ContentKind, Node, NodeRef};

pub use ellipsoid::Ellipsoid;
pub use import::{read_map_file, EarthFileImporter};
pub use map::{LayerConfig, Map, MapNode, TerrainSettings};
pub use systems::{EcsSystem, RenderSystem, SystemsGroup};

/// Resources a sky node requests: sun light and atmosphere.
const SKY_RESOURCES: u32 = 2;

pub fn sky_node() -> NodeRef {
    Node::content(ContentKind::Sky, SKY_RESOURCES)
}
