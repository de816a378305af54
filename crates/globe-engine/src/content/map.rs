use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scene::{ContentKind, Node, NodeRef};
use crate::time::FrameStamp;
use crate::util::sync::write;

use super::Ellipsoid;

/// One layer entry of a map description.
///
/// Only `type` and `name` are interpreted here; everything else is carried
/// for the layer implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub options: serde_json::Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct MapDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    layers: Vec<LayerConfig>,
}

/// Layer collection of the globe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map {
    pub name: Option<String>,
    layers: Vec<LayerConfig>,
}

impl Map {
    /// Imports properties and layers from a map description.
    ///
    /// Layers are appended; a name in `value` replaces the current one.
    /// Returns how many layers were added. On error the map is unchanged.
    pub fn from_json(&mut self, value: &Value) -> Result<usize> {
        let doc: MapDocument =
            serde_json::from_value(value.clone()).context("invalid map description")?;

        if doc.name.is_some() {
            self.name = doc.name;
        }
        let added = doc.layers.len();
        self.layers.extend(doc.layers);
        Ok(added)
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "layers": self.layers,
        })
    }

    #[inline]
    pub fn layers(&self) -> &[LayerConfig] {
        &self.layers
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn add_layer(&mut self, layer: LayerConfig) {
        self.layers.push(layer);
    }
}

/// Terrain engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Tile loads in flight.
    pub concurrency: u32,

    /// Skirt height as a fraction of tile width.
    pub skirt_ratio: f32,

    pub min_level_of_detail: u32,
    pub max_level_of_detail: u32,

    /// Pixels of error tolerated before a tile is subdivided.
    pub screen_space_error: f32,

    /// Terrain state is mutex-protected because several windows record
    /// concurrently.
    pub support_multi_threaded_record: bool,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            concurrency: 6,
            skirt_ratio: 0.025,
            min_level_of_detail: 1,
            max_level_of_detail: 19,
            screen_space_error: 135.0,
            support_multi_threaded_record: false,
        }
    }
}

/// Scene node rendering the map.
#[derive(Debug)]
pub struct MapNode {
    pub map: Map,
    pub settings: TerrainSettings,
    pub ellipsoid: Ellipsoid,
    node: NodeRef,
    synced_layers: usize,
    updates: u64,
    last_frame: Option<u64>,
}

impl MapNode {
    pub fn new(settings: TerrainSettings) -> Self {
        Self {
            map: Map::default(),
            settings,
            ellipsoid: Ellipsoid::WGS84,
            node: Node::content(ContentKind::Map, 0),
            synced_layers: 0,
            updates: 0,
            last_frame: None,
        }
    }

    /// Scene-graph handle; the content asks for one GPU resource per layer.
    #[inline]
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Per-frame tile and paged-data management.
    pub fn update(&mut self, stamp: &FrameStamp) {
        self.updates += 1;
        self.last_frame = Some(stamp.frame_count);

        let layers = self.map.layer_count();
        if layers != self.synced_layers {
            if let Node::Content(content) = &mut *write(&self.node) {
                content.resources = layers as u32;
            }
            self.synced_layers = layers;
        }
    }

    #[inline]
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    #[inline]
    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::sync::read;

    #[test]
    fn from_json_appends_layers() {
        let mut map = Map::default();
        let doc = serde_json::json!({
            "name": "demo",
            "layers": [
                { "type": "TMSImage", "name": "imagery", "uri": "https://example.invalid/{z}/{x}/{y}.png" },
                { "type": "GDALElevation" }
            ]
        });

        assert_eq!(map.from_json(&doc).unwrap(), 2);
        assert_eq!(map.from_json(&doc).unwrap(), 2);
        assert_eq!(map.layer_count(), 4);
        assert_eq!(map.name.as_deref(), Some("demo"));
        assert_eq!(map.layers()[0].options["uri"], "https://example.invalid/{z}/{x}/{y}.png");
    }

    #[test]
    fn invalid_description_leaves_map_unchanged() {
        let mut map = Map::default();
        map.add_layer(LayerConfig {
            kind: "TMSImage".into(),
            name: None,
            options: Default::default(),
        });

        let bad = serde_json::json!({ "layers": [ { "name": "no type" } ] });
        assert!(map.from_json(&bad).is_err());
        assert_eq!(map.layer_count(), 1);
    }

    #[test]
    fn document_without_layers_adds_nothing() {
        let mut map = Map::default();
        assert_eq!(map.from_json(&serde_json::json!({})).unwrap(), 0);
    }

    #[test]
    fn terrain_defaults() {
        let s = TerrainSettings::default();
        assert_eq!(s.concurrency, 6);
        assert_eq!(s.skirt_ratio, 0.025);
        assert_eq!(s.min_level_of_detail, 1);
        assert_eq!(s.screen_space_error, 135.0);
        assert!(!s.support_multi_threaded_record);
    }

    #[test]
    fn update_syncs_layer_resources() {
        let mut node = MapNode::new(TerrainSettings::default());
        node.map
            .from_json(&serde_json::json!({ "layers": [ { "type": "a" }, { "type": "b" } ] }))
            .unwrap();
        node.update(&FrameStamp::initial(std::time::Instant::now()));

        assert_eq!(node.update_count(), 1);
        assert_eq!(node.last_frame(), Some(0));
        match &*read(node.node()) {
            Node::Content(c) => assert_eq!(c.resources, 2),
            other => panic!("unexpected node {other:?}"),
        }
    }
}
