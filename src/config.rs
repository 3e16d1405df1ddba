use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TD", alias = "TB")]
    TopDown,
    #[serde(rename = "LR")]
    LeftRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub direction: Direction,
    /// Gap between neighbouring nodes of one rank.
    pub node_spacing: f32,
    /// Gap between consecutive ranks.
    pub rank_spacing: f32,
    /// Margin kept around the whole drawing.
    pub padding: f32,
    pub node_padding_x: f32,
    pub node_padding_y: f32,
    pub font_size: f32,
    pub label_line_height: f32,
    pub min_node_width: f32,
    pub min_node_height: f32,
    /// Distance between the lanes of parallel edges.
    pub multi_edge_spacing: f32,
    pub self_loop_padding: f32,
    /// Segments used to flatten a curved edge into a polyline.
    pub curve_samples: usize,
    /// Median sweeps used to reduce crossings.
    pub order_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TopDown,
            node_spacing: 50.0,
            rank_spacing: 80.0,
            padding: 8.0,
            node_padding_x: 24.0,
            node_padding_y: 12.0,
            font_size: 14.0,
            label_line_height: 1.4,
            min_node_width: 60.0,
            min_node_height: 36.0,
            multi_edge_spacing: 28.0,
            self_loop_padding: 24.0,
            curve_samples: 12,
            order_passes: 4,
        }
    }
}

impl LayoutConfig {
    /// Copy with every value clamped into a range the layout can work with.
    pub fn sanitized(&self) -> Self {
        let positive = |value: f32, floor: f32| {
            if value.is_finite() {
                value.max(floor)
            } else {
                floor
            }
        };
        Self {
            direction: self.direction,
            node_spacing: positive(self.node_spacing, 1.0),
            rank_spacing: positive(self.rank_spacing, 1.0),
            padding: positive(self.padding, 0.0),
            node_padding_x: positive(self.node_padding_x, 0.0),
            node_padding_y: positive(self.node_padding_y, 0.0),
            font_size: positive(self.font_size, 1.0),
            label_line_height: positive(self.label_line_height, 1.0),
            min_node_width: positive(self.min_node_width, 1.0),
            min_node_height: positive(self.min_node_height, 1.0),
            multi_edge_spacing: positive(self.multi_edge_spacing, 1.0),
            self_loop_padding: positive(self.self_loop_padding, 1.0),
            curve_samples: self.curve_samples.clamp(2, 64),
            order_passes: self.order_passes.min(32),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&contents)?;
    tracing::debug!(path = %path.display(), "loaded layout config");
    Ok(config)
}
