// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Tuning knobs of the terrain core. Every value is checked once at startup;
//! anything out of range aborts initialization with a descriptive error.

use crate::error::TerrainError;
use serde::{Deserialize, Serialize};

/// Maximum side length of a heightmap raster in texels.
pub const MAX_HEIGHTMAP_EXTENT: u32 = 16384;

/// Terrain quality and layout settings. The defaults match a mid-size terrain
/// (a few thousand raster cells per side) and are a sane starting point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainSettings {
    /// Number of LOD levels of every tile quadtree, including the root level.
    pub lod_level_count: u32,
    /// Side length of a leaf node in raster cells. Must be a power of two.
    /// Smaller leaves raise the node count (and memory usage) sharply.
    pub leaf_node_size: u32,
    /// Texel-to-grid ratio of the render patch. Must be a power of two.
    pub render_grid_resolution_mult: u32,
    /// Capacity of the per-frame selection buffer. When the selection
    /// overflows, excess nodes are not drawn for that frame.
    pub max_selected_nodes: usize,
    /// Determines rendering LOD level distribution based on distance from the
    /// viewer. A value of 2.0 should result in an equal number of triangles
    /// displayed on screen (on average) for all distances. Values above 2.0
    /// will result in fewer triangles on closer areas, and vice versa. Must be
    /// in `[1.5, 16.0]`.
    pub lod_distance_ratio: f32,
    /// Fraction of a visibility range at which vertices start morphing to the
    /// next (lower-detailed) LOD level. With the default of 0.7 the first 70%
    /// of the range is not morphed and the morph goes from 0.7 to 1.0.
    pub morph_start_ratio: f32,
    /// Scales normalized `0..1` heights into world units.
    pub height_factor: f32,
    /// When set, the selection is sorted by distance to the camera, closest
    /// first, before rendering.
    pub sort_by_distance: bool,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            lod_level_count: 5,
            leaf_node_size: 32,
            render_grid_resolution_mult: 2,
            max_selected_nodes: 1024,
            lod_distance_ratio: 2.0,
            morph_start_ratio: 0.7,
            height_factor: 655.35 * 2.0,
            sort_by_distance: false,
        }
    }
}

impl TerrainSettings {
    /// Side length of the shared grid patch mesh in quads.
    #[inline]
    pub fn gridmesh_dimension(&self) -> u32 {
        self.leaf_node_size * self.render_grid_resolution_mult
    }

    /// Side length of a root quadtree node in raster cells.
    #[inline]
    pub fn top_node_size(&self) -> u32 {
        self.leaf_node_size << (self.lod_level_count - 1)
    }

    /// Minimum permitted heightmap side length for these settings.
    #[inline]
    pub fn min_heightmap_extent(&self) -> u32 {
        2 * self.leaf_node_size
    }

    /// Checks every field against its permitted range.
    pub fn validate(&self) -> Result<(), TerrainError> {
        if !(2..=15).contains(&self.lod_level_count) {
            return Err(TerrainError::InvalidSettings(format!(
                "lod_level_count must be between 2 and 15, got {}",
                self.lod_level_count
            )));
        }
        if !self.leaf_node_size.is_power_of_two() || !(8..=1024).contains(&self.leaf_node_size) {
            return Err(TerrainError::InvalidSettings(format!(
                "leaf_node_size must be a power of two between 8 and 1024, got {}",
                self.leaf_node_size
            )));
        }
        if !self.render_grid_resolution_mult.is_power_of_two()
            || self.render_grid_resolution_mult < 1
            || self.render_grid_resolution_mult > self.leaf_node_size
        {
            return Err(TerrainError::InvalidSettings(format!(
                "render_grid_resolution_mult must be a power of two between 1 and \
                leaf_node_size ({}), got {}",
                self.leaf_node_size, self.render_grid_resolution_mult
            )));
        }
        let gridmesh_dimension = self.gridmesh_dimension();
        if !gridmesh_dimension.is_power_of_two() || !(8..=1024).contains(&gridmesh_dimension) {
            return Err(TerrainError::InvalidSettings(format!(
                "grid mesh dimension must be a power of two between 8 and 1024, got {}",
                gridmesh_dimension
            )));
        }
        if !(1.5..=16.0).contains(&self.lod_distance_ratio) {
            return Err(TerrainError::InvalidSettings(format!(
                "lod_distance_ratio must be between 1.5 and 16.0, got {}",
                self.lod_distance_ratio
            )));
        }
        if self.morph_start_ratio <= 0.0 || self.morph_start_ratio >= 1.0 {
            return Err(TerrainError::InvalidSettings(format!(
                "morph_start_ratio must be strictly between 0.0 and 1.0, got {}",
                self.morph_start_ratio
            )));
        }
        if self.max_selected_nodes == 0 {
            return Err(TerrainError::InvalidSettings(
                "max_selected_nodes must be non-zero".to_owned(),
            ));
        }
        if self.height_factor <= 0.0 {
            return Err(TerrainError::InvalidSettings(format!(
                "height_factor must be positive, got {}",
                self.height_factor
            )));
        }
        Ok(())
    }
}
