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

//! Per-frame scratch state of LOD selection: the visibility ranges derived
//! from the camera clip planes, the per-level morph tables for the vertex
//! shader, and the fixed-capacity buffer of selected nodes. The driver owns a
//! [`LodSelection`] value and may keep several independent ones (one per
//! view); selection and rendering borrow it.

use crate::{log::Log, math::lerpf, quadtree::Node, settings::TerrainSettings};
use nalgebra::{Vector3, Vector4};

/// A node picked by LOD selection, together with the quadrants of it the
/// renderer must emit.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedNode {
    /// Arena index of the node in the quadtree of its tile.
    pub node: u32,
    /// Index of the owning tile.
    pub tile_index: u32,
    /// Render LOD level of the node: 0 is the finest.
    pub lod_level: u32,
    /// Which quadrants of the node to draw, in TL, TR, BL, BR order.
    pub quadrants: [bool; 4],
    /// Distance from the camera to the node box; only populated when sorting
    /// is enabled.
    pub min_distance_to_camera: f32,
}

impl SelectedNode {
    /// Whether the whole grid patch is drawn for this node.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.quadrants.iter().all(|&quadrant| quadrant)
    }
}

/// See module docs. Usage per frame: `reset`, one `set_tile_index` +
/// quadtree descent per tile, `sort`, then iteration by the renderer.
pub struct LodSelection {
    lod_level_count: u32,
    max_selected_nodes: usize,
    lod_distance_ratio: f32,
    morph_start_ratio: f32,
    sort_by_distance: bool,
    near: f32,
    far: f32,
    visibility_ranges: Vec<f32>,
    morph_start: Vec<f32>,
    morph_end: Vec<f32>,
    entries: Vec<SelectedNode>,
    camera_position: Vector3<f32>,
    current_tile_index: u32,
    min_selected_level: u32,
    max_selected_level: u32,
    overflow_logged: bool,
}

impl LodSelection {
    /// Creates a selection buffer for the given settings. The entry storage is
    /// allocated once here; nothing allocates per frame.
    pub fn new(settings: &TerrainSettings) -> Self {
        let count = settings.lod_level_count as usize;
        Self {
            lod_level_count: settings.lod_level_count,
            max_selected_nodes: settings.max_selected_nodes,
            lod_distance_ratio: settings.lod_distance_ratio,
            morph_start_ratio: settings.morph_start_ratio,
            sort_by_distance: settings.sort_by_distance,
            near: f32::NAN,
            far: f32::NAN,
            visibility_ranges: vec![0.0; count],
            morph_start: vec![0.0; count],
            morph_end: vec![0.0; count],
            entries: Vec::with_capacity(settings.max_selected_nodes),
            camera_position: Vector3::default(),
            current_tile_index: 0,
            min_selected_level: settings.lod_level_count,
            max_selected_level: 0,
            overflow_logged: false,
        }
    }

    /// Derives the visibility ranges and morph tables for the given clip
    /// planes. The widths of the per-level bands grow geometrically with
    /// [`TerrainSettings::lod_distance_ratio`] towards the far plane; `far`
    /// must be greater than `near`.
    pub fn calculate_ranges(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;

        let count = self.lod_level_count as usize;
        let mut total = 0.0;
        let mut detail_balance = 1.0;
        for _ in 0..count {
            total += detail_balance;
            detail_balance *= self.lod_distance_ratio;
        }
        let sect = (far - near) / total;

        // Ranges are indexed by node level: [0] is the coarsest (root) band
        // reaching the far plane, [count - 1] the finest one next to the
        // camera.
        let mut prev_pos = near;
        detail_balance = 1.0;
        for i in 0..count {
            let index = count - 1 - i;
            self.visibility_ranges[index] = prev_pos + sect * detail_balance;
            prev_pos = self.visibility_ranges[index];
            detail_balance *= self.lod_distance_ratio;
        }

        // Morph tables are indexed by render LOD level, 0 the finest.
        prev_pos = near;
        Log::info("Lod levels and ranges: level/range/morph start/morph end");
        for i in 0..count {
            self.morph_end[i] = self.visibility_ranges[count - 1 - i];
            self.morph_start[i] = prev_pos + (self.morph_end[i] - prev_pos) * self.morph_start_ratio;
            prev_pos = self.morph_start[i];
            Log::info(format!(
                "\tlevel {}, range {}, start {}, end {}",
                i,
                self.visibility_ranges[count - 1 - i],
                self.morph_start[i],
                self.morph_end[i]
            ));
        }
    }

    /// Re-derives the range tables only when the clip planes changed since the
    /// last call.
    pub fn update_ranges(&mut self, near: f32, far: f32) {
        if self.near != near || self.far != far {
            self.calculate_ranges(near, far);
        }
    }

    /// Starts a new frame: drops all entries and the overflow latch, stores
    /// the camera position for distance sorting.
    pub fn reset(&mut self, camera_position: Vector3<f32>) {
        self.entries.clear();
        self.camera_position = camera_position;
        self.min_selected_level = self.lod_level_count;
        self.max_selected_level = 0;
        self.overflow_logged = false;
    }

    /// Subsequent adds carry the given tile index.
    #[inline]
    pub fn set_tile_index(&mut self, index: u32) {
        self.current_tile_index = index;
    }

    /// Appends a node to the selection; returns false (and warns once per
    /// frame) when the buffer is at capacity.
    pub(crate) fn add(
        &mut self,
        node: &Node,
        node_index: u32,
        lod_level: u32,
        quadrants: [bool; 4],
    ) -> bool {
        if self.entries.len() >= self.max_selected_nodes {
            if !self.overflow_logged {
                self.overflow_logged = true;
                Log::warn("Maximum selected node count exceeded, some terrain will not be drawn");
            }
            return false;
        }
        let min_distance_to_camera = if self.sort_by_distance {
            node.aabb.squared_distance(self.camera_position).sqrt()
        } else {
            0.0
        };
        self.entries.push(SelectedNode {
            node: node_index,
            tile_index: self.current_tile_index,
            lod_level,
            quadrants,
            min_distance_to_camera,
        });
        self.min_selected_level = self.min_selected_level.min(lod_level);
        self.max_selected_level = self.max_selected_level.max(lod_level);
        true
    }

    /// Reorders the selection by distance to the camera, closest first. Does
    /// nothing unless sorting is enabled; the sort is stable, so entries at
    /// equal distance keep their insertion order.
    pub fn sort(&mut self) {
        if self.sort_by_distance {
            self.entries
                .sort_by(|a, b| a.min_distance_to_camera.total_cmp(&b.min_distance_to_camera));
        }
    }

    /// Selected nodes of the current frame, in insertion (or sorted) order.
    #[inline]
    pub fn entries(&self) -> &[SelectedNode] {
        &self.entries
    }

    /// Amount of selected nodes; never exceeds the configured capacity.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing got selected this frame.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The smallest render LOD level among this frame's entries; equals the
    /// level count while the selection is empty.
    #[inline]
    pub fn min_selected_level(&self) -> u32 {
        self.min_selected_level
    }

    /// The largest render LOD level among this frame's entries.
    #[inline]
    pub fn max_selected_level(&self) -> u32 {
        self.max_selected_level
    }

    /// Amount of LOD levels the tables are sized for.
    #[inline]
    pub fn lod_level_count(&self) -> u32 {
        self.lod_level_count
    }

    /// Visibility range of the given node level (0 = root, coarsest).
    #[inline]
    pub fn visibility_range(&self, level: u32) -> f32 {
        self.visibility_ranges[level as usize]
    }

    /// Visibility range one level finer than the given node level, or `None`
    /// at the finest level.
    #[inline]
    pub fn next_visibility_range(&self, level: u32) -> Option<f32> {
        self.visibility_ranges.get(level as usize + 1).copied()
    }

    /// Morph constants of the given render LOD level packed for the vertex
    /// shader: `(start, 1/d, end/d, 1/d)`. The end is pulled back towards the
    /// start by 1% so the divisor never collapses at the range boundary.
    pub fn morph_consts(&self, lod_level: u32) -> Vector4<f32> {
        let start = self.morph_start[lod_level as usize];
        let error_fudge = 0.01;
        let end = lerpf(self.morph_end[lod_level as usize], start, error_fudge);
        let d = end - start;
        Vector4::new(start, 1.0 / d, end / d, 1.0 / d)
    }
}
