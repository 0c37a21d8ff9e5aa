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

//! The contract between the terrain core and a graphics backend: resource
//! creation ([`server`]), the per-frame draw sink ([`DrawContext`]) and the
//! uniform blocks the terrain shader expects. The core emits draw records
//! directly into the sink, nothing is accumulated on this side.

use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};
use std::{
    fmt::{Display, Formatter},
    ops::AddAssign,
};

use crate::renderer::server::{GpuGeometryBuffer, GpuProgram, GpuTexture};

pub mod server;

/// Texture unit the heightmap of the currently rendered tile is bound to; the
/// terrain shader samples it from there.
pub const HEIGHTMAP_TEXTURE_UNIT: u32 = 0;

/// A range of elements (triangles) of a geometry buffer to draw.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ElementRange {
    /// All available elements.
    #[default]
    Full,
    /// Specific range of elements. Used to draw a single quadrant of the grid
    /// patch mesh out of the shared index buffer.
    Specific {
        /// Offset (in indices) from the beginning of the buffer.
        offset: usize,
        /// Total amount of indices to draw.
        count: usize,
    },
}

/// Statistics of a single draw call, as reported by the backend.
#[derive(Copy, Clone, Debug, Default)]
pub struct DrawCallStatistics {
    /// Amount of triangles the call rasterized.
    pub triangles: usize,
}

/// Aggregated statistics of one terrain frame.
#[derive(Copy, Clone, Debug, Default)]
pub struct RenderStatistics {
    /// Total amount of draw calls emitted.
    pub draw_calls: usize,
    /// Total amount of triangles drawn.
    pub triangles: usize,
    /// Total amount of selected nodes that produced at least one draw call.
    pub nodes: usize,
}

impl AddAssign<DrawCallStatistics> for RenderStatistics {
    fn add_assign(&mut self, rhs: DrawCallStatistics) {
        self.draw_calls += 1;
        self.triangles += rhs.triangles;
    }
}

impl Display for RenderStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Terrain frame: {} draw calls, {} triangles, {} nodes",
            self.draw_calls, self.triangles, self.nodes
        )
    }
}

/// Uniforms pushed once per frame.
#[derive(Clone, Debug)]
pub struct FrameUniforms {
    /// Combined view-projection matrix of the observer.
    pub view_projection: Matrix4<f32>,
    /// World-space camera position.
    pub camera_position: Vector3<f32>,
    /// Homogeneous light position; `w == 0.0` means a directional light.
    pub light_position: Vector4<f32>,
    /// RGB intensity of the light.
    pub light_intensity: Vector3<f32>,
    /// Optional normal matrix for view-space lighting.
    pub normal_matrix: Option<Matrix3<f32>>,
    /// Grid patch dimensions as `(dimension, dimension / 2, 2 / dimension)`.
    /// Filled in by the terrain before the frame uniforms are pushed, any
    /// caller-provided value is overwritten.
    pub grid_dim: Vector3<f32>,
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            view_projection: Matrix4::identity(),
            camera_position: Vector3::default(),
            light_position: Vector4::new(0.3, 0.5, 0.0, 0.0),
            light_intensity: Vector3::new(2.5, 2.5, 2.5),
            normal_matrix: None,
            grid_dim: Vector3::default(),
        }
    }
}

/// Uniforms pushed once per tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TileUniforms {
    /// World-space minimum corner of the tile bounding box.
    pub tile_offset: Vector3<f32>,
    /// World-space size of the tile bounding box.
    pub tile_scale: Vector3<f32>,
    /// Maximum world-space x/z of the tile, used to clamp skirt vertices.
    pub tile_max: Vector2<f32>,
    /// `(extent - 1) / extent` in both directions; clamps sampling so the far
    /// raster edge is never interpolated past the last texel row.
    pub tile_to_texture: Vector2<f32>,
    /// `(extent, extent, 1 / extent, 1 / extent)` of the tile heightmap.
    pub heightmap_texture_info: Vector4<f32>,
    /// Scales normalized heights into world units.
    pub height_factor: f32,
}

/// Uniforms pushed once per selected node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeUniforms {
    /// `(size.x, 0, size.z, lod_level)` of the node.
    pub node_scale: Vector4<f32>,
    /// `(aabb.min.x, (aabb.min.y + aabb.max.y) / 2, aabb.min.z)` of the node.
    pub node_offset: Vector3<f32>,
}

/// Per-frame sink the terrain emits draw records into. A backend implements
/// this on top of whatever draw-call machinery it has; the terrain guarantees
/// the call order: program and geometry are bound first, then frame uniforms,
/// then per tile texture + uniforms, then morph constants at most once per
/// (tile, level) pair, then node uniforms followed by one to four draws.
pub trait DrawContext {
    /// Makes the given program current for subsequent draws.
    fn bind_program(&mut self, program: &dyn GpuProgram);

    /// Makes the given geometry buffer current for subsequent draws.
    fn bind_geometry(&mut self, geometry: &dyn GpuGeometryBuffer);

    /// Binds a texture to the given texture unit.
    fn bind_texture(&mut self, unit: u32, texture: &dyn GpuTexture);

    /// Pushes the frame-global uniforms.
    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms);

    /// Pushes the tile-scope uniforms.
    fn set_tile_uniforms(&mut self, uniforms: &TileUniforms);

    /// Pushes the morph constants of the LOD level of subsequent draws.
    fn set_morph_consts(&mut self, consts: Vector4<f32>);

    /// Pushes the node-scope uniforms.
    fn set_node_uniforms(&mut self, uniforms: &NodeUniforms);

    /// Draws the given range of the currently bound geometry with the
    /// currently bound program and uniforms.
    fn draw(&mut self, element_range: ElementRange) -> DrawCallStatistics;
}
