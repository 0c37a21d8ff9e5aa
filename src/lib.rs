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

//! Renderer core for large heightfield terrains based on CDLOD (continuous
//! distance-dependent level of detail).
//!
//! The pipeline, leaves first:
//!
//! 1. [`heightmap::Heightmap`] owns the 16-bit height raster and answers min/max
//!    queries over sub-rectangles.
//! 2. [`quadtree::QuadTree`] covers a tile with a flat-allocated tree of
//!    height-bounded nodes and runs the per-frame LOD selection against the
//!    [`math::frustum::ViewFrustum`].
//! 3. [`lod::LodSelection`] is the per-frame scratch buffer of selected nodes
//!    plus the visibility/morph range tables derived from the camera planes.
//! 4. [`geometry::GridMesh`] is the single reusable grid patch whose index
//!    buffer is partitioned into four quadrant sub-ranges.
//! 5. [`tile::TerrainTile`] binds a heightmap, its world bounding box (loaded
//!    from a plain-text sidecar file) and a quadtree.
//! 6. [`terrain::Terrain`] orchestrates the tiles and translates a selection
//!    into the minimal stream of uniforms and draw records for the
//!    [`renderer`] backend contract.
//!
//! The GPU itself stays behind the [`renderer::server::GraphicsServer`] and
//! [`renderer::DrawContext`] traits; the crate never touches a window, a GL
//! context or shader sources.

#![allow(clippy::too_many_arguments)]

pub use relief_math as math;

pub mod debug;
pub mod error;
pub mod geometry;
pub mod heightmap;
pub mod lod;
pub mod log;
pub mod quadtree;
pub mod renderer;
pub mod settings;
pub mod terrain;
pub mod tile;
