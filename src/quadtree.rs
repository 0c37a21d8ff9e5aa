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

//! Terrain-specific quadtree. Every tile covers its raster with a grid of
//! root nodes that subdivide down to [`TerrainSettings::leaf_node_size`];
//! each node carries the min/max height of its footprint so LOD selection can
//! test tight world-space boxes. The whole tree lives in one flat arena,
//! children are indices into it.

use crate::{
    error::TerrainError,
    heightmap::Heightmap,
    lod::LodSelection,
    log::Log,
    math::{
        aabb::AxisAlignedBoundingBox,
        frustum::{Containment, ViewFrustum},
    },
    settings::TerrainSettings,
};
use nalgebra::Vector3;
use std::mem::size_of;

/// Sentinel arena index marking an absent child. A child is absent only when
/// its footprint would lie entirely past the raster edge.
pub const INVALID_NODE: u32 = u32::MAX;

/// One of the four children of a node; also names the matching sub-range of
/// the grid patch index buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Quadrant {
    /// Lower x, lower z.
    TopLeft = 0,
    /// Upper x, lower z.
    TopRight = 1,
    /// Lower x, upper z.
    BottomLeft = 2,
    /// Upper x, upper z.
    BottomRight = 3,
}

impl Quadrant {
    /// All quadrants in child order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// Index of the quadrant in child arrays and quadrant flag arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A single cell of the quadtree.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Raster-space origin (top-left corner) of the node footprint.
    pub x: u32,
    /// Raster-space origin (top-left corner) of the node footprint.
    pub z: u32,
    /// Side length of the footprint in raster cells.
    pub size: u32,
    /// Depth in the tree; 0 is a root, `lod_level_count - 1` is a leaf.
    pub level: u32,
    /// Smallest raw height over the footprint (clipped to the raster).
    pub min_height: u16,
    /// Largest raw height over the footprint (clipped to the raster).
    pub max_height: u16,
    /// World-space bounding box of the footprint.
    pub aabb: AxisAlignedBoundingBox,
    children: [u32; 4],
}

impl Node {
    /// Whether this node is at the finest subdivision level.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        // The top-left child exists for every interior node.
        self.children[Quadrant::TopLeft.index()] == INVALID_NODE
    }

    /// Arena index of the given child, if present.
    #[inline]
    pub fn child(&self, quadrant: Quadrant) -> Option<u32> {
        let index = self.children[quadrant.index()];
        (index != INVALID_NODE).then_some(index)
    }
}

/// Per-node outcome of the LOD selection recursion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectResult {
    /// The node is outside the view frustum; nothing of it is drawn.
    Outside,
    /// The node is visible but farther than the visibility range of its
    /// level; its parent covers the area.
    OutOfRange,
    /// The node (or at least one of its descendants) added itself to the
    /// selection.
    Selected,
}

/// Total node count of a quadtree over a raster of the given extent, before
/// building it.
pub fn precomputed_node_count(extent: u32, settings: &TerrainSettings) -> u32 {
    let mut total = 0;
    for i in 0..settings.lod_level_count {
        let node_size = settings.leaf_node_size << i;
        let count = (extent - 1) / node_size + 1;
        total += count * count;
    }
    total
}

struct BuildContext<'a> {
    heightmap: &'a Heightmap,
    tile_min: Vector3<f32>,
    height_factor: f32,
    leaf_node_size: u32,
    finest_level: u32,
}

/// A tile's full node tree in one contiguous arena, indexed top-down.
pub struct QuadTree {
    nodes: Vec<Node>,
    roots: Vec<u32>,
    top_node_size: u32,
    top_node_count: u32,
}

impl QuadTree {
    /// Builds the tree over the given heightmap. `tile_min` is the world-space
    /// minimum corner of the owning tile; node boxes are offset from it.
    pub fn new(
        heightmap: &Heightmap,
        tile_min: Vector3<f32>,
        settings: &TerrainSettings,
    ) -> Result<Self, TerrainError> {
        let extent = heightmap.extent();
        let total = precomputed_node_count(extent, settings);
        let top_node_size = settings.top_node_size();
        let top_node_count = (extent - 1) / top_node_size + 1;

        let mut nodes = Vec::with_capacity(total as usize);
        let mut roots = Vec::with_capacity((top_node_count * top_node_count) as usize);
        let context = BuildContext {
            heightmap,
            tile_min,
            height_factor: settings.height_factor,
            leaf_node_size: settings.leaf_node_size,
            finest_level: settings.lod_level_count - 1,
        };
        for z in 0..top_node_count {
            for x in 0..top_node_count {
                roots.push(build_node(
                    &mut nodes,
                    &context,
                    x * top_node_size,
                    z * top_node_size,
                    top_node_size,
                    0,
                )?);
            }
        }

        if nodes.len() != total as usize {
            return Err(TerrainError::Invariant(format!(
                "quadtree not built: node count {} does not equal the precomputed count {}",
                nodes.len(),
                total
            )));
        }

        Log::info(format!(
            "Quadtree created. {} nodes, size in memory {:.2} kb, {}x{} top level nodes",
            nodes.len(),
            (nodes.len() * size_of::<Node>()) as f32 / 1024.0,
            top_node_count,
            top_node_count
        ));

        Ok(Self {
            nodes,
            roots,
            top_node_size,
            top_node_count,
        })
    }

    /// The node at the given arena index.
    #[inline]
    pub fn node(&self, index: u32) -> &Node {
        &self.nodes[index as usize]
    }

    /// The whole arena, parents before their children.
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Arena indices of the root grid, row-major.
    #[inline]
    pub fn roots(&self) -> &[u32] {
        &self.roots
    }

    /// Side length of a root node in raster cells.
    #[inline]
    pub fn top_node_size(&self) -> u32 {
        self.top_node_size
    }

    /// Side length of the root grid in nodes.
    #[inline]
    pub fn top_node_count(&self) -> u32 {
        self.top_node_count
    }

    /// Runs LOD selection over the whole tree, appending visible nodes to the
    /// selection. The caller sets the current tile index up front.
    pub fn lod_select(&self, frustum: &ViewFrustum, selection: &mut LodSelection) {
        for &root in self.roots.iter() {
            self.select_node(root, false, frustum, selection);
        }
    }

    fn select_node(
        &self,
        index: u32,
        parent_fully_inside: bool,
        frustum: &ViewFrustum,
        selection: &mut LodSelection,
    ) -> SelectResult {
        let node = &self.nodes[index as usize];

        let containment = if parent_fully_inside {
            Containment::Inside
        } else {
            frustum.contains_aabb(&node.aabb)
        };
        if containment == Containment::Outside {
            return SelectResult::Outside;
        }

        if !node
            .aabb
            .is_intersects_sphere(frustum.position(), selection.visibility_range(node.level))
        {
            return SelectResult::OutOfRange;
        }

        let mut quadrants = [true; 4];
        let mut any_child_selected = false;
        // Descend only while a finer level exists and this node is at least
        // partly within its range; otherwise this node covers its whole
        // footprint itself.
        if let Some(next_range) = selection.next_visibility_range(node.level) {
            if node
                .aabb
                .is_intersects_sphere(frustum.position(), next_range)
            {
                let fully_inside = containment == Containment::Inside;
                for (flag, child) in quadrants.iter_mut().zip(node.children) {
                    if child == INVALID_NODE {
                        // Clipped by the raster edge, no geometry there.
                        *flag = false;
                        continue;
                    }
                    match self.select_node(child, fully_inside, frustum, selection) {
                        SelectResult::Selected => {
                            *flag = false;
                            any_child_selected = true;
                        }
                        SelectResult::Outside => *flag = false,
                        // The child is closer-range only; we draw its quadrant.
                        SelectResult::OutOfRange => (),
                    }
                }
            }
        }

        if quadrants.iter().any(|&flag| flag) {
            let lod_level = selection.lod_level_count() - 1 - node.level;
            if selection.add(node, index, lod_level, quadrants) {
                return SelectResult::Selected;
            }
            // Selection buffer is full; pretend the node is invisible so the
            // parent does not try to cover for it either.
            return SelectResult::Outside;
        }

        if any_child_selected {
            SelectResult::Selected
        } else {
            SelectResult::Outside
        }
    }
}

fn build_node(
    nodes: &mut Vec<Node>,
    context: &BuildContext<'_>,
    x: u32,
    z: u32,
    size: u32,
    level: u32,
) -> Result<u32, TerrainError> {
    let extent = context.heightmap.extent();
    // Min/max over the footprint, far edge inclusive, clipped to the raster.
    let limit_x = extent.min(x + size + 1);
    let limit_z = extent.min(z + size + 1);
    let (min_height, max_height) = context
        .heightmap
        .min_max_area(x, z, limit_x - x, limit_z - z);

    let aabb = AxisAlignedBoundingBox::from_min_max(
        context.tile_min
            + Vector3::new(
                x as f32,
                min_height as f32 * context.height_factor,
                z as f32,
            ),
        context.tile_min
            + Vector3::new(
                (x + size) as f32,
                max_height as f32 * context.height_factor,
                (z + size) as f32,
            ),
    );

    let index = nodes.len() as u32;
    nodes.push(Node {
        x,
        z,
        size,
        level,
        min_height,
        max_height,
        aabb,
        children: [INVALID_NODE; 4],
    });

    if size == context.leaf_node_size {
        if level != context.finest_level {
            return Err(TerrainError::Invariant(format!(
                "leaf-sized node ended up on level {} instead of the finest level {}",
                level, context.finest_level
            )));
        }
    } else {
        let half = size / 2;
        let next_level = level + 1;
        let mut children = [INVALID_NODE; 4];
        children[Quadrant::TopLeft.index()] = build_node(nodes, context, x, z, half, next_level)?;
        if x + half < extent {
            children[Quadrant::TopRight.index()] =
                build_node(nodes, context, x + half, z, half, next_level)?;
        }
        if z + half < extent {
            children[Quadrant::BottomLeft.index()] =
                build_node(nodes, context, x, z + half, half, next_level)?;
        }
        if x + half < extent && z + half < extent {
            children[Quadrant::BottomRight.index()] =
                build_node(nodes, context, x + half, z + half, half, next_level)?;
        }
        nodes[index as usize].children = children;
    }

    Ok(index)
}
