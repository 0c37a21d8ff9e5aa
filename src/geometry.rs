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

//! The grid patch mesh: a regular triangle grid over the unit square in the
//! horizontal plane, built once and reused for every node at every LOD level
//! with per-node scale/offset uniforms. Its index buffer is laid out in four
//! contiguous quadrant runs so a node can draw any subset of its quadrants
//! from the one bound mesh.

use crate::{
    error::TerrainError,
    log::Log,
    quadtree::Quadrant,
    renderer::{
        server::{
            AttributeDefinition, AttributeKind, BufferUsage, GeometryBufferDescriptor,
            GpuGeometryBuffer, GraphicsServer, VertexBufferData,
        },
        ElementRange,
    },
};
use bytemuck::{Pod, Zeroable};
use nalgebra::Vector3;

/// Vertex of the grid patch; the shader displaces it by the sampled height.
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct GridVertex {
    /// Position within the unit square, y is always zero.
    pub position: Vector3<f32>,
}

/// See module docs.
pub struct GridMesh {
    dimension: u32,
    index_count: u32,
    quadrants: [ElementRange; 4],
    geometry: Box<dyn GpuGeometryBuffer>,
}

impl GridMesh {
    /// Builds the mesh of `dimension * dimension` quads and uploads it through
    /// the graphics server.
    pub fn new(dimension: u32, server: &dyn GraphicsServer) -> Result<Self, TerrainError> {
        if !dimension.is_power_of_two() || !(8..=1024).contains(&dimension) {
            return Err(TerrainError::InvalidSettings(format!(
                "grid mesh dimension must be a power of two between 8 and 1024, got {}",
                dimension
            )));
        }

        let vertices = make_vertices(dimension);
        let (indices, quadrants) = make_indices(dimension);
        let index_count = (dimension * dimension * 6) as usize;
        if indices.len() != index_count {
            return Err(TerrainError::Invariant(format!(
                "grid mesh emitted {} indices instead of the precomputed {}",
                indices.len(),
                index_count
            )));
        }

        let geometry = server.create_geometry_buffer(GeometryBufferDescriptor {
            name: "TerrainGridMesh",
            vertices: VertexBufferData::new(&vertices),
            attributes: &[AttributeDefinition {
                location: 0,
                kind: AttributeKind::Float,
                component_count: 3,
                normalized: false,
            }],
            indices: &indices,
            usage: BufferUsage::StaticDraw,
        })?;

        Log::info(format!("Grid mesh of dimension {} created", dimension));

        Ok(Self {
            dimension,
            index_count: index_count as u32,
            quadrants,
            geometry,
        })
    }

    /// Side length of the mesh in quads.
    #[inline]
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Total index count of the mesh.
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Index sub-range of the given quadrant.
    #[inline]
    pub fn quadrant_range(&self, quadrant: Quadrant) -> ElementRange {
        self.quadrants[quadrant.index()]
    }

    /// The uploaded vertex/index buffer pair.
    #[inline]
    pub fn geometry(&self) -> &dyn GpuGeometryBuffer {
        &*self.geometry
    }
}

fn make_vertices(dimension: u32) -> Vec<GridVertex> {
    let vertex_dimension = dimension + 1;
    let mut vertices = Vec::with_capacity((vertex_dimension * vertex_dimension) as usize);
    for z in 0..vertex_dimension {
        for x in 0..vertex_dimension {
            vertices.push(GridVertex {
                position: Vector3::new(
                    x as f32 / dimension as f32,
                    0.0,
                    z as f32 / dimension as f32,
                ),
            });
        }
    }
    vertices
}

fn make_indices(dimension: u32) -> (Vec<u32>, [ElementRange; 4]) {
    let vertex_dimension = dimension + 1;
    let half = dimension / 2;
    let mut indices = Vec::with_capacity((dimension * dimension * 6) as usize);
    let mut quadrants = [ElementRange::Full; 4];

    for ((x_range, z_range), quadrant) in [
        (0..half, 0..half),
        (half..dimension, 0..half),
        (0..half, half..dimension),
        (half..dimension, half..dimension),
    ]
    .into_iter()
    .zip(&mut quadrants)
    {
        let offset = indices.len();
        for z in z_range {
            for x in x_range.clone() {
                let v00 = x + vertex_dimension * z;
                let v01 = x + vertex_dimension * (z + 1);
                let v10 = (x + 1) + vertex_dimension * z;
                let v11 = (x + 1) + vertex_dimension * (z + 1);
                indices.extend_from_slice(&[v00, v01, v10, v10, v01, v11]);
            }
        }
        *quadrant = ElementRange::Specific {
            offset,
            count: indices.len() - offset,
        };
    }

    (indices, quadrants)
}
