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

//! Debug view of a frame's LOD selection: the chosen node boxes, colored by
//! quadtree level. The terrain records one outline per drawn node (or node
//! quadrant); the host flushes them with whatever wireframe machinery it has,
//! either as one unit-cube instance per box or as expanded line segments.

use crate::math::aabb::AxisAlignedBoundingBox;
use nalgebra::Vector3;

/// 32-bit RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Color {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
    /// Alpha component.
    pub a: u8,
}

impl Color {
    const RAINBOW: [Color; 7] = [
        Color::opaque(148, 0, 211),
        Color::opaque(75, 0, 130),
        Color::opaque(0, 0, 255),
        Color::opaque(0, 255, 0),
        Color::opaque(255, 255, 0),
        Color::opaque(255, 127, 0),
        Color::opaque(255, 0, 0),
    ];

    /// Creates a fully opaque color.
    #[inline]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Conventional color of a quadtree level, cycling through a rainbow
    /// palette for deep trees.
    #[inline]
    pub fn lod_level_color(level: u32) -> Self {
        Self::RAINBOW[level as usize % Self::RAINBOW.len()]
    }
}

/// See module docs.
#[derive(Default)]
pub struct TerrainDrawingContext {
    /// Outlined boxes of the current frame. Clear between frames.
    pub boxes: Vec<(AxisAlignedBoundingBox, Color)>,
}

impl TerrainDrawingContext {
    // Corner pairs of a box outline: bottom ring, top ring, vertical edges,
    // in the order AxisAlignedBoundingBox::corners yields the corners.
    const EDGES: [(usize, usize); 12] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];

    /// Records one box outline.
    #[inline]
    pub fn draw_aabb(&mut self, aabb: &AxisAlignedBoundingBox, color: Color) {
        self.boxes.push((*aabb, color));
    }

    /// Expands the recorded boxes into colored world-space line segments,
    /// twelve per box, for hosts without an instanced cube pipeline.
    pub fn line_segments(&self) -> Vec<(Vector3<f32>, Vector3<f32>, Color)> {
        let mut segments = Vec::with_capacity(self.boxes.len() * Self::EDGES.len());
        for (aabb, color) in self.boxes.iter() {
            let corners = aabb.corners();
            for (begin, end) in Self::EDGES {
                segments.push((corners[begin], corners[end], *color));
            }
        }
        segments
    }
}
