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

//! Graphics server is an abstraction layer over the graphics API the host
//! application renders with. The terrain core acquires its GPU resources
//! (heightmap textures, the grid patch geometry, the shader program) through
//! this trait at startup and never touches the API underneath. Resource
//! handles are opaque, non-copyable trait objects; a backend releases the
//! underlying GPU object when the handle is dropped.

use crate::error::TerrainError;
use bytemuck::Pod;
use std::{any::Any, fmt::Debug, mem::size_of};

/// An opaque GPU texture handle.
pub trait GpuTexture: Debug {
    /// Allows a backend to downcast the handle to its concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// An opaque handle of a vertex buffer + index buffer pair.
pub trait GpuGeometryBuffer: Debug {
    /// Allows a backend to downcast the handle to its concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// An opaque GPU program handle.
pub trait GpuProgram: Debug {
    /// Allows a backend to downcast the handle to its concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// Pixel layout of a texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelKind {
    /// Single 16-bit unsigned integer channel.
    R16,
    /// Single 32-bit float channel.
    R32F,
    /// Four 8-bit unsigned integer channels.
    Rgba8,
}

impl PixelKind {
    /// Size of a single pixel in bytes.
    pub fn size_in_bytes(self) -> usize {
        match self {
            PixelKind::R16 => 2,
            PixelKind::R32F => 4,
            PixelKind::Rgba8 => 4,
        }
    }
}

/// The texture magnification function, used when a pixel maps to an area less
/// than or equal to one texel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MagnificationFilter {
    /// Nearest texel.
    Nearest,
    /// Weighted average of the four closest texels.
    #[default]
    Linear,
}

/// The texture minification function, used when a pixel maps to an area
/// greater than one texel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MinificationFilter {
    /// Nearest texel.
    Nearest,
    /// Weighted average of the four closest texels.
    #[default]
    Linear,
    /// Trilinear filtering across the two closest mip levels.
    LinearMipMapLinear,
}

/// Texture coordinate wrapping mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    /// Coordinates are clamped to the edge texel.
    #[default]
    ClampToEdge,
    /// Coordinates wrap around.
    Repeat,
}

/// Expanded sampler state of a [`SamplerPreset`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SamplerDescriptor {
    /// Minification filter.
    pub min_filter: MinificationFilter,
    /// Magnification filter.
    pub mag_filter: MagnificationFilter,
    /// S (u) coordinate wrap mode.
    pub s_wrap_mode: WrapMode,
    /// T (v) coordinate wrap mode.
    pub t_wrap_mode: WrapMode,
}

/// The fixed set of sampler configurations the terrain uses. A preset expands
/// into a full [`SamplerDescriptor`] through [`SamplerPreset::descriptor`];
/// heightmaps use [`SamplerPreset::LinearClamp`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SamplerPreset {
    /// Nearest filtering, clamped.
    Nearest,
    /// Linear filtering, clamped.
    LinearClamp,
    /// Nearest filtering, repeating.
    NearestRepeat,
    /// Linear filtering, repeating.
    LinearRepeat,
    /// Trilinear filtering, clamped.
    LinearMipMapClamp,
}

impl SamplerPreset {
    /// Expands the preset into explicit sampler state.
    pub fn descriptor(self) -> SamplerDescriptor {
        match self {
            SamplerPreset::Nearest => SamplerDescriptor {
                min_filter: MinificationFilter::Nearest,
                mag_filter: MagnificationFilter::Nearest,
                ..Default::default()
            },
            SamplerPreset::LinearClamp => SamplerDescriptor::default(),
            SamplerPreset::NearestRepeat => SamplerDescriptor {
                min_filter: MinificationFilter::Nearest,
                mag_filter: MagnificationFilter::Nearest,
                s_wrap_mode: WrapMode::Repeat,
                t_wrap_mode: WrapMode::Repeat,
            },
            SamplerPreset::LinearRepeat => SamplerDescriptor {
                s_wrap_mode: WrapMode::Repeat,
                t_wrap_mode: WrapMode::Repeat,
                ..Default::default()
            },
            SamplerPreset::LinearMipMapClamp => SamplerDescriptor {
                min_filter: MinificationFilter::LinearMipMapLinear,
                ..Default::default()
            },
        }
    }
}

/// Description of a two-dimensional texture with its initial data.
#[derive(Debug)]
pub struct GpuTextureDescriptor<'a> {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Pixel layout of `data`.
    pub pixel_kind: PixelKind,
    /// Sampler configuration of the texture.
    pub sampler: SamplerPreset,
    /// Raw pixel data, row-major, `width * height * pixel_kind.size_in_bytes()`
    /// bytes.
    pub data: &'a [u8],
}

/// Usage hint of a GPU buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    #[default]
    StaticDraw,
    /// Rewritten frequently.
    DynamicDraw,
}

/// Data type of a vertex attribute component.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    /// 32-bit float.
    Float,
    /// Unsigned 8-bit integer.
    UnsignedByte,
    /// Unsigned 16-bit integer.
    UnsignedShort,
    /// Unsigned 32-bit integer.
    UnsignedInt,
}

impl AttributeKind {
    /// Returns attribute component size in bytes.
    pub fn size(self) -> usize {
        match self {
            AttributeKind::Float => size_of::<f32>(),
            AttributeKind::UnsignedByte => size_of::<u8>(),
            AttributeKind::UnsignedShort => size_of::<u16>(),
            AttributeKind::UnsignedInt => size_of::<u32>(),
        }
    }
}

/// Vertex attribute definition.
#[derive(Copy, Clone, Debug)]
pub struct AttributeDefinition {
    /// Binding point of the vertex attribute.
    pub location: u32,
    /// Data type of a single component.
    pub kind: AttributeKind,
    /// Component count, 1 to 4.
    pub component_count: usize,
    /// Whether integer attributes are normalized into `[0.0; 1.0]`.
    pub normalized: bool,
}

/// Untyped vertex buffer data.
#[derive(Debug)]
pub struct VertexBufferData<'a> {
    /// Size of a single vertex in bytes.
    pub element_size: usize,
    /// Raw vertex bytes.
    pub bytes: &'a [u8],
}

impl<'a> VertexBufferData<'a> {
    /// Creates untyped vertex data from a typed slice. The underlying type
    /// must be [`Pod`].
    pub fn new<T: Pod>(vertices: &'a [T]) -> Self {
        Self {
            element_size: size_of::<T>(),
            bytes: bytemuck::cast_slice(vertices),
        }
    }
}

/// Description of a vertex + index buffer pair.
#[derive(Debug)]
pub struct GeometryBufferDescriptor<'a> {
    /// Name for debugging purposes.
    pub name: &'a str,
    /// Vertex data.
    pub vertices: VertexBufferData<'a>,
    /// Layout of a single vertex.
    pub attributes: &'a [AttributeDefinition],
    /// Triangle list indices.
    pub indices: &'a [u32],
    /// Buffer usage hint.
    pub usage: BufferUsage,
}

/// Resource factory implemented by a graphics backend. All creation happens at
/// startup; per-frame work goes through [`crate::renderer::DrawContext`].
pub trait GraphicsServer {
    /// Creates a new GPU texture using the given descriptor.
    fn create_texture(
        &self,
        desc: GpuTextureDescriptor,
    ) -> Result<Box<dyn GpuTexture>, TerrainError>;

    /// Creates a new vertex + index buffer pair using the given descriptor.
    fn create_geometry_buffer(
        &self,
        desc: GeometryBufferDescriptor,
    ) -> Result<Box<dyn GpuGeometryBuffer>, TerrainError>;

    /// Creates a new named GPU program from a pair of vertex and fragment
    /// shaders.
    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Box<dyn GpuProgram>, TerrainError>;
}
