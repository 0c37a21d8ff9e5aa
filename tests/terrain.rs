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

//! End-to-end checks of the whole pipeline through the public API only: a
//! synthesized heightmap + sidecar pair is loaded into a terrain against a
//! null graphics backend, selected from a first-person camera and rendered
//! into a recording draw context.

use nalgebra::{Vector3, Vector4};
use relief::{
    error::TerrainError,
    heightmap::Heightmap,
    lod::LodSelection,
    math::{aabb::AxisAlignedBoundingBox, frustum::ViewFrustum},
    quadtree::precomputed_node_count,
    renderer::{
        server::{
            GeometryBufferDescriptor, GpuGeometryBuffer, GpuProgram, GpuTexture,
            GpuTextureDescriptor, GraphicsServer,
        },
        DrawCallStatistics, DrawContext, ElementRange, FrameUniforms, NodeUniforms, TileUniforms,
    },
    settings::TerrainSettings,
    terrain::Terrain,
};
use std::{any::Any, path::PathBuf};

#[derive(Debug)]
struct NullTexture;
#[derive(Debug)]
struct NullGeometryBuffer;
#[derive(Debug)]
struct NullProgram;

impl GpuTexture for NullTexture {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl GpuGeometryBuffer for NullGeometryBuffer {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl GpuProgram for NullProgram {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct NullGraphicsServer;

impl GraphicsServer for NullGraphicsServer {
    fn create_texture(
        &self,
        _desc: GpuTextureDescriptor,
    ) -> Result<Box<dyn GpuTexture>, TerrainError> {
        Ok(Box::new(NullTexture))
    }

    fn create_geometry_buffer(
        &self,
        _desc: GeometryBufferDescriptor,
    ) -> Result<Box<dyn GpuGeometryBuffer>, TerrainError> {
        Ok(Box::new(NullGeometryBuffer))
    }

    fn create_program(
        &self,
        _name: &str,
        _vertex_source: &str,
        _fragment_source: &str,
    ) -> Result<Box<dyn GpuProgram>, TerrainError> {
        Ok(Box::new(NullProgram))
    }
}

#[derive(Default)]
struct CountingContext {
    draw_calls: usize,
    tile_uniform_changes: usize,
    morph_const_changes: usize,
    node_uniform_changes: usize,
}

impl DrawContext for CountingContext {
    fn bind_program(&mut self, _program: &dyn GpuProgram) {}

    fn bind_geometry(&mut self, _geometry: &dyn GpuGeometryBuffer) {}

    fn bind_texture(&mut self, _unit: u32, _texture: &dyn GpuTexture) {}

    fn set_frame_uniforms(&mut self, _uniforms: &FrameUniforms) {}

    fn set_tile_uniforms(&mut self, _uniforms: &TileUniforms) {
        self.tile_uniform_changes += 1;
    }

    fn set_morph_consts(&mut self, _consts: Vector4<f32>) {
        self.morph_const_changes += 1;
    }

    fn set_node_uniforms(&mut self, _uniforms: &NodeUniforms) {
        self.node_uniform_changes += 1;
    }

    fn draw(&mut self, _element_range: ElementRange) -> DrawCallStatistics {
        self.draw_calls += 1;
        DrawCallStatistics { triangles: 2 }
    }
}

fn write_tile_assets(extent: u32, max_height: f32) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir();
    let heightmap_path = dir.join(format!("relief_e2e_tile_{extent}.png"));
    let sidecar_path = dir.join(format!("relief_e2e_tile_{extent}.bb"));

    let buffer = image::ImageBuffer::<image::Luma<u16>, _>::from_fn(extent, extent, |x, z| {
        image::Luma([((x + z) * 7 % 1000) as u16])
    });
    buffer.save(&heightmap_path).unwrap();

    std::fs::write(
        &sidecar_path,
        format!(
            "0 0 0 {} {} {}",
            (extent - 1) as f32,
            max_height,
            (extent - 1) as f32
        ),
    )
    .unwrap();

    (heightmap_path, sidecar_path)
}

fn small_settings() -> TerrainSettings {
    TerrainSettings {
        lod_level_count: 3,
        leaf_node_size: 8,
        height_factor: 1.0,
        ..Default::default()
    }
}

#[test]
fn tile_loads_from_files_and_renders() {
    let settings = small_settings();
    let server = NullGraphicsServer;
    let program = server.create_program("terrain", "", "").unwrap();
    let mut terrain = Terrain::new(settings.clone(), program, &server).unwrap();

    let (heightmap_path, sidecar_path) = write_tile_assets(64, 2000.0);
    let index = terrain
        .load_tile(&heightmap_path, &sidecar_path, &server)
        .unwrap();
    assert_eq!(index, 0);

    let tile = terrain.tile(0).unwrap();
    assert_eq!(tile.heightmap().extent(), 64);
    assert_eq!(
        tile.quadtree().nodes().len() as u32,
        precomputed_node_count(64, &settings)
    );
    assert!(tile.heightmap().texture().is_some());

    let frustum = ViewFrustum::new(
        Vector3::new(0.0, 100.0, 0.0),
        Vector3::new(63.0, 50.0, 63.0),
        Vector3::y(),
        60.0f32.to_radians(),
        16.0 / 9.0,
        1.0,
        4000.0,
    );
    let mut selection = LodSelection::new(&settings);
    terrain.select(&frustum, &mut selection);
    assert!(!selection.is_empty());
    for entry in selection.entries() {
        assert!(entry.quadrants.iter().any(|&quadrant| quadrant));
    }

    let mut context = CountingContext::default();
    let statistics = terrain.render(&selection, &FrameUniforms::default(), &mut context);
    assert_eq!(context.tile_uniform_changes, 1);
    assert_eq!(context.node_uniform_changes, selection.len());
    assert_eq!(statistics.nodes, selection.len());
    assert_eq!(statistics.draw_calls, context.draw_calls);
    assert!(context.morph_const_changes <= settings.lod_level_count as usize);
    assert!(context.draw_calls >= selection.len());
}

#[test]
fn first_person_camera_over_large_tile() {
    // Default settings over a 2048-cell raster, camera just above the ground
    // looking across the tile.
    let settings = TerrainSettings::default();
    let server = NullGraphicsServer;
    let program = server.create_program("terrain", "", "").unwrap();
    let mut terrain = Terrain::new(settings.clone(), program, &server).unwrap();

    let extent = 2048u32;
    // A smooth diagonal slope, the way real elevation data behaves locally.
    let heights = (0..extent as usize * extent as usize)
        .map(|i| {
            let (x, z) = (i % extent as usize, i / extent as usize);
            ((x + z) / 256) as u16
        })
        .collect();
    let mut heightmap = Heightmap::from_raw(extent, heights, &settings).unwrap();
    heightmap.upload(&server).unwrap();
    terrain
        .add_tile(
            heightmap,
            AxisAlignedBoundingBox::from_min_max(
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2047.0, 16384.0, 2047.0),
            ),
        )
        .unwrap();

    let frustum = ViewFrustum::new(
        Vector3::new(0.0, 100.0, 0.0),
        Vector3::new(2047.0, 50.0, 2047.0),
        Vector3::y(),
        45.0f32.to_radians(),
        16.0 / 9.0,
        1.0,
        4000.0,
    );
    let mut selection = LodSelection::new(&settings);
    terrain.select(&frustum, &mut selection);

    assert!(!selection.is_empty());
    assert!(selection.len() <= settings.max_selected_nodes);
    assert!(selection.min_selected_level() <= selection.max_selected_level());
    assert!(selection.max_selected_level() < settings.lod_level_count);
    for entry in selection.entries() {
        assert!(entry.quadrants.iter().any(|&quadrant| quadrant));
    }

    // Selection is deterministic frame over frame.
    let first: Vec<_> = selection.entries().to_vec();
    terrain.select(&frustum, &mut selection);
    assert_eq!(selection.entries(), first.as_slice());
}

#[test]
fn malformed_assets_are_rejected() {
    let settings = small_settings();
    let server = NullGraphicsServer;
    let program = server.create_program("terrain", "", "").unwrap();
    let mut terrain = Terrain::new(settings, program, &server).unwrap();

    let dir = std::env::temp_dir();

    // Three-channel heightmap.
    let rgb_path = dir.join("relief_e2e_rgb.png");
    image::ImageBuffer::<image::Rgb<u8>, _>::from_pixel(64, 64, image::Rgb([0u8, 1, 2]))
        .save(&rgb_path)
        .unwrap();
    let sidecar_path = dir.join("relief_e2e_rgb.bb");
    std::fs::write(&sidecar_path, "0 0 0 63 100 63").unwrap();
    assert!(matches!(
        terrain.load_tile(&rgb_path, &sidecar_path, &server),
        Err(TerrainError::InvalidChannels { .. })
    ));

    // Five sidecar values instead of six.
    let (heightmap_path, _) = write_tile_assets(64, 100.0);
    let short_sidecar = dir.join("relief_e2e_short.bb");
    std::fs::write(&short_sidecar, "0 0 0 63 100").unwrap();
    assert!(matches!(
        terrain.load_tile(&heightmap_path, &short_sidecar, &server),
        Err(TerrainError::ParseError { .. })
    ));
}
