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

//! The top-level orchestrator. A [`Terrain`] holds the tile roster, the shared
//! grid patch mesh and the shader handle; every frame it runs LOD selection
//! over the tiles and translates the selection into a minimal stream of
//! uniform updates and draw records.

use crate::{
    debug::{Color, TerrainDrawingContext},
    error::TerrainError,
    geometry::GridMesh,
    heightmap::Heightmap,
    lod::LodSelection,
    log::Log,
    math::{aabb::AxisAlignedBoundingBox, frustum::ViewFrustum},
    quadtree::Quadrant,
    renderer::{
        server::{GpuProgram, GraphicsServer},
        DrawContext, ElementRange, FrameUniforms, NodeUniforms, RenderStatistics, TileUniforms,
        HEIGHTMAP_TEXTURE_UNIT,
    },
    settings::TerrainSettings,
    tile::TerrainTile,
};
use nalgebra::{Vector2, Vector3, Vector4};
use std::path::Path;

/// See module docs.
pub struct Terrain {
    settings: TerrainSettings,
    gridmesh: GridMesh,
    tiles: Vec<TerrainTile>,
    program: Box<dyn GpuProgram>,
}

impl Terrain {
    /// Validates the settings and builds the shared grid patch mesh. The
    /// program is the terrain shader created by the host through its
    /// graphics server.
    pub fn new(
        settings: TerrainSettings,
        program: Box<dyn GpuProgram>,
        server: &dyn GraphicsServer,
    ) -> Result<Self, TerrainError> {
        let gridmesh = settings
            .validate()
            .and_then(|_| GridMesh::new(settings.gridmesh_dimension(), server))
            .map_err(|error| {
                Log::err(format!("Terrain startup failed: {error}"));
                error
            })?;
        Ok(Self {
            settings,
            gridmesh,
            tiles: Vec::new(),
            program,
        })
    }

    /// Loads a tile from a heightmap file and its bounding-box sidecar and
    /// appends it to the roster. Returns the index of the new tile.
    pub fn load_tile(
        &mut self,
        heightmap_path: &Path,
        aabb_path: &Path,
        server: &dyn GraphicsServer,
    ) -> Result<u32, TerrainError> {
        let index = self.tiles.len() as u32;
        let tile = TerrainTile::load(heightmap_path, aabb_path, index, &self.settings, server)
            .map_err(|error| {
                Log::err(format!("Unable to load terrain tile: {error}"));
                error
            })?;
        self.tiles.push(tile);
        Ok(index)
    }

    /// Appends a tile built from an in-memory heightmap, e.g. a procedurally
    /// generated one. The heightmap texture must be uploaded separately for
    /// the tile to render.
    pub fn add_tile(
        &mut self,
        heightmap: Heightmap,
        aabb: AxisAlignedBoundingBox,
    ) -> Result<u32, TerrainError> {
        let index = self.tiles.len() as u32;
        let tile = TerrainTile::new(heightmap, aabb, index, &self.settings)?;
        self.tiles.push(tile);
        Ok(index)
    }

    /// The validated settings the terrain was created with.
    #[inline]
    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /// The resident tiles in roster order.
    #[inline]
    pub fn tiles(&self) -> &[TerrainTile] {
        &self.tiles
    }

    /// The tile with the given index.
    #[inline]
    pub fn tile(&self, index: u32) -> Option<&TerrainTile> {
        self.tiles.get(index as usize)
    }

    /// The shared grid patch mesh.
    #[inline]
    pub fn gridmesh(&self) -> &GridMesh {
        &self.gridmesh
    }

    /// Runs LOD selection for the frame: resets the selection, descends every
    /// tile quadtree against the frustum and optionally sorts the result by
    /// distance. Ranges are re-derived only when the clip planes changed.
    pub fn select(&self, frustum: &ViewFrustum, selection: &mut LodSelection) {
        selection.update_ranges(frustum.near(), frustum.far());
        selection.reset(frustum.position());
        for tile in self.tiles.iter() {
            selection.set_tile_index(tile.index());
            tile.quadtree().lod_select(frustum, selection);
        }
        selection.sort();
    }

    /// Emits the selection as a stream of uniforms and draw records. The grid
    /// mesh is bound once; tile uniforms change at most once per tile and
    /// morph constants at most once per LOD level within a tile.
    pub fn render(
        &self,
        selection: &LodSelection,
        frame: &FrameUniforms,
        context: &mut dyn DrawContext,
    ) -> RenderStatistics {
        let mut statistics = RenderStatistics::default();

        context.bind_program(&*self.program);
        context.bind_geometry(self.gridmesh.geometry());

        let dimension = self.gridmesh.dimension() as f32;
        let mut frame = frame.clone();
        frame.grid_dim = Vector3::new(dimension, dimension * 0.5, 2.0 / dimension);
        context.set_frame_uniforms(&frame);

        for tile in self.tiles.iter() {
            let Some(texture) = tile.heightmap().texture() else {
                Log::warn(format!(
                    "Tile {} has no uploaded heightmap texture and was skipped",
                    tile.index()
                ));
                continue;
            };
            context.bind_texture(HEIGHTMAP_TEXTURE_UNIT, texture);

            let aabb = tile.aabb();
            let extent = tile.heightmap().extent() as f32;
            context.set_tile_uniforms(&TileUniforms {
                tile_offset: aabb.min,
                tile_scale: aabb.max - aabb.min,
                tile_max: Vector2::new(aabb.max.x, aabb.max.z),
                tile_to_texture: Vector2::new((extent - 1.0) / extent, (extent - 1.0) / extent),
                heightmap_texture_info: Vector4::new(extent, extent, 1.0 / extent, 1.0 / extent),
                height_factor: self.settings.height_factor,
            });

            for level in selection.min_selected_level()..=selection.max_selected_level() {
                let mut morph_consts_set = false;
                for entry in selection.entries() {
                    if entry.tile_index != tile.index() || entry.lod_level != level {
                        continue;
                    }
                    if !morph_consts_set {
                        context.set_morph_consts(selection.morph_consts(level));
                        morph_consts_set = true;
                    }

                    let node = tile.quadtree().node(entry.node);
                    let size = node.aabb.size();
                    context.set_node_uniforms(&NodeUniforms {
                        node_scale: Vector4::new(size.x, 0.0, size.z, entry.lod_level as f32),
                        node_offset: Vector3::new(
                            node.aabb.min.x,
                            (node.aabb.min.y + node.aabb.max.y) * 0.5,
                            node.aabb.min.z,
                        ),
                    });

                    if entry.is_full() {
                        statistics += context.draw(ElementRange::Full);
                    } else {
                        for quadrant in Quadrant::ALL {
                            if entry.quadrants[quadrant.index()] {
                                statistics += context.draw(self.gridmesh.quadrant_range(quadrant));
                            }
                        }
                    }
                    statistics.nodes += 1;
                }
            }
        }

        statistics
    }

    /// Outlines the boxes of the current selection, full nodes as one box and
    /// partial nodes as one box per drawn quadrant, colored by level.
    pub fn debug_draw(&self, selection: &LodSelection, context: &mut TerrainDrawingContext) {
        for entry in selection.entries() {
            let Some(tile) = self.tile(entry.tile_index) else {
                continue;
            };
            let node = tile.quadtree().node(entry.node);
            if entry.is_full() {
                context.draw_aabb(&node.aabb, Color::lod_level_color(node.level));
            } else {
                for quadrant in Quadrant::ALL {
                    if entry.quadrants[quadrant.index()] {
                        if let Some(child) = node.child(quadrant) {
                            let child = tile.quadtree().node(child);
                            context.draw_aabb(&child.aabb, Color::lod_level_color(child.level));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::server::test::NullGraphicsServer;
    use crate::renderer::DrawCallStatistics;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        BindProgram,
        BindGeometry,
        BindTexture(u32),
        FrameUniforms,
        TileUniforms,
        MorphConsts,
        NodeUniforms,
        Draw,
    }

    struct RecordingContext {
        events: Vec<Event>,
        draws: Vec<ElementRange>,
        grid_dim: Vector3<f32>,
        full_index_count: usize,
    }

    impl RecordingContext {
        fn new(full_index_count: usize) -> Self {
            Self {
                events: Vec::new(),
                draws: Vec::new(),
                grid_dim: Vector3::default(),
                full_index_count,
            }
        }

        fn count(&self, event: Event) -> usize {
            self.events.iter().filter(|&&e| e == event).count()
        }
    }

    impl DrawContext for RecordingContext {
        fn bind_program(&mut self, _program: &dyn crate::renderer::server::GpuProgram) {
            self.events.push(Event::BindProgram);
        }

        fn bind_geometry(&mut self, _geometry: &dyn crate::renderer::server::GpuGeometryBuffer) {
            self.events.push(Event::BindGeometry);
        }

        fn bind_texture(&mut self, unit: u32, _texture: &dyn crate::renderer::server::GpuTexture) {
            self.events.push(Event::BindTexture(unit));
        }

        fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
            self.grid_dim = uniforms.grid_dim;
            self.events.push(Event::FrameUniforms);
        }

        fn set_tile_uniforms(&mut self, _uniforms: &TileUniforms) {
            self.events.push(Event::TileUniforms);
        }

        fn set_morph_consts(&mut self, _consts: Vector4<f32>) {
            self.events.push(Event::MorphConsts);
        }

        fn set_node_uniforms(&mut self, _uniforms: &NodeUniforms) {
            self.events.push(Event::NodeUniforms);
        }

        fn draw(&mut self, element_range: ElementRange) -> DrawCallStatistics {
            self.events.push(Event::Draw);
            self.draws.push(element_range);
            let triangles = match element_range {
                ElementRange::Full => self.full_index_count / 3,
                ElementRange::Specific { count, .. } => count / 3,
            };
            DrawCallStatistics { triangles }
        }
    }

    fn test_settings() -> TerrainSettings {
        TerrainSettings {
            lod_level_count: 3,
            leaf_node_size: 32,
            height_factor: 1.0,
            ..Default::default()
        }
    }

    fn test_terrain(settings: TerrainSettings) -> Terrain {
        let server = NullGraphicsServer;
        let program = server.create_program("terrain", "", "").unwrap();
        let mut terrain = Terrain::new(settings.clone(), program, &server).unwrap();
        let extent = 256u32;
        let mut heightmap =
            Heightmap::from_raw(extent, vec![100; (extent * extent) as usize], &settings).unwrap();
        heightmap.upload(&server).unwrap();
        terrain
            .add_tile(
                heightmap,
                AxisAlignedBoundingBox::from_min_max(
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(256.0, 200.0, 256.0),
                ),
            )
            .unwrap();
        terrain
    }

    fn overhead_frustum() -> ViewFrustum {
        ViewFrustum::new(
            Vector3::new(128.0, 300.0, 128.0),
            Vector3::new(129.0, 0.0, 129.0),
            Vector3::y(),
            90.0f32.to_radians(),
            1.0,
            1.0,
            4000.0,
        )
    }

    #[test]
    fn selection_is_deterministic_and_covers() {
        let settings = test_settings();
        let terrain = test_terrain(settings.clone());
        let frustum = overhead_frustum();

        let mut selection = LodSelection::new(&settings);
        terrain.select(&frustum, &mut selection);
        assert!(!selection.is_empty());
        assert!(selection.len() <= settings.max_selected_nodes);
        assert!(selection.min_selected_level() <= selection.max_selected_level());
        for entry in selection.entries() {
            assert!(
                entry.quadrants.iter().any(|&quadrant| quadrant),
                "an entry with nothing to draw must not be selected"
            );
            assert!(entry.lod_level < settings.lod_level_count);
        }

        let first: Vec<_> = selection.entries().to_vec();
        terrain.select(&frustum, &mut selection);
        assert_eq!(selection.entries(), first.as_slice());
    }

    #[test]
    fn node_facing_away_selects_nothing() {
        let settings = test_settings();
        let terrain = test_terrain(settings.clone());
        // Camera beside the tile looking in the opposite direction.
        let frustum = ViewFrustum::new(
            Vector3::new(-10.0, 100.0, -10.0),
            Vector3::new(-100.0, 100.0, -100.0),
            Vector3::y(),
            90.0f32.to_radians(),
            1.0,
            1.0,
            4000.0,
        );
        let mut selection = LodSelection::new(&settings);
        terrain.select(&frustum, &mut selection);
        assert!(selection.is_empty());
    }

    #[test]
    fn selection_overflow_is_capped() {
        let settings = TerrainSettings {
            max_selected_nodes: 2,
            ..test_settings()
        };
        let terrain = test_terrain(settings.clone());
        let mut selection = LodSelection::new(&settings);
        terrain.select(&overhead_frustum(), &mut selection);
        // The camera is close enough to select far more than two nodes; the
        // buffer must stop exactly at its capacity.
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn sorted_selection_is_ordered_by_distance() {
        let settings = TerrainSettings {
            sort_by_distance: true,
            ..test_settings()
        };
        let terrain = test_terrain(settings.clone());
        let mut selection = LodSelection::new(&settings);
        terrain.select(&overhead_frustum(), &mut selection);
        assert!(selection.len() > 1);
        for pair in selection.entries().windows(2) {
            assert!(pair[0].min_distance_to_camera <= pair[1].min_distance_to_camera);
        }
    }

    #[test]
    fn render_emits_a_minimal_stream() {
        let settings = test_settings();
        let terrain = test_terrain(settings.clone());
        let mut selection = LodSelection::new(&settings);
        terrain.select(&overhead_frustum(), &mut selection);
        assert!(!selection.is_empty());

        let mut context = RecordingContext::new(terrain.gridmesh().index_count() as usize);
        let statistics = terrain.render(&selection, &FrameUniforms::default(), &mut context);

        assert_eq!(context.count(Event::BindProgram), 1);
        assert_eq!(context.count(Event::BindGeometry), 1);
        assert_eq!(context.count(Event::FrameUniforms), 1);
        assert_eq!(context.count(Event::BindTexture(HEIGHTMAP_TEXTURE_UNIT)), 1);
        assert_eq!(context.count(Event::TileUniforms), 1);
        assert_eq!(context.count(Event::NodeUniforms), selection.len());
        assert_eq!(statistics.nodes, selection.len());
        assert_eq!(statistics.draw_calls, context.draws.len());
        assert!(statistics.triangles > 0);

        // Morph constants change at most once per selected level.
        let levels_in_use = (selection.min_selected_level()
            ..=selection.max_selected_level())
            .filter(|&level| {
                selection
                    .entries()
                    .iter()
                    .any(|entry| entry.lod_level == level)
            })
            .count();
        assert_eq!(context.count(Event::MorphConsts), levels_in_use);

        // Full entries draw the whole buffer, partial ones a sub-range per
        // active quadrant.
        let expected_draws: usize = selection
            .entries()
            .iter()
            .map(|entry| {
                if entry.is_full() {
                    1
                } else {
                    entry.quadrants.iter().filter(|&&quadrant| quadrant).count()
                }
            })
            .sum();
        assert_eq!(context.draws.len(), expected_draws);

        let dimension = settings.gridmesh_dimension() as f32;
        assert_eq!(
            context.grid_dim,
            Vector3::new(dimension, dimension * 0.5, 2.0 / dimension)
        );
    }

    #[test]
    fn empty_selection_draws_nothing() {
        let settings = test_settings();
        let terrain = test_terrain(settings.clone());
        let mut selection = LodSelection::new(&settings);
        selection.update_ranges(1.0, 4000.0);
        selection.reset(Vector3::default());

        let mut context = RecordingContext::new(terrain.gridmesh().index_count() as usize);
        let statistics = terrain.render(&selection, &FrameUniforms::default(), &mut context);
        assert_eq!(statistics.draw_calls, 0);
        assert_eq!(statistics.nodes, 0);
        assert_eq!(context.count(Event::Draw), 0);
        assert_eq!(context.count(Event::MorphConsts), 0);
    }

    #[test]
    fn debug_draw_outlines_every_entry() {
        let settings = test_settings();
        let terrain = test_terrain(settings.clone());
        let mut selection = LodSelection::new(&settings);
        terrain.select(&overhead_frustum(), &mut selection);
        assert!(!selection.is_empty());

        let mut context = TerrainDrawingContext::default();
        terrain.debug_draw(&selection, &mut context);
        let expected_boxes: usize = selection
            .entries()
            .iter()
            .map(|entry| {
                if entry.is_full() {
                    1
                } else {
                    entry.quadrants.iter().filter(|&&quadrant| quadrant).count()
                }
            })
            .sum();
        assert_eq!(context.boxes.len(), expected_boxes);
        assert_eq!(context.line_segments().len(), expected_boxes * 12);
    }
}
