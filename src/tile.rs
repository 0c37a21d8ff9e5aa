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

//! A terrain tile: one heightmap, its world-space bounding box and the
//! quadtree built over both. The bounding box comes from a plain-text sidecar
//! file next to the heightmap holding six whitespace-separated numbers,
//! `min.x min.y min.z max.x max.y max.z`.

use crate::{
    error::TerrainError,
    heightmap::Heightmap,
    log::Log,
    math::aabb::AxisAlignedBoundingBox,
    quadtree::QuadTree,
    renderer::server::GraphicsServer,
    settings::TerrainSettings,
};
use nalgebra::Vector3;
use std::path::Path;

/// See module docs.
pub struct TerrainTile {
    heightmap: Heightmap,
    quadtree: QuadTree,
    aabb: AxisAlignedBoundingBox,
    index: u32,
}

impl TerrainTile {
    /// Binds an already constructed heightmap to the given world bounding box
    /// and builds the tile quadtree. The heightmap texture does not have to be
    /// uploaded yet.
    pub fn new(
        heightmap: Heightmap,
        aabb: AxisAlignedBoundingBox,
        index: u32,
        settings: &TerrainSettings,
    ) -> Result<Self, TerrainError> {
        let quadtree = QuadTree::new(&heightmap, aabb.min, settings)?;
        Ok(Self {
            heightmap,
            quadtree,
            aabb,
            index,
        })
    }

    /// Loads a tile from a heightmap file and its bounding-box sidecar,
    /// uploading the heightmap texture on the way.
    pub fn load(
        heightmap_path: &Path,
        aabb_path: &Path,
        index: u32,
        settings: &TerrainSettings,
        server: &dyn GraphicsServer,
    ) -> Result<Self, TerrainError> {
        let mut heightmap = Heightmap::load(heightmap_path, settings)?;
        heightmap.upload(server)?;
        let aabb = read_world_aabb(aabb_path)?;
        let tile = Self::new(heightmap, aabb, index, settings)?;
        Log::info(format!(
            "Terrain tile \"{}\" loaded. Bounding box ({:.2}/{:.2}/{:.2})/({:.2}/{:.2}/{:.2})",
            heightmap_path.display(),
            tile.aabb.min.x,
            tile.aabb.min.y,
            tile.aabb.min.z,
            tile.aabb.max.x,
            tile.aabb.max.y,
            tile.aabb.max.z
        ));
        Ok(tile)
    }

    /// The height raster of the tile.
    #[inline]
    pub fn heightmap(&self) -> &Heightmap {
        &self.heightmap
    }

    /// The quadtree built over the tile.
    #[inline]
    pub fn quadtree(&self) -> &QuadTree {
        &self.quadtree
    }

    /// World-space bounding box of the tile.
    #[inline]
    pub fn aabb(&self) -> &AxisAlignedBoundingBox {
        &self.aabb
    }

    /// Stable index of the tile within its terrain.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Parses a bounding-box sidecar file.
pub fn read_world_aabb(path: &Path) -> Result<AxisAlignedBoundingBox, TerrainError> {
    let content = std::fs::read_to_string(path).map_err(|error| TerrainError::AssetMissing {
        path: path.to_path_buf(),
        error: error.to_string(),
    })?;

    let values = content
        .split_whitespace()
        .map(|token| {
            token.parse::<f32>().map_err(|_| TerrainError::ParseError {
                path: path.to_path_buf(),
                message: format!("\"{token}\" is not a number"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if values.len() != 6 {
        return Err(TerrainError::ParseError {
            path: path.to_path_buf(),
            message: format!("expected 6 bounding box values, got {}", values.len()),
        });
    }

    let aabb = AxisAlignedBoundingBox::from_min_max(
        Vector3::new(values[0], values[1], values[2]),
        Vector3::new(values[3], values[4], values[5]),
    );
    if !aabb.is_valid() {
        return Err(TerrainError::ParseError {
            path: path.to_path_buf(),
            message: "bounding box extremes are inverted".to_owned(),
        });
    }
    Ok(aabb)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn write_sidecar(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn sidecar_parses_six_values() {
        let path = write_sidecar("relief_bb_ok.bb", "0 -10.5 0 2047 16384 2047\n");
        let aabb = read_world_aabb(&path).unwrap();
        assert_eq!(aabb.min, Vector3::new(0.0, -10.5, 0.0));
        assert_eq!(aabb.max, Vector3::new(2047.0, 16384.0, 2047.0));
    }

    #[test]
    fn sidecar_accepts_any_whitespace() {
        let path = write_sidecar("relief_bb_ws.bb", "0 0 0\n10\t20 30");
        assert!(read_world_aabb(&path).is_ok());
    }

    #[test]
    fn sidecar_rejects_wrong_value_count() {
        let path = write_sidecar("relief_bb_five.bb", "0 0 0 10 20");
        assert!(matches!(
            read_world_aabb(&path),
            Err(TerrainError::ParseError { .. })
        ));
        let path = write_sidecar("relief_bb_seven.bb", "0 0 0 10 20 30 40");
        assert!(matches!(
            read_world_aabb(&path),
            Err(TerrainError::ParseError { .. })
        ));
    }

    #[test]
    fn sidecar_rejects_garbage() {
        let path = write_sidecar("relief_bb_garbage.bb", "0 0 zero 10 20 30");
        assert!(matches!(
            read_world_aabb(&path),
            Err(TerrainError::ParseError { .. })
        ));
    }

    #[test]
    fn sidecar_rejects_inverted_box() {
        let path = write_sidecar("relief_bb_inverted.bb", "10 0 0 0 20 30");
        assert!(matches!(
            read_world_aabb(&path),
            Err(TerrainError::ParseError { .. })
        ));
    }

    #[test]
    fn sidecar_reports_missing_file() {
        let path = std::env::temp_dir().join("relief_bb_does_not_exist.bb");
        assert!(matches!(
            read_world_aabb(&path),
            Err(TerrainError::AssetMissing { .. })
        ));
    }
}
