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

//! The height raster of a terrain tile. Heights are stored as raw 16-bit
//! values; the GPU sees them as a normalized `0..1` single-channel float
//! texture and the quadtree reads them directly for its bounding boxes.

use crate::{
    error::TerrainError,
    log::Log,
    renderer::server::{GpuTexture, GpuTextureDescriptor, GraphicsServer, PixelKind, SamplerPreset},
    settings::{TerrainSettings, MAX_HEIGHTMAP_EXTENT},
};
use image::DynamicImage;
use std::path::Path;

/// A square 16-bit monochrome height raster. Immutable after construction; the
/// min/max extrema always match the raster content.
pub struct Heightmap {
    extent: u32,
    heights: Vec<u16>,
    min_height: u16,
    max_height: u16,
    texture: Option<Box<dyn GpuTexture>>,
}

impl Heightmap {
    /// Wraps a raw height raster. `heights` is row-major with `extent` values
    /// per row; the extent must be a power of two between twice the leaf node
    /// size and [`MAX_HEIGHTMAP_EXTENT`].
    pub fn from_raw(
        extent: u32,
        heights: Vec<u16>,
        settings: &TerrainSettings,
    ) -> Result<Self, TerrainError> {
        if !extent.is_power_of_two()
            || extent < settings.min_heightmap_extent()
            || extent > MAX_HEIGHTMAP_EXTENT
        {
            return Err(TerrainError::InvalidHeightmapSize {
                width: extent,
                height: extent,
            });
        }
        if heights.len() != (extent as usize).pow(2) {
            return Err(TerrainError::Invariant(format!(
                "height raster of extent {} must hold {} values, got {}",
                extent,
                (extent as usize).pow(2),
                heights.len()
            )));
        }
        let mut min_height = u16::MAX;
        let mut max_height = 0;
        for &height in heights.iter() {
            min_height = min_height.min(height);
            max_height = max_height.max(height);
        }
        Ok(Self {
            extent,
            heights,
            min_height,
            max_height,
            texture: None,
        })
    }

    /// Loads a heightmap from a single-channel image file. 16-bit rasters are
    /// taken as-is, 8-bit grayscale is widened to the full 16-bit range; any
    /// other channel layout is rejected.
    pub fn load(path: &Path, settings: &TerrainSettings) -> Result<Self, TerrainError> {
        let image = image::open(path).map_err(|error| match error {
            image::ImageError::IoError(io_error) => TerrainError::AssetMissing {
                path: path.to_path_buf(),
                error: io_error.to_string(),
            },
            other => TerrainError::ParseError {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        })?;

        let (width, height, heights) = match image {
            DynamicImage::ImageLuma16(buffer) => {
                let (width, height) = (buffer.width(), buffer.height());
                (width, height, buffer.into_raw())
            }
            DynamicImage::ImageLuma8(buffer) => {
                let (width, height) = (buffer.width(), buffer.height());
                let widened = buffer
                    .into_raw()
                    .into_iter()
                    .map(|value| value as u16 * 257)
                    .collect();
                (width, height, widened)
            }
            _ => {
                return Err(TerrainError::InvalidChannels {
                    path: path.to_path_buf(),
                })
            }
        };

        if width != height {
            return Err(TerrainError::InvalidHeightmapSize { width, height });
        }

        let heightmap = Self::from_raw(width, heights, settings)?;
        Log::info(format!(
            "Heightmap \"{}\" loaded, {}x{}, heights {}..{}",
            path.display(),
            heightmap.extent,
            heightmap.extent,
            heightmap.min_height,
            heightmap.max_height
        ));
        Ok(heightmap)
    }

    /// Uploads the raster to the GPU as a normalized single-channel float
    /// texture with linear filtering clamped at the edges.
    pub fn upload(&mut self, server: &dyn GraphicsServer) -> Result<(), TerrainError> {
        let normalized: Vec<f32> = self
            .heights
            .iter()
            .map(|&height| height as f32 / u16::MAX as f32)
            .collect();
        self.texture = Some(server.create_texture(GpuTextureDescriptor {
            width: self.extent,
            height: self.extent,
            pixel_kind: PixelKind::R32F,
            sampler: SamplerPreset::LinearClamp,
            data: bytemuck::cast_slice(&normalized),
        })?);
        Ok(())
    }

    /// Side length of the raster in texels.
    #[inline]
    pub fn extent(&self) -> u32 {
        self.extent
    }

    /// Smallest raw height of the whole raster.
    #[inline]
    pub fn min_height(&self) -> u16 {
        self.min_height
    }

    /// Largest raw height of the whole raster.
    #[inline]
    pub fn max_height(&self) -> u16 {
        self.max_height
    }

    /// The GPU texture, if [`Heightmap::upload`] has been called.
    #[inline]
    pub fn texture(&self) -> Option<&dyn GpuTexture> {
        self.texture.as_deref()
    }

    /// Raw height at the given raster cell. Bounds are the caller's
    /// responsibility.
    #[inline]
    pub fn height_at(&self, x: u32, z: u32) -> u16 {
        self.heights[(x + z * self.extent) as usize]
    }

    /// Smallest and largest raw height over the `w * h` rectangle starting at
    /// `(x, z)`. The rectangle must lie within the raster.
    pub fn min_max_area(&self, x: u32, z: u32, w: u32, h: u32) -> (u16, u16) {
        let mut min = u16::MAX;
        let mut max = 0;
        for j in z..z + h {
            for i in x..x + w {
                let height = self.height_at(i, j);
                min = min.min(height);
                max = max.max(height);
            }
        }
        (min, max)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::server::test::{NullGraphicsServer, NullTexture};

    fn small_settings() -> TerrainSettings {
        TerrainSettings {
            lod_level_count: 2,
            leaf_node_size: 8,
            ..Default::default()
        }
    }

    // Heights rise along x so area extrema are easy to predict.
    fn gradient(extent: u32) -> Vec<u16> {
        (0..extent * extent)
            .map(|i| (i % extent) as u16)
            .collect()
    }

    #[test]
    fn from_raw_computes_extrema() {
        let heightmap = Heightmap::from_raw(16, gradient(16), &small_settings()).unwrap();
        assert_eq!(heightmap.extent(), 16);
        assert_eq!(heightmap.min_height(), 0);
        assert_eq!(heightmap.max_height(), 15);
    }

    #[test]
    fn from_raw_rejects_bad_extents() {
        let settings = small_settings();
        for extent in [0, 8, 12, 20] {
            assert!(matches!(
                Heightmap::from_raw(extent, vec![0; (extent * extent) as usize], &settings),
                Err(TerrainError::InvalidHeightmapSize { .. })
            ));
        }
        assert!(matches!(
            Heightmap::from_raw(16, vec![0; 10], &settings),
            Err(TerrainError::Invariant(_))
        ));
    }

    #[test]
    fn min_max_area_matches_rectangle() {
        let heightmap = Heightmap::from_raw(16, gradient(16), &small_settings()).unwrap();
        assert_eq!(heightmap.min_max_area(0, 0, 16, 16), (0, 15));
        assert_eq!(heightmap.min_max_area(4, 2, 3, 5), (4, 6));
        assert_eq!(heightmap.min_max_area(15, 0, 1, 1), (15, 15));
    }

    #[test]
    fn height_at_is_row_major() {
        let mut heights = vec![0u16; 256];
        heights[3 + 2 * 16] = 777;
        let heightmap = Heightmap::from_raw(16, heights, &small_settings()).unwrap();
        assert_eq!(heightmap.height_at(3, 2), 777);
        assert_eq!(heightmap.height_at(2, 3), 0);
    }

    #[test]
    fn upload_creates_normalized_texture() {
        let mut heightmap = Heightmap::from_raw(16, gradient(16), &small_settings()).unwrap();
        assert!(heightmap.texture().is_none());
        heightmap.upload(&NullGraphicsServer).unwrap();
        let texture = heightmap
            .texture()
            .unwrap()
            .as_any()
            .downcast_ref::<NullTexture>()
            .unwrap();
        assert_eq!(texture.width, 16);
        assert_eq!(texture.height, 16);
        assert_eq!(texture.pixel_kind, PixelKind::R32F);
        assert_eq!(texture.sampler, SamplerPreset::LinearClamp);
    }

    #[test]
    fn load_accepts_luma16_and_widened_luma8() {
        let settings = small_settings();
        let dir = std::env::temp_dir();

        let path16 = dir.join("relief_heightmap_luma16.png");
        let buffer16 =
            image::ImageBuffer::<image::Luma<u16>, _>::from_fn(16, 16, |x, _| {
                image::Luma([x as u16 * 100])
            });
        buffer16.save(&path16).unwrap();
        let heightmap = Heightmap::load(&path16, &settings).unwrap();
        assert_eq!(heightmap.extent(), 16);
        assert_eq!(heightmap.max_height(), 1500);

        let path8 = dir.join("relief_heightmap_luma8.png");
        let buffer8 = image::ImageBuffer::<image::Luma<u8>, _>::from_fn(16, 16, |x, _| {
            image::Luma([x as u8])
        });
        buffer8.save(&path8).unwrap();
        let heightmap = Heightmap::load(&path8, &settings).unwrap();
        // 8-bit values cover the full 16-bit range after widening.
        assert_eq!(heightmap.max_height(), 15 * 257);
    }

    #[test]
    fn load_rejects_rgb() {
        let path = std::env::temp_dir().join("relief_heightmap_rgb.png");
        let buffer = image::ImageBuffer::<image::Rgb<u8>, _>::from_pixel(
            16,
            16,
            image::Rgb([1u8, 2, 3]),
        );
        buffer.save(&path).unwrap();
        assert!(matches!(
            Heightmap::load(&path, &small_settings()),
            Err(TerrainError::InvalidChannels { .. })
        ));
    }

    #[test]
    fn load_rejects_non_square() {
        let path = std::env::temp_dir().join("relief_heightmap_rect.png");
        let buffer =
            image::ImageBuffer::<image::Luma<u16>, _>::from_pixel(16, 32, image::Luma([0u16]));
        buffer.save(&path).unwrap();
        assert!(matches!(
            Heightmap::load(&path, &small_settings()),
            Err(TerrainError::InvalidHeightmapSize {
                width: 16,
                height: 32
            })
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let path = std::env::temp_dir().join("relief_heightmap_does_not_exist.png");
        assert!(matches!(
            Heightmap::load(&path, &small_settings()),
            Err(TerrainError::AssetMissing { .. })
        ));
    }
}
