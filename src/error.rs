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

//! Contains all possible errors that may occur during terrain initialization
//! and asset loading.

use std::{
    error::Error,
    fmt::{Display, Formatter},
    path::PathBuf,
};

/// Set of possible terrain errors. All of them are startup errors: per-frame
/// conditions (such as selection buffer overflow) never produce an error value,
/// they degrade gracefully and log instead.
#[derive(Debug)]
pub enum TerrainError {
    /// A settings value is outside its permitted range.
    InvalidSettings(String),
    /// An asset file is missing or could not be read.
    AssetMissing {
        /// Path of the file.
        path: PathBuf,
        /// Underlying i/o error message.
        error: String,
    },
    /// A heightmap raster is not a single-channel 16-bit (or 8-bit) image.
    InvalidChannels {
        /// Path of the file.
        path: PathBuf,
    },
    /// A heightmap raster is not square, or its side is not a permitted power
    /// of two.
    InvalidHeightmapSize {
        /// Raster width in texels.
        width: u32,
        /// Raster height in texels.
        height: u32,
    },
    /// A file has the right shape on disk but its content failed to parse.
    ParseError {
        /// Path of the file.
        path: PathBuf,
        /// What exactly went wrong.
        message: String,
    },
    /// An internal precomputed invariant did not hold; fatal at startup.
    Invariant(String),
    /// Custom error. Usually reported by a graphics backend implementation.
    Custom(String),
}

impl Display for TerrainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TerrainError::InvalidSettings(message) => {
                write!(f, "Invalid terrain settings: {message}")
            }
            TerrainError::AssetMissing { path, error } => {
                write!(f, "Unable to read \"{}\": {error}", path.display())
            }
            TerrainError::InvalidChannels { path } => {
                write!(
                    f,
                    "Heightmap \"{}\" is not a monochrome 16-bit image",
                    path.display()
                )
            }
            TerrainError::InvalidHeightmapSize { width, height } => {
                write!(
                    f,
                    "Heightmap must be square with a power-of-two side between twice the \
                    leaf node size and 16384, got {width}x{height}",
                )
            }
            TerrainError::ParseError { path, message } => {
                write!(f, "Unable to parse \"{}\": {message}", path.display())
            }
            TerrainError::Invariant(message) => {
                write!(f, "Invariant violation: {message}")
            }
            TerrainError::Custom(message) => {
                write!(f, "{message}")
            }
        }
    }
}

impl Error for TerrainError {}

impl From<String> for TerrainError {
    fn from(message: String) -> Self {
        Self::Custom(message)
    }
}

impl From<&str> for TerrainError {
    fn from(message: &str) -> Self {
        Self::Custom(message.to_owned())
    }
}
