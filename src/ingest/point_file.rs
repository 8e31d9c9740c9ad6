//! Point-cloud files: named per-point attributes, rkyv-archived and LZ4-compressed.
//!
//! A file stores `num_points` points as a list of attributes, each holding
//! `count` floats per point. Loading for shading needs `position` and `normal`
//! (vectors), `radius` (one float) and optionally `_radiosity` (three floats,
//! the surfel color). Other attributes are kept in the file but ignored.

use std::path::Path;

use rkyv::{Archive, Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::surfel::{SurfelBuffer, SURFEL_FLOATS};

/// Current file format version
pub const POINT_FILE_VERSION: u32 = 1;

/// Attribute names read by [`PointFile::to_surfels`]
pub const POSITION_ATTR: &str = "position";
pub const NORMAL_ATTR: &str = "normal";
pub const RADIUS_ATTR: &str = "radius";
pub const RADIOSITY_ATTR: &str = "_radiosity";

/// Interpretation of an attribute's floats
#[derive(Archive, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    Float,
    Vector,
    Color,
}

/// One named attribute, `count` floats per point
#[derive(Archive, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct AttributeData {
    pub name: String,
    pub kind: AttributeKind,
    pub count: u32,
    /// `num_points * count` floats, point-major
    pub values: Vec<f32>,
}

/// On-disk payload
#[derive(Archive, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PointFileData {
    pub version: u32,
    pub num_points: u64,
    pub attributes: Vec<AttributeData>,
}

/// An in-memory point file.
#[derive(Clone, Debug, PartialEq)]
pub struct PointFile {
    data: PointFileData,
}

impl PointFile {
    /// Empty file for `num_points` points, no attributes yet
    pub fn new(num_points: usize) -> Self {
        Self {
            data: PointFileData {
                version: POINT_FILE_VERSION,
                num_points: num_points as u64,
                attributes: Vec::new(),
            },
        }
    }

    /// File carrying the fixed surfel fields of `surfels`.
    /// Color is written as `_radiosity`; trailing fields are not stored.
    pub fn from_buffer(surfels: &SurfelBuffer) -> Self {
        let n = surfels.len();
        let mut position = Vec::with_capacity(n * 3);
        let mut normal = Vec::with_capacity(n * 3);
        let mut radius = Vec::with_capacity(n);
        let mut color = Vec::with_capacity(n * 3);
        for s in surfels.iter() {
            position.extend_from_slice(&s.position().to_array());
            normal.extend_from_slice(&s.normal().to_array());
            radius.push(s.radius());
            color.extend_from_slice(&s.color().to_array());
        }

        Self::new(n)
            .with_attribute(POSITION_ATTR, AttributeKind::Vector, 3, position)
            .with_attribute(NORMAL_ATTR, AttributeKind::Vector, 3, normal)
            .with_attribute(RADIUS_ATTR, AttributeKind::Float, 1, radius)
            .with_attribute(RADIOSITY_ATTR, AttributeKind::Color, 3, color)
    }

    /// Add (or replace) an attribute
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        kind: AttributeKind,
        count: u32,
        values: Vec<f32>,
    ) -> Self {
        let name = name.into();
        self.data.attributes.retain(|a| a.name != name);
        self.data.attributes.push(AttributeData { name, kind, count, values });
        self
    }

    /// Drop an attribute, if present
    pub fn without_attribute(mut self, name: &str) -> Self {
        self.data.attributes.retain(|a| a.name != name);
        self
    }

    pub fn num_points(&self) -> usize {
        self.data.num_points as usize
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeData> {
        self.data.attributes.iter().find(|a| a.name == name)
    }

    pub fn attributes(&self) -> &[AttributeData] {
        &self.data.attributes
    }

    /// Serialize and compress
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&self.data)
            .map_err(|e| Error::PointFile(e.to_string()))?;
        Ok(lz4_flex::compress_prepend_size(&bytes))
    }

    /// Decompress and deserialize
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decompressed = lz4_flex::decompress_size_prepended(bytes)
            .map_err(|e| Error::PointFile(format!("LZ4 decompression failed: {}", e)))?;

        // Archives must be read from aligned memory
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(decompressed.len());
        aligned.extend_from_slice(&decompressed);

        let data = rkyv::from_bytes::<PointFileData, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::PointFile(e.to_string()))?;

        if data.version != POINT_FILE_VERSION {
            return Err(Error::PointFile(format!(
                "unsupported point file version {} (expected {})",
                data.version, POINT_FILE_VERSION
            )));
        }
        Ok(Self { data })
    }

    /// Write to disk, creating parent directories
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read from disk
    pub fn load_sync(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Interleave the surfel attributes into a stride-10 buffer.
    ///
    /// `path` is only used in error messages.
    pub fn to_surfels(&self, path: &Path) -> Result<SurfelBuffer> {
        let position = self.require(path, POSITION_ATTR)?;
        let normal = self.require(path, NORMAL_ATTR)?;
        let radius = self.require(path, RADIUS_ATTR)?;
        let radiosity = self.attribute(RADIOSITY_ATTR);

        check_kind(path, position, &[AttributeKind::Vector], 3)?;
        check_kind(path, normal, &[AttributeKind::Vector], 3)?;
        check_kind(path, radius, &[AttributeKind::Float], 1)?;
        if let Some(attr) = radiosity {
            check_kind(path, attr, &[AttributeKind::Float, AttributeKind::Color], 3)?;
        }

        let n = usize::try_from(self.data.num_points).map_err(|_| {
            Error::PointFile(format!("{} declares {} points", path.display(), self.data.num_points))
        })?;
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        for attr in [Some(position), Some(normal), Some(radius), radiosity].into_iter().flatten() {
            check_length(path, attr, n)?;
        }

        // Every attribute length matched above, so `n` is backed by real data
        let floats = n.checked_mul(SURFEL_FLOATS).ok_or_else(|| overflow(path, POSITION_ATTR, n))?;
        let mut data = Vec::new();
        data.try_reserve_exact(floats)
            .map_err(|e| Error::PointFile(format!("{}: {}", path.display(), e)))?;
        for i in 0..n {
            data.extend_from_slice(&position.values[i * 3..i * 3 + 3]);
            data.extend_from_slice(&normal.values[i * 3..i * 3 + 3]);
            data.push(radius.values[i]);
            match radiosity {
                Some(c) => data.extend_from_slice(&c.values[i * 3..i * 3 + 3]),
                None => data.extend_from_slice(&[0.0; 3]),
            }
        }

        SurfelBuffer::new(data, SURFEL_FLOATS)
    }

    fn require(&self, path: &Path, name: &str) -> Result<&AttributeData> {
        self.attribute(name).ok_or_else(|| Error::MissingAttribute {
            path: path.to_path_buf(),
            name: name.to_string(),
        })
    }
}

fn check_kind(path: &Path, attr: &AttributeData, kinds: &[AttributeKind], count: u32) -> Result<()> {
    if kinds.contains(&attr.kind) && attr.count == count {
        Ok(())
    } else {
        Err(Error::AttributeType {
            path: path.to_path_buf(),
            name: attr.name.clone(),
        })
    }
}

fn check_length(path: &Path, attr: &AttributeData, num_points: usize) -> Result<()> {
    let expected = num_points
        .checked_mul(attr.count as usize)
        .ok_or_else(|| overflow(path, &attr.name, num_points))?;
    if attr.values.len() == expected {
        Ok(())
    } else {
        Err(Error::AttributeLength {
            path: path.to_path_buf(),
            name: attr.name.clone(),
            expected,
            actual: attr.values.len(),
        })
    }
}

fn overflow(path: &Path, name: &str, num_points: usize) -> Error {
    Error::PointFile(format!(
        "attribute \"{}\" in {} cannot hold {} points",
        name,
        path.display(),
        num_points
    ))
}

/// Read a point file and return its surfels.
pub fn load_surfels(path: &Path) -> Result<SurfelBuffer> {
    let file = PointFile::load_sync(path)?;
    let surfels = file.to_surfels(path)?;
    log::debug!("Loaded {} surfels from {}", surfels.len(), path.display());
    Ok(surfels)
}
