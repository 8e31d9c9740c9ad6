//! Stride-addressed surfel buffer handed over by the ingestion adapter.

use crate::core::error::Error;
use crate::core::types::{Result, Vec3};

use super::record::{SurfelRecord, SurfelRef, SURFEL_FLOATS};

/// Flat array of interleaved surfel records.
///
/// Each record is `stride` floats: the fixed 10-float layout followed by
/// `stride - 10` opaque trailing fields that are carried along untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfelBuffer {
    data: Vec<f32>,
    stride: usize,
}

impl Default for SurfelBuffer {
    fn default() -> Self {
        Self { data: Vec::new(), stride: SURFEL_FLOATS }
    }
}

impl SurfelBuffer {
    /// Wrap interleaved data.
    ///
    /// Fails if `stride < 10` or the data is not a whole number of records.
    pub fn new(data: Vec<f32>, stride: usize) -> Result<Self> {
        if stride < SURFEL_FLOATS {
            return Err(Error::InvalidStride(stride));
        }
        if data.len() % stride != 0 {
            return Err(Error::RaggedBuffer { len: data.len(), stride });
        }
        Ok(Self { data, stride })
    }

    /// Stride-10 buffer from packed records
    pub fn from_records(records: &[SurfelRecord]) -> Self {
        Self {
            data: bytemuck::cast_slice(records).to_vec(),
            stride: SURFEL_FLOATS,
        }
    }

    /// Append one surfel with the fixed layout.
    ///
    /// Trailing fields of wider buffers are zero-filled.
    pub fn push(&mut self, position: Vec3, normal: Vec3, radius: f32, color: Vec3) {
        let rec = SurfelRecord::new(position, normal, radius, color);
        self.data.extend_from_slice(bytemuck::cast_slice(std::slice::from_ref(&rec)));
        self.data.resize(self.data.len() + self.stride - SURFEL_FLOATS, 0.0);
    }

    /// Number of floats per record
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.data.len() / self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw record `index` (`stride` floats)
    pub fn record(&self, index: usize) -> &[f32] {
        let start = index * self.stride;
        &self.data[start..start + self.stride]
    }

    /// View of record `index`
    pub fn surfel(&self, index: usize) -> SurfelRef<'_> {
        SurfelRef::new(self.record(index))
    }

    /// Iterate over all records
    pub fn iter(&self) -> impl ExactSizeIterator<Item = SurfelRef<'_>> + '_ {
        self.data.chunks_exact(self.stride).map(SurfelRef::new)
    }

    /// Underlying interleaved floats
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Packed records, only available for stride-10 buffers
    pub fn records(&self) -> Option<&[SurfelRecord]> {
        if self.stride == SURFEL_FLOATS {
            Some(bytemuck::cast_slice(self.data.as_slice()))
        } else {
            None
        }
    }

    /// Sum of all disk areas
    pub fn total_area(&self) -> f64 {
        self.iter().map(|s| s.area() as f64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_rejects_short_stride() {
        let err = SurfelBuffer::new(vec![0.0; 9], 9).unwrap_err();
        assert!(matches!(err, Error::InvalidStride(9)));
    }

    #[test]
    fn test_rejects_ragged_data() {
        let err = SurfelBuffer::new(vec![0.0; 25], 10).unwrap_err();
        assert!(matches!(err, Error::RaggedBuffer { len: 25, stride: 10 }));
    }

    #[test]
    fn test_extra_fields_preserved() {
        let mut data = vec![0.0; 24];
        data[6] = 1.0;
        data[10] = 7.0;
        data[11] = 8.0;
        data[18] = 2.0;
        data[22] = 9.0;
        let buf = SurfelBuffer::new(data, 12).unwrap();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.stride(), 12);
        assert_eq!(buf.surfel(0).extra(), &[7.0, 8.0]);
        assert_eq!(buf.surfel(1).radius(), 2.0);
        assert_eq!(buf.surfel(1).extra(), &[9.0, 0.0]);
        assert!(buf.records().is_none());
    }

    #[test]
    fn test_push_and_records() {
        let mut buf = SurfelBuffer::default();
        assert!(buf.is_empty());
        buf.push(Vec3::ZERO, Vec3::Y, 1.0, Vec3::ONE);
        buf.push(Vec3::X, Vec3::Y, 2.0, Vec3::ZERO);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.stride(), 10);

        let records = buf.records().unwrap();
        assert_eq!(records[1].radius, 2.0);
        assert_eq!(SurfelBuffer::from_records(records), buf);
        assert!((buf.total_area() - 5.0 * PI).abs() < 1e-4);
    }

    #[test]
    fn test_iter_len() {
        let buf = SurfelBuffer::new(vec![0.0; 40], 10).unwrap();
        assert_eq!(buf.iter().len(), 4);
    }
}
