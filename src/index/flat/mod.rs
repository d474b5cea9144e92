
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use super::{Neighbor, VectorIndex};
use crate::{QaError, Result};

const FOURCC_FLAT: &[u8; 4] = b"IxFl";
const FOURCC_FLAT_L2: &[u8; 4] = b"IxF2";
const FOURCC_FLAT_IP: &[u8; 4] = b"IxFI";

const METRIC_INNER_PRODUCT: i32 = 0;
const METRIC_L2: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Squared euclidean distance, smaller is closer
    L2,
    /// Dot product, larger is closer
    InnerProduct,
}

/// Exhaustive-search index in the FAISS `IndexFlat` on-disk layout.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Build an in-memory index from row-major vectors
    #[inline]
    pub fn from_vectors(dimension: usize, metric: Metric, vectors: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            return Err(QaError::Index("Index dimension must be positive".to_string()));
        }
        if vectors.len() % dimension != 0 {
            return Err(QaError::Index(format!(
                "{} values do not divide into vectors of dimension {}",
                vectors.len(),
                dimension
            )));
        }
        Ok(Self {
            dimension,
            metric,
            vectors,
        })
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => QaError::ResourceNotFound(path.display().to_string()),
            _ => QaError::Resource(format!("Failed to read {}: {}", path.display(), e)),
        })?;

        Self::from_bytes(&bytes).map_err(|e| {
            QaError::Resource(format!("{} is not a flat index: {}", path.display(), e))
        })
    }

    /// Parse a serialized flat index
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        let mut reader = ByteReader::new(bytes);

        let fourcc = reader.take(4)?;
        let mut metric = match fourcc {
            f if f == FOURCC_FLAT_L2 => Some(Metric::L2),
            f if f == FOURCC_FLAT_IP => Some(Metric::InnerProduct),
            f if f == FOURCC_FLAT => None,
            other => {
                return Err(format!(
                    "unsupported index type {:?}",
                    String::from_utf8_lossy(other)
                ));
            }
        };

        let dimension = reader.read_i32()?;
        let ntotal = reader.read_i64()?;
        // two unused header fields
        reader.read_i64()?;
        reader.read_i64()?;
        let _is_trained = reader.take(1)?;
        let metric_type = reader.read_i32()?;
        if metric_type > 1 {
            reader.read_f32()?;
        }

        let header_metric = match metric_type {
            METRIC_INNER_PRODUCT => Metric::InnerProduct,
            METRIC_L2 => Metric::L2,
            other => return Err(format!("unsupported metric type {}", other)),
        };
        match metric {
            Some(expected) if expected != header_metric => {
                return Err(format!(
                    "header metric {:?} contradicts index type {:?}",
                    header_metric, expected
                ));
            }
            Some(_) => {}
            None => metric = Some(header_metric),
        }

        let dimension = usize::try_from(dimension)
            .ok()
            .filter(|&d| d > 0)
            .ok_or_else(|| format!("invalid dimension {}", dimension))?;
        let ntotal = usize::try_from(ntotal).map_err(|_| format!("invalid ntotal {}", ntotal))?;

        let count = usize::try_from(reader.read_u64()?)
            .map_err(|_| "vector data too large".to_string())?;
        let expected = dimension
            .checked_mul(ntotal)
            .ok_or_else(|| "vector data too large".to_string())?;
        if count != expected {
            return Err(format!(
                "expected {} values for {} vectors of dimension {}, found {}",
                expected, ntotal, dimension, count
            ));
        }

        let raw = reader.take(count.checked_mul(4).ok_or("vector data too large")?)?;
        let vectors = raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        if !reader.is_empty() {
            debug!("Ignoring {} trailing bytes after index data", reader.remaining());
        }

        Ok(Self {
            dimension,
            metric: metric.unwrap_or(Metric::L2),
            vectors,
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Number of stored vectors
    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn score(&self, query: &[f32], vector: &[f32]) -> f32 {
        match self.metric {
            Metric::L2 => query
                .iter()
                .zip(vector)
                .map(|(a, b)| {
                    let diff = a - b;
                    diff * diff
                })
                .sum(),
            Metric::InnerProduct => query.iter().zip(vector).map(|(a, b)| a * b).sum(),
        }
    }
}

impl VectorIndex for FlatIndex {
    #[inline]
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(QaError::Index(format!(
                "Query has {} dimensions but the index stores {}",
                query.len(),
                self.dimension
            )));
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, vector)| Neighbor {
                ordinal: ordinal as i64,
                score: self.score(query, vector),
            })
            .collect();

        match self.metric {
            Metric::L2 => neighbors.sort_by(|a, b| a.score.total_cmp(&b.score)),
            Metric::InnerProduct => neighbors.sort_by(|a, b| b.score.total_cmp(&a.score)),
        }
        neighbors.truncate(k);

        debug!("Flat search returned {} neighbors", neighbors.len());
        Ok(neighbors)
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn take(&mut self, len: usize) -> std::result::Result<&'a [u8], String> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| format!("unexpected end of file at byte {}", self.position))?;
        let slice = self.bytes.get(self.position..end).unwrap_or_default();
        self.position = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> std::result::Result<[u8; N], String> {
        let slice = self.take(N)?;
        let mut out = [0; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_i32(&mut self) -> std::result::Result<i32, String> {
        self.array().map(i32::from_le_bytes)
    }

    fn read_i64(&mut self) -> std::result::Result<i64, String> {
        self.array().map(i64::from_le_bytes)
    }

    fn read_u64(&mut self) -> std::result::Result<u64, String> {
        self.array().map(u64::from_le_bytes)
    }

    fn read_f32(&mut self) -> std::result::Result<f32, String> {
        self.array().map(f32::from_le_bytes)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}
