// Vector index module
// Nearest-neighbour search over a local flat index file or a hosted service

pub mod flat;
pub mod hosted;

pub use flat::{FlatIndex, Metric};
pub use hosted::HostedIndex;

use tracing::info;

use crate::Result;
use crate::config::{IndexBackend, IndexConfig};

/// One search hit. `ordinal` is the position of the document in the document store; it is
/// signed because index backends use `-1` to pad short result lists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub ordinal: i64,
    pub score: f32,
}

pub trait VectorIndex: Send {
    /// Return up to `k` neighbours of `query`, best first
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}

/// Open the index selected by `config`. The flat backend reads its file here; the hosted
/// backend only resolves its API key and performs no network I/O until searched.
#[inline]
pub fn open_index(config: &IndexConfig) -> Result<Box<dyn VectorIndex>> {
    match config.backend {
        IndexBackend::Flat => {
            let index = FlatIndex::load(&config.index_path)?;
            info!(
                "Loaded flat index {} ({} vectors, {} dimensions)",
                config.index_path.display(),
                index.len(),
                index.dimension()
            );
            Ok(Box::new(index))
        }
        IndexBackend::Hosted => {
            let index = HostedIndex::new(&config.hosted)?;
            info!("Using hosted index at {}", config.hosted.host);
            Ok(Box::new(index))
        }
    }
}
