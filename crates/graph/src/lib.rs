pub mod assembler;
pub mod model;
pub mod stats;

pub use assembler::{AssemblyError, GraphAssembler};
pub use model::{Edge, GraphMetadata, KnowledgeGraph, Node};
pub use stats::{GraphStatistics, statistics};
