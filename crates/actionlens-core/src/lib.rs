pub mod classifier;
pub mod corpus;
pub mod extractor;
pub mod inventory;
pub mod reference;
pub mod report;
pub mod stats;

pub use corpus::{load_corpus, RepoRecord, WorkflowFile};
pub use extractor::ReferenceExtractor;
pub use inventory::{load_references, Inventory, InventoryError, Summary};
pub use reference::{ActionReference, Classification, Invocation, RiskLevel};
pub use stats::SecurityStats;
