pub mod auditor;
pub mod bizview;
pub mod bizview_count;
pub mod classifier;
pub mod errors;
pub mod extractor;
pub mod mapping;
pub mod oracle;
pub mod query;
pub mod report;
pub mod rows;
pub mod thresholds;
pub mod types;

pub use auditor::Auditor;
pub use bizview::{BizviewComparison, BizviewReconciler, ViewType};
pub use bizview_count::{BizviewCountStrategy, BizviewCounter};
pub use classifier::{CountComparison, DiscrepancyClassifier, ValidationOutcome};
pub use errors::{AuditError, ConfigError, QueryError, RowConversionError};
pub use extractor::{DifferenceExtractor, DifferenceRecord, ExtractionOutcome};
pub use mapping::{MappingBuilder, TableMapping};
pub use oracle::{CountOracle, CountResult, CountTarget};
pub use query::{DataFusionEngine, QueryEngine, SessionSettings, SourceFormat};
pub use report::{ReportRecord, RunReport};
pub use thresholds::Thresholds;
