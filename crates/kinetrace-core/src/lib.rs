pub mod aligner;
pub mod config;
pub mod dedup;
pub mod error;
pub mod file_name;
pub mod gap_audit;
pub mod outputs;
pub mod pipeline;
pub mod reorder;
pub mod row_validator;
