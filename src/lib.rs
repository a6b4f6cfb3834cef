pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, toml_config::JobConfig};
pub use core::{
    etl::{build_report, transpose_archive, TranspositionEngine},
    key::KeyLabel,
    pipeline::{transpose_document, transpose_xml, TranspositionPipeline},
    transposer::transpose,
};
pub use domain::model::{Pitch, Step, TransposeOutcome, TransposeReport, TransposeStats};
pub use utils::error::{Result, TransposeError};
