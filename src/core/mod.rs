pub mod etl;
pub mod key;
pub mod pipeline;
pub mod transposer;

pub use crate::domain::model::{Pitch, Step, TransposeOutcome, TransposeStats};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
