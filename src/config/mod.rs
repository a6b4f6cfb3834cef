pub mod cli;
pub mod toml_config;

use std::path::Path;

/// `scores/song.mxl` -> `scores/song-transposed.mxl`
pub fn default_output_path(input: &str) -> String {
    let path = Path::new(input);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("score");
    let file_name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-transposed.{}", stem, ext),
        None => format!("{}-transposed", stem),
    };
    path.with_file_name(file_name).to_string_lossy().into_owned()
}

#[cfg(feature = "cli")]
pub use self::cli_args::CliConfig;

#[cfg(feature = "cli")]
mod cli_args {
    use super::default_output_path;
    use crate::adapters::container::DEFAULT_DOCUMENT_SUFFIXES;
    use crate::core::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{
        validate_non_empty_string, validate_path, validate_suffixes, Validate,
    };
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "transposex")]
    #[command(about = "Transpose every note of a MusicXML score by a number of semitones")]
    pub struct CliConfig {
        /// Input score: .mxl archive, or .xml/.musicxml document
        pub input: String,

        /// Semitones to shift by, negative to go down
        #[arg(short, long, allow_negative_numbers = true)]
        pub interval: i32,

        /// Output path [default: <input stem>-transposed.<ext>]
        #[arg(short, long)]
        pub output: Option<String>,

        /// Entry name suffixes that identify the score inside an archive
        #[arg(long = "suffix", value_delimiter = ',', default_values_t = DEFAULT_DOCUMENT_SUFFIXES.map(String::from))]
        pub document_suffixes: Vec<String>,

        /// Key of the original score, reported alongside the transposed key
        #[arg(long)]
        pub from_key: Option<String>,

        /// Print a JSON report on stdout
        #[arg(long)]
        pub json: bool,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log CPU and memory usage per stage")]
        pub monitor: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> &str {
            &self.input
        }

        fn output_path(&self) -> String {
            self.output
                .clone()
                .unwrap_or_else(|| default_output_path(&self.input))
        }

        fn interval(&self) -> i32 {
            self.interval
        }

        fn document_suffixes(&self) -> &[String] {
            &self.document_suffixes
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_path("input", &self.input)?;
            if let Some(output) = &self.output {
                validate_path("output", output)?;
            }
            validate_suffixes("suffix", &self.document_suffixes)?;
            if let Some(key) = &self.from_key {
                validate_non_empty_string("from_key", key)?;
                key.parse::<crate::core::key::KeyLabel>()?;
            }
            Ok(())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(default_output_path("song.mxl"), "song-transposed.mxl");
        assert_eq!(
            default_output_path("/tmp/scores/Song.musicxml"),
            "/tmp/scores/Song-transposed.musicxml"
        );
        assert_eq!(default_output_path("score"), "score-transposed");
    }
}
