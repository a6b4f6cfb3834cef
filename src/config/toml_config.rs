use crate::adapters::container::DEFAULT_DOCUMENT_SUFFIXES;
use crate::config::default_output_path;
use crate::core::ConfigProvider;
use crate::utils::error::{Result, TransposeError};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_required_field, validate_suffixes, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub transpose: TransposeSection,
    pub container: Option<ContainerSection>,
    pub monitoring: Option<MonitoringConfig>,
    #[serde(default)]
    pub jobs: Vec<BatchJob>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransposeSection {
    /// Default interval for jobs that do not set their own.
    pub interval: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSection {
    pub document_suffixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub input: String,
    pub output: Option<String>,
    pub interval: Option<i32>,
    pub from_key: Option<String>,
}

/// One fully resolved job, ready to hand to a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub input: String,
    pub output: String,
    pub interval: i32,
    pub document_suffixes: Vec<String>,
    pub from_key: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TransposeError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SCORES_DIR})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TransposeError::Config {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn document_suffixes(&self) -> Vec<String> {
        self.container
            .as_ref()
            .and_then(|c| c.document_suffixes.clone())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_SUFFIXES.iter().map(|s| s.to_string()).collect())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }

    /// Resolve every job against the defaults. Fails on the first job that
    /// has no interval.
    pub fn resolve_jobs(&self) -> Result<Vec<JobConfig>> {
        let suffixes = self.document_suffixes();

        self.jobs
            .iter()
            .enumerate()
            .map(|(index, job)| -> Result<JobConfig> {
                let interval = job.interval.or(self.transpose.interval);
                let interval =
                    *validate_required_field(&format!("jobs[{}].interval", index), &interval)?;
                Ok(JobConfig {
                    input: job.input.clone(),
                    output: job
                        .output
                        .clone()
                        .unwrap_or_else(|| default_output_path(&job.input)),
                    interval,
                    document_suffixes: suffixes.clone(),
                    from_key: job.from_key.clone(),
                })
            })
            .collect()
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.jobs.is_empty() {
            return Err(TransposeError::MissingConfig {
                field: "jobs".to_string(),
            });
        }

        validate_suffixes("container.document_suffixes", &self.document_suffixes())?;

        for job in self.resolve_jobs()? {
            job.validate()?;
        }

        if let Some(format) = self.monitoring.as_ref().and_then(|m| m.log_format.as_deref()) {
            if !["json", "compact"].contains(&format.to_ascii_lowercase().as_str()) {
                return Err(TransposeError::InvalidConfigValue {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Supported formats: json, compact".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

impl ConfigProvider for JobConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> String {
        self.output.clone()
    }

    fn interval(&self) -> i32 {
        self.interval
    }

    fn document_suffixes(&self) -> &[String] {
        &self.document_suffixes
    }
}

impl Validate for JobConfig {
    fn validate(&self) -> Result<()> {
        validate_path("jobs.input", &self.input)?;
        validate_path("jobs.output", &self.output)?;
        if let Some(key) = &self.from_key {
            validate_non_empty_string("jobs.from_key", key)?;
            key.parse::<crate::core::key::KeyLabel>()?;
        }
        Ok(())
    }
}
