use crate::utils::error::{Result, TransposeError};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(TransposeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(TransposeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// Document suffixes must be non-empty and start with a dot, e.g. `.xml`.
pub fn validate_suffixes(field_name: &str, suffixes: &[String]) -> Result<()> {
    if suffixes.is_empty() {
        return Err(TransposeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: String::new(),
            reason: "At least one document suffix is required".to_string(),
        });
    }

    for suffix in suffixes {
        if suffix.len() < 2 || !suffix.starts_with('.') {
            return Err(TransposeError::InvalidConfigValue {
                field: field_name.to_string(),
                value: suffix.clone(),
                reason: "Suffix must start with '.' followed by an extension".to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| TransposeError::MissingConfig {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TransposeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}
