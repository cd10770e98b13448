use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayrollError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid input '{value}' for {field}: {reason}")]
    InvalidInputError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Pay history has {actual} month(s) but month {month_index} needs {expected}")]
    HistoryLengthError {
        month_index: u32,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Calculation,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl PayrollError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PayrollError::ConfigValidationError { .. }
            | PayrollError::InvalidConfigValueError { .. }
            | PayrollError::MissingConfigError { .. } => ErrorCategory::Configuration,
            PayrollError::CsvError(_)
            | PayrollError::InvalidInputError { .. } => ErrorCategory::Input,
            PayrollError::HistoryLengthError { .. } => ErrorCategory::Calculation,
            PayrollError::ZipError(_)
            | PayrollError::IoError(_)
            | PayrollError::SerializationError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Calculation => {
                ErrorSeverity::High
            }
            ErrorCategory::Storage => match self {
                // 寫檔失敗通常重試即可
                PayrollError::IoError(_) => ErrorSeverity::Medium,
                _ => ErrorSeverity::Critical,
            },
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PayrollError::IoError(e) => format!("File access failed: {}", e),
            PayrollError::CsvError(e) => format!("Salary sheet could not be read: {}", e),
            PayrollError::HistoryLengthError {
                month_index,
                expected,
                ..
            } => format!(
                "Month {} needs exactly {} previous salary value(s)",
                month_index, expected
            ),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PayrollError::ConfigValidationError { .. }
            | PayrollError::InvalidConfigValueError { .. } => {
                "Check the configuration values against the documented ranges"
            }
            PayrollError::MissingConfigError { .. } => "Add the missing field to the configuration",
            PayrollError::InvalidInputError { .. } => {
                "Amounts must be non-negative and months must be between 1 and 12"
            }
            PayrollError::HistoryLengthError { .. } => {
                "Pass one gross salary per earlier month of the tax year, or omit the history"
            }
            PayrollError::CsvError(_) => {
                "Use a CSV with header month,gross_salary[,special_deductions]"
            }
            PayrollError::IoError(_) => "Verify the path exists and is writable, then retry",
            PayrollError::ZipError(_) | PayrollError::SerializationError(_) => {
                "This is an internal error; re-run with --verbose and report the log"
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, PayrollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_error_is_a_calculation_error() {
        let err = PayrollError::HistoryLengthError {
            month_index: 3,
            expected: 2,
            actual: 1,
        };
        assert_eq!(err.category(), ErrorCategory::Calculation);
        assert_eq!(err.exit_code(), 1);
        assert!(err.user_friendly_message().contains("2 previous"));
    }

    #[test]
    fn test_io_error_is_retryable() {
        let err = PayrollError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_archive_error_is_critical() {
        let err = PayrollError::from(zip::result::ZipError::FileNotFound);
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
    }
}
