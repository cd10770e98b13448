use crate::core::ConfigProvider;
use crate::domain::model::EmployeeSettings;
use crate::domain::policy::PolicyConfig;
use crate::utils::error::{PayrollError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_non_negative, validate_output_formats, validate_path,
    validate_range, Validate,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_ARCHIVE: &str = "payroll.zip";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub payroll: PayrollInfo,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub employee: EmployeeSettings,
    pub input: InputConfig,
    pub load: LoadConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollInfo {
    pub name: String,
    pub description: Option<String>,
    /// 首月發薪日，用來檢查政策參數是否仍有效
    pub pay_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub json: Option<bool>,
    pub verbose: Option<bool>,
}

/// A standalone `[policy]` table, for overriding rates from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl PolicyFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let processed = substitute_env_vars(&content)?;
        toml::from_str(&processed).map_err(|e| PayrollError::ConfigValidationError {
            field: "policy".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }
}

/// 替換環境變數 (例如 ${SPECIAL_DEDUCTIONS})；未設定的變數保留原文
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PayrollError::ConfigValidationError {
        field: "env_substitution".to_string(),
        message: e.to_string(),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.into_owned())
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PayrollError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn json_logs(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.json)
            .unwrap_or(false)
    }

    pub fn verbose_logs(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.verbose)
            .unwrap_or(false)
    }

    /// Whether the pay date, if any, falls inside the policy window.
    pub fn policy_covers_pay_date(&self) -> bool {
        self.payroll
            .pay_date
            .map_or(true, |date| self.policy.covers(date))
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("payroll.name", &self.payroll.name)?;
        validate_path("input.path", &self.input.path)?;
        validate_path("load.output_path", &self.load.output_path)?;
        validate_output_formats("load.output_formats", &self.load.output_formats)?;

        if let Some(compression) = &self.load.compression {
            if let Some(filename) = &compression.filename {
                validate_path("load.compression.filename", filename)?;
            }
        }

        validate_non_negative(
            "employee.special_deductions_monthly",
            self.employee.special_deductions_monthly,
        )?;
        if let Some(rate) = self.employee.hf_rate {
            validate_range("employee.hf_rate", rate, 0.0, 1.0)?;
        }
        if let Some(base) = self.employee.si_base {
            validate_non_negative("employee.si_base", base)?;
        }
        if let Some(base) = self.employee.hf_base {
            validate_non_negative("employee.hf_base", base)?;
        }

        self.policy.validate()
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn compression_enabled(&self) -> bool {
        self.load
            .compression
            .as_ref()
            .map(|c| c.enabled)
            .unwrap_or(false)
    }

    fn archive_filename(&self) -> &str {
        self.load
            .compression
            .as_ref()
            .and_then(|c| c.filename.as_deref())
            .unwrap_or(DEFAULT_ARCHIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[payroll]
name = "2025 salary"
pay_date = "2025-01-10"

[employee]
special_deductions_monthly = 1500.0
hf_rate = 0.07

[input]
path = "salaries.csv"

[load]
output_path = "./output"
output_formats = ["csv", "json"]
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = TomlConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy, PolicyConfig::default());
        assert_eq!(config.employee.hf_rate, Some(0.07));
        assert!(!config.compression_enabled());
        assert_eq!(config.archive_filename(), "payroll.zip");
        assert!(config.policy_covers_pay_date());
        assert!(!config.json_logs());
    }

    #[test]
    fn test_policy_override() {
        let content = format!("{}\n[policy]\nsi_floor = 7460.0\nsi_cap = 37302.0\n", SAMPLE);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.policy.si_floor, 7460.0);
        assert_eq!(config.policy.hf_cap, 36921.0);
    }

    #[test]
    fn test_pay_date_outside_policy() {
        let content = SAMPLE.replace("2025-01-10", "2025-08-10");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(!config.policy_covers_pay_date());
    }

    #[test]
    fn test_rejects_unknown_format() {
        let content = SAMPLE.replace(r#"["csv", "json"]"#, r#"["xlsx"]"#);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(PayrollError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_rejects_repeated_format_with_compression() {
        let content = format!(
            "{}\n[load.compression]\nenabled = true\n",
            SAMPLE.replace(r#"["csv", "json"]"#, r#"["csv", "csv"]"#)
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.compression_enabled());
        assert!(matches!(
            config.validate(),
            Err(PayrollError::InvalidConfigValueError { ref field, .. }) if field == "load.output_formats"
        ));
    }

    #[test]
    fn test_rejects_nan_policy_rate() {
        let content = format!("{}\n[policy]\npension_rate = nan\n", SAMPLE);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("SH_TAKEHOME_TEST_INPUT", "march.csv");
        let content = SAMPLE.replace("salaries.csv", "${SH_TAKEHOME_TEST_INPUT}");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.input_path(), "march.csv");

        let untouched = substitute_env_vars("path = \"${SH_TAKEHOME_UNSET_VAR}\"").unwrap();
        assert!(untouched.contains("${SH_TAKEHOME_UNSET_VAR}"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            TomlConfig::from_toml_str("[payroll"),
            Err(PayrollError::ConfigValidationError { .. })
        ));
    }
}
