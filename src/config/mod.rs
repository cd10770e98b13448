pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::{CliConfig, OutputFormat};

#[cfg(feature = "cli")]
mod args {
    use crate::domain::model::{EmployeeSettings, TakeHomeRequest};
    use crate::domain::policy::PolicyConfig;
    use crate::utils::error::Result;
    use crate::utils::validation::{
        validate_month_index, validate_non_negative, validate_path, validate_range, Validate,
    };
    use chrono::NaiveDate;
    use clap::{Parser, ValueEnum};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
    #[serde(rename_all = "lowercase")]
    pub enum OutputFormat {
        Text,
        Json,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "sh-takehome")]
    #[command(about = "Shanghai monthly take-home pay calculator")]
    pub struct CliConfig {
        /// Gross monthly salary (CNY)
        #[arg(long)]
        pub gross: f64,

        /// Month of the tax year, 1-12
        #[arg(long, default_value = "1")]
        pub month: u32,

        /// Monthly total of special additional deductions
        #[arg(long, default_value = "0")]
        pub special_deductions: f64,

        /// Social insurance base declared by the employer
        #[arg(long)]
        pub si_base: Option<f64>,

        /// Employee housing fund rate, e.g. 0.07
        #[arg(long)]
        pub hf_rate: Option<f64>,

        /// Housing fund base declared by the employer
        #[arg(long)]
        pub hf_base: Option<f64>,

        /// Gross salaries of the earlier months of this tax year
        #[arg(long, value_delimiter = ',')]
        pub prev_pay: Vec<f64>,

        /// Income tax already withheld this tax year
        #[arg(long, default_value = "0")]
        pub prev_withheld_tax: f64,

        /// Print months 1..=month as a withholding schedule
        #[arg(long)]
        pub year: bool,

        /// Pay date, checked against the policy's validity window
        #[arg(long)]
        pub pay_date: Option<NaiveDate>,

        /// TOML file with a [policy] table overriding the built-in rates
        #[arg(long)]
        pub policy: Option<String>,

        #[arg(long, value_enum, default_value = "text")]
        pub format: OutputFormat,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,
    }

    impl CliConfig {
        pub fn settings(&self) -> EmployeeSettings {
            EmployeeSettings {
                special_deductions_monthly: self.special_deductions,
                si_base: self.si_base,
                hf_rate: self.hf_rate,
                hf_base: self.hf_base,
            }
        }

        pub fn request(&self) -> TakeHomeRequest {
            let request = TakeHomeRequest::new(self.gross, self.month)
                .with_settings(self.settings())
                .with_prev_withheld_tax(self.prev_withheld_tax);
            if self.prev_pay.is_empty() {
                request
            } else {
                request.with_history(self.prev_pay.clone())
            }
        }

        pub fn load_policy(&self) -> Result<PolicyConfig> {
            let policy = match &self.policy {
                Some(path) => crate::config::toml_config::PolicyFile::from_file(path)?.policy,
                None => PolicyConfig::default(),
            };
            policy.validate()?;
            Ok(policy)
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_non_negative("gross", self.gross)?;
            validate_month_index("month", self.month)?;
            validate_non_negative("special_deductions", self.special_deductions)?;
            validate_non_negative("prev_withheld_tax", self.prev_withheld_tax)?;
            if let Some(rate) = self.hf_rate {
                validate_range("hf_rate", rate, 0.0, 1.0)?;
            }
            if let Some(path) = &self.policy {
                validate_path("policy", path)?;
            }
            Ok(())
        }
    }

}
