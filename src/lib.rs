pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, OutputFormat};

pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::calculator::{
    calc_employee_social, calc_housing_fund, takehome, tax_on_cumulative_taxable, year_schedule,
};
pub use core::{engine::PayrollEngine, pipeline::PayrollPipeline};
pub use domain::model::{
    EmployeeSettings, MonthInput, MonthlyBreakdown, PayrollSchedule, TakeHomeRequest,
};
pub use domain::policy::{PolicyConfig, TaxBracket};
pub use utils::error::{PayrollError, Result};
