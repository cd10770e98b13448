use crate::core::calculator::year_schedule;
use crate::core::{ConfigProvider, MonthInput, Pipeline, RenderedReport, Storage};
use crate::domain::model::{round_cents, EmployeeSettings, PayrollSchedule};
use crate::domain::policy::PolicyConfig;
use crate::utils::error::{PayrollError, Result};
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};

pub const REPORT_HEADER: [&str; 8] = [
    "month",
    "gross_salary",
    "social_insurance",
    "housing_fund",
    "tax_this_month",
    "take_home",
    "cumulative_taxable_income",
    "cumulative_tax_payable",
];

/// Reads a salary sheet, runs the year schedule and writes the reports.
pub struct PayrollPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) policy: PolicyConfig,
    pub(crate) settings: EmployeeSettings,
}

impl<S: Storage, C: ConfigProvider> PayrollPipeline<S, C> {
    pub fn new(storage: S, config: C, policy: PolicyConfig, settings: EmployeeSettings) -> Self {
        Self {
            storage,
            config,
            policy,
            settings,
        }
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }
}

pub fn parse_salary_sheet(data: &[u8]) -> Result<Vec<MonthInput>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut rows = Vec::new();
    for row in reader.deserialize::<MonthInput>() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn render_table(schedule: &PayrollSchedule, delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(REPORT_HEADER)?;
    for month in &schedule.months {
        writer.write_record([
            month.month_index.to_string(),
            format!("{:.2}", round_cents(month.gross_salary)),
            format!("{:.2}", round_cents(month.social_insurance.total)),
            format!("{:.2}", round_cents(month.housing_fund.amount)),
            format!("{:.2}", round_cents(month.tax_this_month)),
            format!("{:.2}", round_cents(month.take_home)),
            format!("{:.2}", round_cents(month.cumulative_taxable_income)),
            format!("{:.2}", round_cents(month.cumulative_tax_payable)),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PayrollError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| PayrollError::InvalidInputError {
        field: "report".to_string(),
        value: String::new(),
        reason: e.to_string(),
    })
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for PayrollPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<MonthInput>> {
        tracing::debug!("Reading salary sheet: {}", self.config.input_path());
        let data = self.storage.read_file(self.config.input_path()).await?;
        let rows = parse_salary_sheet(&data)?;
        tracing::debug!("Salary sheet has {} row(s)", rows.len());
        Ok(rows)
    }

    async fn transform(&self, rows: Vec<MonthInput>) -> Result<RenderedReport> {
        let schedule = year_schedule(&rows, &self.settings, &self.policy)?;

        Ok(RenderedReport {
            csv_output: render_table(&schedule, b',')?,
            tsv_output: render_table(&schedule, b'\t')?,
            json_output: serde_json::to_string_pretty(&schedule)?,
            schedule,
        })
    }

    async fn load(&self, report: RenderedReport) -> Result<String> {
        let formats = self.config.output_formats();
        let documents: Vec<(&str, &str)> = formats
            .iter()
            .enumerate()
            .filter(|(i, format)| {
                // 同一格式只寫一次，ZIP 內不允許重複檔名
                let repeated = formats[..*i].contains(*format);
                if repeated {
                    tracing::warn!("Skipping repeated output format: {}", format);
                }
                !repeated
            })
            .filter_map(|(_, format)| match format.as_str() {
                "csv" => Some(("payroll.csv", report.csv_output.as_str())),
                "tsv" => Some(("payroll.tsv", report.tsv_output.as_str())),
                "json" => Some(("payroll.json", report.json_output.as_str())),
                other => {
                    tracing::warn!("Skipping unknown output format: {}", other);
                    None
                }
            })
            .collect();

        if !self.config.compression_enabled() {
            for (name, content) in &documents {
                let path = self.output_file(name);
                tracing::debug!("Writing {} ({} bytes)", path, content.len());
                self.storage.write_file(&path, content.as_bytes()).await?;
            }
            return Ok(self.config.output_path().to_string());
        }

        tracing::debug!("Creating ZIP file with {} files", documents.len());
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, content) in &documents {
                zip.start_file::<_, ()>(*name, FileOptions::default())?;
                zip.write_all(content.as_bytes())?;
            }
            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        let path = self.output_file(self.config.archive_filename());
        tracing::debug!("Writing ZIP file ({} bytes) to {}", zip_data.len(), path);
        self.storage.write_file(&path, &zip_data).await?;
        Ok(path)
    }
}
