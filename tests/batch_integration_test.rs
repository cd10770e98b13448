use sh_takehome::utils::validation::Validate;
use sh_takehome::{LocalStorage, PayrollEngine, PayrollPipeline, TomlConfig};
use std::io::Read;
use tempfile::TempDir;

fn write_job(dir: &TempDir, compression: bool) -> TomlConfig {
    std::fs::write(
        dir.path().join("salaries.csv"),
        "month,gross_salary,special_deductions\n\
         1,30000,\n\
         2,30000,\n\
         3,30000,\n",
    )
    .unwrap();

    let content = format!(
        r#"
[payroll]
name = "integration"
pay_date = "2025-01-10"

[employee]
special_deductions_monthly = 1500.0
hf_rate = 0.07

[input]
path = "salaries.csv"

[load]
output_path = "reports"
output_formats = ["csv", "tsv", "json"]

[load.compression]
enabled = {}
filename = "year.zip"
"#,
        compression
    );
    let config = TomlConfig::from_toml_str(&content).unwrap();
    config.validate().unwrap();
    config
}

fn engine(
    dir: &TempDir,
    config: TomlConfig,
) -> PayrollEngine<PayrollPipeline<LocalStorage, TomlConfig>> {
    let storage = LocalStorage::new(dir.path());
    let policy = config.policy.clone();
    let settings = config.employee.clone();
    PayrollEngine::new(PayrollPipeline::new(storage, config, policy, settings))
}

#[tokio::test]
async fn test_end_to_end_writes_plain_reports() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_job(&temp_dir, false);

    let output = engine(&temp_dir, config).run().await.unwrap();
    assert_eq!(output, "reports");

    let reports = temp_dir.path().join("reports");
    let csv = std::fs::read_to_string(reports.join("payroll.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[3].starts_with("3,30000.00,3150.00,2100.00,1825.00,22925.00"));

    assert!(reports.join("payroll.tsv").exists());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(reports.join("payroll.json")).unwrap())
            .unwrap();
    let tax = json["summary"]["tax"].as_f64().unwrap();
    assert!((tax - 2955.0).abs() < 1e-6);
    assert_eq!(json["months"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_end_to_end_writes_zip_archive() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_job(&temp_dir, true);

    let output = engine(&temp_dir, config).run().await.unwrap();
    assert!(output.ends_with("year.zip"));

    let zip_data = std::fs::read(temp_dir.path().join("reports").join("year.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    let file_names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(file_names, vec!["payroll.csv", "payroll.tsv", "payroll.json"]);

    let mut tsv = String::new();
    archive
        .by_name("payroll.tsv")
        .unwrap()
        .read_to_string(&mut tsv)
        .unwrap();
    assert!(tsv.contains("2\t30000.00\t3150.00\t2100.00\t582.50"));
}

#[tokio::test]
async fn test_missing_salary_sheet_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_job(&temp_dir, false);
    std::fs::remove_file(temp_dir.path().join("salaries.csv")).unwrap();

    let err = engine(&temp_dir, config).run().await.unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(!temp_dir.path().join("reports").exists());
}

#[tokio::test]
async fn test_month_gap_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_job(&temp_dir, false);
    std::fs::write(
        temp_dir.path().join("salaries.csv"),
        "month,gross_salary\n1,30000\n3,30000\n",
    )
    .unwrap();

    let err = engine(&temp_dir, config).run().await.unwrap_err();
    assert!(matches!(
        err,
        sh_takehome::PayrollError::InvalidInputError { .. }
    ));
}
