use anyhow::Context;
use clap::Parser;
use sh_takehome::config::toml_config::TomlConfig;
use sh_takehome::core::pipeline::parse_salary_sheet;
use sh_takehome::core::ConfigProvider;
use sh_takehome::utils::{logger, validation::Validate};
use sh_takehome::{LocalStorage, PayrollEngine, PayrollError, PayrollPipeline};

#[derive(Parser)]
#[command(name = "payroll-batch")]
#[command(about = "Run a year of Shanghai payroll from a TOML job file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "payroll.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Directory that input and output paths are relative to
    #[arg(long, default_value = ".")]
    workdir: String,

    /// Dry run - validate the job and the salary sheet without writing output
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;

    // 命令列旗標優先於設定檔
    let verbose = args.verbose || config.verbose_logs();
    if args.json_logs || config.json_logs() {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("🚀 Starting payroll job: {}", config.payroll.name);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    if !config.policy_covers_pay_date() {
        tracing::warn!(
            "Pay date is outside {} ({} to {}); bases may be out of date",
            config.policy.name,
            config.policy.effective_from,
            config.policy.effective_to
        );
    }

    display_config_summary(&config);
    let storage = LocalStorage::new(&args.workdir);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No output will be written");
        return perform_dry_run(&config, &args.workdir);
    }

    let pipeline = PayrollPipeline::new(
        storage,
        config.clone(),
        config.policy.clone(),
        config.employee.clone(),
    );
    let engine = PayrollEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            println!("✅ Payroll reports written to: {}", output_path);
            Ok(())
        }
        Err(e) => {
            report_failure(&e);
            std::process::exit(e.exit_code());
        }
    }
}

fn display_config_summary(config: &TomlConfig) {
    tracing::info!("📋 Policy: {}", config.policy.name);
    tracing::info!("📥 Input: {}", config.input_path());
    tracing::info!(
        "📤 Output: {} [{}]{}",
        config.output_path(),
        config.output_formats().join(", "),
        if config.compression_enabled() {
            format!(" -> {}", config.archive_filename())
        } else {
            String::new()
        }
    );
}

fn perform_dry_run(config: &TomlConfig, workdir: &str) -> anyhow::Result<()> {
    let path = std::path::Path::new(workdir).join(config.input_path());
    let data = std::fs::read(&path)
        .with_context(|| format!("failed to read salary sheet '{}'", path.display()))?;
    let rows = parse_salary_sheet(&data)?;
    let schedule = sh_takehome::year_schedule(&rows, &config.employee, &config.policy)?;

    println!(
        "Would process {} month(s): tax {:.2}, take-home {:.2}",
        schedule.summary.months, schedule.summary.tax, schedule.summary.take_home
    );
    Ok(())
}

fn report_failure(e: &PayrollError) {
    tracing::error!(
        "❌ Payroll run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
}
