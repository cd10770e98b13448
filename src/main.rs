use clap::Parser;
use sh_takehome::domain::model::{round_cents, MonthlyBreakdown, YearSummary};
use sh_takehome::utils::{logger, validation::Validate};
use sh_takehome::{takehome, year_schedule, CliConfig, MonthInput, OutputFormat, PayrollError};

fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = run(&config) {
        tracing::error!(
            "❌ Calculation failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

fn run(config: &CliConfig) -> Result<(), PayrollError> {
    config.validate()?;
    let policy = config.load_policy()?;
    tracing::debug!("Using policy: {}", policy.name);

    if let Some(date) = config.pay_date {
        if !policy.covers(date) {
            tracing::warn!(
                "Pay date {} is outside {} ({} to {}); bases may be out of date",
                date,
                policy.name,
                policy.effective_from,
                policy.effective_to
            );
        }
    }

    if config.year {
        if config.prev_withheld_tax > 0.0 {
            tracing::warn!("--prev-withheld-tax is ignored with --year; the schedule tracks it");
        }
        let rows = schedule_rows(config)?;
        let schedule = year_schedule(&rows, &config.settings(), &policy)?;
        match config.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&schedule)?),
            OutputFormat::Text => print_schedule(&schedule.months, &schedule.summary),
        }
    } else {
        let breakdown = takehome(&config.request(), &policy)?;
        match config.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&breakdown)?),
            OutputFormat::Text => print_breakdown(&breakdown),
        }
    }

    Ok(())
}

/// 以 --prev-pay 為前幾個月的工資，未提供時假設每月相同
fn schedule_rows(config: &CliConfig) -> Result<Vec<MonthInput>, PayrollError> {
    let expected = (config.month - 1) as usize;
    if !config.prev_pay.is_empty() && config.prev_pay.len() != expected {
        return Err(PayrollError::HistoryLengthError {
            month_index: config.month,
            expected,
            actual: config.prev_pay.len(),
        });
    }

    Ok((1..=config.month)
        .map(|month| {
            let gross_salary = config
                .prev_pay
                .get(month as usize - 1)
                .copied()
                .unwrap_or(config.gross);
            MonthInput {
                month,
                gross_salary,
                special_deductions: None,
            }
        })
        .collect())
}

fn print_breakdown(b: &MonthlyBreakdown) {
    println!("Month {}", b.month_index);
    println!("  Gross salary            {:>12.2}", round_cents(b.gross_salary));
    println!(
        "  Social insurance        {:>12.2}  (base {:.2}: pension {:.2}, medical {:.2}, unemployment {:.2})",
        round_cents(b.social_insurance.total),
        b.social_insurance.base,
        round_cents(b.social_insurance.pension),
        round_cents(b.social_insurance.medical),
        round_cents(b.social_insurance.unemployment)
    );
    println!(
        "  Housing fund            {:>12.2}  (base {:.2} at {:.1}%)",
        round_cents(b.housing_fund.amount),
        b.housing_fund.base,
        b.housing_fund.rate * 100.0
    );
    println!("  Income tax this month   {:>12.2}", round_cents(b.tax_this_month));
    println!("  Take-home               {:>12.2}", round_cents(b.take_home));
    println!(
        "  Cumulative taxable      {:>12.2}",
        round_cents(b.cumulative_taxable_income)
    );
    println!(
        "  Cumulative tax payable  {:>12.2}",
        round_cents(b.cumulative_tax_payable)
    );
}

fn print_schedule(months: &[MonthlyBreakdown], summary: &YearSummary) {
    println!(
        "{:>5} {:>12} {:>10} {:>10} {:>10} {:>12}",
        "month", "gross", "si", "hf", "tax", "take_home"
    );
    for m in months {
        println!(
            "{:>5} {:>12.2} {:>10.2} {:>10.2} {:>10.2} {:>12.2}",
            m.month_index,
            round_cents(m.gross_salary),
            round_cents(m.social_insurance.total),
            round_cents(m.housing_fund.amount),
            round_cents(m.tax_this_month),
            round_cents(m.take_home)
        );
    }
    println!(
        "{:>5} {:>12.2} {:>10.2} {:>10.2} {:>10.2} {:>12.2}",
        "total",
        round_cents(summary.gross_salary),
        round_cents(summary.social_insurance),
        round_cents(summary.housing_fund),
        round_cents(summary.tax),
        round_cents(summary.take_home)
    );
    println!(
        "Effective tax rate: {:.2}%",
        summary.effective_tax_rate * 100.0
    );
}
