//! Shanghai take-home pay arithmetic.
//!
//! Income tax uses the cumulative withholding method: each month the tax on
//! the year-to-date taxable income is computed from the annual bracket table
//! and the amount already withheld is subtracted.

use crate::domain::model::{
    Assumptions, EmployeeSettings, HousingFund, MonthInput, MonthlyBreakdown, PayrollSchedule,
    SocialInsurance, TakeHomeRequest, YearSummary,
};
use crate::domain::policy::PolicyConfig;
use crate::utils::error::{PayrollError, Result};
use crate::utils::validation::{validate_month_index, validate_non_negative, validate_range};

const TYPICAL_HF_RATE: (f64, f64) = (0.05, 0.07);

pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    lo.max(hi.min(x))
}

pub fn calc_employee_social(
    gross: f64,
    policy: &PolicyConfig,
    si_base: Option<f64>,
) -> SocialInsurance {
    let base = clamp(si_base.unwrap_or(gross), policy.si_floor, policy.si_cap);
    let pension = base * policy.pension_rate;
    let medical = base * policy.medical_rate;
    let unemployment = base * policy.unemployment_rate;
    SocialInsurance {
        base,
        pension,
        medical,
        unemployment,
        total: pension + medical + unemployment,
    }
}

pub fn calc_housing_fund(
    gross: f64,
    policy: &PolicyConfig,
    hf_rate: Option<f64>,
    hf_base: Option<f64>,
) -> HousingFund {
    let rate = hf_rate.unwrap_or(policy.default_hf_rate);
    let base = clamp(hf_base.unwrap_or(gross), policy.hf_floor, policy.hf_cap);
    HousingFund {
        rate,
        base,
        amount: base * rate,
    }
}

pub fn tax_on_cumulative_taxable(cum_taxable: f64, policy: &PolicyConfig) -> f64 {
    let t = cum_taxable.max(0.0);
    match policy.bracket_for(t) {
        Some(bracket) => t * bracket.rate - bracket.quick_deduction,
        // 稅率表未驗證時的退路：沿用最高級
        None => policy
            .brackets
            .last()
            .map_or(0.0, |b| t * b.rate - b.quick_deduction),
    }
}

fn validate_settings(settings: &EmployeeSettings) -> Result<()> {
    validate_non_negative("special_deductions_monthly", settings.special_deductions_monthly)?;
    if let Some(base) = settings.si_base {
        validate_non_negative("si_base", base)?;
    }
    if let Some(base) = settings.hf_base {
        validate_non_negative("hf_base", base)?;
    }
    if let Some(rate) = settings.hf_rate {
        validate_non_negative("hf_rate", rate)?;
        validate_range("hf_rate", rate, 0.0, 1.0)?;
    }
    Ok(())
}

pub fn is_typical_hf_rate(rate: f64) -> bool {
    (TYPICAL_HF_RATE.0..=TYPICAL_HF_RATE.1).contains(&rate)
}

/// 不論比例來自員工設定或政策預設，都檢查實際採用的值
fn warn_unusual_hf_rate(rate: f64) {
    if !is_typical_hf_rate(rate) {
        tracing::warn!(
            "Housing fund rate {:.2}% is outside the usual {:.0}%-{:.0}% range",
            rate * 100.0,
            TYPICAL_HF_RATE.0 * 100.0,
            TYPICAL_HF_RATE.1 * 100.0
        );
    }
}

/// Computes one month's take-home pay.
///
/// Without `cumulative_prev_pay` every earlier month of the tax year is
/// assumed to have the same gross salary and settings as this one.
pub fn takehome(request: &TakeHomeRequest, policy: &PolicyConfig) -> Result<MonthlyBreakdown> {
    let TakeHomeRequest {
        gross_salary,
        month_index,
        ref settings,
        ref cumulative_prev_pay,
        prev_withheld_tax,
    } = *request;

    validate_month_index("month_index", month_index)?;
    validate_non_negative("gross_salary", gross_salary)?;
    validate_non_negative("prev_withheld_tax", prev_withheld_tax)?;
    validate_settings(settings)?;

    let si = calc_employee_social(gross_salary, policy, settings.si_base);
    let hf = calc_housing_fund(gross_salary, policy, settings.hf_rate, settings.hf_base);
    warn_unusual_hf_rate(hf.rate);
    let months = f64::from(month_index);

    let (cum_income, prev_si_total, prev_hf_total) = match cumulative_prev_pay {
        None => {
            let prev_months = f64::from(month_index - 1);
            (
                gross_salary * months,
                si.total * prev_months,
                hf.amount * prev_months,
            )
        }
        Some(history) => {
            let expected = (month_index - 1) as usize;
            if history.len() != expected {
                return Err(PayrollError::HistoryLengthError {
                    month_index,
                    expected,
                    actual: history.len(),
                });
            }
            let mut prev_si = 0.0;
            let mut prev_hf = 0.0;
            for &pay in history {
                validate_non_negative("cumulative_prev_pay", pay)?;
                prev_si += calc_employee_social(pay, policy, settings.si_base).total;
                prev_hf += calc_housing_fund(pay, policy, settings.hf_rate, settings.hf_base).amount;
            }
            (history.iter().sum::<f64>() + gross_salary, prev_si, prev_hf)
        }
    };

    let cum_si = prev_si_total + si.total;
    let cum_hf = prev_hf_total + hf.amount;
    let cum_standard = policy.standard_deduction_monthly * months;
    let cum_special = settings.special_deductions_monthly * months;

    let cum_taxable = cum_income - cum_si - cum_hf - cum_standard - cum_special;
    let cumulative_tax_payable = tax_on_cumulative_taxable(cum_taxable, policy);
    let tax_this_month = (cumulative_tax_payable - prev_withheld_tax).max(0.0);

    tracing::debug!(
        month_index,
        cum_taxable,
        cumulative_tax_payable,
        tax_this_month,
        "Computed monthly withholding"
    );

    Ok(MonthlyBreakdown {
        month_index,
        gross_salary,
        take_home: gross_salary - si.total - hf.amount - tax_this_month,
        tax_this_month,
        cumulative_tax_payable,
        pre_tax_deductions_this_month: si.total + hf.amount,
        social_insurance: si,
        housing_fund: hf,
        cumulative_taxable_income: cum_taxable.max(0.0),
        assumptions: Assumptions {
            standard_deduction_monthly: policy.standard_deduction_monthly,
            special_deductions_monthly: settings.special_deductions_monthly,
            si_base_used_this_month: si.base,
            hf_base_used_this_month: hf.base,
        },
    })
}

/// Runs consecutive months of one tax year, carrying the tax already
/// withheld forward so each month only withholds the increment.
pub fn year_schedule(
    rows: &[MonthInput],
    settings: &EmployeeSettings,
    policy: &PolicyConfig,
) -> Result<PayrollSchedule> {
    validate_settings(settings)?;
    warn_unusual_hf_rate(settings.hf_rate.unwrap_or(policy.default_hf_rate));
    if rows.len() > 12 {
        return Err(PayrollError::InvalidInputError {
            field: "month".to_string(),
            value: rows.len().to_string(),
            reason: "A tax year has at most 12 months".to_string(),
        });
    }

    let mut months = Vec::with_capacity(rows.len());
    let mut cum_income = 0.0;
    let mut cum_si = 0.0;
    let mut cum_hf = 0.0;
    let mut cum_special = 0.0;
    let mut withheld = 0.0;

    for (i, row) in rows.iter().enumerate() {
        let expected = i as u32 + 1;
        if row.month != expected {
            return Err(PayrollError::InvalidInputError {
                field: "month".to_string(),
                value: row.month.to_string(),
                reason: format!("Expected month {}; rows must start at 1 without gaps", expected),
            });
        }
        validate_non_negative("gross_salary", row.gross_salary)?;
        let special = row
            .special_deductions
            .unwrap_or(settings.special_deductions_monthly);
        validate_non_negative("special_deductions", special)?;

        let si = calc_employee_social(row.gross_salary, policy, settings.si_base);
        let hf = calc_housing_fund(row.gross_salary, policy, settings.hf_rate, settings.hf_base);

        cum_income += row.gross_salary;
        cum_si += si.total;
        cum_hf += hf.amount;
        cum_special += special;

        let cum_standard = policy.standard_deduction_monthly * f64::from(row.month);
        let cum_taxable = cum_income - cum_si - cum_hf - cum_standard - cum_special;
        let cumulative_tax_payable = tax_on_cumulative_taxable(cum_taxable, policy);
        let tax_this_month = (cumulative_tax_payable - withheld).max(0.0);
        withheld += tax_this_month;

        months.push(MonthlyBreakdown {
            month_index: row.month,
            gross_salary: row.gross_salary,
            take_home: row.gross_salary - si.total - hf.amount - tax_this_month,
            tax_this_month,
            cumulative_tax_payable,
            pre_tax_deductions_this_month: si.total + hf.amount,
            social_insurance: si,
            housing_fund: hf,
            cumulative_taxable_income: cum_taxable.max(0.0),
            assumptions: Assumptions {
                standard_deduction_monthly: policy.standard_deduction_monthly,
                special_deductions_monthly: special,
                si_base_used_this_month: si.base,
                hf_base_used_this_month: hf.base,
            },
        });
    }

    let summary = summarize(&months);
    tracing::info!(
        "Scheduled {} month(s): gross {:.2}, tax {:.2}, take-home {:.2}",
        summary.months,
        summary.gross_salary,
        summary.tax,
        summary.take_home
    );

    Ok(PayrollSchedule {
        policy_name: policy.name.clone(),
        months,
        summary,
    })
}

pub fn summarize(months: &[MonthlyBreakdown]) -> YearSummary {
    let mut summary = months.iter().fold(YearSummary::default(), |mut acc, m| {
        acc.months += 1;
        acc.gross_salary += m.gross_salary;
        acc.social_insurance += m.social_insurance.total;
        acc.housing_fund += m.housing_fund.amount;
        acc.tax += m.tax_this_month;
        acc.take_home += m.take_home;
        acc
    });
    summary.effective_tax_rate = if summary.gross_salary > 0.0 {
        summary.tax / summary.gross_salary
    } else {
        0.0
    };
    summary
}
