use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocialInsurance {
    pub base: f64,
    pub pension: f64,
    pub medical: f64,
    pub unemployment: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HousingFund {
    pub rate: f64,
    pub base: f64,
    pub amount: f64,
}

/// Employee settings shared by every month of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeSettings {
    pub special_deductions_monthly: f64,
    pub si_base: Option<f64>,
    pub hf_rate: Option<f64>,
    pub hf_base: Option<f64>,
}

/// One month's calculation request.
#[derive(Debug, Clone, PartialEq)]
pub struct TakeHomeRequest {
    pub gross_salary: f64,
    pub month_index: u32,
    pub settings: EmployeeSettings,
    /// 本年度之前各月的實際稅前工資
    pub cumulative_prev_pay: Option<Vec<f64>>,
    /// 累計已預扣個稅
    pub prev_withheld_tax: f64,
}

impl TakeHomeRequest {
    pub fn new(gross_salary: f64, month_index: u32) -> Self {
        Self {
            gross_salary,
            month_index,
            settings: EmployeeSettings::default(),
            cumulative_prev_pay: None,
            prev_withheld_tax: 0.0,
        }
    }

    pub fn with_settings(mut self, settings: EmployeeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_history(mut self, prev_pay: Vec<f64>) -> Self {
        self.cumulative_prev_pay = Some(prev_pay);
        self
    }

    pub fn with_prev_withheld_tax(mut self, tax: f64) -> Self {
        self.prev_withheld_tax = tax;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    pub standard_deduction_monthly: f64,
    pub special_deductions_monthly: f64,
    pub si_base_used_this_month: f64,
    pub hf_base_used_this_month: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBreakdown {
    pub month_index: u32,
    pub gross_salary: f64,
    pub take_home: f64,
    pub tax_this_month: f64,
    pub cumulative_tax_payable: f64,
    pub pre_tax_deductions_this_month: f64,
    pub social_insurance: SocialInsurance,
    pub housing_fund: HousingFund,
    pub cumulative_taxable_income: f64,
    pub assumptions: Assumptions,
}

/// A row of a batch salary sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthInput {
    pub month: u32,
    pub gross_salary: f64,
    /// 覆蓋該月的專項附加扣除
    #[serde(default)]
    pub special_deductions: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub months: u32,
    pub gross_salary: f64,
    pub social_insurance: f64,
    pub housing_fund: f64,
    pub tax: f64,
    pub take_home: f64,
    pub effective_tax_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollSchedule {
    pub policy_name: String,
    pub months: Vec<MonthlyBreakdown>,
    pub summary: YearSummary,
}

/// Output of the transform step, ready to be written out.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub schedule: PayrollSchedule,
    pub csv_output: String,
    pub tsv_output: String,
    pub json_output: String,
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
