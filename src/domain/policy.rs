use crate::utils::error::{PayrollError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 綜合所得年度稅率表的一級。`up_to` 為 `None` 表示無上限。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    #[serde(default)]
    pub up_to: Option<f64>,
    pub rate: f64,
    #[serde(alias = "quick")]
    pub quick_deduction: f64,
}

impl TaxBracket {
    pub fn new(up_to: Option<f64>, rate: f64, quick_deduction: f64) -> Self {
        Self {
            up_to,
            rate,
            quick_deduction,
        }
    }

    pub fn contains(&self, amount: f64) -> bool {
        self.up_to.map_or(true, |limit| amount <= limit)
    }
}

/// Shanghai employee-side parameters for one policy year.
///
/// Every field has a default, so a TOML `[policy]` table only needs to list
/// what changed when the city publishes new bases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub name: String,
    pub effective_from: NaiveDate,
    pub effective_to: NaiveDate,
    pub si_floor: f64,
    pub si_cap: f64,
    pub hf_floor: f64,
    pub hf_cap: f64,
    pub pension_rate: f64,
    pub medical_rate: f64,
    pub unemployment_rate: f64,
    pub default_hf_rate: f64,
    pub standard_deduction_monthly: f64,
    pub brackets: Vec<TaxBracket>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            name: "Shanghai 2024-07".to_string(),
            effective_from: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap_or_default(),
            effective_to: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap_or_default(),
            si_floor: 7384.0,
            si_cap: 36921.0,
            hf_floor: 2690.0,
            hf_cap: 36921.0,
            pension_rate: 0.08,
            medical_rate: 0.02,
            unemployment_rate: 0.005,
            default_hf_rate: 0.07,
            standard_deduction_monthly: 5000.0,
            brackets: default_brackets(),
        }
    }
}

pub fn default_brackets() -> Vec<TaxBracket> {
    vec![
        TaxBracket::new(Some(36_000.0), 0.03, 0.0),
        TaxBracket::new(Some(144_000.0), 0.10, 2_520.0),
        TaxBracket::new(Some(300_000.0), 0.20, 16_920.0),
        TaxBracket::new(Some(420_000.0), 0.25, 31_920.0),
        TaxBracket::new(Some(660_000.0), 0.30, 52_920.0),
        TaxBracket::new(Some(960_000.0), 0.35, 85_920.0),
        TaxBracket::new(None, 0.45, 181_920.0),
    ]
}

impl PolicyConfig {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && date <= self.effective_to
    }

    pub fn si_rate_total(&self) -> f64 {
        self.pension_rate + self.medical_rate + self.unemployment_rate
    }

    /// 找出適用的稅級；稅率表驗證過後最後一級必定無上限
    pub fn bracket_for(&self, amount: f64) -> Option<&TaxBracket> {
        self.brackets.iter().find(|b| b.contains(amount))
    }
}

impl Validate for PolicyConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("policy.name", &self.name)?;

        if self.effective_from > self.effective_to {
            return Err(PayrollError::ConfigValidationError {
                field: "policy.effective_from".to_string(),
                message: format!(
                    "{} is after effective_to {}",
                    self.effective_from, self.effective_to
                ),
            });
        }

        check_floor_cap("policy.si_floor", self.si_floor, self.si_cap)?;
        check_floor_cap("policy.hf_floor", self.hf_floor, self.hf_cap)?;

        for (field, rate) in [
            ("policy.pension_rate", self.pension_rate),
            ("policy.medical_rate", self.medical_rate),
            ("policy.unemployment_rate", self.unemployment_rate),
            ("policy.default_hf_rate", self.default_hf_rate),
        ] {
            validate_range(field, rate, 0.0, 1.0)?;
        }

        if !self.standard_deduction_monthly.is_finite() || self.standard_deduction_monthly < 0.0 {
            return Err(PayrollError::InvalidConfigValueError {
                field: "policy.standard_deduction_monthly".to_string(),
                value: self.standard_deduction_monthly.to_string(),
                reason: "Deduction must be non-negative".to_string(),
            });
        }

        validate_brackets(&self.brackets)
    }
}

fn check_floor_cap(field: &str, floor: f64, cap: f64) -> Result<()> {
    if !floor.is_finite() || !cap.is_finite() || floor < 0.0 || floor > cap {
        return Err(PayrollError::ConfigValidationError {
            field: field.to_string(),
            message: format!("floor {} and cap {} must satisfy 0 <= floor <= cap", floor, cap),
        });
    }
    Ok(())
}

fn validate_brackets(brackets: &[TaxBracket]) -> Result<()> {
    let Some((last, rest)) = brackets.split_last() else {
        return Err(PayrollError::MissingConfigError {
            field: "policy.brackets".to_string(),
        });
    };

    if last.up_to.is_some() {
        return Err(PayrollError::ConfigValidationError {
            field: "policy.brackets".to_string(),
            message: "the last bracket must have no upper limit".to_string(),
        });
    }

    let mut previous = f64::NEG_INFINITY;
    for (i, bracket) in rest.iter().enumerate() {
        let Some(limit) = bracket.up_to else {
            return Err(PayrollError::ConfigValidationError {
                field: format!("policy.brackets[{}]", i),
                message: "only the last bracket may omit up_to".to_string(),
            });
        };
        if !limit.is_finite() || limit <= previous {
            return Err(PayrollError::ConfigValidationError {
                field: format!("policy.brackets[{}]", i),
                message: format!("up_to {} is not above the previous limit {}", limit, previous),
            });
        }
        previous = limit;
    }

    for (i, bracket) in brackets.iter().enumerate() {
        validate_range(&format!("policy.brackets[{}].rate", i), bracket.rate, 0.0, 1.0)?;
        if !bracket.quick_deduction.is_finite() || bracket.quick_deduction < 0.0 {
            return Err(PayrollError::InvalidConfigValueError {
                field: format!("policy.brackets[{}].quick_deduction", i),
                value: bracket.quick_deduction.to_string(),
                reason: "Quick deduction must be a finite, non-negative number".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = PolicyConfig::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.brackets.len(), 7);
        assert!((policy.si_rate_total() - 0.105).abs() < 1e-12);
    }

    #[test]
    fn test_covers_is_inclusive() {
        let policy = PolicyConfig::default();
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert!(policy.covers(d(2024, 7, 1)));
        assert!(policy.covers(d(2025, 6, 30)));
        assert!(!policy.covers(d(2024, 6, 30)));
        assert!(!policy.covers(d(2025, 7, 1)));
    }

    #[test]
    fn test_bracket_lookup_uses_inclusive_upper_limit() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.bracket_for(36_000.0).unwrap().rate, 0.03);
        assert_eq!(policy.bracket_for(36_000.01).unwrap().rate, 0.10);
        assert_eq!(policy.bracket_for(5_000_000.0).unwrap().rate, 0.45);
    }

    #[test]
    fn test_rejects_bounded_last_bracket() {
        let mut policy = PolicyConfig::default();
        policy.brackets.last_mut().unwrap().up_to = Some(2_000_000.0);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_rejects_unbounded_middle_bracket() {
        let mut policy = PolicyConfig::default();
        policy.brackets[2].up_to = None;
        let err = policy.validate().unwrap_err();
        assert!(matches!(
            err,
            PayrollError::ConfigValidationError { ref field, .. } if field == "policy.brackets[2]"
        ));
    }

    #[test]
    fn test_rejects_nan_rate_from_toml() {
        let policy: PolicyConfig = toml::from_str("pension_rate = nan").unwrap();
        assert!(policy.pension_rate.is_nan());
        assert!(matches!(
            policy.validate(),
            Err(PayrollError::InvalidConfigValueError { ref field, .. }) if field == "policy.pension_rate"
        ));
    }

    #[test]
    fn test_rejects_non_finite_bracket_values() {
        let mut policy = PolicyConfig::default();
        policy.brackets[1].up_to = Some(f64::NAN);
        assert!(policy.validate().is_err());

        let mut policy = PolicyConfig::default();
        policy.brackets[1].quick_deduction = f64::NAN;
        assert!(policy.validate().is_err());

        let mut policy = PolicyConfig::default();
        policy.brackets[1].quick_deduction = -1.0;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_rejects_unsorted_brackets() {
        let mut policy = PolicyConfig::default();
        policy.brackets.swap(0, 1);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_rejects_floor_above_cap() {
        let policy = PolicyConfig {
            si_floor: 40_000.0,
            ..PolicyConfig::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let policy: PolicyConfig = toml::from_str("si_floor = 7460.0\nsi_cap = 37302.0").unwrap();
        assert_eq!(policy.si_floor, 7460.0);
        assert_eq!(policy.hf_floor, 2690.0);
        assert_eq!(policy.brackets, default_brackets());
    }
}
