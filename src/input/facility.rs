//! Code for reading the facility parameters file.
use super::{input_err_msg, read_toml};
use crate::facility::CostAccounting;
use crate::units::Dimensionless;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

pub const FACILITY_FILE_NAME: &str = "facility.toml";

fn default_discount_rate() -> Dimensionless {
    Dimensionless(0.05)
}

/// Represents the contents of the facility file
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FacilityParameters {
    /// The name of the facility
    pub name: String,
    /// When the facility was built (default: today)
    pub date_of_construction: Option<NaiveDate>,
    /// Keys of the items delivering the facility's products
    pub outputs: Vec<String>,
    /// How shared items are counted when summing costs
    #[serde(default)]
    pub cost_accounting: CostAccounting,
    /// The discount rate used when annualising capital costs
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Dimensionless,
}

impl FacilityParameters {
    /// Read the facility file from the specified model directory
    pub fn from_path(model_dir: &Path) -> Result<FacilityParameters> {
        let file_path = model_dir.join(FACILITY_FILE_NAME);
        let parameters: FacilityParameters = read_toml(&file_path)?;
        parameters
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(parameters)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.name.trim().is_empty(),
            "Facility name cannot be empty"
        );
        ensure!(!self.outputs.is_empty(), "`outputs` is empty");

        let mut seen = HashSet::new();
        for output in &self.outputs {
            ensure!(seen.insert(output), "Duplicate output item {output}");
        }

        ensure!(
            self.discount_rate.0.is_finite() && self.discount_rate >= Dimensionless(0.0),
            "discount_rate must be a finite number greater than or equal to zero"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn parameters(outputs: &[&str], discount_rate: f64) -> FacilityParameters {
        FacilityParameters {
            name: "plant".into(),
            date_of_construction: None,
            outputs: outputs.iter().map(ToString::to_string).collect(),
            cost_accounting: CostAccounting::PerPath,
            discount_rate: Dimensionless(discount_rate),
        }
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(FACILITY_FILE_NAME)).unwrap();
            writeln!(
                file,
                r#"name = "desalination_plant"
date_of_construction = "2024-03-01"
outputs = ["membrane"]"#
            )
            .unwrap();
        }

        let parameters = FacilityParameters::from_path(dir.path()).unwrap();
        assert_eq!(
            parameters,
            FacilityParameters {
                name: "desalination_plant".into(),
                date_of_construction: NaiveDate::from_ymd_opt(2024, 3, 1),
                outputs: vec!["membrane".into()],
                cost_accounting: CostAccounting::PerPath,
                discount_rate: Dimensionless(0.05),
            }
        );
    }

    #[test]
    fn test_from_path_unknown_field() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(FACILITY_FILE_NAME)).unwrap();
            writeln!(
                file,
                "name = \"plant\"\noutputs = [\"a\"]\ncolour = \"blue\""
            )
            .unwrap();
        }

        assert!(FacilityParameters::from_path(dir.path()).is_err());
    }

    #[rstest]
    #[case(&["a"], 0.05)]
    #[case(&["a", "b"], 0.0)]
    fn test_validate_ok(#[case] outputs: &[&str], #[case] discount_rate: f64) {
        assert!(parameters(outputs, discount_rate).validate().is_ok());
    }

    #[test]
    fn test_validate_bad() {
        assert_error!(parameters(&[], 0.05).validate(), "`outputs` is empty");
        assert_error!(
            parameters(&["a", "a"], 0.05).validate(),
            "Duplicate output item a"
        );
        assert!(parameters(&["a"], -0.1).validate().is_err());
        assert!(parameters(&["a"], f64::NAN).validate().is_err());
    }
}
