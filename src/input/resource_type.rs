//! Code for reading the resource type catalogue.
use super::{input_err_msg, read_toml};
use crate::model::{ResourceTypeKey, ResourceTypeMap};
use crate::production::ProductionFunction;
use crate::quantity::Quantity;
use crate::resource_type::ResourceType;
use anyhow::{Context, Result, ensure};
use chrono::TimeDelta;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

const RESOURCE_TYPES_FILE_NAME: &str = "resource_types.toml";

/// A resource type, as written in the catalogue file
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ResourceTypeRaw {
    /// Display name (defaults to the key)
    name: Option<String>,
    #[serde(default)]
    nominal_input: Vec<Quantity>,
    expected_lifetime_days: Option<i64>,
    production: ProductionFunctionRaw,
}

/// A production function, as written in the catalogue file
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ProductionFunctionRaw {
    Constant {
        output: Vec<Quantity>,
    },
    /// Scaled by how well the nominal input is satisfied
    Proportional {
        output: Vec<Quantity>,
    },
    Passthrough {
        limit: Quantity,
    },
    Gated {
        minimum: Vec<Quantity>,
        then: Box<ProductionFunctionRaw>,
    },
}

impl ProductionFunctionRaw {
    /// Check the function against the nominal input of its resource type
    fn validate(&self, nominal_input: &[Quantity]) -> Result<()> {
        let has_input = |quantity: &Quantity| {
            nominal_input
                .iter()
                .any(|input| input.dimension() == quantity.dimension())
        };

        match self {
            Self::Constant { output } | Self::Proportional { output } => {
                ensure!(!output.is_empty(), "Production output cannot be empty");
                check_quantities(output)?;
            }
            Self::Passthrough { limit } => {
                check_quantities(std::slice::from_ref(limit))?;
                ensure!(
                    has_input(limit),
                    "Passthrough limit {limit} ({}) has no matching nominal input",
                    limit.dimension()
                );
            }
            Self::Gated { minimum, then } => {
                check_quantities(minimum)?;
                for quantity in minimum {
                    ensure!(
                        has_input(quantity),
                        "Gate minimum {quantity} ({}) has no matching nominal input",
                        quantity.dimension()
                    );
                }
                then.validate(nominal_input)?;
            }
        }

        Ok(())
    }

    fn into_production_function(self, nominal_input: &[Quantity]) -> ProductionFunction {
        match self {
            Self::Constant { output } => ProductionFunction::Constant(output),
            Self::Proportional { output } => ProductionFunction::Proportional {
                reference: nominal_input.to_vec(),
                output,
            },
            Self::Passthrough { limit } => ProductionFunction::Passthrough { limit },
            Self::Gated { minimum, then } => ProductionFunction::Gated {
                minimum,
                inner: Box::new(then.into_production_function(nominal_input)),
            },
        }
    }
}

/// Check that quantities are finite and not negative
fn check_quantities(quantities: &[Quantity]) -> Result<()> {
    for quantity in quantities {
        ensure!(
            quantity.is_finite() && quantity.value() >= 0.0,
            "Invalid quantity {quantity}. Must be finite and >=0."
        );
    }

    Ok(())
}

impl ResourceTypeRaw {
    fn into_resource_type(self, key: &str) -> Result<ResourceType> {
        check_quantities(&self.nominal_input).context("Invalid nominal input")?;
        self.production.validate(&self.nominal_input)?;

        let production = self.production.into_production_function(&self.nominal_input);
        let name = self.name.as_deref().unwrap_or(key);
        let mut resource_type = ResourceType::new(name, self.nominal_input, production);
        if let Some(days) = self.expected_lifetime_days {
            ensure!(days > 0, "expected_lifetime_days must be greater than zero");
            let expected_lifetime = TimeDelta::try_days(days)
                .with_context(|| format!("expected_lifetime_days ({days}) is out of range"))?;
            resource_type = resource_type.with_expected_lifetime(expected_lifetime);
        }

        Ok(resource_type)
    }
}

/// Read resource types from a map of raw records keyed by resource type key
fn read_resource_types_from_raw(raw: BTreeMap<String, ResourceTypeRaw>) -> Result<ResourceTypeMap> {
    let mut resource_types = ResourceTypeMap::new();
    for (key, resource_type) in raw {
        let resource_type = resource_type
            .into_resource_type(&key)
            .with_context(|| format!("Invalid resource type {key}"))?;
        resource_types.insert(ResourceTypeKey::from(key), Rc::new(resource_type));
    }

    Ok(resource_types)
}

/// Read the resource type catalogue from the specified model directory
pub fn read_resource_types(model_dir: &Path) -> Result<ResourceTypeMap> {
    let file_path = model_dir.join(RESOURCE_TYPES_FILE_NAME);
    let raw: BTreeMap<String, ResourceTypeRaw> = read_toml(&file_path)?;
    let resource_types =
        read_resource_types_from_raw(raw).with_context(|| input_err_msg(&file_path))?;
    ensure!(
        !resource_types.is_empty(),
        "{} does not define any resource types",
        file_path.display()
    );

    Ok(resource_types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::production::InputMap;
    use crate::quantity::q;
    use float_cmp::assert_approx_eq;
    use indexmap::indexmap;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn parse(toml_str: &str) -> Result<ResourceTypeMap> {
        read_resource_types_from_raw(toml::from_str(toml_str).unwrap())
    }

    #[test]
    fn test_read_resource_types() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(RESOURCE_TYPES_FILE_NAME)).unwrap();
            writeln!(
                file,
                r#"[solar_panel]
expected_lifetime_days = 1825
[solar_panel.production]
kind = "constant"
output = ["1000 kW"]

[membrane]
name = "FlexEDR E150"
nominal_input = ["45 psi", "9.75 m^3/h", "1132.23 kW"]
[membrane.production]
kind = "gated"
minimum = ["1132.23 kW", "45 psi"]
[membrane.production.then]
kind = "passthrough"
limit = "9.75 m^3/h""#
            )
            .unwrap();
        }

        let resource_types = read_resource_types(dir.path()).unwrap();
        assert_eq!(resource_types.len(), 2);

        let solar_panel = &resource_types["solar_panel"];
        assert_eq!(solar_panel.name, "solar_panel");
        assert_eq!(solar_panel.expected_lifetime, TimeDelta::days(1825));
        assert_eq!(solar_panel.peak_output().unwrap(), vec![q("1000 kW")]);

        let membrane = &resource_types["membrane"];
        assert_eq!(membrane.name, "FlexEDR E150");
        assert_eq!(membrane.nominal_input.len(), 3);
        let inputs = indexmap! {
            q("1 kW").dimension() => q("1132.23 kW"),
            q("1 psi").dimension() => q("45 psi"),
            q("1 m^3/h").dimension() => q("2 m^3/h"),
        };
        assert_eq!(membrane.produce(&inputs).unwrap(), vec![q("2 m^3/h")]);
    }

    #[test]
    fn test_proportional_uses_nominal_input() {
        let resource_types = parse(
            r#"[converter]
nominal_input = ["1000 kW"]
[converter.production]
kind = "proportional"
output = ["500 kW"]
"#,
        )
        .unwrap();
        let converter = &resource_types["converter"];
        let inputs: InputMap = indexmap! { q("1 kW").dimension() => q("400 kW") };
        let output = converter.produce(&inputs).unwrap();
        assert_approx_eq!(f64, output[0].value(), 200.0);
    }

    #[test]
    fn test_gate_without_nominal_input() {
        let error = parse(
            r#"[pump]
nominal_input = ["1 kW"]
[pump.production]
kind = "gated"
minimum = ["10 psi"]
[pump.production.then]
kind = "constant"
output = ["1 m^3/h"]
"#,
        )
        .unwrap_err();
        assert_eq!(error.to_string(), "Invalid resource type pump");
        assert_eq!(
            error.root_cause().to_string(),
            "Gate minimum 10 psi (pressure) has no matching nominal input"
        );
    }

    #[test]
    fn test_bad_quantities() {
        let result = parse(
            r#"[panel]
[panel.production]
kind = "constant"
output = ["-5 kW"]
"#,
        );
        assert_eq!(
            result.unwrap_err().root_cause().to_string(),
            "Invalid quantity -5 kW. Must be finite and >=0."
        );

        let result = parse(
            r#"[panel]
[panel.production]
kind = "constant"
output = []
"#,
        );
        assert_eq!(
            result.unwrap_err().root_cause().to_string(),
            "Production output cannot be empty"
        );
    }

    #[test]
    fn test_bad_lifetime() {
        let result = parse(
            r#"[panel]
expected_lifetime_days = 0
[panel.production]
kind = "constant"
output = ["1 kW"]
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_lifetime_out_of_range() {
        let result = parse(
            r#"[panel]
expected_lifetime_days = 9000000000000000
[panel.production]
kind = "constant"
output = ["1 kW"]
"#,
        );
        let error = result.unwrap_err();
        assert_eq!(error.to_string(), "Invalid resource type panel");
        assert_eq!(
            error.root_cause().to_string(),
            "expected_lifetime_days (9000000000000000) is out of range"
        );
    }

    #[test]
    fn test_unknown_unit() {
        let result: Result<BTreeMap<String, ResourceTypeRaw>, _> = toml::from_str(
            r#"[panel]
[panel.production]
kind = "constant"
output = ["5 furlongs"]
"#,
        );
        assert!(result.is_err());
    }
}
