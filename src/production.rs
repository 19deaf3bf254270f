//! Production functions describe how a resource type turns its satisfied inputs into outputs.
use crate::quantity::{Dimension, Quantity};
use anyhow::Result;
use float_cmp::{ApproxEq, F64Margin};
use indexmap::IndexMap;

/// The inputs available to a production function, keyed by dimension.
///
/// An empty map means that the item is unconstrained (nothing upstream limits it), in which case
/// a production function should return its peak output. If the map is not empty, any required
/// dimension missing from it should be treated as zero.
pub type InputMap = IndexMap<Dimension, Quantity>;

/// Something which can compute the output of a resource type from its satisfied inputs
pub trait Producible {
    /// Compute the output quantities for the given satisfied inputs
    fn produce(&self, inputs: &InputMap) -> Result<Vec<Quantity>>;
}

impl<F> Producible for F
where
    F: Fn(&InputMap) -> Result<Vec<Quantity>>,
{
    fn produce(&self, inputs: &InputMap) -> Result<Vec<Quantity>> {
        self(inputs)
    }
}

/// Get the satisfied input with the same dimension as `like`, or zero if there is none
pub fn satisfied_input(inputs: &InputMap, like: &Quantity) -> Quantity {
    inputs
        .get(&like.dimension())
        .cloned()
        .unwrap_or_else(|| like.zero_like())
}

/// The built-in kinds of production function which can be used in model files
#[derive(Debug, Clone, PartialEq)]
pub enum ProductionFunction {
    /// Always produces the same output, regardless of inputs
    Constant(Vec<Quantity>),
    /// Produces `output` scaled by how well the `reference` inputs are satisfied.
    ///
    /// The scale factor is the smallest ratio of satisfied to reference quantity, clamped to
    /// `[0, 1]`.
    Proportional {
        /// The inputs needed for full output
        reference: Vec<Quantity>,
        /// The output at full utilisation
        output: Vec<Quantity>,
    },
    /// Delivers the satisfied input of the same dimension as `limit`, up to `limit`
    Passthrough {
        /// The maximum output
        limit: Quantity,
    },
    /// Produces nothing unless every `minimum` input is met, otherwise defers to `inner`
    Gated {
        /// Inputs which must all be met for the item to run
        minimum: Vec<Quantity>,
        /// The production function used when running
        inner: Box<ProductionFunction>,
    },
}

impl ProductionFunction {
    /// The output when unconstrained
    pub fn peak_output(&self) -> Result<Vec<Quantity>> {
        self.produce(&InputMap::new())
    }
}

impl Producible for ProductionFunction {
    fn produce(&self, inputs: &InputMap) -> Result<Vec<Quantity>> {
        match self {
            Self::Constant(output) => Ok(output.clone()),
            Self::Proportional { reference, output } => {
                if inputs.is_empty() {
                    return Ok(output.clone());
                }

                let fraction = utilisation(reference, inputs)?;
                Ok(output.iter().map(|value| value.scale(fraction)).collect())
            }
            Self::Passthrough { limit } => {
                if inputs.is_empty() {
                    return Ok(vec![limit.clone()]);
                }

                Ok(vec![satisfied_input(inputs, limit).try_min(limit)?])
            }
            Self::Gated { minimum, inner } => {
                if !inputs.is_empty()
                    && !minimum
                        .iter()
                        .all(|required| is_met(&satisfied_input(inputs, required), required))
                {
                    // Not running: same outputs as normal, but all zero
                    return Ok(inner
                        .peak_output()?
                        .iter()
                        .map(Quantity::zero_like)
                        .collect());
                }

                inner.produce(inputs)
            }
        }
    }
}

/// Whether `satisfied` reaches `required`, allowing for rounding in the accumulated value
fn is_met(satisfied: &Quantity, required: &Quantity) -> bool {
    satisfied >= required || satisfied.approx_eq(required, F64Margin::default())
}

/// The fraction of full output achievable with the given inputs
fn utilisation(reference: &[Quantity], inputs: &InputMap) -> Result<f64> {
    let mut fraction: f64 = 1.0;
    for required in reference {
        if required.si_value() <= 0.0 {
            continue;
        }

        let ratio = satisfied_input(inputs, required).ratio(required)?;
        fraction = fraction.min(ratio);
    }

    Ok(fraction.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::q;
    use float_cmp::assert_approx_eq;
    use indexmap::indexmap;
    use rstest::rstest;

    fn inputs(quantities: &[&str]) -> InputMap {
        quantities
            .iter()
            .map(|s| {
                let quantity = q(s);
                (quantity.dimension(), quantity)
            })
            .collect()
    }

    #[test]
    fn test_closure_is_producible() {
        let halve = |inputs: &InputMap| -> Result<Vec<Quantity>> {
            Ok(vec![satisfied_input(inputs, &q("0 kW")).scale(0.5)])
        };
        let output = halve.produce(&inputs(&["10 kW"])).unwrap();
        assert_eq!(output, vec![q("5 kW")]);
    }

    #[test]
    fn test_constant() {
        let function = ProductionFunction::Constant(vec![q("1000 kW")]);
        assert_eq!(
            function.produce(&InputMap::new()).unwrap(),
            vec![q("1000 kW")]
        );
        assert_eq!(
            function.produce(&inputs(&["5 psi"])).unwrap(),
            vec![q("1000 kW")]
        );
    }

    #[rstest]
    #[case(&[], 500.0)] // Unconstrained
    #[case(&["1000 kW"], 500.0)]
    #[case(&["400 kW"], 200.0)]
    #[case(&["5 psi"], 0.0)] // Required dimension missing
    fn test_proportional(#[case] satisfied: &[&str], #[case] expected_kw: f64) {
        let function = ProductionFunction::Proportional {
            reference: vec![q("1000 kW")],
            output: vec![q("500 kW")],
        };
        let output = function.produce(&inputs(satisfied)).unwrap();
        assert_eq!(output.len(), 1);
        assert_approx_eq!(f64, output[0].value(), expected_kw);
    }

    #[test]
    fn test_proportional_limited_by_scarcest_input() {
        let function = ProductionFunction::Proportional {
            reference: vec![q("10 kW"), q("2 m^3/h")],
            output: vec![q("1 m^3/h")],
        };
        let output = function.produce(&inputs(&["10 kW", "0.5 m^3/h"])).unwrap();
        assert_approx_eq!(f64, output[0].value(), 0.25);
    }

    #[rstest]
    #[case(&[], 9.75)]
    #[case(&["0.702 m^3/h"], 0.702)]
    #[case(&["20 m^3/h"], 9.75)]
    #[case(&["45 psi"], 0.0)]
    fn test_passthrough(#[case] satisfied: &[&str], #[case] expected: f64) {
        let function = ProductionFunction::Passthrough {
            limit: q("9.75 m^3/h"),
        };
        let output = function.produce(&inputs(satisfied)).unwrap();
        assert_approx_eq!(
            f64,
            output[0].to_unit(q("1 m^3/h").unit()).unwrap().value(),
            expected
        );
    }

    #[rstest]
    #[case(&[], 0.5)] // Unconstrained
    #[case(&["1 kW", "45 psi", "2 m^3/h"], 0.5)]
    #[case(&["1 kW", "44 psi", "2 m^3/h"], 0.0)] // Pressure too low
    #[case(&["45 psi", "2 m^3/h"], 0.0)] // No power at all
    fn test_gated(#[case] satisfied: &[&str], #[case] expected: f64) {
        let function = ProductionFunction::Gated {
            minimum: vec![q("1 kW"), q("45 psi")],
            inner: Box::new(ProductionFunction::Passthrough {
                limit: q("0.5 m^3/h"),
            }),
        };
        let output = function.produce(&inputs(satisfied)).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].unit().symbol(), "m^3/h");
        assert_approx_eq!(f64, output[0].value(), expected);
    }

    #[test]
    fn test_satisfied_input_missing_is_zero() {
        let inputs = indexmap! { q("1 kW").dimension() => q("1 kW") };
        assert_eq!(satisfied_input(&inputs, &q("3 kW")), q("1 kW"));
        assert_eq!(satisfied_input(&inputs, &q("3 psi")), q("0 psi"));
    }
}
