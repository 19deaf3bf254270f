//! Matching produced quantities against required ones.
//!
//! Each item declares a nominal input: the quantities (by dimension) it needs to run at full
//! output. The quantities produced upstream are matched against these slots by dimension, summed
//! across producers and clamped so that no slot ever receives more than it asks for.
use crate::production::InputMap;
use crate::quantity::{Dimension, Quantity};
use anyhow::Result;
use indexmap::IndexMap;
use indexmap::map::Entry;
use log::warn;

/// Match the output of upstream producers against the nominal input of a consumer.
///
/// Producers are processed in order, and so are the quantities in each producer's output. For
/// each produced quantity:
///
/// * If the consumer has no required slot of that dimension, the quantity is discarded and a
///   warning is logged
/// * If it is the first quantity of its dimension, the slot receives the lesser of the produced
///   and required quantities
/// * Otherwise, the slot receives the lesser of the produced quantity and the remaining headroom
///   (required minus already received)
///
/// The accumulated value for a dimension is therefore never more than what is required, and the
/// final value only depends on the produced quantities, not on the order of the producers.
///
/// # Arguments
///
/// * `consumer_name` - Name of the consuming item (for diagnostics)
/// * `required` - The consumer's nominal input
/// * `upstream` - The name and output of each producer
///
/// # Returns
///
/// The satisfied inputs, keyed by dimension. Required dimensions which nothing produced are
/// absent. If there are no producers, the map is empty.
pub fn match_upstream_output<'a, I>(
    consumer_name: &str,
    required: &[Quantity],
    upstream: I,
) -> Result<InputMap>
where
    I: IntoIterator<Item = (&'a str, Vec<Quantity>)>,
{
    let mut satisfied = InputMap::new();
    for (producer_name, output) in upstream {
        for produced in output {
            let dimension = produced.dimension();
            let Some(cap) = required.iter().find(|slot| slot.dimension() == dimension) else {
                warn!(
                    "{producer_name} has {produced} ({dimension}) as production output which is \
                    not a required resource for the connected {consumer_name}"
                );
                continue;
            };

            match satisfied.entry(dimension) {
                Entry::Vacant(entry) => {
                    entry.insert(produced.try_min(cap)?);
                }
                Entry::Occupied(mut entry) => {
                    let headroom = cap.try_sub(entry.get())?;
                    let total = entry.get().try_add(&produced.try_min(&headroom)?)?;

                    // Converting between units can leave the sum an ulp above the cap
                    entry.insert(total.try_min(cap)?);
                }
            }
        }
    }

    Ok(satisfied)
}

/// Sum lists of quantities by dimension, without any cap.
///
/// The result contains one quantity per dimension, in the order each dimension was first seen,
/// expressed in the unit in which it was first seen.
pub fn sum_by_dimension<I>(outputs: I) -> Result<Vec<Quantity>>
where
    I: IntoIterator<Item = Vec<Quantity>>,
{
    let mut totals: IndexMap<Dimension, Quantity> = IndexMap::new();
    for output in outputs {
        for value in output {
            match totals.entry(value.dimension()) {
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
                Entry::Occupied(mut entry) => {
                    let total = entry.get().try_add(&value)?;
                    entry.insert(total);
                }
            }
        }
    }

    Ok(totals.into_values().collect())
}
