//! Resource types are catalogue definitions of a kind of equipment: what it needs to run at full
//! output and how its output depends on its inputs.
use crate::id::define_uuid_type;
use crate::production::{InputMap, Producible};
use crate::quantity::Quantity;
use anyhow::Result;
use chrono::TimeDelta;
use std::fmt;

define_uuid_type! {ResourceTypeID}

/// The default expected lifetime for equipment, in days
pub const DEFAULT_EXPECTED_LIFETIME_DAYS: i64 = 4 * 365;

/// A kind of equipment, shared by any number of [`crate::inventory::InventoryNode`]s
pub struct ResourceType {
    /// A unique identifier, generated on creation
    pub id: ResourceTypeID,
    /// A human-readable label (not required to be unique)
    pub name: String,
    /// The resources needed to run at full output.
    ///
    /// In practice each dimension appears at most once.
    pub nominal_input: Vec<Quantity>,
    /// How long equipment of this type is expected to stay in service
    pub expected_lifetime: TimeDelta,
    production: Box<dyn Producible>,
}

impl ResourceType {
    /// Create a new resource type.
    ///
    /// # Arguments
    ///
    /// * `name` - A human-readable label
    /// * `nominal_input` - The resources needed to run at full output
    /// * `production` - Computes the output from the satisfied inputs
    pub fn new<P>(name: &str, nominal_input: Vec<Quantity>, production: P) -> Self
    where
        P: Producible + 'static,
    {
        Self {
            id: ResourceTypeID::new(),
            name: name.to_string(),
            nominal_input,
            expected_lifetime: TimeDelta::days(DEFAULT_EXPECTED_LIFETIME_DAYS),
            production: Box::new(production),
        }
    }

    /// Set the expected lifetime of this resource type
    pub fn with_expected_lifetime(mut self, expected_lifetime: TimeDelta) -> Self {
        self.expected_lifetime = expected_lifetime;
        self
    }

    /// Compute the output of this resource type for the given satisfied inputs
    pub fn produce(&self, inputs: &InputMap) -> Result<Vec<Quantity>> {
        self.production.produce(inputs)
    }

    /// The output of this resource type when nothing constrains it
    pub fn peak_output(&self) -> Result<Vec<Quantity>> {
        self.produce(&InputMap::new())
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("nominal_input", &self.nominal_input)
            .field("expected_lifetime", &self.expected_lifetime)
            .finish_non_exhaustive()
    }
}
