//! A facility model loaded from a model directory.
use crate::facility::Facility;
use crate::id::define_id_type;
use crate::inventory::InventoryNode;
use crate::quantity::Quantity;
use crate::resource_type::ResourceType;
use crate::units::{Dimensionless, MoneyPerYear};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::rc::Rc;

define_id_type! {ResourceTypeKey}
define_id_type! {ItemKey}

/// Resource types, keyed by the key used for them in the model files
pub type ResourceTypeMap = IndexMap<ResourceTypeKey, Rc<ResourceType>>;

/// Inventory items, keyed by the key used for them in the model files
pub type ItemMap = IndexMap<ItemKey, Rc<InventoryNode>>;

/// A facility together with the catalogue and items it was built from
#[derive(Debug)]
pub struct FacilityModel {
    /// The facility itself
    pub facility: Facility,
    /// All resource types defined for the model
    pub resource_types: ResourceTypeMap,
    /// Every item in the model, in the order they were defined
    pub items: ItemMap,
    /// The discount rate used when annualising capital costs
    pub discount_rate: Dimensionless,
}

impl FacilityModel {
    /// The combined capacity of the facility, optionally guarding against deep graphs
    pub fn get_capacity(&self, max_depth: Option<usize>) -> Result<Vec<Quantity>> {
        match max_depth {
            Some(max_depth) => self.facility.get_capacity_with_depth_limit(max_depth),
            None => self.facility.get_capacity(),
        }
    }

    /// The capacity of every item in the model
    pub fn item_capacities(
        &self,
        max_depth: Option<usize>,
    ) -> Result<IndexMap<ItemKey, Vec<Quantity>>> {
        self.items
            .iter()
            .map(|(key, item)| {
                let capacity = match max_depth {
                    Some(max_depth) => item.get_capacity_with_depth_limit(max_depth),
                    None => item.get_capacity(),
                }
                .with_context(|| format!("Failed to compute capacity of item {key}"))?;
                Ok((key.clone(), capacity))
            })
            .collect()
    }

    /// The annualised capital cost of the facility at the model's discount rate
    pub fn get_annualised_capital_cost(&self) -> MoneyPerYear {
        self.facility.get_annualised_capital_cost(self.discount_rate)
    }
}
