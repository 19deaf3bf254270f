//! Code for reading the items file.
use super::{input_err_msg, read_csv};
use crate::inventory::InventoryNode;
use crate::model::{ItemKey, ResourceTypeMap};
use crate::resource_type::ResourceType;
use crate::units::Money;
use anyhow::{Context, Result, ensure};
use chrono::{NaiveDate, TimeDelta};
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const ITEMS_FILE_NAME: &str = "items.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct ItemRaw {
    id: String,
    resource_type_id: String,
    price_per_unit: Money,
    date_of_investment: NaiveDate,
    #[serde(default)]
    depreciation_days: Option<i64>,
    #[serde(default)]
    end_of_operation: Option<NaiveDate>,
}

impl ItemRaw {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.price_per_unit.is_finite() && self.price_per_unit >= Money(0.0),
            "Invalid value for price_per_unit ({}). Must be finite and >=0.",
            self.price_per_unit.value()
        );

        if let Some(days) = self.depreciation_days {
            ensure!(days > 0, "depreciation_days must be greater than zero");
        }
        self.depreciation_time()?;

        if let Some(end_of_operation) = self.end_of_operation {
            ensure!(
                end_of_operation >= self.date_of_investment,
                "end_of_operation ({end_of_operation}) is before date_of_investment ({})",
                self.date_of_investment
            );
        }

        Ok(())
    }

    /// The depreciation time, if one was given
    fn depreciation_time(&self) -> Result<Option<TimeDelta>> {
        self.depreciation_days
            .map(|days| {
                TimeDelta::try_days(days)
                    .with_context(|| format!("depreciation_days ({days}) is out of range"))
            })
            .transpose()
    }
}

/// An item read from file, ready to be built once its upstream items exist
#[derive(Debug)]
pub struct ItemDefinition {
    resource_type: Rc<ResourceType>,
    price_per_unit: Money,
    date_of_investment: NaiveDate,
    depreciation_time: Option<TimeDelta>,
    end_of_operation: Option<NaiveDate>,
}

impl ItemDefinition {
    /// Create the inventory node for this item, named after its key
    pub fn build(&self, key: &ItemKey, input_connections: Vec<Rc<InventoryNode>>) -> InventoryNode {
        let mut node = InventoryNode::new(
            Rc::clone(&self.resource_type),
            self.price_per_unit,
            self.date_of_investment,
            input_connections,
        )
        .with_name(&key.0);
        if let Some(depreciation_time) = self.depreciation_time {
            node = node.with_depreciation_time(depreciation_time);
        }
        if let Some(end_of_operation) = self.end_of_operation {
            node = node.with_end_of_operation(end_of_operation);
        }

        node
    }
}

fn read_items_from_iter<I>(
    iter: I,
    resource_types: &ResourceTypeMap,
) -> Result<IndexMap<ItemKey, ItemDefinition>>
where
    I: Iterator<Item = ItemRaw>,
{
    let mut items = IndexMap::new();
    for item in iter {
        item.validate()
            .with_context(|| format!("Invalid item {}", item.id))?;
        let resource_type = resource_types
            .get(item.resource_type_id.as_str())
            .with_context(|| {
                format!(
                    "Unknown resource type {} for item {}",
                    item.resource_type_id, item.id
                )
            })?;

        let definition = ItemDefinition {
            resource_type: Rc::clone(resource_type),
            price_per_unit: item.price_per_unit,
            date_of_investment: item.date_of_investment,
            depreciation_time: item.depreciation_time()?,
            end_of_operation: item.end_of_operation,
        };

        match items.entry(ItemKey::from(item.id)) {
            Entry::Occupied(entry) => {
                anyhow::bail!("Duplicate item ID {}", entry.key());
            }
            Entry::Vacant(entry) => {
                entry.insert(definition);
            }
        }
    }

    Ok(items)
}

/// Read the items file from the specified model directory
pub fn read_items(
    model_dir: &Path,
    resource_types: &ResourceTypeMap,
) -> Result<IndexMap<ItemKey, ItemDefinition>> {
    let file_path = model_dir.join(ITEMS_FILE_NAME);
    let items_csv = read_csv(&file_path)?;
    read_items_from_iter(items_csv, resource_types).with_context(|| input_err_msg(&file_path))
}
