//! The module responsible for writing output data to disk.
use crate::model::{FacilityModel, ItemKey};
use crate::quantity::Quantity;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "factory_model_results";

/// The output file name for capacities
const CAPACITIES_FILE_NAME: &str = "capacities.csv";

/// The output file name for costs
const COSTS_FILE_NAME: &str = "costs.csv";

/// The item ID used for facility-wide rows
const FACILITY_ROW_ID: &str = "FACILITY";

/// Get the default output directory for the model at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory, or reuse an existing one.
///
/// An existing directory is only reused if it is empty or `overwrite` is set.
///
/// # Returns
///
/// Whether an existing, non-empty directory is being overwritten.
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        let is_empty = fs::read_dir(output_dir)?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            overwrite,
            "Output folder {} already exists and is not empty. Use the --overwrite option to \
            replace its contents.",
            output_dir.display()
        );
        return Ok(true);
    }

    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// Represents a row in the capacities CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CapacityRow {
    item_id: String,
    item_name: String,
    dimension: String,
    value: f64,
    unit: String,
}

impl CapacityRow {
    fn new(item_id: &str, item_name: &str, quantity: &Quantity) -> Self {
        Self {
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            dimension: quantity.dimension().to_string(),
            value: quantity.value(),
            unit: quantity.unit().to_string(),
        }
    }
}

/// Represents a row in the costs CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CostRow {
    item_id: String,
    item_name: String,
    price_per_unit: f64,
    date_of_investment: Option<NaiveDate>,
    replacement_date: Option<NaiveDate>,
    subtree_cost: f64,
}

/// Write the capacity of every item, followed by the facility as a whole
pub fn write_capacities(
    output_path: &Path,
    model: &FacilityModel,
    item_capacities: &IndexMap<ItemKey, Vec<Quantity>>,
    facility_capacity: &[Quantity],
) -> Result<()> {
    let file_path = output_path.join(CAPACITIES_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)?;
    for (key, capacity) in item_capacities {
        let item = &model.items[key];
        for quantity in capacity {
            writer.serialize(CapacityRow::new(&key.0, &item.name, quantity))?;
        }
    }
    for quantity in facility_capacity {
        writer.serialize(CapacityRow::new(
            FACILITY_ROW_ID,
            &model.facility.name,
            quantity,
        ))?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the price of every item and the cost of its upstream graph, followed by the facility
/// total.
///
/// Item subtree costs use the item's default window; the facility total uses the facility's.
pub fn write_costs(output_path: &Path, model: &FacilityModel) -> Result<()> {
    let file_path = output_path.join(COSTS_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)?;
    for (key, item) in &model.items {
        writer.serialize(CostRow {
            item_id: key.to_string(),
            item_name: item.name.clone(),
            price_per_unit: item.price_per_unit.value(),
            date_of_investment: Some(item.date_of_investment),
            replacement_date: Some(item.replacement_date()?),
            subtree_cost: item
                .get_cost_with_accounting(None, None, model.facility.cost_accounting)
                .value(),
        })?;
    }
    writer.serialize(CostRow {
        item_id: FACILITY_ROW_ID.to_string(),
        item_name: model.facility.name.clone(),
        price_per_unit: 0.0,
        date_of_investment: Some(model.facility.date_of_construction),
        replacement_date: None,
        subtree_cost: model.facility.get_total_cost(None, None).value(),
    })?;
    writer.flush()?;

    Ok(())
}
