//! Common routines for handling input data.
use crate::facility::Facility;
use crate::id::IDCollection;
use crate::inventory::{InventoryNode, today};
use crate::model::{FacilityModel, ItemKey, ItemMap};
use anyhow::{Context, Result, bail};
use indexmap::IndexSet;
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::rc::Rc;

mod connection;
use connection::{read_connections, sort_producers_first};
mod facility;
use facility::{FACILITY_FILE_NAME, FacilityParameters};
mod item;
use item::read_items;
mod resource_type;
use resource_type::read_resource_types;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// A missing or empty file yields no records.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a facility model from the specified directory.
///
/// Items are built producers first, so that each item can hold its upstream items. Cyclic
/// connections are rejected.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The loaded model or an error if any of the files are invalid.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<FacilityModel> {
    let model_dir = model_dir.as_ref();
    let parameters = FacilityParameters::from_path(model_dir)?;
    let resource_types = read_resource_types(model_dir)?;
    let definitions = read_items(model_dir, &resource_types)?;
    let item_ids: IndexSet<ItemKey> = definitions.keys().cloned().collect();
    let connections = read_connections(model_dir, &item_ids)?;

    let mut built = ItemMap::new();
    for key in sort_producers_first(&item_ids, &connections)? {
        let producers = connections
            .get(&key)
            .map(|producers| {
                producers
                    .iter()
                    .map(|producer| Rc::clone(&built[producer]))
                    .collect_vec()
            })
            .unwrap_or_default();
        let item = definitions[&key].build(&key, producers);
        built.insert(key, Rc::new(item));
    }

    // Keep the order in which items were defined
    let items: ItemMap = item_ids
        .iter()
        .map(|key| (key.clone(), Rc::clone(&built[key])))
        .collect();

    let output_items = parameters
        .outputs
        .iter()
        .map(|id| {
            let key = item_ids.get_id_by_str(id)?;
            Ok(Rc::clone(&items[&key]))
        })
        .collect::<Result<Vec<Rc<InventoryNode>>>>()
        .with_context(|| input_err_msg(model_dir.join(FACILITY_FILE_NAME)))?;

    let date_of_construction = parameters.date_of_construction.unwrap_or_else(today);
    let facility = Facility::new(&parameters.name, date_of_construction, output_items)
        .with_cost_accounting(parameters.cost_accounting);

    Ok(FacilityModel {
        facility,
        resource_types,
        items,
        discount_rate: parameters.discount_rate,
    })
}
