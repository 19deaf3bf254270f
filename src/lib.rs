//! Capacity propagation and cost modelling for production facilities.
//!
//! A facility is a graph of inventory items. Each item is an instance of a resource type, whose
//! production function turns the output of the items feeding it into its own output.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod capacity;
pub mod cli;
pub mod facility;
pub mod finance;
pub mod id;
pub mod input;
pub mod inventory;
pub mod log;
pub mod model;
pub mod output;
pub mod production;
pub mod quantity;
pub mod resource_type;
pub mod settings;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory where program configuration files are stored
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("factory_model");

    path
}
