//! A facility is the top-level collection of equipment, reporting combined capacity and cost.
use crate::capacity::sum_by_dimension;
use crate::finance::{annual_capital_cost, lifetime_in_years};
use crate::id::define_uuid_type;
use crate::inventory::{InventoryNode, ItemID, today};
use crate::quantity::Quantity;
use crate::units::{Dimensionless, Money, MoneyPerYear};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::rc::Rc;

define_uuid_type! {FacilityID}

/// How to count nodes reachable from more than one consumer when summing costs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostAccounting {
    /// Count a node once for every path which reaches it
    #[default]
    PerPath,
    /// Count every node once
    Unique,
}

/// A production facility
#[derive(Debug)]
pub struct Facility {
    /// A unique identifier, generated on creation
    pub id: FacilityID,
    /// A human-readable label
    pub name: String,
    /// The items delivering the facility's products
    pub output_items: Vec<Rc<InventoryNode>>,
    /// The date on which the facility was built
    pub date_of_construction: NaiveDate,
    /// How shared equipment is counted in [`Facility::get_total_cost`]
    pub cost_accounting: CostAccounting,
}

impl Facility {
    /// Create a new facility
    pub fn new(
        name: &str,
        date_of_construction: NaiveDate,
        output_items: Vec<Rc<InventoryNode>>,
    ) -> Self {
        Self {
            id: FacilityID::new(),
            name: name.to_string(),
            output_items,
            date_of_construction,
            cost_accounting: CostAccounting::default(),
        }
    }

    /// Set how shared equipment is counted
    pub fn with_cost_accounting(mut self, cost_accounting: CostAccounting) -> Self {
        self.cost_accounting = cost_accounting;
        self
    }

    /// Add an item to the facility's outputs
    pub fn add_output_item(&mut self, item: Rc<InventoryNode>) {
        self.output_items.push(item);
    }

    /// The combined output of the facility.
    ///
    /// Quantities of the same dimension are summed across output items, without any cap.
    pub fn get_capacity(&self) -> Result<Vec<Quantity>> {
        let outputs: Vec<_> = self
            .output_items
            .iter()
            .map(|item| item.get_capacity())
            .try_collect()?;
        sum_by_dimension(outputs).context("Failed to combine output item capacities")
    }

    /// As [`Facility::get_capacity`], but fail if the graph below any output item is deeper than
    /// `max_depth`
    pub fn get_capacity_with_depth_limit(&self, max_depth: usize) -> Result<Vec<Quantity>> {
        let outputs: Vec<_> = self
            .output_items
            .iter()
            .map(|item| item.get_capacity_with_depth_limit(max_depth))
            .try_collect()?;
        sum_by_dimension(outputs).context("Failed to combine output item capacities")
    }

    /// The acquisition cost of every output item and everything upstream of it.
    ///
    /// Only items invested within `[start_date, end_date]` are counted. `start_date` defaults to
    /// the date of construction and `end_date` to today. Shared items are counted according to
    /// [`Facility::cost_accounting`].
    pub fn get_total_cost(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Money {
        let start_date = start_date.unwrap_or(self.date_of_construction);
        let end_date = end_date.unwrap_or_else(today);
        let mut counted = HashSet::new();
        self.output_items
            .iter()
            .map(|item| match self.cost_accounting {
                CostAccounting::PerPath => item.cost_within(start_date, end_date, None),
                CostAccounting::Unique => {
                    item.cost_within(start_date, end_date, Some(&mut counted))
                }
            })
            .sum()
    }

    /// The output items invested on or after `date` (default: today).
    ///
    /// Only the output items themselves are considered, not their upstream items.
    pub fn active_items(&self, date: Option<NaiveDate>) -> Vec<&Rc<InventoryNode>> {
        let date = date.unwrap_or_else(today);
        self.output_items
            .iter()
            .filter(|item| date <= item.date_of_investment)
            .collect()
    }

    /// Find an item with the given ID anywhere in the facility
    pub fn find_item(&self, id: ItemID) -> Option<&Rc<InventoryNode>> {
        self.output_items.iter().find_map(|item| {
            if item.id == id {
                Some(item)
            } else {
                item.find_upstream(id)
            }
        })
    }

    /// Whether an item with the given ID is anywhere in the facility
    pub fn contains_item(&self, id: ItemID) -> bool {
        self.find_item(id).is_some()
    }

    /// The capital cost of all the facility's equipment, spread over each item's lifetime.
    ///
    /// Shared items are counted according to [`Facility::cost_accounting`].
    pub fn get_annualised_capital_cost(&self, discount_rate: Dimensionless) -> MoneyPerYear {
        let mut counted = HashSet::new();
        let mut total = MoneyPerYear(0.0);
        let mut add_item = |item: &InventoryNode| {
            let lifetime = lifetime_in_years(item.actual_depreciation_time);
            total += annual_capital_cost(item.price_per_unit, lifetime, discount_rate);
        };
        for item in &self.output_items {
            let counted = match self.cost_accounting {
                CostAccounting::PerPath => None,
                CostAccounting::Unique => Some(&mut counted),
            };
            item.visit(counted, &mut add_item);
        }

        total
    }
}
