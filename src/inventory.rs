//! Inventory nodes are the physical pieces of equipment making up a facility.
//!
//! Nodes form a directed acyclic graph: each node holds the upstream nodes (producers) feeding it
//! in `input_connections`. The same producer may feed several consumers, so nodes are shared via
//! [`Rc`]. Nothing here detects cycles; callers building a graph by hand must make sure it is
//! acyclic (the model loader does this for you).
use crate::capacity::match_upstream_output;
use crate::facility::CostAccounting;
use crate::id::define_uuid_type;
use crate::quantity::Quantity;
use crate::resource_type::ResourceType;
use crate::units::Money;
use anyhow::{Context, Result, ensure};
use chrono::{NaiveDate, TimeDelta};
use std::collections::HashSet;
use std::rc::Rc;

define_uuid_type! {ItemID}

/// Today's date in the local time zone
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// A single piece of equipment, instantiating a [`ResourceType`]
#[derive(Debug)]
pub struct InventoryNode {
    /// A unique identifier, generated on creation
    pub id: ItemID,
    /// A human-readable label
    pub name: String,
    /// The kind of equipment this is
    pub resource_type: Rc<ResourceType>,
    /// The acquisition cost
    pub price_per_unit: Money,
    /// The date on which the item entered service
    pub date_of_investment: NaiveDate,
    /// How long the item stays in service before it should be replaced
    pub actual_depreciation_time: TimeDelta,
    /// The date on which the item was (or will be) taken out of service, if known
    pub end_of_operation: Option<NaiveDate>,
    /// The upstream nodes feeding this one, in connection order
    pub input_connections: Vec<Rc<InventoryNode>>,
}

impl InventoryNode {
    /// Create a new inventory node.
    ///
    /// The name is derived from the resource type's name plus the first characters of the
    /// generated ID and the depreciation time defaults to the type's expected lifetime.
    pub fn new(
        resource_type: Rc<ResourceType>,
        price_per_unit: Money,
        date_of_investment: NaiveDate,
        input_connections: Vec<Rc<InventoryNode>>,
    ) -> Self {
        let id = ItemID::new();
        Self {
            id,
            name: format!("{}-{}", resource_type.name, id.short()),
            actual_depreciation_time: resource_type.expected_lifetime,
            resource_type,
            price_per_unit,
            date_of_investment,
            end_of_operation: None,
            input_connections,
        }
    }

    /// Replace the generated name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set how long the item stays in service
    pub fn with_depreciation_time(mut self, depreciation_time: TimeDelta) -> Self {
        self.actual_depreciation_time = depreciation_time;
        self
    }

    /// Set the date on which the item is taken out of service
    pub fn with_end_of_operation(mut self, end_of_operation: NaiveDate) -> Self {
        self.end_of_operation = Some(end_of_operation);
        self
    }

    /// Create a copy of this node with a new ID and the given name.
    ///
    /// The copy shares the resource type and upstream nodes of the original.
    pub fn duplicate(&self, item_name: &str) -> Self {
        Self {
            id: ItemID::new(),
            name: item_name.to_string(),
            resource_type: Rc::clone(&self.resource_type),
            price_per_unit: self.price_per_unit,
            date_of_investment: self.date_of_investment,
            actual_depreciation_time: self.actual_depreciation_time,
            end_of_operation: self.end_of_operation,
            input_connections: self.input_connections.clone(),
        }
    }

    /// The date on which the item is due to be replaced
    pub fn replacement_date(&self) -> Result<NaiveDate> {
        self.date_of_investment
            .checked_add_signed(self.actual_depreciation_time)
            .with_context(|| format!("Replacement date of {} is out of range", self.name))
    }

    /// Whether the item is in service on the given date
    pub fn is_operational(&self, date: NaiveDate) -> bool {
        self.date_of_investment <= date && self.end_of_operation.is_none_or(|end| date <= end)
    }

    /// The output this node can sustain, given its upstream graph.
    ///
    /// The capacity of each upstream node is computed recursively (depth first, in connection
    /// order), matched against this node's nominal input and fed into its production function.
    /// Shared upstream nodes are recomputed for every path that reaches them.
    ///
    /// A node with no upstream connections is unconstrained and returns the peak output of its
    /// resource type. Errors raised by a production function are returned unchanged.
    ///
    /// The graph must be acyclic. See [`InventoryNode::get_capacity_with_depth_limit`] for a
    /// version which guards against pathologically deep graphs.
    pub fn get_capacity(&self) -> Result<Vec<Quantity>> {
        self.capacity(0, None)
    }

    /// As [`InventoryNode::get_capacity`], but fail if the graph is deeper than `max_depth`.
    ///
    /// This node is at depth zero and its direct producers at depth one.
    pub fn get_capacity_with_depth_limit(&self, max_depth: usize) -> Result<Vec<Quantity>> {
        self.capacity(0, Some(max_depth))
    }

    fn capacity(&self, depth: usize, max_depth: Option<usize>) -> Result<Vec<Quantity>> {
        if let Some(max_depth) = max_depth {
            ensure!(
                depth <= max_depth,
                "Maximum graph depth of {max_depth} exceeded at {}",
                self.name
            );
        }

        let mut upstream = Vec::with_capacity(self.input_connections.len());
        for node in &self.input_connections {
            upstream.push((node.name.as_str(), node.capacity(depth + 1, max_depth)?));
        }

        let satisfied =
            match_upstream_output(&self.name, &self.resource_type.nominal_input, upstream)?;
        self.resource_type.produce(&satisfied)
    }

    /// The acquisition cost of this node and everything upstream of it, within a time window.
    ///
    /// Only nodes whose date of investment lies within `[start_date, end_date]` (inclusive) are
    /// counted. `start_date` defaults to this node's own date of investment and `end_date` to
    /// today. The same window is applied to every upstream node.
    ///
    /// A node shared by several consumers is counted once for every path which reaches it.
    pub fn get_cost(&self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Money {
        self.get_cost_with_accounting(start_date, end_date, CostAccounting::PerPath)
    }

    /// As [`InventoryNode::get_cost`], with a choice of how shared upstream nodes are counted
    pub fn get_cost_with_accounting(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        accounting: CostAccounting,
    ) -> Money {
        let start_date = start_date.unwrap_or(self.date_of_investment);
        let end_date = end_date.unwrap_or_else(today);
        let mut counted = HashSet::new();
        let counted = match accounting {
            CostAccounting::PerPath => None,
            CostAccounting::Unique => Some(&mut counted),
        };

        self.cost_within(start_date, end_date, counted)
    }

    /// Sum the prices of nodes invested within the window.
    ///
    /// If `counted` is provided, nodes whose IDs are already in it are skipped (along with their
    /// upstream graph) and visited nodes are added to it.
    pub(crate) fn cost_within(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        counted: Option<&mut HashSet<ItemID>>,
    ) -> Money {
        let mut cost = Money(0.0);
        self.visit(counted, &mut |node: &InventoryNode| {
            if (start_date..=end_date).contains(&node.date_of_investment) {
                cost += node.price_per_unit;
            }
        });

        cost
    }

    /// Call `callback` for this node and every node upstream of it, producers first.
    ///
    /// Without `counted`, a shared node is visited once per path which reaches it.
    pub(crate) fn visit<F>(&self, mut counted: Option<&mut HashSet<ItemID>>, callback: &mut F)
    where
        F: FnMut(&InventoryNode),
    {
        if counted
            .as_deref_mut()
            .is_some_and(|counted| !counted.insert(self.id))
        {
            return;
        }

        for node in &self.input_connections {
            node.visit(counted.as_deref_mut(), callback);
        }
        callback(self);
    }

    /// Find a node with the given ID among the nodes upstream of this one
    pub fn find_upstream(&self, id: ItemID) -> Option<&Rc<InventoryNode>> {
        self.input_connections.iter().find_map(|node| {
            if node.id == id {
                Some(node)
            } else {
                node.find_upstream(id)
            }
        })
    }
}
