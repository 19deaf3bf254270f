//! Code for reading the connections between items and ordering items for construction.
use super::{input_err_msg, read_csv_optional};
use crate::id::IDCollection;
use crate::model::ItemKey;
use anyhow::{Context, Result, anyhow, ensure};
use indexmap::{IndexMap, IndexSet};
use petgraph::algo::toposort;
use petgraph::graph::Graph;
use serde::Deserialize;
use std::path::Path;

const CONNECTIONS_FILE_NAME: &str = "connections.csv";

/// The producers feeding each consumer, in connection order
pub type ConnectionMap = IndexMap<ItemKey, Vec<ItemKey>>;

#[derive(PartialEq, Debug, Deserialize)]
struct ConnectionRaw {
    consumer_id: String,
    producer_id: String,
}

fn read_connections_from_iter<I>(iter: I, item_ids: &IndexSet<ItemKey>) -> Result<ConnectionMap>
where
    I: Iterator<Item = ConnectionRaw>,
{
    let mut connections = ConnectionMap::new();
    for connection in iter {
        let consumer = item_ids.get_id_by_str(&connection.consumer_id)?;
        let producer = item_ids.get_id_by_str(&connection.producer_id)?;
        ensure!(consumer != producer, "Item {consumer} cannot feed itself");

        let producers = connections.entry(consumer).or_default();
        ensure!(
            !producers.contains(&producer),
            "Duplicate connection from {producer} to {}",
            connection.consumer_id
        );
        producers.push(producer);
    }

    Ok(connections)
}

/// Read the connections file from the specified model directory.
///
/// The file is optional; without it no item has any upstream connections.
pub fn read_connections(model_dir: &Path, item_ids: &IndexSet<ItemKey>) -> Result<ConnectionMap> {
    let file_path = model_dir.join(CONNECTIONS_FILE_NAME);
    let connections_csv = read_csv_optional(&file_path)?;
    read_connections_from_iter(connections_csv, item_ids).with_context(|| input_err_msg(&file_path))
}

/// Order items so that every producer comes before the items it feeds.
///
/// Returns an error if the connections contain a cycle.
pub fn sort_producers_first(
    item_ids: &IndexSet<ItemKey>,
    connections: &ConnectionMap,
) -> Result<Vec<ItemKey>> {
    // Edges point from producer to consumer
    let mut graph = Graph::new();
    let nodes: IndexMap<_, _> = item_ids
        .iter()
        .map(|id| (id, graph.add_node(id.clone())))
        .collect();
    for (consumer, producers) in connections {
        for producer in producers {
            graph.add_edge(nodes[producer], nodes[consumer], ());
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| {
        anyhow!(
            "Cycle detected in item connections at item {}",
            graph[cycle.node_id()]
        )
    })?;

    Ok(order.into_iter().map(|idx| graph[idx].clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use itertools::Itertools;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn item_ids(ids: &[&str]) -> IndexSet<ItemKey> {
        ids.iter().map(|id| ItemKey::from(*id)).collect()
    }

    fn connection(consumer_id: &str, producer_id: &str) -> ConnectionRaw {
        ConnectionRaw {
            consumer_id: consumer_id.into(),
            producer_id: producer_id.into(),
        }
    }

    #[test]
    fn test_read_connections() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(CONNECTIONS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "consumer_id,producer_id
membrane,solar_panel_1
membrane,pump
pump,converter"
            )
            .unwrap();
        }

        let ids = item_ids(&["solar_panel_1", "converter", "pump", "membrane"]);
        let connections = read_connections(dir.path(), &ids).unwrap();
        assert_eq!(connections.len(), 2);
        assert_eq!(
            connections["membrane"],
            [ItemKey::from("solar_panel_1"), ItemKey::from("pump")]
        );
        assert_eq!(connections["pump"], [ItemKey::from("converter")]);
    }

    #[test]
    fn test_read_connections_missing_file() {
        let dir = tempdir().unwrap();
        let connections = read_connections(dir.path(), &item_ids(&["a"])).unwrap();
        assert!(connections.is_empty());
    }

    #[test]
    fn test_read_connections_bad() {
        let ids = item_ids(&["a", "b"]);
        assert_error!(
            read_connections_from_iter([connection("a", "c")].into_iter(), &ids),
            "Unknown ID c found"
        );
        assert_error!(
            read_connections_from_iter([connection("a", "a")].into_iter(), &ids),
            "Item a cannot feed itself"
        );
        assert_error!(
            read_connections_from_iter(
                [connection("a", "b"), connection("a", "b")].into_iter(),
                &ids
            ),
            "Duplicate connection from b to a"
        );
    }

    #[test]
    fn test_sort_producers_first() {
        let ids = item_ids(&["membrane", "pump", "converter", "solar_panel"]);
        let connections = read_connections_from_iter(
            [
                connection("membrane", "solar_panel"),
                connection("membrane", "pump"),
                connection("pump", "converter"),
                connection("converter", "solar_panel"),
            ]
            .into_iter(),
            &ids,
        )
        .unwrap();

        let order = sort_producers_first(&ids, &connections).unwrap();
        assert_eq!(order.len(), 4);
        let position = |id: &str| order.iter().position(|key| key.0.as_ref() == id).unwrap();
        for (consumer, producers) in &connections {
            for producer in producers {
                assert!(position(&producer.0) < position(&consumer.0));
            }
        }
        assert_eq!(
            order.iter().map(ToString::to_string).collect_vec(),
            ["solar_panel", "converter", "pump", "membrane"]
        );
    }

    #[test]
    fn test_sort_producers_first_cycle() {
        let ids = item_ids(&["a", "b", "c"]);
        let connections = read_connections_from_iter(
            [connection("a", "b"), connection("b", "c"), connection("c", "b")].into_iter(),
            &ids,
        )
        .unwrap();
        assert!(
            sort_producers_first(&ids, &connections)
                .unwrap_err()
                .to_string()
                .starts_with("Cycle detected in item connections at item ")
        );
    }
}
