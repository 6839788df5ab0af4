//! Module for creating and analysing the graph of buses and assets
use crate::asset::{AssetGroup, AssetID, AssetPool};
use crate::bus::{BusID, BusMap};
use anyhow::{Result, ensure};
use petgraph::Directed;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{Graph, NodeIndex};
use std::collections::HashMap;
use std::fmt::Display;

/// A graph of energy flows between buses and assets
pub type EnergySystemGraph = Graph<GraphNode, GraphEdge, Directed>;

#[derive(Debug, Eq, PartialEq, Clone, Hash)]
/// A node in the energy system graph
pub enum GraphNode {
    /// A node representing a bus
    Bus(BusID),
    /// A node representing an asset
    Asset(AssetID),
}

impl Display for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphNode::Bus(id) => write!(f, "{id}"),
            GraphNode::Asset(id) => write!(f, "asset {id}"),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
/// An edge in the energy system graph, representing one port of an asset
pub struct GraphEdge {
    /// Index of the port on the asset's input or output side
    pub port: usize,
}

/// Creates a directed graph of the energy system.
///
/// There is an edge from a bus to every asset drawing from it and from every asset to each bus it
/// supplies. Buses which are named by an asset but missing from `buses` are still added, so that
/// they can be reported.
pub fn create_energy_system_graph(assets: &AssetPool, buses: &BusMap) -> EnergySystemGraph {
    let mut graph = Graph::new();
    let mut bus_to_node_index = HashMap::new();
    for bus_id in buses.keys() {
        let node = graph.add_node(GraphNode::Bus(bus_id.clone()));
        bus_to_node_index.insert(bus_id.clone(), node);
    }

    for asset in assets.iter() {
        let asset_node = graph.add_node(GraphNode::Asset(asset.id));
        for (port, bus_id) in asset.inputs.iter().enumerate() {
            let bus_node = *bus_to_node_index
                .entry(bus_id.clone())
                .or_insert_with(|| graph.add_node(GraphNode::Bus(bus_id.clone())));
            graph.add_edge(bus_node, asset_node, GraphEdge { port });
        }
        for (port, bus_id) in asset.outputs.iter().enumerate() {
            let bus_node = *bus_to_node_index
                .entry(bus_id.clone())
                .or_insert_with(|| graph.add_node(GraphNode::Bus(bus_id.clone())));
            graph.add_edge(asset_node, bus_node, GraphEdge { port });
        }
    }

    graph
}

/// Iterate over the bus nodes of the graph
fn bus_nodes(graph: &EnergySystemGraph) -> impl Iterator<Item = (NodeIndex, &BusID)> {
    graph
        .node_indices()
        .filter_map(|idx| match graph.node_weight(idx) {
            Some(GraphNode::Bus(id)) => Some((idx, id)),
            _ => None,
        })
}

/// Whether the node is an asset other than an excess sink
fn is_regular_asset(graph: &EnergySystemGraph, node: NodeIndex, assets: &AssetPool) -> bool {
    match graph.node_weight(node) {
        Some(GraphNode::Asset(id)) => assets.get(*id).group != AssetGroup::Excess,
        _ => false,
    }
}

/// Validates that every bus is supplied by and drains into at least one asset.
///
/// Excess sinks are not counted, as every bus has one.
pub fn validate_bus_fan_out(graph: &EnergySystemGraph, assets: &AssetPool) -> Result<()> {
    for (node_idx, bus_id) in bus_nodes(graph) {
        let has_supplier = graph
            .neighbors_directed(node_idx, petgraph::Direction::Incoming)
            .any(|node| is_regular_asset(graph, node, assets));
        ensure!(has_supplier, "{bus_id} has no asset supplying it");

        let has_consumer = graph
            .neighbors_directed(node_idx, petgraph::Direction::Outgoing)
            .any(|node| is_regular_asset(graph, node, assets));
        ensure!(has_consumer, "{bus_id} has no asset drawing from it");
    }

    Ok(())
}

/// Finds the buses from which no demand can be reached.
///
/// Energy on such a bus can only be fed in or go to waste.
pub fn buses_without_demand(graph: &EnergySystemGraph, assets: &AssetPool) -> Vec<BusID> {
    let demand_nodes: Vec<_> = graph
        .node_indices()
        .filter(|&idx| match graph.node_weight(idx) {
            Some(GraphNode::Asset(id)) => assets.get(*id).is_demand(),
            _ => false,
        })
        .collect();

    bus_nodes(graph)
        .filter(|(bus_node, _)| {
            !demand_nodes
                .iter()
                .any(|&demand| has_path_connecting(graph, *bus_node, demand, None))
        })
        .map(|(_, bus_id)| bus_id.clone())
        .collect()
}
