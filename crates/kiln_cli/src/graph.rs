//! `kiln graph`: print the static asset dependency graph.

use std::collections::HashMap;

use kiln_asset::{AssetId, Registry};
use petgraph::algo::toposort;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

/// Runs the `kiln graph` command.
pub fn run() -> Result<i32, Box<dyn std::error::Error>> {
    let graph = build(&kiln_assets::registry()?);
    if let Err(cycle) = toposort(&graph, None) {
        return Err(format!("asset graph has a cycle through '{}'", graph[cycle.node_id()]).into());
    }
    println!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]));
    Ok(0)
}

/// Builds a graph with one node per registered asset and an unlabeled edge
/// from each asset to each of its dependencies.
fn build(registry: &Registry) -> DiGraph<AssetId, &'static str> {
    let mut graph = DiGraph::new();
    let nodes: HashMap<AssetId, NodeIndex> = registry
        .ids()
        .into_iter()
        .map(|id| (id, graph.add_node(id)))
        .collect();
    for (from, to) in registry.dependency_edges() {
        if let (Some(&a), Some(&b)) = (nodes.get(&from), nodes.get(&to)) {
            graph.add_edge(a, b, "");
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use kiln_asset::Asset;
    use kiln_assets::{InstallConfigAsset, Manifests};

    use super::*;

    #[test]
    fn graph_has_every_asset_and_edge() {
        let registry = kiln_assets::registry().unwrap();
        let graph = build(&registry);
        assert_eq!(graph.node_count(), registry.ids().len());
        assert_eq!(graph.edge_count(), registry.dependency_edges().len());
    }

    #[test]
    fn graph_is_acyclic_with_install_config_last() {
        let graph = build(&kiln_assets::registry().unwrap());
        let order = toposort(&graph, None).unwrap();
        let position = |id: AssetId| order.iter().position(|&n| graph[n] == id).unwrap();
        assert!(position(Manifests::ID) < position(InstallConfigAsset::ID));
    }

    #[test]
    fn dot_output_names_assets() {
        let graph = build(&kiln_assets::registry().unwrap());
        let dot = format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]));
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("label = \"install-config\""));
        assert!(dot.contains("label = \"target-cluster\""));
    }
}
