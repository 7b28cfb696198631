use serde::{Deserialize, Serialize};

use crate::{Layer, LayerKind, Link, NetError, NetResult, Network, Node, NodeId, Options};

/// Plain nested view of a network's structure and weights. Re-derivable
/// at any time without touching the network; this is also the only
/// persistence format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub options: OptionsSnapshot,
    pub layers: Vec<LayerSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsSnapshot {
    pub inputs_count: usize,
    pub outputs_count: usize,
    pub hidden_layer_sizes: Vec<usize>,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub kind: LayerKind,
    pub nodes: Vec<NodeSnapshot>,
}

/// A node with its forward links only; backward links are the next
/// layer's view of the same edges and would duplicate every weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub bias: f64,
    pub links: Vec<LinkSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
}

impl Network {
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            options: OptionsSnapshot {
                inputs_count: self.options.inputs_count,
                outputs_count: self.options.outputs_count,
                hidden_layer_sizes: self.options.hidden_layer_sizes.clone(),
                learning_rate: self.options.learning_rate,
            },
            layers: self
                .layers
                .iter()
                .map(|layer| LayerSnapshot {
                    kind: layer.kind(),
                    nodes: self
                        .layer_nodes(layer)
                        .iter()
                        .map(|node| NodeSnapshot {
                            id: node.id(),
                            bias: node.bias(),
                            links: node
                                .links
                                .iter()
                                .map(|&li| {
                                    let link = &self.links[li];
                                    LinkSnapshot {
                                        from: link.from_id(),
                                        to: link.to_id(),
                                        weight: link.weight(),
                                    }
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Rebuilds a network from a snapshot, restoring topology, biases and
    /// weights. Activation functions are code, not data, so the restored
    /// network always carries the sigmoid pair; swap via options if the
    /// snapshot was trained with something else.
    pub fn from_snapshot(snapshot: &NetworkSnapshot) -> NetResult<Network> {
        let options = Options {
            inputs_count: snapshot.options.inputs_count,
            outputs_count: snapshot.options.outputs_count,
            hidden_layer_sizes: snapshot.options.hidden_layer_sizes.clone(),
            learning_rate: snapshot.options.learning_rate,
            ..Options::default()
        }
        .sanitized();

        let mut nn = Network {
            options,
            ..Network::default()
        };

        for layer_snap in &snapshot.layers {
            let start = nn.nodes.len();
            for node_snap in &layer_snap.nodes {
                if node_snap.id != nn.nodes.len() as NodeId + 1 {
                    return Err(NetError::MalformedSnapshot(format!(
                        "node id {} breaks the dense creation order",
                        node_snap.id
                    )));
                }
                if !node_snap.bias.is_finite() {
                    return Err(NetError::MalformedSnapshot(format!(
                        "node {} has a non-finite bias",
                        node_snap.id
                    )));
                }
                nn.nodes.push(Node {
                    id: node_snap.id,
                    bias: node_snap.bias,
                    links: Vec::new(),
                    back_links: Vec::new(),
                });
            }
            nn.layers.push(Layer {
                kind: layer_snap.kind,
                nodes: start..nn.nodes.len(),
            });
        }

        if !nn.layers.is_empty() {
            let mut expected = vec![(LayerKind::Input, nn.options.inputs_count)];
            for &size in &nn.options.hidden_layer_sizes {
                expected.push((LayerKind::Hidden, size));
            }
            expected.push((LayerKind::Output, nn.options.outputs_count));
            let actual: Vec<(LayerKind, usize)> = nn
                .layers
                .iter()
                .map(|layer| (layer.kind(), layer.len()))
                .collect();
            if actual != expected {
                return Err(NetError::MalformedSnapshot(
                    "layer structure does not match the recorded options".into(),
                ));
            }
        }

        // Second pass: rebuild the shared edge arena from the per-node
        // forward lists.
        for (layer_index, layer_snap) in snapshot.layers.iter().enumerate() {
            let next = nn.layers.get(layer_index + 1).map(Layer::node_indices);
            for node_snap in &layer_snap.nodes {
                for link_snap in &node_snap.links {
                    if link_snap.from != node_snap.id {
                        return Err(NetError::MalformedSnapshot(format!(
                            "node {} lists a forward link owned by node {}",
                            node_snap.id, link_snap.from
                        )));
                    }
                    if !link_snap.weight.is_finite() {
                        return Err(NetError::MalformedSnapshot(format!(
                            "link {} -> {} has a non-finite weight",
                            link_snap.from, link_snap.to
                        )));
                    }
                    let to_slot = match (link_snap.to as usize).checked_sub(1) {
                        Some(slot) if next.as_ref().map_or(false, |range| range.contains(&slot)) => slot,
                        _ => {
                            return Err(NetError::MalformedSnapshot(format!(
                                "link {} -> {} does not target the next layer",
                                link_snap.from, link_snap.to
                            )))
                        }
                    };
                    let from_slot = node_snap.id as usize - 1;
                    let index = nn.links.len();
                    nn.links.push(Link {
                        from: from_slot,
                        to: to_slot,
                        weight: link_snap.weight,
                    });
                    nn.nodes[from_slot].links.push(index);
                    nn.nodes[to_slot].back_links.push(index);
                }
            }
        }

        Ok(nn)
    }

    /// Renders layer roles, node brackets and the middle node's forward
    /// weights per layer. Diagnostic only; an empty network yields an
    /// empty string.
    pub fn describe(&self) -> String {
        let mut result = String::new();
        for (index, layer) in self.layers.iter().enumerate() {
            match layer.kind() {
                LayerKind::Input => result.push_str("input   \t{"),
                LayerKind::Hidden => result.push_str(&format!("middle {}\t{{", index)),
                LayerKind::Output => result.push_str("output  \t{"),
            }
            for node_index in 0..layer.len() {
                result.push_str(&format!("[{}]", node_index));
            }
            result.push_str("}\n");

            let nodes = self.layer_nodes(layer);
            if let Some(node) = nodes.get(nodes.len() / 2) {
                for &li in &node.links {
                    result.push_str(&format!("({:.6})", self.links[li].weight()));
                }
            }
            result.push('\n');
        }
        result
    }
}
