use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{NetError, NetResult, NetworkSnapshot, Options};

/// Node identifiers are dense, start at 1 and follow creation order, so
/// the arena slot of a node is always `id - 1`.
pub type NodeId = u64;

/// Hook fired after every successful training step. The snapshot
/// indirection keeps subscribers transport-agnostic; a visualization
/// layer owns the other end.
pub type UpdateHook = Box<dyn FnMut(&NetworkSnapshot) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Input,
    Hidden,
    Output,
}

/// An ordered group of nodes of one role. Nodes of a layer occupy a
/// contiguous range of the network's node arena.
#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) kind: LayerKind,
    pub(crate) nodes: Range<usize>,
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Arena slots of this layer's nodes.
    pub fn node_indices(&self) -> Range<usize> {
        self.nodes.clone()
    }
}

/// A computational unit. Forward and backward lists hold indices into
/// the central link arena, two views of the same edges.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) bias: f64,
    pub(crate) links: Vec<usize>,
    pub(crate) back_links: Vec<usize>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }
}

/// Directed weighted edge between two nodes in adjacent layers. Stored
/// once; `from`/`to` are arena slots.
#[derive(Debug, Clone, Copy)]
pub struct Link {
    pub(crate) from: usize,
    pub(crate) to: usize,
    pub(crate) weight: f64,
}

impl Link {
    pub fn from_id(&self) -> NodeId {
        self.from as NodeId + 1
    }

    pub fn to_id(&self) -> NodeId {
        self.to as NodeId + 1
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Result of a full forward pass: the output vector plus every node's
/// activation, indexed by arena slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub(crate) outputs: Vec<f64>,
    pub(crate) activations: Vec<f64>,
}

impl Evaluation {
    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<f64> {
        self.outputs
    }

    pub fn activations(&self) -> &[f64] {
        &self.activations
    }

    pub fn activation(&self, id: NodeId) -> Option<f64> {
        self.activations.get((id as usize).checked_sub(1)?).copied()
    }
}

/// Fully-connected multilayer feed-forward network.
///
/// The topology is fixed at construction; training mutates link weights
/// only. Evaluation is a pure read, so shared references may fan out
/// across threads while nobody trains.
pub struct Network {
    pub(crate) layers: Vec<Layer>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) options: Options,
    pub(crate) update_hook: Option<UpdateHook>,
}

impl Default for Network {
    /// A network with no layers. It refuses evaluation and describes
    /// itself as the empty string.
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            nodes: Vec::new(),
            links: Vec::new(),
            options: Options::default(),
            update_hook: None,
        }
    }
}

impl Network {
    pub fn new(options: Options) -> Self {
        Self::with_rng(options, &mut rand::thread_rng())
    }

    /// Builds the layered graph with weights drawn from `rng`, uniformly
    /// in [-0.5, 0.5). Construction always succeeds; out-of-range options
    /// are silently defaulted first.
    pub fn with_rng<R: Rng + ?Sized>(options: Options, rng: &mut R) -> Self {
        let options = options.sanitized();
        let mut nn = Self {
            layers: Vec::new(),
            nodes: Vec::new(),
            links: Vec::new(),
            update_hook: None,
            options,
        };

        let mut prev = nn.push_layer(LayerKind::Input, nn.options.inputs_count);
        for i in 0..nn.options.hidden_layer_sizes.len() {
            let size = nn.options.hidden_layer_sizes[i];
            let hidden = nn.push_layer(LayerKind::Hidden, size);
            nn.connect_fully(prev, hidden, rng);
            prev = hidden;
        }
        let output = nn.push_layer(LayerKind::Output, nn.options.outputs_count);
        nn.connect_fully(prev, output, rng);

        nn
    }

    fn push_layer(&mut self, kind: LayerKind, size: usize) -> usize {
        let start = self.nodes.len();
        for _ in 0..size {
            let id = self.nodes.len() as NodeId + 1;
            self.nodes.push(Node {
                id,
                bias: 0.,
                links: Vec::new(),
                back_links: Vec::new(),
            });
        }
        self.layers.push(Layer {
            kind,
            nodes: start..self.nodes.len(),
        });
        self.layers.len() - 1
    }

    /// One link per (earlier, later) node pair, registered in the source
    /// node's forward list and the destination node's backward list.
    fn connect_fully<R: Rng + ?Sized>(&mut self, earlier: usize, later: usize, rng: &mut R) {
        let earlier = self.layers[earlier].node_indices();
        let later = self.layers[later].node_indices();
        for to in later {
            for from in earlier.clone() {
                let index = self.links.len();
                self.links.push(Link {
                    from,
                    to,
                    weight: rng.gen_range(-0.5..0.5),
                });
                self.nodes[from].links.push(index);
                self.nodes[to].back_links.push(index);
            }
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn layer_nodes(&self, layer: &Layer) -> &[Node] {
        &self.nodes[layer.node_indices()]
    }

    /// Forward pass returning the output vector only.
    pub fn evaluate(&self, input_values: &[f64]) -> NetResult<Vec<f64>> {
        Ok(self.evaluate_full(input_values)?.into_outputs())
    }

    /// Forward pass returning the output vector and every intermediate
    /// activation. Never mutates the network; calling twice with the same
    /// inputs and unchanged weights yields bit-identical results.
    pub fn evaluate_full(&self, input_values: &[f64]) -> NetResult<Evaluation> {
        let input_layer = self.layers.first().ok_or(NetError::EmptyNetwork)?;
        if input_values.len() != input_layer.len() {
            return Err(NetError::ShapeMismatch {
                vector: "input",
                expected: input_layer.len(),
                actual: input_values.len(),
            });
        }

        let mut activations = vec![0.; self.nodes.len()];
        for (slot, value) in input_layer.node_indices().zip(input_values) {
            activations[slot] = *value;
        }

        for layer in &self.layers[1..] {
            for slot in layer.node_indices() {
                let node = &self.nodes[slot];
                let mut incoming = 0.;
                for &li in &node.back_links {
                    let link = &self.links[li];
                    incoming += activations[link.from] * link.weight + node.bias;
                }
                activations[slot] = (self.options.activation_func)(incoming);
            }
        }

        let output_layer = &self.layers[self.layers.len() - 1];
        let outputs = output_layer
            .node_indices()
            .map(|slot| activations[slot])
            .collect();

        Ok(Evaluation {
            outputs,
            activations,
        })
    }

    /// One backpropagation step against a single example. Mutates every
    /// link weight in place and returns the outputs computed before the
    /// update. A shape mismatch leaves the network untouched.
    pub fn train_step(&mut self, input_values: &[f64], target_values: &[f64]) -> NetResult<Vec<f64>> {
        let output_layer = self.layers.last().ok_or(NetError::EmptyNetwork)?;
        if target_values.len() != output_layer.len() {
            return Err(NetError::ShapeMismatch {
                vector: "target",
                expected: output_layer.len(),
                actual: target_values.len(),
            });
        }

        let evaluation = self.evaluate_full(input_values)?;
        let last = self.layers.len() - 1;

        let mut errors = vec![0.; self.nodes.len()];
        for (i, slot) in self.layers[last].node_indices().enumerate() {
            errors[slot] = target_values[i] - evaluation.activations[slot];
        }

        // Hidden layers in reverse creation order; output errors stay as
        // assigned above, input nodes carry no error.
        if last > 0 {
            for layer in self.layers[1..last].iter().rev() {
                for slot in layer.node_indices() {
                    let node = &self.nodes[slot];
                    let mut sum = 0.;
                    for &li in &node.links {
                        let link = &self.links[li];
                        sum += errors[link.to] * link.weight;
                    }
                    errors[slot] = sum;
                }
            }
        }

        let derivative = self.options.activation_func_derivative;
        let rate = self.options.learning_rate;
        for layer in &self.layers[1..] {
            for slot in layer.node_indices() {
                for &li in &self.nodes[slot].back_links {
                    let link = &mut self.links[li];
                    link.weight += rate
                        * errors[slot]
                        * derivative(evaluation.activations[slot])
                        * evaluation.activations[link.from];
                }
            }
        }

        self.fire_update_hook();
        Ok(evaluation.into_outputs())
    }

    pub fn set_update_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&NetworkSnapshot) + Send + Sync + 'static,
    {
        self.update_hook = Some(Box::new(hook));
    }

    pub fn clear_update_hook(&mut self) {
        self.update_hook = None;
    }

    fn fire_update_hook(&mut self) {
        if let Some(mut hook) = self.update_hook.take() {
            hook(&self.snapshot());
            self.update_hook = Some(hook);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::activations::sigmoid;
    use crate::calc_cost;

    fn tiny_options() -> Options {
        Options {
            inputs_count: 2,
            hidden_layer_sizes: vec![2],
            outputs_count: 1,
            learning_rate: 0.5,
            ..Options::default()
        }
    }

    fn seeded(options: Options, seed: u64) -> Network {
        Network::with_rng(options, &mut ChaCha8Rng::seed_from_u64(seed))
    }

    fn weights_of(nn: &Network) -> Vec<f64> {
        nn.links.iter().map(|link| link.weight).collect()
    }

    #[test]
    fn default_topology() {
        let nn = Network::new(Options::default());
        assert_eq!(nn.layers().len(), 4);
        assert_eq!(nn.nodes().len(), 5 + 15 + 7 + 2);
        let sizes: Vec<usize> = nn.layers().iter().map(Layer::len).collect();
        assert_eq!(sizes, vec![5, 15, 7, 2]);
        let kinds: Vec<LayerKind> = nn.layers().iter().map(Layer::kind).collect();
        assert_eq!(
            kinds,
            vec![
                LayerKind::Input,
                LayerKind::Hidden,
                LayerKind::Hidden,
                LayerKind::Output
            ]
        );
        assert_eq!(nn.links().len(), 5 * 15 + 15 * 7 + 7 * 2);
    }

    #[test]
    fn node_ids_are_dense_and_start_at_one() {
        let nn = Network::new(Options::default());
        for (slot, node) in nn.nodes().iter().enumerate() {
            assert_eq!(node.id(), slot as NodeId + 1);
        }
    }

    #[test]
    fn adjacent_layers_are_fully_connected() {
        let nn = Network::new(Options::default());
        for pair in nn.layers().windows(2) {
            let (earlier, later) = (&pair[0], &pair[1]);
            for node in nn.layer_nodes(later) {
                assert_eq!(node.back_links.len(), earlier.len());
            }
            for node in nn.layer_nodes(earlier) {
                assert_eq!(node.links.len(), later.len());
            }
        }
    }

    #[test]
    fn forward_and_backward_lists_view_the_same_edges() {
        let nn = seeded(tiny_options(), 3);
        for (index, link) in nn.links.iter().enumerate() {
            assert!(nn.nodes[link.from].links.contains(&index));
            assert!(nn.nodes[link.to].back_links.contains(&index));
        }
    }

    #[test]
    fn initial_weights_are_in_range() {
        let nn = Network::new(Options::default());
        for link in nn.links() {
            assert!(link.weight() >= -0.5 && link.weight() < 0.5);
        }
    }

    #[test]
    fn construction_is_deterministic_under_a_seeded_rng() {
        let a = seeded(Options::default(), 7);
        let b = seeded(Options::default(), 7);
        assert_eq!(weights_of(&a), weights_of(&b));
    }

    #[test]
    fn evaluate_is_deterministic() {
        let nn = seeded(Options::default(), 11);
        let input = [0.1, 0.9, 0.3, 0.5, 0.7];
        let first = nn.evaluate(&input).unwrap();
        let second = nn.evaluate(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn evaluate_rejects_mismatched_input() {
        let nn = seeded(Options::default(), 11);
        let before = weights_of(&nn);
        let err = nn.evaluate(&[1., 0., 1.]).unwrap_err();
        assert_eq!(
            err,
            NetError::ShapeMismatch {
                vector: "input",
                expected: 5,
                actual: 3
            }
        );
        assert_eq!(weights_of(&nn), before);
    }

    #[test]
    fn evaluate_on_empty_network_fails_safely() {
        let nn = Network::default();
        assert_eq!(nn.evaluate(&[]).unwrap_err(), NetError::EmptyNetwork);
    }

    #[test]
    fn hand_computed_forward_pass() {
        let mut nn = seeded(tiny_options(), 1);
        for link in nn.links.iter_mut() {
            link.weight = 0.1;
        }

        let output = nn.evaluate(&[1., 0.]).unwrap();

        // Both hidden nodes see 1 * 0.1 + 0 * 0.1; the output node sums
        // them through weight 0.1 again.
        let hidden = sigmoid(0.1);
        let expected = sigmoid(hidden * 0.1 + hidden * 0.1);
        assert_eq!(output.len(), 1);
        assert_abs_diff_eq!(output[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn train_step_rejects_mismatched_target_without_mutation() {
        let mut nn = seeded(tiny_options(), 5);
        let before = weights_of(&nn);
        let err = nn.train_step(&[1., 0.], &[1., 0.]).unwrap_err();
        assert_eq!(
            err,
            NetError::ShapeMismatch {
                vector: "target",
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(weights_of(&nn), before);
    }

    #[test]
    fn train_step_rejects_mismatched_input_without_mutation() {
        let mut nn = seeded(tiny_options(), 5);
        let before = weights_of(&nn);
        let err = nn.train_step(&[1.], &[1.]).unwrap_err();
        assert_eq!(
            err,
            NetError::ShapeMismatch {
                vector: "input",
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(weights_of(&nn), before);
    }

    #[test]
    fn repeated_training_reduces_error() {
        let mut nn = seeded(tiny_options(), 42);
        let input = [1., 0.];
        let target = [1.];

        let first = nn.train_step(&input, &target).unwrap();
        let initial_cost = calc_cost(&first, &target);
        for _ in 0..999 {
            nn.train_step(&input, &target).unwrap();
        }
        let trained = nn.evaluate(&input).unwrap();
        let final_cost = calc_cost(&trained, &target);

        assert!(
            final_cost < initial_cost,
            "cost did not shrink: {} -> {}",
            initial_cost,
            final_cost
        );
        assert!(final_cost < 0.01, "cost still {} after 1000 steps", final_cost);
    }

    #[test]
    fn weights_stay_finite_through_training() {
        let mut nn = seeded(tiny_options(), 9);
        for _ in 0..1000 {
            nn.train_step(&[0.2, 0.8], &[0.5]).unwrap();
        }
        assert!(nn.links().iter().all(|link| link.weight().is_finite()));
    }

    #[test]
    fn update_hook_fires_once_per_step() {
        let mut nn = seeded(tiny_options(), 2);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        nn.set_update_hook(move |snapshot| {
            assert_eq!(snapshot.layers.len(), 3);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        nn.train_step(&[1., 0.], &[1.]).unwrap();
        nn.train_step(&[1., 0.], &[1.]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Failed steps and cleared hooks stay silent.
        nn.train_step(&[1.], &[1.]).unwrap_err();
        nn.clear_update_hook();
        nn.train_step(&[1., 0.], &[1.]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn custom_activation_pair_is_used() {
        let options = Options {
            inputs_count: 1,
            hidden_layer_sizes: vec![1],
            outputs_count: 1,
            activation_func: crate::activations::identity,
            activation_func_derivative: |_| 1.,
            ..Options::default()
        };
        let mut nn = seeded(options, 0);
        for link in nn.links.iter_mut() {
            link.weight = 0.5;
        }
        let output = nn.evaluate(&[2.]).unwrap();
        assert_abs_diff_eq!(output[0], 2. * 0.5 * 0.5, epsilon = 1e-12);
    }
}
