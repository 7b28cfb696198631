use serde::{Deserialize, Serialize};

use crate::activations;

/// Scalar activation function. The derivative variant receives the
/// already-activated value, not the raw weighted sum.
pub type ActivationFn = fn(f64) -> f64;

/// Construction options for a [`crate::Network`].
///
/// Zero or out-of-range values are silently replaced by the documented
/// defaults when the builder runs, so `Options { inputs_count: 784,
/// ..Default::default() }` is enough to customize a single knob.
/// Substituting `activation_func` without its matching derivative is a
/// caller error.
#[derive(Debug, Clone)]
pub struct Options {
    pub inputs_count: usize,
    pub outputs_count: usize,
    pub hidden_layer_sizes: Vec<usize>,
    pub activation_func: ActivationFn,
    pub activation_func_derivative: ActivationFn,
    pub learning_rate: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            inputs_count: 5,
            outputs_count: 2,
            hidden_layer_sizes: vec![15, 7],
            activation_func: activations::sigmoid,
            activation_func_derivative: activations::sigmoid_derivative,
            learning_rate: 0.5,
        }
    }
}

impl Options {
    /// Applies the defaulting rules: zero counts fall back to 5 inputs and
    /// 2 outputs, zero-size hidden layers are dropped (an emptied list
    /// becomes [15, 7]), and a learning rate outside (0, 1] resets to 0.5.
    pub fn sanitized(mut self) -> Self {
        if self.inputs_count == 0 {
            self.inputs_count = 5;
        }
        if self.outputs_count == 0 {
            self.outputs_count = 2;
        }
        self.hidden_layer_sizes.retain(|size| *size > 0);
        if self.hidden_layer_sizes.is_empty() {
            self.hidden_layer_sizes = vec![15, 7];
        }
        if !(self.learning_rate > 0. && self.learning_rate <= 1.) {
            self.learning_rate = 0.5;
        }
        self
    }
}

/// Topology subset of [`Options`] loadable from a YAML file. Activation
/// functions are code, not data, so a config always gets the sigmoid pair.
#[derive(Debug, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub inputs_count: usize,
    #[serde(default)]
    pub outputs_count: usize,
    #[serde(default)]
    pub hidden_layer_sizes: Vec<usize>,
    #[serde(default)]
    pub learning_rate: f64,
}

impl TopologyConfig {
    pub fn into_options(self) -> Options {
        Options {
            inputs_count: self.inputs_count,
            outputs_count: self.outputs_count,
            hidden_layer_sizes: self.hidden_layer_sizes,
            learning_rate: self.learning_rate,
            ..Options::default()
        }
        .sanitized()
    }
}
