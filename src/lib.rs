mod error;
mod network;
mod options;
mod snapshot;
mod trainer;

pub mod dataset;

pub use {error::*, network::*, options::*, snapshot::*, trainer::*};

pub mod activations {
    //! Pluggable scalar activation functions, paired with derivatives
    //! that take the already-activated value.

    use std::f64::consts::E;

    pub fn sigmoid(x: f64) -> f64 {
        1. / (1. + E.powf(-x))
    }

    /// `y` is the sigmoid output, per the `y * (1 - y)` convention.
    pub fn sigmoid_derivative(y: f64) -> f64 {
        y * (1. - y)
    }

    pub fn identity(x: f64) -> f64 {
        x
    }
}

/// Summed squared error between a prediction and its target.
pub fn calc_cost(present: &[f64], expected: &[f64]) -> f64 {
    present
        .iter()
        .zip(expected.iter())
        .map(|(p, e)| (p - e).powi(2))
        .sum()
}

/// A prediction counts as a hit when its strongest output lines up with
/// the target's.
pub fn is_prediction_ok(present: &[f64], expected: &[f64]) -> bool {
    fn max_index(values: &[f64]) -> usize {
        let mut result: (f64, usize) = (f64::MIN, 0);
        for (i, value) in values.iter().enumerate() {
            if result.0 < *value {
                result = (*value, i);
            }
        }
        result.1
    }

    !present.is_empty() && !expected.is_empty() && max_index(present) == max_index(expected)
}

/// Prints a vector with each value shaded red-to-green by magnitude,
/// assuming values in [0, 1].
pub fn print_vector(comment: &str, values: &[f64]) {
    use colored::Colorize;

    print!("{}", comment);
    for num in values {
        let g = (num * 255.) as u8;
        let r = ((1. - num) * 255.) as u8;
        let sign = if !(*num < 0.) { "+" } else { "" };
        print!("{}, ", format!("{}{:.5}", sign, num).truecolor(r, g, 0));
    }
    println!();
}
