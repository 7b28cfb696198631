use std::time::{Duration, Instant};

use colored::Colorize;
use rand::Rng;

use crate::{calc_cost, is_prediction_ok, NetResult, Network};

/// One training example: an input vector and the expected output vector.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainPair {
    pub input: Vec<f64>,
    pub target: Vec<f64>,
}

impl TrainPair {
    pub fn new(input: Vec<f64>, target: Vec<f64>) -> Self {
        Self { input, target }
    }

    /// Runs one backpropagation step and reports the pre-update cost,
    /// whether the prediction already hit, and the step duration.
    pub fn train(&self, nn: &mut Network) -> NetResult<(f64, bool, Duration)> {
        let instant = Instant::now();
        let predicted = nn.train_step(&self.input, &self.target)?;
        Ok((
            calc_cost(&predicted, &self.target),
            is_prediction_ok(&predicted, &self.target),
            instant.elapsed(),
        ))
    }
}

/// Epoch/batch driver over a training set, sampling examples at random.
/// Stops early once the summed batch cost drops under `stop_cost` or the
/// hit ratio reaches `stop_ok_coef`.
pub struct Trainer {
    pub epochs: usize,
    pub batch_size: usize,
    pub stop_cost: f64,
    pub stop_ok_coef: f64,
}

impl Default for Trainer {
    fn default() -> Self {
        Self {
            epochs: 10000,
            batch_size: 100,
            stop_cost: 1.,
            stop_ok_coef: 0.9,
        }
    }
}

impl Trainer {
    pub fn train_rand(&self, nn: &mut Network, set: &[TrainPair]) -> NetResult<()> {
        if set.is_empty() {
            return Ok(());
        }
        let batch_size = self.batch_size.max(1);
        let mut rng = rand::thread_rng();

        println!("training started");

        for epoch in 0..self.epochs {
            let mut cost_sum = 0.;
            let mut ok_count = 0usize;
            let mut duration_sum: Duration = Default::default();
            let instant = Instant::now();
            for _ in 0..batch_size {
                let (cost, ok, duration) = set[rng.gen_range(0..set.len())].train(nn)?;
                cost_sum += cost;
                if ok {
                    ok_count += 1;
                }
                duration_sum += duration;
            }
            let avr_duration = duration_sum / (batch_size as u32);

            if cost_sum < self.stop_cost {
                break;
            }
            if ok_count as f64 >= self.stop_ok_coef * batch_size as f64 {
                break;
            }

            let ok_text = if ok_count * 2 >= batch_size {
                ok_count.to_string().green()
            } else {
                ok_count.to_string().red()
            };
            println!(
                "epoch[{}] ok: {}, cost: {} (epoch time: {} ms, one train time: {} ms)",
                epoch,
                ok_text,
                cost_sum,
                instant.elapsed().as_millis(),
                avr_duration.as_millis()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::Options;

    fn tiny_network() -> Network {
        let options = Options {
            inputs_count: 2,
            hidden_layer_sizes: vec![3],
            outputs_count: 2,
            learning_rate: 0.5,
            ..Options::default()
        };
        Network::with_rng(options, &mut ChaCha8Rng::seed_from_u64(17))
    }

    #[test]
    fn pair_train_reports_cost_and_hit() {
        let mut nn = tiny_network();
        let pair = TrainPair::new(vec![1., 0.], vec![1., 0.]);
        let (cost, _, _) = pair.train(&mut nn).unwrap();
        assert!(cost > 0. && cost.is_finite());
    }

    #[test]
    fn trainer_learns_a_constant_mapping() {
        let mut nn = tiny_network();
        let set = vec![
            TrainPair::new(vec![1., 0.], vec![1., 0.]),
            TrainPair::new(vec![0., 1.], vec![0., 1.]),
        ];
        let trainer = Trainer {
            epochs: 500,
            batch_size: 10,
            stop_cost: 0.05,
            // Hit ratio alone must not stop this run.
            stop_ok_coef: 2.,
        };
        trainer.train_rand(&mut nn, &set).unwrap();

        let out = nn.evaluate(&[1., 0.]).unwrap();
        assert!(is_prediction_ok(&out, &[1., 0.]));
    }

    #[test]
    fn trainer_ignores_an_empty_set() {
        let mut nn = tiny_network();
        let before: Vec<f64> = nn.links().iter().map(|l| l.weight()).collect();
        Trainer::default().train_rand(&mut nn, &[]).unwrap();
        let after: Vec<f64> = nn.links().iter().map(|l| l.weight()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn trainer_propagates_shape_errors() {
        let mut nn = tiny_network();
        let set = vec![TrainPair::new(vec![1.], vec![1., 0.])];
        assert!(Trainer::default().train_rand(&mut nn, &set).is_err());
    }
}
