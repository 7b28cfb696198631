use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use rayon::prelude::*;

use graphnet::dataset::MnistDataset;
use graphnet::{
    is_prediction_ok, print_vector, Network, NetworkSnapshot, Options, TopologyConfig, TrainPair,
    Trainer,
};

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "error:".red().bold(), err);
    std::process::exit(1);
}

fn read_model(path: &Path) -> Network {
    let json = fs::read_to_string(path).unwrap_or_else(|err| fail(err));
    let snapshot: NetworkSnapshot = serde_json::from_str(&json).unwrap_or_else(|err| fail(err));
    Network::from_snapshot(&snapshot).unwrap_or_else(|err| fail(err))
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct TrainMnist {
    #[clap(short, long)]
    dataset_dir: PathBuf,
    /// YAML topology config; defaults to 784-[16,16]-10 at rate 0.05.
    #[clap(short, long)]
    config: Option<PathBuf>,
    model_path: PathBuf,
}

impl TrainMnist {
    fn exec(self) {
        let options = match self.config {
            Some(path) => {
                let text = fs::read_to_string(&path).unwrap_or_else(|err| fail(err));
                let config: TopologyConfig =
                    serde_yaml::from_str(&text).unwrap_or_else(|err| fail(err));
                config.into_options()
            }
            None => Options {
                inputs_count: 784,
                hidden_layer_sizes: vec![16, 16],
                outputs_count: 10,
                learning_rate: 0.05,
                ..Options::default()
            },
        };

        let dataset = MnistDataset::load_train(&self.dataset_dir).unwrap_or_else(|err| fail(err));
        if dataset.input_size() != options.inputs_count {
            fail(format!(
                "network expects {} inputs, dataset images have {} pixels",
                options.inputs_count,
                dataset.input_size()
            ));
        }
        let set: Vec<TrainPair> = dataset.train_pairs().collect();

        let mut nn = Network::new(options);
        let trainer = Trainer {
            epochs: 10000,
            batch_size: 100,
            stop_cost: 1.,
            stop_ok_coef: 0.9,
        };
        trainer.train_rand(&mut nn, &set).unwrap_or_else(|err| fail(err));

        let json = serde_json::to_string_pretty(&nn.snapshot()).unwrap_or_else(|err| fail(err));
        fs::write(&self.model_path, json).unwrap_or_else(|err| fail(err));
        println!("model saved to {}", self.model_path.display());
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Test {
    #[clap(short, long)]
    dataset_dir: PathBuf,
    model_path: PathBuf,
}

impl Test {
    fn exec(self) {
        let nn = read_model(&self.model_path);
        let dataset = MnistDataset::load_check(&self.dataset_dir).unwrap_or_else(|err| fail(err));
        let set: Vec<TrainPair> = dataset.train_pairs().collect();
        if set.is_empty() {
            fail("check set is empty");
        }

        // Evaluation never mutates the network, so the sweep can fan out.
        let success = set
            .par_iter()
            .filter(|pair| match nn.evaluate(&pair.input) {
                Ok(output) => is_prediction_ok(&output, &pair.target),
                Err(err) => fail(err),
            })
            .count();

        println!("success rate {:.6}", success as f64 / set.len() as f64);
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Describe {
    model_path: PathBuf,
}

impl Describe {
    fn exec(self) {
        let nn = read_model(&self.model_path);
        print!("{}", nn.describe());
        println!(
            "layers: {}, nodes: {}, links: {}",
            nn.layers().len(),
            nn.nodes().len(),
            nn.links().len()
        );
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Demo {}

impl Demo {
    fn exec(self) {
        let nn = Network::new(Options::default());
        let output = nn
            .evaluate(&[1., 1., 1., 1., 1.])
            .unwrap_or_else(|err| fail(err));
        print_vector("output: ", &output);
        print!("{}", nn.describe());
    }
}

#[derive(Parser)]
enum SubCommand {
    TrainMnist(TrainMnist),
    Test(Test),
    Describe(Describe),
    Demo(Demo),
}

fn main() {
    match SubCommand::parse() {
        SubCommand::TrainMnist(train) => train.exec(),
        SubCommand::Test(test) => test.exec(),
        SubCommand::Describe(describe) => describe.exec(),
        SubCommand::Demo(demo) => demo.exec(),
    }
}
