use crate::TrainPair;

mod idx;
mod mnist;

pub use {idx::*, mnist::*};

pub trait Dataset {
    fn training_data(self) -> Box<dyn Iterator<Item = TrainPair>>
    where
        Self: Sized;

    fn class_name(&self, num: usize) -> Option<String>;
}
