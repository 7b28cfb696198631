use std::path::Path;

use crate::TrainPair;

use super::{Dataset, DatasetError, IdxImages, IdxLabels};

pub const MNIST_CLASSES: usize = 10;

/// MNIST-style image/label pairing. Pixels normalize to [0, 1] inputs,
/// labels become one-hot target vectors of width [`MNIST_CLASSES`].
pub struct MnistDataset {
    images: IdxImages,
    labels: IdxLabels,
}

impl MnistDataset {
    pub fn load(
        dir: impl AsRef<Path>,
        images_file: &str,
        labels_file: &str,
    ) -> Result<Self, DatasetError> {
        let dir = dir.as_ref();
        Self::from_parts(
            IdxImages::read(dir.join(images_file))?,
            IdxLabels::read(dir.join(labels_file))?,
        )
    }

    /// The conventional training split file names.
    pub fn load_train(dir: impl AsRef<Path>) -> Result<Self, DatasetError> {
        Self::load(dir, "train-images.idx3-ubyte", "train-labels.idx1-ubyte")
    }

    /// The conventional check split file names.
    pub fn load_check(dir: impl AsRef<Path>) -> Result<Self, DatasetError> {
        Self::load(dir, "t10k-images.idx3-ubyte", "t10k-labels.idx1-ubyte")
    }

    pub fn from_parts(images: IdxImages, labels: IdxLabels) -> Result<Self, DatasetError> {
        if images.count() != labels.count() {
            return Err(DatasetError::CountMismatch {
                images: images.count(),
                labels: labels.count(),
            });
        }
        Ok(Self { images, labels })
    }

    pub fn count(&self) -> usize {
        self.images.count()
    }

    /// Inputs per example, i.e. the pixel count of one image.
    pub fn input_size(&self) -> usize {
        self.images.image_size()
    }

    pub fn pair_at(&self, index: usize) -> Option<TrainPair> {
        let image = self.images.image_at(index)?;
        let label = self.labels.label_at(index)?;

        let input = image.iter().map(|b| *b as f64 / 255.).collect();
        let mut target = vec![0.; MNIST_CLASSES];
        if let Some(slot) = target.get_mut(label as usize) {
            *slot = 1.;
        }
        Some(TrainPair::new(input, target))
    }

    pub fn train_pairs(&self) -> impl Iterator<Item = TrainPair> + '_ {
        (0..self.count()).filter_map(|index| self.pair_at(index))
    }
}

impl Dataset for MnistDataset {
    fn training_data(self) -> Box<dyn Iterator<Item = TrainPair>> {
        let count = self.count();
        Box::new((0..count).filter_map(move |index| self.pair_at(index)))
    }

    fn class_name(&self, num: usize) -> Option<String> {
        if num < MNIST_CLASSES {
            Some(format!("{}", num))
        } else {
            None
        }
    }
}
