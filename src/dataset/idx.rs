use std::{fs, path::Path};

use thiserror::Error;

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

/// Dataset I/O failures. These belong to the edge of a program; the
/// network core never produces them.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad magic number {found:#010x}, expected {expected:#010x}")]
    BadMagic { expected: u32, found: u32 },
    #[error("file is truncated: needs {expected} bytes, has {found}")]
    Truncated { expected: usize, found: usize },
    #[error("counts of labels and images are not equal: {images} images, {labels} labels")]
    CountMismatch { images: usize, labels: usize },
}

fn read_be_u32(bytes: &[u8], offset: usize) -> Result<u32, DatasetError> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or(DatasetError::Truncated {
            expected: offset + 4,
            found: bytes.len(),
        })?;
    Ok(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// IDX image file (magic 0x803): big-endian header of count, rows and
/// columns, then one byte per pixel, row-major, image after image.
pub struct IdxImages {
    count: usize,
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl IdxImages {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        Self::parse(&fs::read(path)?)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, DatasetError> {
        let magic = read_be_u32(bytes, 0)?;
        if magic != IMAGES_MAGIC {
            return Err(DatasetError::BadMagic {
                expected: IMAGES_MAGIC,
                found: magic,
            });
        }
        let count = read_be_u32(bytes, 4)? as usize;
        let rows = read_be_u32(bytes, 8)? as usize;
        let cols = read_be_u32(bytes, 12)? as usize;
        let payload = count * rows * cols;
        let data = bytes
            .get(16..16 + payload)
            .ok_or(DatasetError::Truncated {
                expected: 16 + payload,
                found: bytes.len(),
            })?
            .to_vec();
        Ok(Self {
            count,
            rows,
            cols,
            data,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn image_size(&self) -> usize {
        self.rows * self.cols
    }

    /// Raw pixel bytes of one image.
    pub fn image_at(&self, index: usize) -> Option<&[u8]> {
        if index >= self.count {
            return None;
        }
        let size = self.image_size();
        self.data.get(index * size..(index + 1) * size)
    }
}

/// IDX label file (magic 0x801): a count header followed by one class
/// byte per example.
pub struct IdxLabels {
    count: usize,
    data: Vec<u8>,
}

impl IdxLabels {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        Self::parse(&fs::read(path)?)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, DatasetError> {
        let magic = read_be_u32(bytes, 0)?;
        if magic != LABELS_MAGIC {
            return Err(DatasetError::BadMagic {
                expected: LABELS_MAGIC,
                found: magic,
            });
        }
        let count = read_be_u32(bytes, 4)? as usize;
        let data = bytes
            .get(8..8 + count)
            .ok_or(DatasetError::Truncated {
                expected: 8 + count,
                found: bytes.len(),
            })?
            .to_vec();
        Ok(Self { count, data })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn label_at(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }
}
