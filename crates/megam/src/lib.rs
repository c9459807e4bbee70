//! Interface to the megam maximum-entropy optimizer.
//!
//! [megam](http://www.cs.utah.edu/~hal/megam/) is an external program; this
//! crate finds it, writes training data in its input format, runs it, and
//! reads the learned weights back.
//!
//! # Overview
//!
//! - **Locating**: [`locate`] resolves the binary from an explicit path, the
//!   `MEGAM`/`MEGAMHOME` environment variables, or `PATH`
//! - **Writing**: [`write_megam`] serializes labeled instances in one of four
//!   variants (bernoulli or not, explicit or not)
//! - **Running**: [`Megam::call`] runs the binary and captures stdout
//! - **Parsing**: [`parse_megam_weights`] turns stdout into a weight vector
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use megam::{Megam, MegamConfig, TableEncoding, TrainOptions};
//!
//! let megam = Megam::new(MegamConfig::default());
//! let encoding = TableEncoding::from_records(&records, None, None)?;
//! let data: Vec<_> = records.into_iter().map(|r| (r.instance, r.label)).collect();
//!
//! let weights = megam.train(&data, &encoding, &TrainOptions::default())?;
//! println!("learned {} weights", weights.len());
//! ```
//!
//! # Lower-level use
//!
//! ```rust,ignore
//! use megam::{Megam, WriteOptions, parse_megam_weights, write_megam_file};
//!
//! write_megam_file(&data, &encoding, "train.txt".as_ref(), &WriteOptions::default())?;
//! let stdout = Megam::default().call(&["-nobias", "-explicit", "multiclass", "train.txt"])?;
//! let weights = parse_megam_weights(&stdout, encoding.length(), true)?;
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod invoker;
pub mod locator;
pub mod train;
pub mod weights;
pub mod writer;

// Re-export main types for convenience
pub use config::{
    DEFAULT_BINARY_NAMES, DEFAULT_ENV_VARS, MEGAM_URL, MegamConfig, MegamConfigBuilder,
};
pub use encoding::{FeatureEncoding, FeatureVector, TableEncoding, TableInstance, TrainingRecord};
pub use error::{MegamError, Result};
pub use invoker::Megam;
pub use locator::{locate, locate_with};
pub use train::{TrainOptions, TrainOptionsBuilder};
pub use weights::parse_megam_weights;
pub use writer::{LabelMode, Sink, WriteOptions, write_megam, write_megam_file, write_megam_string};
