//! End-to-end training through megam.
//!
//! [`Megam::train`] writes the training data to a temporary file, runs megam
//! in `multiclass` mode on it and parses the learned weights. Training always
//! uses the explicit format, since only explicit weight output can be parsed.

use std::ffi::OsString;
use std::path::Path;
use tracing::info;

use crate::encoding::FeatureEncoding;
use crate::error::{MegamError, Result};
use crate::invoker::Megam;
use crate::weights::parse_megam_weights;
use crate::writer::{LabelMode, WriteOptions, write_megam_file};

/// Options for a megam training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    /// Use the bernoulli feature format. When false, `-fvals` is passed.
    /// Default: true
    pub bernoulli: bool,

    /// Label field format written to the training file.
    /// Default: LabelMode::Index
    pub label_mode: LabelMode,

    /// Number of times megam repeats optimization (`-repeat`).
    /// Default: 10
    pub repeat: u32,

    /// Gaussian prior precision (`-lambda`).
    /// Default: None (megam's own default)
    pub lambda: Option<f64>,

    /// Maximum number of iterations (`-maxi`).
    /// Default: None
    pub max_iterations: Option<u32>,

    /// Tune lambda on held-out data (`-tune`).
    /// Default: false
    pub tune: bool,

    /// Extra arguments inserted before the model type.
    /// Default: empty
    pub extra_args: Vec<String>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            bernoulli: true,
            label_mode: LabelMode::Index,
            repeat: 10,
            lambda: None,
            max_iterations: None,
            tune: false,
            extra_args: Vec::new(),
        }
    }
}

impl TrainOptions {
    /// Create a new builder.
    pub fn builder() -> TrainOptionsBuilder {
        TrainOptionsBuilder::default()
    }

    /// Validate the options and return an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.repeat == 0 {
            return Err(MegamError::InvalidConfig(
                "repeat must be at least 1".to_string(),
            ));
        }
        if let Some(lambda) = self.lambda {
            if !lambda.is_finite() || lambda < 0.0 {
                return Err(MegamError::InvalidConfig(format!(
                    "lambda must be a finite, non-negative number (got {lambda})"
                )));
            }
        }
        if self.max_iterations == Some(0) {
            return Err(MegamError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The serializer options implied by these training options.
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            bernoulli: self.bernoulli,
            explicit: true,
            label_mode: self.label_mode,
        }
    }

    /// Build the megam argument list for training on `data_file`.
    pub fn to_args(&self, data_file: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-nobias".into(),
            "-repeat".into(),
            self.repeat.to_string().into(),
            "-explicit".into(),
        ];
        if !self.bernoulli {
            args.push("-fvals".into());
        }
        if let Some(lambda) = self.lambda {
            args.push("-lambda".into());
            args.push(lambda.to_string().into());
        }
        if let Some(maxi) = self.max_iterations {
            args.push("-maxi".into());
            args.push(maxi.to_string().into());
        }
        if self.tune {
            args.push("-tune".into());
        }
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push("multiclass".into());
        args.push(data_file.as_os_str().to_owned());
        args
    }
}

/// Builder for [`TrainOptions`].
#[derive(Debug, Default)]
pub struct TrainOptionsBuilder {
    options: TrainOptions,
}

impl TrainOptionsBuilder {
    /// Use the bernoulli (binary) feature format.
    pub fn bernoulli(mut self, bernoulli: bool) -> Self {
        self.options.bernoulli = bernoulli;
        self
    }

    /// Set the label field format.
    pub fn label_mode(mut self, mode: LabelMode) -> Self {
        self.options.label_mode = mode;
        self
    }

    /// Set the number of optimization repeats.
    pub fn repeat(mut self, repeat: u32) -> Self {
        self.options.repeat = repeat;
        self
    }

    /// Set the Gaussian prior precision.
    pub fn lambda(mut self, lambda: f64) -> Self {
        self.options.lambda = Some(lambda);
        self
    }

    /// Cap the number of iterations.
    pub fn max_iterations(mut self, maxi: u32) -> Self {
        self.options.max_iterations = Some(maxi);
        self
    }

    /// Enable lambda tuning.
    pub fn tune(mut self, tune: bool) -> Self {
        self.options.tune = tune;
        self
    }

    /// Append an extra megam argument.
    pub fn extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.options.extra_args.push(arg.into());
        self
    }

    /// Build the options, validating all settings.
    pub fn build(self) -> Result<TrainOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

impl Megam {
    /// Train weights for `encoding` on `train_toks`.
    ///
    /// Returns a vector of `encoding.length()` weights.
    pub fn train<E>(
        &self,
        train_toks: &[(E::FeatureSet, E::Label)],
        encoding: &E,
        options: &TrainOptions,
    ) -> Result<Vec<f64>>
    where
        E: FeatureEncoding,
    {
        options.validate()?;

        let data_file = tempfile::Builder::new()
            .prefix("megam-")
            .suffix(".txt")
            .tempfile()?;
        write_megam_file(train_toks, encoding, data_file.path(), &options.write_options())?;

        info!(
            "Training megam on {} instances ({} labels, {} features)",
            train_toks.len(),
            encoding.labels().len(),
            encoding.length()
        );

        let stdout = self.call(&options.to_args(data_file.path()))?;
        parse_megam_weights(&stdout, encoding.length(), true)
    }
}
