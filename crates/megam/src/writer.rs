//! Writing megam training files.
//!
//! Each training pair becomes one line:
//!
//! ```text
//! <label> [ #<features>]+\n        (explicit)
//! <label> <features>\n             (implicit)
//! ```
//!
//! where `<label>` is the index of the gold label or, in cost mode, the
//! colon-joined cost of every label, and `<features>` is a space-prefixed list
//! of firing feature ids (bernoulli) or `id value` pairs.

use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::encoding::FeatureEncoding;
use crate::error::{MegamError, Result};

/// How the label field of each line is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMode {
    /// Index of the gold label in the encoding's label order.
    #[default]
    Index,
    /// Colon-separated cost of every label, in encoding order.
    ///
    /// Requires an encoding that implements [`FeatureEncoding::cost`].
    Cost,
}

/// Options controlling the training file variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// List only firing binary features by id. Values must be 0 or 1.
    /// When false, megam must be called with `-fvals`.
    /// Default: true
    pub bernoulli: bool,

    /// Write a feature block for every label, not just the gold one.
    /// When true, megam must be called with `-explicit`.
    /// Default: true
    pub explicit: bool,

    /// Label field format.
    /// Default: LabelMode::Index
    pub label_mode: LabelMode,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            bernoulli: true,
            explicit: true,
            label_mode: LabelMode::Index,
        }
    }
}

/// Destination for serialized training data.
///
/// Text sinks receive `str` fragments; byte sinks receive them UTF-8 encoded.
pub enum Sink<'a> {
    Text(&'a mut dyn fmt::Write),
    Bytes(&'a mut dyn io::Write),
}

impl Sink<'_> {
    fn put(&mut self, s: &str) -> Result<()> {
        match self {
            Sink::Text(w) => w
                .write_str(s)
                .map_err(|_| MegamError::Io(io::Error::other("text sink rejected write"))),
            Sink::Bytes(w) => Ok(w.write_all(s.as_bytes())?),
        }
    }
}

/// Serialize `train_toks` in megam's input format.
///
/// # Errors
///
/// Returns [`MegamError::Format`] if a gold label is not one of the
/// encoding's labels, a cost is requested but the encoding has none, an
/// encoded vector is empty, or a bernoulli feature is not binary. Sink
/// failures surface as [`MegamError::Io`]. Lines written before the failing
/// instance remain in the sink.
pub fn write_megam<E>(
    train_toks: &[(E::FeatureSet, E::Label)],
    encoding: &E,
    mut sink: Sink<'_>,
    options: &WriteOptions,
) -> Result<()>
where
    E: FeatureEncoding,
{
    let labels = encoding.labels();

    for (featureset, label) in train_toks {
        match options.label_mode {
            LabelMode::Index => {
                let index = labels.iter().position(|l| l == label).ok_or_else(|| {
                    MegamError::Format(format!("label {label:?} is not known to the encoding"))
                })?;
                sink.put(&index.to_string())?;
            }
            LabelMode::Cost => {
                let costs = labels
                    .iter()
                    .map(|candidate| {
                        encoding
                            .cost(featureset, label, candidate)
                            .map(|c| c.to_string())
                            .ok_or_else(|| {
                                MegamError::Format(format!(
                                    "encoding defines no cost for label {candidate:?}"
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                sink.put(&costs.join(":"))?;
            }
        }

        if options.explicit {
            for candidate in labels {
                sink.put(" #")?;
                let vector = encoding.encode(featureset, candidate);
                write_features(&vector, &mut sink, options.bernoulli)?;
            }
        } else {
            write_features(&encoding.encode(featureset, label), &mut sink, options.bernoulli)?;
        }

        sink.put("\n")?;
    }

    debug!(
        "Wrote {} megam instances ({} labels, bernoulli={}, explicit={})",
        train_toks.len(),
        labels.len(),
        options.bernoulli,
        options.explicit
    );
    Ok(())
}

/// Serialize `train_toks` into a `String`.
pub fn write_megam_string<E>(
    train_toks: &[(E::FeatureSet, E::Label)],
    encoding: &E,
    options: &WriteOptions,
) -> Result<String>
where
    E: FeatureEncoding,
{
    let mut out = String::new();
    write_megam(train_toks, encoding, Sink::Text(&mut out), options)?;
    Ok(out)
}

/// Serialize `train_toks` into the file at `path`, creating or truncating it.
pub fn write_megam_file<E>(
    train_toks: &[(E::FeatureSet, E::Label)],
    encoding: &E,
    path: &Path,
    options: &WriteOptions,
) -> Result<()>
where
    E: FeatureEncoding,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write_megam(train_toks, encoding, Sink::Bytes(&mut writer), options)?;
    writer.flush()?;
    Ok(())
}

fn write_features(vector: &[(usize, f64)], sink: &mut Sink<'_>, bernoulli: bool) -> Result<()> {
    if vector.is_empty() {
        return Err(MegamError::Format(
            "megam requires the use of an always-on feature".to_string(),
        ));
    }

    for &(fid, fval) in vector {
        if bernoulli {
            if fval == 1.0 {
                sink.put(&format!(" {fid}"))?;
            } else if fval != 0.0 {
                return Err(MegamError::Format(format!(
                    "if bernoulli is set, all features must be binary (feature {fid} = {fval})"
                )));
            }
        } else {
            sink.put(&format!(" {fid} {fval}"))?;
        }
    }
    Ok(())
}
