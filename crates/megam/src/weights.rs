//! Parsing megam's weight output.
//!
//! After training, megam prints one `<feature-id> <weight>` pair per line on
//! stdout. Bias features are not modeled here.

use crate::error::{MegamError, Result};

/// Parse megam's stdout into a dense weight vector of `features_count` entries.
///
/// Positions not named in the output stay `0.0`. Blank lines are skipped.
///
/// # Errors
///
/// - [`MegamError::UnsupportedMode`] if `explicit` is false
/// - [`MegamError::Parse`] for invalid UTF-8, a line without exactly two
///   fields, a non-numeric field, or an id outside `0..features_count`
pub fn parse_megam_weights(
    stdout: &[u8],
    features_count: usize,
    explicit: bool,
) -> Result<Vec<f64>> {
    if !explicit {
        return Err(MegamError::UnsupportedMode(
            "non-explicit weight output is not supported".to_string(),
        ));
    }

    let text = std::str::from_utf8(stdout).map_err(|e| MegamError::Parse {
        line: 0,
        message: format!("output is not valid UTF-8: {e}"),
    })?;

    let mut weights = vec![0.0; features_count];

    for (lineno, line) in text.lines().enumerate() {
        let line_no = lineno + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (fid, weight) = match fields.as_slice() {
            [] => continue,
            [fid, weight] => (*fid, *weight),
            _ => {
                return Err(MegamError::Parse {
                    line: line_no,
                    message: format!("expected 2 fields, found {}: {line:?}", fields.len()),
                });
            }
        };

        let fid: usize = fid.parse().map_err(|_| MegamError::Parse {
            line: line_no,
            message: format!("invalid feature id {fid:?}"),
        })?;
        let weight: f64 = weight.parse().map_err(|_| MegamError::Parse {
            line: line_no,
            message: format!("invalid weight {weight:?}"),
        })?;

        let slot = weights.get_mut(fid).ok_or_else(|| MegamError::Parse {
            line: line_no,
            message: format!("feature id {fid} out of range (feature count is {features_count})"),
        })?;
        *slot = weight;
    }

    Ok(weights)
}
