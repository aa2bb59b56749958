//! Structural validation of the inference input contract.
//!
//! All checks are pure and run before any authentication or backend
//! work. Numeric content (NaN/Inf) is deliberately not screened; the
//! gateway trusts the upstream pose-extraction pipeline.

use bst_common::PoseSequenceRequest;

use crate::config::ModelConfig;
use crate::error::{Error, Result};

/// A request whose shape has been checked against the model contract.
///
/// Borrows the request; engines re-read the nested arrays from here.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedInput<'a> {
    pub request: &'a PoseSequenceRequest,
    pub batch_size: usize,
    pub seq_len: usize,
    pub n_people: usize,
    pub pose_features: usize,
}

impl ValidatedInput<'_> {
    /// Flatten `JnB` to a row-major buffer for tensor construction.
    pub fn jnb_flat(&self) -> Vec<f32> {
        let mut buffer =
            Vec::with_capacity(self.batch_size * self.seq_len * self.n_people * self.pose_features);
        for clip in &self.request.jnb {
            for frame in clip {
                for person in frame {
                    buffer.extend_from_slice(person);
                }
            }
        }
        buffer
    }

    /// Flatten `shuttle` to a row-major buffer.
    pub fn shuttle_flat(&self) -> Vec<f32> {
        let mut buffer = Vec::with_capacity(self.batch_size * self.seq_len * 2);
        for clip in &self.request.shuttle {
            for frame in clip {
                buffer.extend_from_slice(frame);
            }
        }
        buffer
    }

    /// Flatten `pos` to a row-major buffer.
    pub fn pos_flat(&self) -> Vec<f32> {
        let mut buffer = Vec::with_capacity(self.batch_size * self.seq_len * self.n_people * 2);
        for clip in &self.request.pos {
            for frame in clip {
                for person in frame {
                    buffer.extend_from_slice(person);
                }
            }
        }
        buffer
    }
}

fn mismatch(field: &'static str, expected: impl ToString, actual: impl ToString) -> Error {
    Error::ShapeMismatch {
        field,
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

/// Check the request against the configured model dimensions.
///
/// Checks run in contract order: non-empty batch, non-empty time,
/// per-field rank and uniformity, cross-field dimension equality,
/// then `video_len` bounds.
pub fn validate<'a>(
    request: &'a PoseSequenceRequest,
    model: &ModelConfig,
) -> Result<ValidatedInput<'a>> {
    let batch_size = request.jnb.len();
    if batch_size == 0 {
        return Err(mismatch("JnB", "batch size > 0", "0"));
    }

    let seq_len = request.jnb[0].len();
    if seq_len == 0 {
        return Err(mismatch("JnB", "sequence length > 0", "0"));
    }

    let jnb_expected = format!(
        "({batch_size}, {seq_len}, {}, {})",
        model.n_people, model.pose_features
    );
    for (b, clip) in request.jnb.iter().enumerate() {
        if clip.len() != seq_len {
            return Err(mismatch(
                "JnB",
                &jnb_expected,
                format!("sequence length {} at batch {b}", clip.len()),
            ));
        }
        for frame in clip {
            if frame.len() != model.n_people {
                return Err(mismatch(
                    "JnB",
                    &jnb_expected,
                    format!("{} people at batch {b}", frame.len()),
                ));
            }
            for person in frame {
                if person.len() != model.pose_features {
                    return Err(mismatch(
                        "JnB",
                        &jnb_expected,
                        format!("{} features at batch {b}", person.len()),
                    ));
                }
            }
        }
    }

    let shuttle_expected = format!("({batch_size}, {seq_len}, 2)");
    if request.shuttle.len() != batch_size {
        return Err(mismatch(
            "shuttle",
            &shuttle_expected,
            format!("batch size {}", request.shuttle.len()),
        ));
    }
    for (b, clip) in request.shuttle.iter().enumerate() {
        if clip.len() != seq_len {
            return Err(mismatch(
                "shuttle",
                &shuttle_expected,
                format!("sequence length {} at batch {b}", clip.len()),
            ));
        }
        for frame in clip {
            if frame.len() != 2 {
                return Err(mismatch(
                    "shuttle",
                    &shuttle_expected,
                    format!("{} coordinates at batch {b}", frame.len()),
                ));
            }
        }
    }

    let pos_expected = format!("({batch_size}, {seq_len}, {}, 2)", model.n_people);
    if request.pos.len() != batch_size {
        return Err(mismatch(
            "pos",
            &pos_expected,
            format!("batch size {}", request.pos.len()),
        ));
    }
    for (b, clip) in request.pos.iter().enumerate() {
        if clip.len() != seq_len {
            return Err(mismatch(
                "pos",
                &pos_expected,
                format!("sequence length {} at batch {b}", clip.len()),
            ));
        }
        for frame in clip {
            if frame.len() != model.n_people {
                return Err(mismatch(
                    "pos",
                    &pos_expected,
                    format!("{} people at batch {b}", frame.len()),
                ));
            }
            for person in frame {
                if person.len() != 2 {
                    return Err(mismatch(
                        "pos",
                        &pos_expected,
                        format!("{} coordinates at batch {b}", person.len()),
                    ));
                }
            }
        }
    }

    if request.video_len.len() != batch_size {
        return Err(mismatch(
            "video_len",
            format!("({batch_size},)"),
            format!("({},)", request.video_len.len()),
        ));
    }
    for (b, &len) in request.video_len.iter().enumerate() {
        if len < 1 || len as usize > seq_len {
            return Err(mismatch(
                "video_len",
                format!("1..={seq_len}"),
                format!("{len} at batch {b}"),
            ));
        }
    }

    Ok(ValidatedInput {
        request,
        batch_size,
        seq_len,
        n_people: model.n_people,
        pose_features: model.pose_features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_model() -> ModelConfig {
        ModelConfig {
            n_people: 2,
            pose_features: 3,
            n_classes: 4,
            ..ModelConfig::default()
        }
    }

    fn valid_request(batch: usize, time: usize) -> PoseSequenceRequest {
        PoseSequenceRequest {
            jnb: vec![vec![vec![vec![0.0; 3]; 2]; time]; batch],
            shuttle: vec![vec![vec![0.0; 2]; time]; batch],
            pos: vec![vec![vec![vec![0.0; 2]; 2]; time]; batch],
            video_len: vec![time as i64; batch],
        }
    }

    #[test]
    fn test_accepts_conforming_request() {
        let request = valid_request(2, 5);
        let input = validate(&request, &small_model()).unwrap();
        assert_eq!(input.batch_size, 2);
        assert_eq!(input.seq_len, 5);
        assert_eq!(input.jnb_flat().len(), 2 * 5 * 2 * 3);
        assert_eq!(input.shuttle_flat().len(), 2 * 5 * 2);
        assert_eq!(input.pos_flat().len(), 2 * 5 * 2 * 2);
    }

    #[test]
    fn test_rejects_empty_batch() {
        let request = PoseSequenceRequest {
            jnb: vec![],
            shuttle: vec![],
            pos: vec![],
            video_len: vec![],
        };
        let error = validate(&request, &small_model()).unwrap_err();
        assert!(matches!(error, Error::ShapeMismatch { field: "JnB", .. }));
    }

    #[test]
    fn test_rejects_wrong_feature_count() {
        let mut request = valid_request(1, 2);
        request.jnb[0][1][0] = vec![0.0; 7];
        let error = validate(&request, &small_model()).unwrap_err();
        assert!(matches!(error, Error::ShapeMismatch { field: "JnB", .. }));
    }

    #[test]
    fn test_rejects_shuttle_time_mismatch() {
        let mut request = valid_request(1, 4);
        request.shuttle[0].pop();
        let error = validate(&request, &small_model()).unwrap_err();
        assert!(matches!(
            error,
            Error::ShapeMismatch { field: "shuttle", .. }
        ));
    }

    #[test]
    fn test_rejects_people_mismatch_in_pos() {
        let mut request = valid_request(1, 2);
        request.pos[0][0] = vec![vec![0.0; 2]; 3];
        let error = validate(&request, &small_model()).unwrap_err();
        assert!(matches!(error, Error::ShapeMismatch { field: "pos", .. }));
    }

    #[test]
    fn test_rejects_video_len_batch_mismatch() {
        let mut request = valid_request(2, 3);
        request.video_len = vec![3];
        let error = validate(&request, &small_model()).unwrap_err();
        assert!(matches!(
            error,
            Error::ShapeMismatch { field: "video_len", .. }
        ));
    }

    #[test]
    fn test_rejects_video_len_out_of_range() {
        let mut request = valid_request(1, 3);
        request.video_len = vec![4];
        assert!(validate(&request, &small_model()).is_err());

        request.video_len = vec![0];
        assert!(validate(&request, &small_model()).is_err());
    }

    #[test]
    fn test_does_not_screen_non_finite_values() {
        let mut request = valid_request(1, 2);
        request.jnb[0][0][0][0] = f32::NAN;
        request.shuttle[0][1][1] = f32::INFINITY;
        assert!(validate(&request, &small_model()).is_ok());
    }
}
