//! Likelihood scoring of frame sequences.

use crate::error::GmmError;
use crate::gmm::Gmm;

/// Mean per-frame log-likelihood of `frames` under `gmm`.
pub fn average_log_likelihood(gmm: &Gmm, frames: &[Vec<f32>]) -> Result<f64, GmmError> {
    if frames.is_empty() {
        return Err(GmmError::InsufficientData);
    }
    let mut total = 0.0;
    for frame in frames {
        check_width(gmm, frame)?;
        total += gmm.log_likelihood(frame);
    }
    Ok(total / frames.len() as f64)
}

/// Mean per-frame log-likelihood ratio of `model` against `background`.
///
/// Positive scores mean the frames fit the speaker model better than the
/// background model. The result is a pure fold over the frames in order,
/// so the same inputs always produce the same score.
pub fn average_llr(model: &Gmm, background: &Gmm, frames: &[Vec<f32>]) -> Result<f64, GmmError> {
    if model.dim() != background.dim() {
        return Err(GmmError::InvalidModel(format!(
            "model dimension {} disagrees with background dimension {}",
            model.dim(),
            background.dim()
        )));
    }
    if frames.is_empty() {
        return Err(GmmError::InsufficientData);
    }
    let mut total = 0.0;
    for frame in frames {
        check_width(model, frame)?;
        total += model.log_likelihood(frame) - background.log_likelihood(frame);
    }
    Ok(total / frames.len() as f64)
}

fn check_width(gmm: &Gmm, frame: &[f32]) -> Result<(), GmmError> {
    if frame.len() != gmm.dim() {
        return Err(GmmError::DimensionMismatch {
            expected: gmm.dim(),
            got: frame.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn background() -> Gmm {
        Gmm::new(
            vec![0.5, 0.5],
            vec![vec![-2.0], vec![2.0]],
            vec![vec![1.0], vec![1.0]],
        )
        .unwrap()
    }

    fn shifted_model() -> Gmm {
        // mass pulled toward +2, the way adaptation on +2 data would
        Gmm::new(
            vec![0.5, 0.5],
            vec![vec![0.0], vec![2.0]],
            vec![vec![1.0], vec![1.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_llr_sign_tracks_fit() {
        let ubm = background();
        let model = shifted_model();
        let near: Vec<Vec<f32>> = (0..50).map(|i| vec![2.0 + (i % 5) as f32 * 0.1]).collect();
        let far: Vec<Vec<f32>> = (0..50).map(|i| vec![-2.0 - (i % 5) as f32 * 0.1]).collect();
        let s_near = average_llr(&model, &ubm, &near).unwrap();
        let s_far = average_llr(&model, &ubm, &far).unwrap();
        assert!(s_near > 0.0, "matched data should score positive, got {s_near}");
        assert!(s_far < 0.0, "mismatched data should score negative, got {s_far}");
    }

    #[test]
    fn test_llr_of_identical_models_is_zero() {
        let ubm = background();
        let frames: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32 * 0.3 - 1.5]).collect();
        let s = average_llr(&ubm, &ubm, &frames).unwrap();
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_average_log_likelihood() {
        let g = background();
        let frames = vec![vec![-2.0f32], vec![2.0]];
        let avg = average_log_likelihood(&g, &frames).unwrap();
        let by_hand = (g.log_likelihood(&[-2.0]) + g.log_likelihood(&[2.0])) / 2.0;
        assert_eq!(avg, by_hand);
    }

    #[test]
    fn test_empty_frames_rejected() {
        let g = background();
        assert!(matches!(
            average_log_likelihood(&g, &[]),
            Err(GmmError::InsufficientData)
        ));
        assert!(matches!(
            average_llr(&g, &g, &[]),
            Err(GmmError::InsufficientData)
        ));
    }

    #[test]
    fn test_frame_width_checked() {
        let g = background();
        let bad = vec![vec![0.0f32, 0.0]];
        assert!(matches!(
            average_llr(&g, &g, &bad),
            Err(GmmError::DimensionMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_background_dimension_checked() {
        let one_d = background();
        let two_d = Gmm::new(vec![1.0], vec![vec![0.0, 0.0]], vec![vec![1.0, 1.0]]).unwrap();
        assert!(matches!(
            average_llr(&one_d, &two_d, &[vec![0.0]]),
            Err(GmmError::InvalidModel(_))
        ));
    }
}
