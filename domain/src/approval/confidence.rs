//! Learned confidence scoring.
//!
//! The engine estimates its own decision accuracy from user feedback on
//! past decisions: `0.7 * accuracy + 0.3 * mean(past confidence)`, clamped
//! to `[0, 1]`. With no feedback history the score is exactly 0.5 —
//! neutral, which under the default thresholds biases toward escalation.

use super::entities::Feedback;
use serde::{Deserialize, Serialize};

/// Neutral confidence used when no feedback history exists.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Weight of observed accuracy in the blend.
const ACCURACY_WEIGHT: f64 = 0.7;

/// Weight of the mean recorded confidence in the blend.
const PAST_CONFIDENCE_WEIGHT: f64 = 0.3;

/// One past decision that carries user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSample {
    /// Confidence score recorded on the decision
    pub confidence: f64,
    /// The user's verdict on that decision
    pub feedback: Feedback,
}

/// Compute the confidence score from feedback-bearing decision history
/// (callers pass the last 30 days).
pub fn confidence_from_history(samples: &[FeedbackSample]) -> f64 {
    if samples.is_empty() {
        return NEUTRAL_CONFIDENCE;
    }

    let total = samples.len() as f64;
    let correct = samples
        .iter()
        .filter(|s| s.feedback == Feedback::Correct)
        .count() as f64;
    let accuracy = correct / total;
    let avg_confidence = samples.iter().map(|s| s.confidence).sum::<f64>() / total;

    (ACCURACY_WEIGHT * accuracy + PAST_CONFIDENCE_WEIGHT * avg_confidence).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(confidence: f64, feedback: Feedback) -> FeedbackSample {
        FeedbackSample {
            confidence,
            feedback,
        }
    }

    #[test]
    fn test_empty_history_is_neutral() {
        assert_eq!(confidence_from_history(&[]), 0.5);
    }

    #[test]
    fn test_blend_matches_formula() {
        // 10 correct at 0.8, 2 incorrect at 0.6
        let mut samples = vec![sample(0.8, Feedback::Correct); 10];
        samples.extend(vec![sample(0.6, Feedback::Incorrect); 2]);

        let accuracy = 10.0 / 12.0;
        let avg = (10.0 * 0.8 + 2.0 * 0.6) / 12.0;
        let expected = 0.7 * accuracy + 0.3 * avg;

        assert!((confidence_from_history(&samples) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_always_within_unit_interval() {
        let all_correct = vec![sample(1.0, Feedback::Correct); 50];
        let all_wrong = vec![sample(0.0, Feedback::Incorrect); 50];

        let high = confidence_from_history(&all_correct);
        let low = confidence_from_history(&all_wrong);

        assert!((0.0..=1.0).contains(&high));
        assert!((0.0..=1.0).contains(&low));
        assert_eq!(high, 1.0);
        assert_eq!(low, 0.0);
    }

    #[test]
    fn test_incorrect_feedback_lowers_confidence() {
        let history_good = vec![sample(0.7, Feedback::Correct); 5];
        let mut history_bad = vec![sample(0.7, Feedback::Correct); 4];
        history_bad.push(sample(0.7, Feedback::Incorrect));

        assert!(confidence_from_history(&history_bad) < confidence_from_history(&history_good));
    }
}
