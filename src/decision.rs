//! The fire/no-fire decision rule.

use crate::inference::messages::ClassificationResult;
use crate::types::Label;

/// Choose the outcome label for a classification.
///
/// Fire wins only when its score is strictly greater than the no-fire score.
/// Ties, including two missing scores, resolve to [`Label::NoFire`].
pub fn decide(result: &ClassificationResult) -> Label {
    if result.fire_score() > result.no_fire_score() {
        Label::Fire
    } else {
        Label::NoFire
    }
}
