use facecheck_core::{Comparator, Leg, MatchDecision, MatchPolicy};
use std::sync::Arc;

/// A reference image uploaded under a form label (`image1`, `image2`).
#[derive(Debug, Clone)]
pub struct Reference {
    pub label: String,
    pub bytes: Vec<u8>,
}

impl Reference {
    pub fn new(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            bytes,
        }
    }
}

/// Runs the comparison legs for one request and applies the match policy.
///
/// Clone-safe; the comparator is shared.
#[derive(Clone)]
pub struct MatchEngine {
    comparator: Arc<dyn Comparator>,
    policy: MatchPolicy,
}

impl MatchEngine {
    pub fn new(comparator: Arc<dyn Comparator>, policy: MatchPolicy) -> Self {
        Self { comparator, policy }
    }

    pub fn backend(&self) -> &'static str {
        self.comparator.name()
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Compare the captured image against each supplied reference and pick
    /// the best match.
    ///
    /// Both legs run concurrently. A leg whose comparison fails is treated
    /// as absent rather than failing the request.
    pub async fn evaluate(
        &self,
        captured: &[u8],
        first: Option<&Reference>,
        second: Option<&Reference>,
    ) -> MatchDecision {
        let (first, second) = tokio::join!(
            self.run_leg(captured, first),
            self.run_leg(captured, second)
        );

        let decision = self.policy.decide(first.as_ref(), second.as_ref());
        tracing::info!(
            backend = self.backend(),
            match_found = decision.match_found,
            similarity = decision.similarity,
            matched = ?decision.matched_label,
            "match decision"
        );
        decision
    }

    async fn run_leg(&self, captured: &[u8], reference: Option<&Reference>) -> Option<Leg> {
        let reference = reference?;
        match self.comparator.compare(&reference.bytes, captured).await {
            Ok(result) => {
                tracing::debug!(
                    label = %reference.label,
                    matched = result.matched,
                    score = ?result.score,
                    "leg compared"
                );
                Some(Leg::new(reference.label.clone(), result))
            }
            Err(err) => {
                tracing::warn!(
                    label = %reference.label,
                    backend = self.backend(),
                    error = %err,
                    "comparison failed; treating leg as absent"
                );
                None
            }
        }
    }
}
