//! Evidence-grounded request classification with a closed label set.

use std::sync::Arc;
use tracing::{debug, info, warn};

use intake_core::structured::{confidence_field, parse_validated, string_field, Structured};
use intake_core::traits::Generator;
use intake_core::types::{Label, RequestCategory};
use intake_hybrid::Fusion;

use crate::prompts;

/// One-shot marker for "has this ticket been classified yet".
///
/// Flips from first to not-first on the first [`FirstPass::take`] and never
/// flips back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstPass {
    done: bool,
}

impl FirstPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once.
    pub fn take(&mut self) -> bool {
        let first = !self.done;
        self.done = true;
        first
    }

    pub fn is_pending(&self) -> bool {
        !self.done
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: Label,
    /// 0 to 100.
    pub confidence: u8,
    pub explanation: String,
    pub summary: String,
    pub evidence_title: String,
    pub total_chunk_count: usize,
    pub is_first_pass: bool,
}

pub struct Classifier {
    fusion: Arc<Fusion>,
    generator: Arc<dyn Generator>,
}

impl Classifier {
    pub fn new(fusion: Arc<Fusion>, generator: Arc<dyn Generator>) -> Self {
        Self { fusion, generator }
    }

    /// Retrieve evidence for `request_text` and ask the generator for a
    /// category. Never fails: unusable output becomes a sentinel label.
    pub async fn classify(&self, request_text: &str, first_pass: &mut FirstPass) -> ClassificationResult {
        let evidence = self.fusion.fuse(request_text).await;
        let raw = match self
            .generator
            .generate(&prompts::classifier_system(), &prompts::classifier_user(request_text, &evidence.combined_text), true)
            .await
        {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!(error = %e, "classification generation failed");
                None
            }
        };
        let is_first_pass = first_pass.take();

        let (label, confidence, explanation, summary) = match raw.as_deref().map(|r| (r, parse_validated(r, "result", RequestCategory::parse))) {
            None => (Label::JsonError, 0, "Generation failed; no output to parse.".to_string(), String::new()),
            Some((raw, Structured::Unparseable(failure))) => {
                debug!(?failure, raw, "classifier output is not a JSON object");
                (Label::JsonError, 0, "Parsing failed or no valid JSON output.".to_string(), String::new())
            }
            Some((_, Structured::Invalid { found, fields })) => {
                debug!(found = %found, "classifier named a label outside the category set");
                (
                    Label::CategorizationError,
                    confidence_field(&fields, "result_confidence"),
                    string_field(&fields, "result_explanation"),
                    string_field(&fields, "result_summary"),
                )
            }
            Some((_, Structured::Valid { value, fields })) => (
                Label::Category(value),
                confidence_field(&fields, "result_confidence"),
                string_field(&fields, "result_explanation"),
                string_field(&fields, "result_summary"),
            ),
        };

        info!(
            label = %label,
            confidence,
            chunks = evidence.total_chunk_count,
            first_pass = is_first_pass,
            "request classified"
        );
        ClassificationResult {
            label,
            confidence,
            explanation,
            summary,
            evidence_title: evidence.combined_title,
            total_chunk_count: evidence.total_chunk_count,
            is_first_pass,
        }
    }
}
