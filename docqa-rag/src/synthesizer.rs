//! Grounded prompt construction and answer synthesis.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::document::filename_from_record_id;
use crate::error::{RagError, Result};
use crate::generation::{GenerationModel, GenerationRequest};
use crate::retriever::{Evidence, Retrieval};
use crate::timeout::with_timeout;

/// Answer returned when retrieval found nothing relevant.
pub const REFUSAL_ANSWER: &str = "I cannot answer this question based on the uploaded documents.";

/// Source label paired with [`REFUSAL_ANSWER`].
pub const NO_SOURCE: &str = "No source";

/// Source label used when the top chunk carries no usable filename.
pub const UNKNOWN_SOURCE: &str = "Unknown source";

/// The reply the model is told to give when the context lacks the answer.
pub const DONT_KNOW_SENTINEL: &str = "I don't know.";

/// A final answer with its source attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// The answer text.
    pub text: String,
    /// Filename of the highest-ranked evidence, or [`NO_SOURCE`].
    pub source: String,
}

impl Answer {
    /// The fixed answer for questions the documents cannot ground.
    pub fn refusal() -> Self {
        Self { text: REFUSAL_ANSWER.to_string(), source: NO_SOURCE.to_string() }
    }

    /// Whether this is the refusal answer.
    pub fn is_refusal(&self) -> bool {
        self.text == REFUSAL_ANSWER && self.source == NO_SOURCE
    }
}

/// Render evidence as numbered, attributed context paragraphs.
pub fn build_context(evidence: &[Evidence]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, e)| format!("Document {} (from {}): {}", i + 1, e.filename, e.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the grounded prompt: context, question, instructions, answer cue.
pub fn build_prompt(question: &str, evidence: &[Evidence]) -> String {
    format!(
        "Context information:\n{context}\n\n\
         Question: {question}\n\n\
         Instructions: Answer ONLY using the information provided above. \
         If the answer is not in the context, respond with \"{DONT_KNOW_SENTINEL}\" \
         Do not add information from outside the context.\n\n\
         Answer:",
        context = build_context(evidence),
    )
}

/// Attribute an answer to the single highest-ranked chunk.
///
/// Other contributing documents are not credited.
pub fn source_of(evidence: &[Evidence]) -> String {
    let Some(top) = evidence.first() else {
        return NO_SOURCE.to_string();
    };
    if !top.filename.is_empty() {
        return top.filename.clone();
    }
    filename_from_record_id(&top.id).unwrap_or(UNKNOWN_SOURCE).to_string()
}

/// Turns gated retrieval results into answers using a generation model.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    model: Arc<dyn GenerationModel>,
    max_output_tokens: usize,
    generate_timeout: Option<Duration>,
}

impl AnswerSynthesizer {
    /// Create a synthesizer bounding answers to `max_output_tokens`.
    pub fn new(model: Arc<dyn GenerationModel>, max_output_tokens: usize) -> Self {
        Self { model, max_output_tokens, generate_timeout: None }
    }

    /// Bound the time spent in the generation model.
    pub fn with_generate_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.generate_timeout = timeout;
        self
    }

    /// Produce an answer for `question` from `retrieval`.
    ///
    /// [`Retrieval::Insufficient`] short-circuits to [`Answer::refusal`]
    /// without calling the model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] if the model fails or produces
    /// only whitespace, and [`RagError::TimeoutError`] if it does not finish
    /// in time.
    pub async fn synthesize(&self, question: &str, retrieval: &Retrieval) -> Result<Answer> {
        let evidence = match retrieval {
            Retrieval::Insufficient => return Ok(Answer::refusal()),
            Retrieval::Evidence(evidence) if evidence.is_empty() => return Ok(Answer::refusal()),
            Retrieval::Evidence(evidence) => evidence,
        };

        let request = GenerationRequest {
            prompt: build_prompt(question, evidence),
            max_output_tokens: self.max_output_tokens,
        };
        let generated =
            with_timeout("generation", self.generate_timeout, self.model.generate(request))
                .await
                .inspect_err(|e| error!(model = self.model.name(), error = %e, "generation failed"))?;

        let text = generated.trim();
        if text.is_empty() {
            error!(model = self.model.name(), "generation returned an empty answer");
            return Err(RagError::GenerationError {
                model: self.model.name().to_string(),
                message: "model returned an empty answer".to_string(),
            });
        }

        let source = source_of(evidence);
        info!(model = self.model.name(), %source, evidence_count = evidence.len(), "answer generated");
        Ok(Answer { text: text.to_string(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockGenerationModel;

    fn evidence(filename: &str, id: &str, text: &str) -> Evidence {
        Evidence {
            text: text.to_string(),
            filename: filename.to_string(),
            id: id.to_string(),
            distance: 0.5,
        }
    }

    #[test]
    fn context_numbers_and_attributes_chunks() {
        let context = build_context(&[
            evidence("a.txt", "a.txt_chunk_0", "Alpha."),
            evidence("b.txt", "b.txt_chunk_3", "Beta."),
        ]);
        assert_eq!(context, "Document 1 (from a.txt): Alpha.\n\nDocument 2 (from b.txt): Beta.");
    }

    #[test]
    fn prompt_sections_appear_in_order() {
        let prompt = build_prompt("Why?", &[evidence("a.txt", "a.txt_chunk_0", "Because.")]);
        let context = prompt.find("Context information:\nDocument 1 (from a.txt): Because.").unwrap();
        let question = prompt.find("Question: Why?").unwrap();
        let instructions = prompt.find("Instructions: Answer ONLY using").unwrap();
        assert!(context < question && question < instructions);
        assert!(prompt.contains("respond with \"I don't know.\""));
        assert!(prompt.contains("Do not add information from outside the context."));
        assert!(prompt.ends_with("\n\nAnswer:"));
    }

    #[test]
    fn source_falls_back_to_record_id_then_unknown() {
        assert_eq!(source_of(&[evidence("", "notes.md_chunk_2", "x")]), "notes.md");
        assert_eq!(source_of(&[evidence("", "weird", "x")]), UNKNOWN_SOURCE);
        assert_eq!(source_of(&[]), NO_SOURCE);
    }

    #[tokio::test]
    async fn insufficient_retrieval_skips_the_model() {
        let model = Arc::new(MockGenerationModel::new().with_fallback("should not be used"));
        let synthesizer = AnswerSynthesizer::new(model.clone(), 150);
        let answer = synthesizer.synthesize("Anything?", &Retrieval::Insufficient).await.unwrap();
        assert!(answer.is_refusal());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn answer_is_trimmed_and_attributed_to_top_chunk() {
        let model = Arc::new(MockGenerationModel::new().with_response("\n  Paris.  \n"));
        let synthesizer = AnswerSynthesizer::new(model.clone(), 150);
        let retrieval = Retrieval::Evidence(vec![
            evidence("paris.txt", "paris.txt_chunk_0", "The Eiffel Tower is in Paris."),
            evidence("rome.txt", "rome.txt_chunk_0", "The Colosseum is in Rome."),
        ]);

        let answer = synthesizer.synthesize("Where is the tower?", &retrieval).await.unwrap();
        assert_eq!(answer.text, "Paris.");
        assert_eq!(answer.source, "paris.txt");

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_output_tokens, 150);
        assert!(requests[0].prompt.contains("Question: Where is the tower?"));
    }

    #[tokio::test]
    async fn blank_generation_is_an_error() {
        let model = Arc::new(MockGenerationModel::new().with_response("   "));
        let synthesizer = AnswerSynthesizer::new(model, 150);
        let retrieval = Retrieval::Evidence(vec![evidence("a.txt", "a.txt_chunk_0", "A.")]);
        let result = synthesizer.synthesize("Q?", &retrieval).await;
        assert!(matches!(result, Err(RagError::GenerationError { .. })));
    }
}
