//! Answer generation pipeline.
//!
//! Builds the prompt for a question (plus optional context), invokes the
//! provider through the resilient invoker, and passes the raw output through
//! the validator/repairer. The repair round-trip also goes through the
//! invoker, so transient provider errors during repair are retried under the
//! same policy.

use crate::error::PipelineError;
use crate::models::{AnswerRequest, AnswerResponse};
use crate::provider::ProviderClient;
use crate::retry::RetryPolicy;
use crate::validate::validate_or_repair;

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.\n\
Return JSON ONLY that matches the schema: AnswerResponse with keys:\n\
answer (string), sources (array of strings), confidence (0..1), follow_ups (array of strings).\n\
If you are unsure, keep confidence low and ask follow-up questions.\n";

const REPAIR_INSTRUCTIONS: &str = "Your previous reply was not valid JSON.\n\
Respond with ONLY a JSON object, no prose, no code fences, matching exactly:\n\
{\"answer\": string, \"sources\": array of strings, \"confidence\": number in [0,1], \"follow_ups\": array of strings}\n\
Use these defaults for anything you cannot determine: sources=[], follow_ups=[], confidence=0.3.\n\
The malformed reply to fix follows.\n";

/// Concatenate the question with the optional context block, separated by a
/// blank line under a `Context:` label.
pub fn build_user_message(question: &str, context: Option<&str>) -> String {
    let mut text = format!("Question: {question}");
    if let Some(context) = context {
        text.push_str("\n\nContext:\n");
        text.push_str(context);
    }
    text
}

/// Answer a question end to end: generate, then validate or repair.
pub async fn generate_answer(
    provider: &ProviderClient,
    retry: &RetryPolicy,
    request: &AnswerRequest,
) -> Result<AnswerResponse, PipelineError> {
    let user_message = build_user_message(&request.question, request.context.as_deref());

    let raw = retry
        .invoke(|| provider.generate(SYSTEM_PROMPT, &user_message))
        .await?;

    validate_or_repair(&raw, |malformed| async move {
        let repaired = retry
            .invoke(|| provider.generate(REPAIR_INSTRUCTIONS, &malformed))
            .await?;
        Ok(repaired)
    })
    .await
}
