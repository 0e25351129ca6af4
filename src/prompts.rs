//! Prompt assembly for expert and synthesis calls.

use serde_json::Value;

use crate::engine::state::{ExpertResult, SearchResult};

/// Trailer line the synthesis prompt asks the model to end with on
/// non-final rounds.
const VERDICT_PREFIX: &str = "VERDICT:";

/// System prompt for the synthesis call.
pub fn synthesis_system() -> String {
    "You are the synthesis stage of a multi-expert reasoning pipeline. You receive \
     independent expert answers and supporting evidence, weigh them against each \
     other, and produce one coherent, well-grounded answer to the user's question."
        .to_string()
}

/// Build the user prompt for one expert.
pub fn expert_prompt(
    query: &str,
    search_results: Option<&[SearchResult]>,
    file_context: Option<&Value>,
    prior_draft: Option<&str>,
) -> String {
    let mut prompt = format!("Question:\n{}\n", query);
    if let Some(results) = search_results {
        if !results.is_empty() {
            prompt.push_str("\nWeb search evidence:\n");
            prompt.push_str(&search_digest(results));
        }
    }
    if let Some(context) = file_context {
        prompt.push_str("\nSupplied context:\n");
        prompt.push_str(&context_digest(context));
        prompt.push('\n');
    }
    if let Some(draft) = prior_draft {
        prompt.push_str("\nDraft answer from the previous round (improve on it):\n");
        prompt.push_str(draft);
        prompt.push('\n');
    }
    prompt.push_str("\nAnswer the question from your assigned perspective.");
    prompt
}

/// Build the user prompt for the synthesis call.
///
/// On non-final rounds the model is asked to end with a
/// `VERDICT: final` or `VERDICT: continue` line; see [`parse_verdict`].
pub fn synthesis_prompt(
    query: &str,
    experts: &[ExpertResult],
    search_results: Option<&[SearchResult]>,
    last_round: bool,
) -> String {
    let mut prompt = format!("Question:\n{}\n\nExpert answers:\n", query);
    for expert in experts {
        match &expert.output {
            Some(output) => {
                prompt.push_str(&format!("--- {} ({}) ---\n{}\n", expert.name, expert.model, output));
            }
            None => {
                prompt.push_str(&format!(
                    "--- {} ({}) ---\n(unavailable: {})\n",
                    expert.name,
                    expert.model,
                    expert.error.as_deref().unwrap_or("failed")
                ));
            }
        }
    }
    if let Some(results) = search_results {
        if !results.is_empty() {
            prompt.push_str("\nWeb search evidence:\n");
            prompt.push_str(&search_digest(results));
        }
    }
    prompt.push_str("\nSynthesize the expert answers into one final answer.");
    if !last_round {
        prompt.push_str(
            "\nThen, on the very last line, write exactly `VERDICT: final` if the answer \
             is complete and well-supported, or `VERDICT: continue` if another round of \
             research and expert analysis would materially improve it.",
        );
    }
    prompt
}

/// Split a synthesis response into `(answer, is_final)`.
///
/// The verdict trailer is stripped from the answer. A missing or
/// malformed trailer counts as final, so a noncompliant model cannot
/// burn rounds.
pub fn parse_verdict(raw: &str) -> (String, bool) {
    let trimmed = raw.trim_end();
    if let Some(idx) = trimmed.rfind('\n') {
        let (body, last_line) = trimmed.split_at(idx);
        let last_line = last_line.trim_start();
        if let Some(verdict) = last_line.strip_prefix(VERDICT_PREFIX) {
            let is_final = !verdict.trim().eq_ignore_ascii_case("continue");
            return (body.trim_end().to_string(), is_final);
        }
    } else if let Some(verdict) = trimmed.trim_start().strip_prefix(VERDICT_PREFIX) {
        // Degenerate case: the whole response is a verdict line.
        let is_final = !verdict.trim().eq_ignore_ascii_case("continue");
        return (String::new(), is_final);
    }
    (trimmed.to_string(), true)
}

fn search_digest(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {} — {}\n   {}\n", i + 1, r.title, r.url, r.snippet))
        .collect()
}

fn context_digest(context: &Value) -> String {
    match context {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> Vec<SearchResult> {
        vec![SearchResult {
            title: "Arithmetic".to_string(),
            url: "https://a.test".to_string(),
            snippet: "2+2=4".to_string(),
        }]
    }

    #[test]
    fn test_expert_prompt_includes_evidence_and_context() {
        let context = serde_json::json!("notes about addition");
        let prompt = expert_prompt("What is 2+2?", Some(&results()), Some(&context), None);
        assert!(prompt.contains("What is 2+2?"));
        assert!(prompt.contains("https://a.test"));
        assert!(prompt.contains("notes about addition"));
        assert!(!prompt.contains("previous round"));
    }

    #[test]
    fn test_expert_prompt_carries_prior_draft() {
        let prompt = expert_prompt("q", None, None, Some("draft v1"));
        assert!(prompt.contains("draft v1"));
    }

    #[test]
    fn test_synthesis_prompt_marks_failed_experts() {
        let experts = vec![
            ExpertResult::ok("a", "m", "four"),
            ExpertResult::failed("b", "m", "timed out"),
        ];
        let prompt = synthesis_prompt("q", &experts, None, true);
        assert!(prompt.contains("four"));
        assert!(prompt.contains("unavailable: timed out"));
        assert!(!prompt.contains("VERDICT"));
    }

    #[test]
    fn test_synthesis_prompt_requests_verdict_on_non_final_rounds() {
        let prompt = synthesis_prompt("q", &[], None, false);
        assert!(prompt.contains("VERDICT: final"));
        assert!(prompt.contains("VERDICT: continue"));
    }

    #[test]
    fn test_parse_verdict_continue() {
        let (answer, is_final) = parse_verdict("The answer is 4.\nVERDICT: continue");
        assert_eq!(answer, "The answer is 4.");
        assert!(!is_final);
    }

    #[test]
    fn test_parse_verdict_final() {
        let (answer, is_final) = parse_verdict("The answer is 4.\nVERDICT: final");
        assert_eq!(answer, "The answer is 4.");
        assert!(is_final);
    }

    #[test]
    fn test_missing_verdict_defaults_to_final() {
        let (answer, is_final) = parse_verdict("The answer is 4.");
        assert_eq!(answer, "The answer is 4.");
        assert!(is_final);
    }
}
