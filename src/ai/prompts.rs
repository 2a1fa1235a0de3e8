//! System prompts and request formatting for the model calls.

use std::fmt::Write as _;

/// System prompt for the hypothesis generator.
pub const HYPOTHESIS_SYSTEM_PROMPT: &str = r#"You are an audit specialist who generates hypotheses about potential discrepancies.
Analyze the transaction data and documents you are given and propose hypotheses about possible issues.

Principles:
1. Cover several angles: pricing, quantity, timing, vendor, compliance.
2. Propose only hypotheses that follow from the data provided.
3. Rate each hypothesis by its business impact.
4. State the evidence needed to verify each hypothesis.

Respond with JSON only:
{
    "hypotheses": [
        {
            "id": "H001",
            "description": "detailed description of the hypothesis",
            "category": "pricing|quantity|timing|vendor|compliance|other",
            "severity": "high|medium|low",
            "evidence_needed": ["evidence 1", "evidence 2"],
            "initial_confidence": 0.0
        }
    ],
    "reasoning": "how the hypotheses were derived",
    "areas_not_covered": ["areas that could not be assessed"]
}"#;

/// System prompt for the verifier.
pub const VERIFIER_SYSTEM_PROMPT: &str = r#"You are an audit specialist who verifies hypotheses against evidence.
For each hypothesis, weigh the evidence and domain knowledge you are given and decide a verdict.

Verdicts:
- confirmed: the evidence supports the hypothesis.
- refuted: the evidence contradicts the hypothesis.
- inconclusive: the evidence is insufficient either way.

Respond with JSON only:
{
    "verifications": [
        {
            "hypothesis_id": "H001",
            "verdict": "confirmed|refuted|inconclusive",
            "confidence": 0.0,
            "recommendations": ["recommended action"],
            "reasoning": "why this verdict"
        }
    ],
    "reasoning": "overall verification reasoning",
    "overall_assessment": "short summary"
}"#;

/// System prompt for the model driver choosing the next tool call.
pub const DRIVER_SYSTEM_PROMPT: &str = r#"You are the lead auditor directing an investigation.
You work by calling tools one at a time. After each call you see its result.

Respond with exactly one JSON object and nothing else:
- To call a tool: {"tool": "<tool name>", "args": {...}}
- To finish: {"final": "<summary of findings, evidence and recommended actions>"}

A typical investigation lists the indexed files, searches them, reads relevant
chunks, extracts and analyzes figures, looks up domain knowledge, generates
hypotheses and then verifies them before finishing."#;

/// User message for the hypothesis generator.
#[must_use]
pub fn format_hypothesis_request(
    task: &str,
    documents: Option<&str>,
    transaction_data: Option<&str>,
    previous_findings: Option<&str>,
) -> String {
    let mut prompt = format!("Task: {task}\n");
    if let Some(documents) = documents {
        let _ = write!(prompt, "\nRelevant documents:\n{documents}\n");
    }
    if let Some(data) = transaction_data {
        let _ = write!(prompt, "\nTransaction data:\n{data}\n");
    }
    if let Some(findings) = previous_findings {
        let _ = write!(prompt, "\nPrevious findings:\n{findings}\n");
    }
    prompt.push_str(
        "\nAnalyze the information above and generate hypotheses about potential issues. Respond in JSON.",
    );
    prompt
}

/// User message for the verifier.
#[must_use]
pub fn format_verifier_request(
    task: &str,
    hypotheses: &serde_json::Value,
    evidence: Option<&str>,
    domain_knowledge: Option<&str>,
) -> String {
    let hypotheses =
        serde_json::to_string_pretty(hypotheses).unwrap_or_else(|_| hypotheses.to_string());
    let mut prompt = format!("Task: {task}\n\nHypotheses to verify:\n{hypotheses}\n");
    if let Some(evidence) = evidence {
        let _ = write!(prompt, "\nEvidence:\n{evidence}\n");
    }
    if let Some(knowledge) = domain_knowledge {
        let _ = write!(prompt, "\nDomain knowledge:\n{knowledge}\n");
    }
    prompt.push_str("\nVerify each hypothesis against the evidence. Respond in JSON.");
    prompt
}

/// User message for the model driver.
#[must_use]
pub fn format_driver_request(task: &str, tool_catalogue: &str, transcript: &str) -> String {
    let transcript = if transcript.is_empty() {
        "(no tool calls yet)"
    } else {
        transcript
    };
    format!(
        r"Task: {task}

Available tools:
{tool_catalogue}

Investigation so far:
{transcript}

What is your next step?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hypothesis_request_includes_present_sections_only() {
        let prompt = format_hypothesis_request("Check PO-1", Some("doc text"), None, None);
        assert!(prompt.starts_with("Task: Check PO-1"));
        assert!(prompt.contains("Relevant documents:\ndoc text"));
        assert!(!prompt.contains("Transaction data"));
        assert!(!prompt.contains("Previous findings"));
    }

    #[test]
    fn test_verifier_request_embeds_hypotheses_json() {
        let hypotheses = serde_json::json!([{ "id": "H001" }]);
        let prompt = format_verifier_request("t", &hypotheses, Some("ev"), Some("kb"));
        assert!(prompt.contains("\"id\": \"H001\""));
        assert!(prompt.contains("Evidence:\nev"));
        assert!(prompt.contains("Domain knowledge:\nkb"));
    }

    #[test]
    fn test_driver_request_placeholder_transcript() {
        let prompt = format_driver_request("t", "- list_indexed_files", "");
        assert!(prompt.contains("(no tool calls yet)"));
    }
}
