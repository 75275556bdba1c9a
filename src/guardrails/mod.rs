//! Question and context guardrails
//!
//! Pattern screens over the incoming question: prompt-injection phrasing and
//! requests for credentials/secrets close the retrieval gate. A guard trip is
//! never an error; it surfaces as notes on the response. A second pass over
//! the retrieved contexts can append further notes but does not reopen or
//! close the gate.

use crate::retrieval::ContextWindow;
use regex::RegexSet;

const INJECTION_PATTERNS: &[&str] = &[
    r"ignore previous",
    r"ignore all previous",
    r"system prompt",
    r"developer message",
    r"\breveal\b",
    r"\bsecret\b",
];

const EXFILTRATION_PATTERNS: &[&str] = &[
    r"\bcredentials?\b",
    r"\bpassword\b",
    r"\bapi[ _-]?key\b",
    r"\btoken\b",
    r"\bsecret\b",
];

/// Outcome of a guardrail pass
#[derive(Debug, Clone)]
pub struct GuardVerdict {
    pub notes: Vec<String>,
    pub allow_context: bool,
}

/// Compiled guardrail screens
pub struct Guardrails {
    injection: RegexSet,
    exfiltration: RegexSet,
}

impl Guardrails {
    pub fn new() -> Self {
        // Pattern lists are static and known-valid
        let case_insensitive = |patterns: &[&str]| {
            RegexSet::new(patterns.iter().map(|p| format!("(?i){p}")))
                .unwrap_or_else(|e| panic!("invalid guardrail pattern: {e}"))
        };

        Self {
            injection: case_insensitive(INJECTION_PATTERNS),
            exfiltration: case_insensitive(EXFILTRATION_PATTERNS),
        }
    }

    /// First pass: screen the question before any index is touched
    pub fn screen_question(&self, question: &str) -> GuardVerdict {
        let mut notes = Vec::new();
        let mut allow_context = true;

        if self.injection.is_match(question) {
            notes.push("Possible prompt injection detected.".to_string());
            allow_context = false;
        }
        if self.exfiltration.is_match(question) {
            notes.push("Request for sensitive data blocked.".to_string());
            allow_context = false;
        }

        GuardVerdict {
            notes,
            allow_context,
        }
    }

    /// Second pass: annotate the retrieved contexts
    ///
    /// Only appends notes; gating is decided by the question pass.
    pub fn screen_contexts(&self, window: &ContextWindow) -> Vec<String> {
        let flagged = window
            .candidates
            .iter()
            .filter(|c| self.exfiltration.is_match(&c.text))
            .count();

        if flagged > 0 {
            vec![format!(
                "{flagged} retrieved passage(s) mention credential-like terms."
            )]
        } else {
            Vec::new()
        }
    }
}

impl Default for Guardrails {
    fn default() -> Self {
        Self::new()
    }
}
