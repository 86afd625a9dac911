//! Healing requests and results.
//!
//! Healing is transient: nothing here is persisted and no stage is tracked.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::execution::{ExecutionResult, Failure};

/// Applied fix when a structured diagnosis carries no usable field.
pub const NO_DIAGNOSIS_DETAIL: &str = "The diagnosis agent returned no details.";

/// What the remote agent should act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealingScope {
    /// Rewrite the generated test file.
    Test,
    /// Diagnose the application code under test.
    Code,
}

impl HealingScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for HealingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence forwarded to the healing agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealingEvidence {
    /// Structured failure records.
    Failures(Vec<Failure>),
    /// Raw executor output.
    RawLog(Vec<String>),
}

impl HealingEvidence {
    /// Text payload sent over the wire.
    ///
    /// Failure records render as pretty JSON so the agent sees every field.
    pub fn render(&self) -> String {
        match self {
            Self::Failures(failures) => {
                serde_json::to_string_pretty(failures).unwrap_or_else(|_| {
                    failures
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("\n")
                })
            }
            Self::RawLog(lines) => lines.join("\n"),
        }
    }
}

/// A single user-initiated heal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealingRequest {
    pub scope: HealingScope,
    pub evidence: HealingEvidence,
    pub test_file_handle: Option<String>,
}

impl HealingRequest {
    /// Heal the test file using the selected failure, or all of them.
    pub fn for_test(result: &ExecutionResult, selected: Option<&Failure>) -> Self {
        let failures = selected.map_or_else(|| result.failures.clone(), |f| vec![f.clone()]);
        Self {
            scope: HealingScope::Test,
            evidence: HealingEvidence::Failures(failures),
            test_file_handle: result.test_file_handle.clone(),
        }
    }

    /// Diagnose application code from the raw log. The target source file is
    /// left for the remote agent to discover.
    pub fn for_code(result: &ExecutionResult) -> Self {
        Self {
            scope: HealingScope::Code,
            evidence: HealingEvidence::RawLog(result.raw_log.clone()),
            test_file_handle: None,
        }
    }

    pub fn from_result(scope: HealingScope, result: &ExecutionResult) -> Self {
        match scope {
            HealingScope::Test => Self::for_test(result, None),
            HealingScope::Code => Self::for_code(result),
        }
    }
}

/// Rewritten test file returned by the test healer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestHealReport {
    pub message: String,
    pub fixed_code: String,
}

/// Analysis returned by the code diagnosis agent.
///
/// The agent answers with model-written JSON, so every structured field is
/// optional and non-string values are kept as their JSON text. Anything that
/// is neither a string nor an object is carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Diagnosis {
    Text(String),
    Structured {
        #[serde(default, deserialize_with = "text_or_json")]
        explanation: Option<String>,
        #[serde(default, deserialize_with = "text_or_json")]
        recommendation: Option<String>,
        #[serde(default, deserialize_with = "text_or_json")]
        solution: Option<String>,
    },
    Other(serde_json::Value),
}

fn text_or_json<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
    .filter(|s| !s.trim().is_empty()))
}

/// Outcome of one heal attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HealingResult {
    Healed {
        applied_fix: String,
        explanation: Option<String>,
        recommendation: Option<String>,
    },
    Failed {
        reason: String,
    },
}

impl HealingResult {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Healed { .. })
    }
}

impl From<TestHealReport> for HealingResult {
    fn from(report: TestHealReport) -> Self {
        Self::Healed {
            applied_fix: report.fixed_code,
            explanation: Some(report.message).filter(|m| !m.is_empty()),
            recommendation: None,
        }
    }
}

impl From<Diagnosis> for HealingResult {
    /// The proposed solution becomes the applied fix, falling back to the
    /// explanation, then the recommendation, then the raw analysis.
    fn from(diagnosis: Diagnosis) -> Self {
        match diagnosis {
            Diagnosis::Structured {
                explanation,
                recommendation,
                solution,
            } => {
                let applied_fix = solution
                    .or_else(|| explanation.clone())
                    .or_else(|| recommendation.clone())
                    .unwrap_or_else(|| NO_DIAGNOSIS_DETAIL.to_string());
                Self::Healed {
                    applied_fix,
                    explanation,
                    recommendation,
                }
            }
            Diagnosis::Text(analysis) => Self::Healed {
                applied_fix: analysis,
                explanation: None,
                recommendation: None,
            },
            Diagnosis::Other(value) => Self::Healed {
                applied_fix: serde_json::to_string_pretty(&value)
                    .unwrap_or_else(|_| value.to_string()),
                explanation: None,
                recommendation: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> ExecutionResult {
        ExecutionResult {
            failures: vec![
                Failure::new("test_create_order", "assert 500 == 201"),
                Failure::new("test_list_products", "KeyError: 'price'"),
            ],
            raw_log: vec!["collected 2 items".to_string(), "2 failed".to_string()],
            test_file_handle: Some("tests/generated/test_shop.py".to_string()),
            ..ExecutionResult::default()
        }
    }

    #[test]
    fn test_for_test_uses_selected_failure() {
        let result = sample_result();
        let request = HealingRequest::for_test(&result, result.find_failure("test_list_products"));
        assert_eq!(request.scope, HealingScope::Test);
        assert_eq!(
            request.test_file_handle.as_deref(),
            Some("tests/generated/test_shop.py")
        );
        match &request.evidence {
            HealingEvidence::Failures(f) => {
                assert_eq!(f.len(), 1);
                assert_eq!(f[0].test_id, "test_list_products");
            }
            HealingEvidence::RawLog(_) => panic!("expected failure evidence"),
        }
    }

    #[test]
    fn test_for_code_uses_raw_log_without_target() {
        let request = HealingRequest::from_result(HealingScope::Code, &sample_result());
        assert!(request.test_file_handle.is_none());
        assert_eq!(request.evidence.render(), "collected 2 items\n2 failed");
    }

    #[test]
    fn test_failure_evidence_renders_json() {
        let request = HealingRequest::from_result(HealingScope::Test, &sample_result());
        let rendered = request.evidence.render();
        let parsed: Vec<Failure> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_diagnosis_untagged_forms() {
        let text: Diagnosis = serde_json::from_str("\"missing await in checkout\"").unwrap();
        assert_eq!(text, Diagnosis::Text("missing await in checkout".to_string()));

        let structured: Diagnosis = serde_json::from_str(
            r#"{"explanation":"e","recommendation":"r","solution":"s"}"#,
        )
        .unwrap();
        let result = HealingResult::from(structured);
        assert!(result.is_ok());
        match result {
            HealingResult::Healed { applied_fix, .. } => assert_eq!(applied_fix, "s"),
            HealingResult::Failed { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_partial_diagnosis_falls_back_to_explanation() {
        let partial: Diagnosis =
            serde_json::from_str(r#"{"explanation":"null deref in checkout"}"#).unwrap();
        assert_eq!(
            HealingResult::from(partial),
            HealingResult::Healed {
                applied_fix: "null deref in checkout".to_string(),
                explanation: Some("null deref in checkout".to_string()),
                recommendation: None,
            }
        );
    }

    #[test]
    fn test_diagnosis_non_string_fields_are_kept_as_json() {
        let diagnosis: Diagnosis = serde_json::from_str(
            r#"{"explanation":"bad total","recommendation":["round","validate"],"solution":null,"confidence":0.8}"#,
        )
        .unwrap();
        let HealingResult::Healed {
            applied_fix,
            recommendation,
            ..
        } = HealingResult::from(diagnosis)
        else {
            panic!("diagnosis should heal");
        };
        assert_eq!(applied_fix, "bad total");
        assert_eq!(recommendation.as_deref(), Some(r#"["round","validate"]"#));
    }

    #[test]
    fn test_diagnosis_other_shapes_are_pretty_printed() {
        let diagnosis: Diagnosis = serde_json::from_str(r#"["check", "the", "guard"]"#).unwrap();
        assert!(matches!(diagnosis, Diagnosis::Other(_)));
        let HealingResult::Healed { applied_fix, .. } = HealingResult::from(diagnosis) else {
            panic!("diagnosis should heal");
        };
        assert!(applied_fix.contains("\"guard\""));

        let empty: Diagnosis = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            HealingResult::from(empty),
            HealingResult::Healed { ref applied_fix, .. } if applied_fix == NO_DIAGNOSIS_DETAIL
        ));
    }
}
