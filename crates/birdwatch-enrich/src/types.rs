//! Request payload items and response validation for post analysis.

use serde::{Deserialize, Serialize};

/// One post as embedded into the analysis prompt.
#[derive(Debug, Serialize)]
pub(crate) struct AnalysisItem<'a> {
    pub id: &'a str,
    pub text: &'a str,
    pub author: &'a str,
    pub timestamp: String,
}

/// The strict top-level response shape. A payload without an `analyses`
/// array fails deserialization and the whole batch with it.
#[derive(Debug, Deserialize)]
pub(crate) struct AnalysisPayload {
    pub analyses: Vec<Analysis>,
}

/// One analysis element, all fields optional at the wire level so that a
/// partial element can be skipped on its own.
#[derive(Debug, Deserialize)]
pub(crate) struct Analysis {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub category: Option<String>,
}

/// A validated element with all four fields present.
#[derive(Debug)]
pub(crate) struct CompleteAnalysis {
    pub id: String,
    pub summary: String,
    pub sentiment: String,
    pub category: String,
}

impl Analysis {
    /// Promotes the element when every field is present; `None` marks it
    /// for an individual skip.
    pub(crate) fn into_complete(self) -> Option<CompleteAnalysis> {
        Some(CompleteAnalysis {
            id: self.id?,
            summary: self.summary?,
            sentiment: self.sentiment?,
            category: self.category?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_element_promotes() {
        let analysis = Analysis {
            id: Some("1".to_string()),
            summary: Some("s".to_string()),
            sentiment: Some("happy".to_string()),
            category: Some("news".to_string()),
        };
        assert!(analysis.into_complete().is_some());
    }

    #[test]
    fn element_missing_sentiment_is_rejected() {
        let analysis = Analysis {
            id: Some("1".to_string()),
            summary: Some("s".to_string()),
            sentiment: None,
            category: Some("news".to_string()),
        };
        assert!(analysis.into_complete().is_none());
    }

    #[test]
    fn payload_without_analyses_key_fails_to_parse() {
        let result = serde_json::from_str::<AnalysisPayload>(r#"{"results": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_element_fields_are_ignored() {
        let payload: AnalysisPayload = serde_json::from_str(
            r#"{"analyses": [{"id": "9", "summary": "s", "sentiment": "sad",
                 "category": "opinion", "confidence": 0.9}]}"#,
        )
        .expect("extra fields should not break parsing");
        assert_eq!(payload.analyses.len(), 1);
    }
}
