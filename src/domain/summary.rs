//! Summary domain types.
//!
//! Structured narrative records produced per category by the summarization
//! stage, either from the classifier backend or from a fixed template.

use serde::{Deserialize, Serialize};

use super::CategoryId;

/// Structured narrative returned by the summarizer.
///
/// Every field is optional on the wire so partially filled responses still
/// deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredSummary {
    /// Purpose or background of the correspondence.
    pub context: String,
    /// Concrete actions taken, one entry per step.
    pub actions: Vec<String>,
    /// Current status or outcome.
    pub result: String,
    /// Key parties or counterparts.
    pub parties: String,
    /// Factual remarks and risks.
    pub remarks: String,
    /// Recommended next steps.
    pub recommendations: String,
}

/// Summary of one category, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    /// Category this summary belongs to.
    pub category_id: CategoryId,
    /// Category display name.
    pub category_name: String,
    /// Human-readable date range of the category's messages.
    pub date_range: String,
    /// Up to ten participants in first-seen order.
    pub participants: Vec<String>,
    /// Total messages in the category.
    pub message_count: usize,
    /// Total attachments in the category.
    pub attachment_count: u32,
    /// Narrative fields.
    #[serde(flatten)]
    pub summary: StructuredSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_summary_tolerates_missing_fields() {
        let json = r#"{"context": "Hotel design review", "actions": ["1. Sent drawings"]}"#;
        let summary: StructuredSummary = serde_json::from_str(json).unwrap();

        assert_eq!(summary.context, "Hotel design review");
        assert_eq!(summary.actions, vec!["1. Sent drawings".to_string()]);
        assert!(summary.result.is_empty());
        assert!(summary.recommendations.is_empty());
    }

    #[test]
    fn category_summary_flattens_narrative() {
        let summary = CategorySummary {
            category_id: CategoryId::sequential(1),
            category_name: "Design".to_string(),
            date_range: "N/A".to_string(),
            participants: vec!["a@x.com".to_string()],
            message_count: 2,
            attachment_count: 0,
            summary: StructuredSummary {
                result: "Approved".to_string(),
                ..Default::default()
            },
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["result"], "Approved");
        assert_eq!(json["category_id"], "CAT_001");
    }
}
