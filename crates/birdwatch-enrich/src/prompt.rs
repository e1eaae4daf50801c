//! Analysis prompt construction.

use birdwatch_db::PostRow;

use crate::types::AnalysisItem;

/// The closed sentiment vocabulary the model is instructed to use.
pub const SENTIMENT_LABELS: [&str; 9] = [
    "hateful",
    "angry",
    "happy",
    "neutral",
    "innovative",
    "excited",
    "sad",
    "concerned",
    "teaching",
];

pub(crate) const SYSTEM_PROMPT: &str =
    "You are a post analysis system. Return only valid JSON matching the specified format exactly.";

/// Builds the batch analysis prompt, embedding each post's id, text,
/// author, and timestamp as JSON.
pub(crate) fn build_analysis_prompt(posts: &[PostRow]) -> String {
    let items: Vec<AnalysisItem<'_>> = posts
        .iter()
        .map(|post| AnalysisItem {
            id: &post.post_id,
            text: &post.text,
            author: &post.author,
            timestamp: post.created_at.to_rfc3339(),
        })
        .collect();

    // Serialization of these borrowed string fields cannot fail.
    let items_json = serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Analyze these {count} posts and return a JSON object with an "analyses" array containing analysis for each post.

For each post provide:
1. A brief summary (max 50 words)
2. The emotional tone/sentiment (one of: {labels})
3. A category describing the post's nature (e.g., news, opinion, announcement, discussion)

Expected JSON format:
{{
    "analyses": [
        {{
            "id": "post_id",
            "summary": "brief summary",
            "sentiment": "emotional_tone",
            "category": "post_category"
        }}
    ]
}}

Posts to analyze: {items_json}"#,
        count = posts.len(),
        labels = SENTIMENT_LABELS.join(", "),
    )
}
