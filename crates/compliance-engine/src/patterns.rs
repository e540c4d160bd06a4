//! Text assembly and keyword detection for product listings

use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{PolicyRule, Product};

lazy_static! {
    /// Markup tags in rich-text descriptions and metafields
    static ref HTML_TAG_PATTERN: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();

    static ref WHITESPACE_PATTERN: Regex = Regex::new(r"\s+").unwrap();
}

/// A rule that fired, with the keywords that triggered it (in rule order)
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule: PolicyRule,
    pub matching_keywords: Vec<String>,
}

/// Strip markup and collapse whitespace
pub fn plain_text(text: &str) -> String {
    let without_tags = HTML_TAG_PATTERN.replace_all(text, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    WHITESPACE_PATTERN.replace_all(&decoded, " ").trim().to_string()
}

/// Newline-joined title, description, tags and metafield values
pub fn product_text(product: &Product) -> String {
    let mut parts = vec![plain_text(&product.title), plain_text(&product.description)];
    parts.extend(product.tags.iter().map(|tag| plain_text(tag)));
    parts.extend(product.metafields.iter().map(|m| plain_text(&m.value)));
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Case-insensitive substring search of every rule keyword.
///
/// No word-boundary checks: "heal" matches "healing". False positives are
/// left for the AI stage and human review.
pub fn detect_matches(text: &str, rules: &[PolicyRule]) -> Vec<RuleMatch> {
    let text_lower = text.to_lowercase();

    rules
        .iter()
        .filter_map(|rule| {
            let matching_keywords: Vec<String> = rule
                .keywords
                .iter()
                .filter(|keyword| !keyword.is_empty())
                .filter(|keyword| text_lower.contains(&keyword.to_lowercase()))
                .cloned()
                .collect();

            if matching_keywords.is_empty() {
                None
            } else {
                Some(RuleMatch {
                    rule: rule.clone(),
                    matching_keywords,
                })
            }
        })
        .collect()
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

/// Lowercase, dash-separated identifier ("Medical Claims" -> "medical-claims")
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
