use crate::models::TopicSuggestion;

pub const MAX_TAGS: usize = 10;

const SUMMARY_PREFIXES: [&str; 3] = ["概要：", "概要:", "概要 :"];

/// Read `### N. Title` headings and the `概要：` line that follows each one.
/// Separator lines, preambles and stray text are ignored.
pub fn parse_suggestions(text: &str) -> Vec<TopicSuggestion> {
    let mut suggestions: Vec<TopicSuggestion> = Vec::new();

    for line in strip_code_fence(text).lines() {
        let line = line.trim();

        if let Some(heading) = line.strip_prefix("###") {
            let title = strip_number(heading.trim()).trim().trim_matches('*').trim();
            if !title.is_empty() {
                suggestions.push(TopicSuggestion {
                    title: title.to_string(),
                    summary: None,
                });
            }
            continue;
        }

        let Some(current) = suggestions.last_mut() else {
            continue;
        };
        if let Some(summary) = SUMMARY_PREFIXES.iter().find_map(|p| line.strip_prefix(p)) {
            let summary = summary.trim();
            if !summary.is_empty() {
                current.summary = Some(summary.to_string());
            }
        }
    }

    suggestions
}

fn strip_number(heading: &str) -> &str {
    let rest = heading.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == heading.len() {
        return heading;
    }
    rest.strip_prefix('.')
        .or_else(|| rest.strip_prefix('．'))
        .or_else(|| rest.strip_prefix(')'))
        .unwrap_or(rest)
}

/// Split a comma separated tag list. Japanese commas count too.
pub fn parse_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in strip_code_fence(text).split([',', '、', '，', '\n']) {
        let tag = tag.trim().trim_start_matches('#').trim();
        if tag.is_empty() || tags.iter().any(|t| t == tag) {
            continue;
        }
        tags.push(tag.to_string());
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

/// Remove a ``` fence wrapping the whole reply, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };
    // drop the info string (```markdown)
    match inner.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => inner.trim(),
    }
}
