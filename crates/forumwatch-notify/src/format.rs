//! Slack Block Kit payloads.

use serde_json::{json, Value};

use forumwatch_core::DetectionResult;

const PREVIEW_CHARS: usize = 300;
const ERROR_CHARS: usize = 500;

/// Block Kit alert for a triggered item.
#[must_use]
pub fn alert(result: &DetectionResult) -> Value {
    let item = &result.item;
    let category = if item.category.is_empty() {
        "N/A"
    } else {
        item.category.as_str()
    };

    json!({
        "text": format!("Governance Alert: {} ({})", item.title, item.source),
        "blocks": [
            {
                "type": "header",
                "text": {"type": "plain_text", "text": "Governance Alert", "emoji": true}
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("*{}*  |  <{}|{}>", item.source.to_uppercase(), item.url, item.title)
                }
            },
            {
                "type": "section",
                "fields": [
                    {"type": "mrkdwn", "text": format!("*Author*\n{}", item.author)},
                    {"type": "mrkdwn", "text": format!("*Category*\n{category}")},
                    {"type": "mrkdwn", "text": format!("*Keywords*\n{}", keywords_text(result))},
                    {"type": "mrkdwn", "text": format!("*Confidence*\n{:.1}", result.score)}
                ]
            },
            {"type": "divider"},
            {
                "type": "section",
                "text": {"type": "mrkdwn", "text": format!("*Preview*\n{}", preview(&item.body))}
            },
            {
                "type": "actions",
                "elements": [{
                    "type": "button",
                    "text": {"type": "plain_text", "text": "View Discussion", "emoji": true},
                    "url": item.url,
                    "style": "primary"
                }]
            }
        ]
    })
}

/// Block Kit message reporting a failed source.
#[must_use]
pub fn error_alert(source_name: &str, message: &str) -> Value {
    let truncated: String = message.chars().take(ERROR_CHARS).collect();
    json!({
        "text": format!("Forum Monitor Error: {source_name}"),
        "blocks": [
            {
                "type": "header",
                "text": {"type": "plain_text", "text": "Forum Monitor - Error"}
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!(
                        "*Source*: {source_name}\n*Error*: {truncated}\n\nThe monitor will retry on the next cycle."
                    )
                }
            }
        ]
    })
}

#[must_use]
pub fn test_message() -> Value {
    json!({
        "text": "Forum Governance Monitor - Test Notification",
        "blocks": [{
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": "*Forum Governance Monitor* is connected and working!\nYou'll receive alerts here when governance or security discussions are detected."
            }
        }]
    })
}

/// `*group*: text, text` per group, groups in first-match order, each matched
/// text listed once.
fn keywords_text(result: &DetectionResult) -> String {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for m in &result.matches {
        let idx = match groups.iter().position(|(g, _)| *g == m.group) {
            Some(idx) => idx,
            None => {
                groups.push((m.group.as_str(), Vec::new()));
                groups.len() - 1
            }
        };
        let texts = &mut groups[idx].1;
        if !texts.contains(&m.matched_text.as_str()) {
            texts.push(m.matched_text.as_str());
        }
    }

    if groups.is_empty() {
        return "N/A".to_string();
    }
    groups
        .iter()
        .map(|(group, texts)| format!("*{group}*: {}", texts.join(", ")))
        .collect::<Vec<_>>()
        .join(", ")
}

fn preview(body: &str) -> String {
    let mut out: String = body.chars().take(PREVIEW_CHARS).collect();
    if body.chars().nth(PREVIEW_CHARS).is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use forumwatch_core::{ContentItem, ItemId, MatchLocation, MatchRecord};

    use super::*;

    fn result(body: &str, matches: Vec<MatchRecord>) -> DetectionResult {
        DetectionResult {
            item: ContentItem {
                id: ItemId::new("arbitrum", "7"),
                source: "arbitrum".to_string(),
                topic_id: "7".to_string(),
                title: "Treasury proposal".to_string(),
                body: body.to_string(),
                author: "alice".to_string(),
                category: "Governance".to_string(),
                url: "https://forum.example/t/treasury-proposal/7".to_string(),
                created_at: Utc::now(),
                reply_count: 0,
                like_count: 0,
            },
            triggered: true,
            score: 3.0,
            matches,
        }
    }

    fn m(group: &str, text: &str, location: MatchLocation) -> MatchRecord {
        MatchRecord {
            group: group.to_string(),
            pattern: text.to_lowercase(),
            location,
            matched_text: text.to_string(),
        }
    }

    #[test]
    fn alert_has_expected_block_layout() {
        let payload = alert(&result("body", vec![m("governance", "Treasury", MatchLocation::Title)]));
        let blocks = payload["blocks"].as_array().unwrap();
        let types: Vec<&str> = blocks.iter().map(|b| b["type"].as_str().unwrap()).collect();
        assert_eq!(types, ["header", "section", "section", "divider", "section", "actions"]);
        assert_eq!(
            blocks[1]["text"]["text"],
            "*ARBITRUM*  |  <https://forum.example/t/treasury-proposal/7|Treasury proposal>"
        );
        assert_eq!(blocks[2]["fields"][3]["text"], "*Confidence*\n3.0");
        assert_eq!(
            blocks[5]["elements"][0]["url"],
            "https://forum.example/t/treasury-proposal/7"
        );
        assert_eq!(payload["text"], "Governance Alert: Treasury proposal (arbitrum)");
    }

    #[test]
    fn keywords_are_grouped_and_deduplicated() {
        let r = result(
            "",
            vec![
                m("governance", "Treasury", MatchLocation::Title),
                m("security", "exploit", MatchLocation::Body),
                m("governance", "Treasury", MatchLocation::Body),
                m("governance", "vote", MatchLocation::Body),
            ],
        );
        assert_eq!(
            keywords_text(&r),
            "*governance*: Treasury, vote, *security*: exploit"
        );
    }

    #[test]
    fn no_matches_render_as_not_available() {
        assert_eq!(keywords_text(&result("", Vec::new())), "N/A");
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let long = "x".repeat(301);
        assert_eq!(preview(&long), format!("{}...", "x".repeat(300)));
        assert_eq!(preview(&"y".repeat(300)), "y".repeat(300));
    }

    #[test]
    fn error_alert_truncates_message() {
        let payload = error_alert("arbitrum", &"e".repeat(600));
        let text = payload["blocks"][1]["text"]["text"].as_str().unwrap();
        assert!(text.contains(&format!("*Error*: {}\n", "e".repeat(500))));
        assert!(!text.contains(&"e".repeat(501)));
    }
}
