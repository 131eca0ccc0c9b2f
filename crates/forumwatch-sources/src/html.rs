use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("valid regex")
});

/// Strip HTML tags, decode entities and collapse whitespace.
///
/// Tags become spaces so adjacent block elements do not run words together.
pub(crate) fn strip_html(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, " ");
    let decoded = ENTITY_RE.replace_all(&without_tags, |caps: &regex::Captures<'_>| {
        decode_entity(&caps[1]).map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "hellip" => Some('…'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "rsquo" => Some('’'),
        "lsquo" => Some('‘'),
        "rdquo" => Some('”'),
        "ldquo" => Some('“'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        assert_eq!(
            strip_html("<p>Treasury <b>grant</b></p>\n\n<p>second   para</p>"),
            "Treasury grant second para"
        );
    }

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(
            strip_html("AT&amp;T &lt;3 &#39;quoted&#x27; &quot;x&quot;"),
            "AT&T <3 'quoted' \"x\""
        );
    }

    #[test]
    fn unknown_entity_is_left_alone() {
        assert_eq!(strip_html("a &bogus; b"), "a &bogus; b");
    }

    #[test]
    fn tags_between_words_do_not_join_them() {
        assert_eq!(strip_html("one<br>two"), "one two");
    }
}
