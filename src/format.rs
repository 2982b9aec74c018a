//! Response formatting.
//!
//! Provider replies are plain text with loose markdown. [`format_response`]
//! applies a fixed, ordered sequence of textual substitutions so that the
//! markdown renderer sees list items, headings and emphasis where the model
//! meant them. The rules are heuristics: they are not idempotent, and running
//! them twice may insert more whitespace.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// A `•` bullet, with any horizontal whitespace around it.
static BULLET_GLYPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*•[ \t]*").expect("bullet glyph regex"));

/// A `*` or `-` bullet that follows text on the same line. A hyphen between
/// two numbers is a range and is left alone by [`break_bullets`].
static INLINE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S)[ \t]+([*-])[ \t]+").expect("inline bullet regex"));

/// A one- or two-digit numbered marker that follows text on the same line.
///
/// The match consumes the first character of the item, so a one-character
/// item hides the next marker until [`break_numbered`] runs it again.
static INLINE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\S)[ \t]+(\d{1,2})\.[ \t]*([^\s\d])").expect("inline number regex")
});

/// A numbered marker at the start of a line with no space after the dot.
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\d{1,2})\.([^\s\d])").expect("leading number regex"));

/// A header keyword, optionally bolded.
static HEADER_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t]*(?:\*\*)?\b(Warning|Important|Note):(?:\*\*)?").expect("header regex")
});

/// A `**strong**` span on a single line.
static STRONG_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]+?)\*\*").expect("strong span regex"));

/// Three or more newlines, possibly with blank-line whitespace between them.
static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("newline regex"));

/// Normalize a raw provider reply for markdown rendering.
///
/// The steps run in this order:
///
/// 1. bullet markers start their own line;
/// 2. numbered markers start their own line and get a space after the dot;
/// 3. `Warning:`, `Important:` and `Note:` become `###` headings;
/// 4. `**emphasis**` is padded with spaces where it touches other text,
///    unless the marker sits inside a single word;
/// 5. runs of blank lines collapse and the result is trimmed.
///
/// ```
/// use aidsnap::format_response;
///
/// assert_eq!(format_response("Warning: stop"), "### Warning: stop");
/// assert_eq!(format_response("1.First 2.Second"), "1. First\n2. Second");
/// ```
pub fn format_response(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = break_bullets(&text);
    let text = break_numbered(&text);
    let text = coerce_headers(&text);
    let text = pad_emphasis(&text);
    EXCESS_NEWLINES
        .replace_all(&text, "\n\n")
        .trim()
        .to_string()
}

fn break_bullets(text: &str) -> String {
    let text = BULLET_GLYPH.replace_all(text, "\n- ");
    INLINE_BULLET
        .replace_all(&text, |caps: &Captures<'_>| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let before = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let marker = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let after = caps
                .get(0)
                .and_then(|m| text[m.end()..].chars().next());
            let is_range = marker == "-"
                && before.chars().all(|c| c.is_ascii_digit())
                && after.is_some_and(|c| c.is_ascii_digit());
            if is_range {
                whole.to_string()
            } else {
                format!("{before}\n{marker} ")
            }
        })
        .into_owned()
}

fn break_numbered(text: &str) -> String {
    let mut text = text.to_string();
    loop {
        let next = INLINE_NUMBER.replace_all(&text, "$1\n$2. $3").into_owned();
        if next == text {
            break;
        }
        text = next;
    }
    LEADING_NUMBER.replace_all(&text, "$1. $2").into_owned()
}

fn coerce_headers(text: &str) -> String {
    HEADER_KEYWORD
        .replace_all(text, "\n\n### $1:")
        .into_owned()
}

fn pad_emphasis(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for caps in STRONG_SPAN.captures_iter(text) {
        let Some(span) = caps.get(0) else {
            continue;
        };
        let inner = inner_text(&caps);
        let before = text[..span.start()].chars().next_back();
        let after = text[span.end()..].chars().next();

        out.push_str(&text[last..span.start()]);
        if needs_padding_before(before, inner.chars().next()) {
            out.push(' ');
        }
        out.push_str(span.as_str());
        if needs_padding_after(inner.chars().next_back(), after) {
            out.push(' ');
        }
        last = span.end();
    }
    out.push_str(&text[last..]);
    out
}

fn inner_text<'a>(caps: &Captures<'a>) -> &'a str {
    caps.get(1).map(|m| m.as_str()).unwrap_or_default()
}

fn needs_padding_before(before: Option<char>, first_inner: Option<char>) -> bool {
    match (before, first_inner) {
        (Some(b), _) if b.is_whitespace() || is_opening(b) => false,
        (Some(b), Some(i)) if b.is_alphanumeric() && i.is_alphanumeric() => false,
        (Some(_), _) => true,
        (None, _) => false,
    }
}

fn needs_padding_after(last_inner: Option<char>, after: Option<char>) -> bool {
    match (last_inner, after) {
        (Some(i), Some(a)) if i.is_alphanumeric() && a.is_alphanumeric() => false,
        (_, Some(a)) => a.is_alphanumeric(),
        (_, None) => false,
    }
}

fn is_opening(c: char) -> bool {
    matches!(c, '(' | '[' | '{' | '"' | '\'' | '*' | '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_becomes_heading() {
        let out = format_response("Warning: stop");
        assert!(out.contains("### Warning:"));
        assert_eq!(out, "### Warning: stop");
    }

    #[test]
    fn header_keywords_mid_text_start_new_block() {
        let out = format_response("Rinse with water. Important: do not rub the eye.");
        assert_eq!(
            out,
            "Rinse with water.\n\n### Important: do not rub the eye."
        );
    }

    #[test]
    fn bolded_header_keyword_is_unwrapped() {
        let out = format_response("**Note:** keep the person warm");
        assert_eq!(out, "### Note: keep the person warm");
    }

    #[test]
    fn numbered_items_start_own_line() {
        let out = format_response("1.First 2.Second");
        assert_eq!(out, "1. First\n2. Second");
        for line in out.lines() {
            assert!(line.starts_with(char::is_numeric));
        }
    }

    #[test]
    fn numbered_items_after_sentence() {
        let out = format_response("Do this: 1. Cool the burn 2. Cover it");
        assert_eq!(out, "Do this:\n1. Cool the burn\n2. Cover it");
    }

    #[test]
    fn one_character_items_start_own_line() {
        assert_eq!(format_response("1.A 2.B 3.C"), "1. A\n2. B\n3. C");
        assert_eq!(
            format_response("Steps 1. Cool 2. X 3. Cover"),
            "Steps\n1. Cool\n2. X\n3. Cover"
        );
    }

    #[test]
    fn long_numbers_and_decimals_are_left_alone() {
        assert_eq!(format_response("Call 911. Then wait"), "Call 911. Then wait");
        assert_eq!(format_response("Take 2.5 mg"), "Take 2.5 mg");
    }

    #[test]
    fn bullets_start_own_line() {
        assert_eq!(
            format_response("Remember RICE: • Rest • Ice"),
            "Remember RICE:\n- Rest\n- Ice"
        );
        assert_eq!(
            format_response("Signs: - redness - swelling"),
            "Signs:\n- redness\n- swelling"
        );
    }

    #[test]
    fn numeric_ranges_are_not_bullets() {
        assert_eq!(format_response("Wait 5 - 10 minutes"), "Wait 5 - 10 minutes");
        assert_eq!(format_response("Take 1 - 2 tablets"), "Take 1 - 2 tablets");
        assert_eq!(
            format_response("Cool it for 10 - 20 minutes - then cover"),
            "Cool it for 10 - 20 minutes\n- then cover"
        );
    }

    #[test]
    fn letter_to_letter_emphasis_is_unpadded() {
        assert_eq!(
            format_response("**bold**and**more**"),
            "**bold**and**more**"
        );
        assert_eq!(format_response("un**believ**able"), "un**believ**able");
    }

    #[test]
    fn emphasis_touching_punctuation_is_padded() {
        assert_eq!(
            format_response("Step:**Call for help**now"),
            "Step: **Call for help**now"
        );
        assert_eq!(
            format_response("**Stay calm:**breathe slowly"),
            "**Stay calm:** breathe slowly"
        );
    }

    #[test]
    fn emphasis_with_spaces_is_unchanged() {
        assert_eq!(
            format_response("Apply **firm pressure** to the wound."),
            "Apply **firm pressure** to the wound."
        );
    }

    #[test]
    fn blank_lines_collapse_and_trim() {
        assert_eq!(format_response("\n\nA\n\n\n\nB\n"), "A\n\nB");
    }

    #[test]
    fn never_fails_on_odd_input() {
        assert_eq!(format_response(""), "");
        assert_eq!(format_response("****"), "****");
        assert_eq!(format_response("**unterminated"), "**unterminated");
    }

    #[test]
    fn reformatting_is_not_guaranteed_to_be_a_no_op() {
        let once = format_response("Note: rest");
        let twice = format_response(&once);
        assert!(twice.contains("Note:"));
    }
}
