//! Citation markers to numbered footnotes
//!
//! Markers look like `【4:0†safety_manual.md】` (the `⟦ ⟧` bracket pair is
//! accepted too). Each distinct source gets a number in order of first
//! appearance, and a sources section is appended at the end.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[【⟦](\d+):(\d+)†([^】⟧]*)[】⟧]").expect("citation pattern is valid")
});

static MULTI_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" {2,}").expect("space pattern is valid"));

const SOURCES_HEADER: &str = "\n\n---\n\n**📚 Sources:**\n";

/// Replace citation markers with `<sup>[n]</sup>` and append the sources list.
///
/// Text without markers comes back unchanged.
pub fn format_citations(text: &str) -> String {
    if !CITATION_RE.is_match(text) {
        return text.to_string();
    }

    let mut sources: Vec<String> = Vec::new();
    let replaced = CITATION_RE.replace_all(text, |caps: &Captures| {
        let source = caps[3].trim();
        if source.is_empty() {
            return String::new();
        }
        let number = match sources.iter().position(|s| s == source) {
            Some(idx) => idx + 1,
            None => {
                sources.push(source.to_string());
                sources.len()
            }
        };
        format!("<sup>[{number}]</sup>")
    });

    let mut result = MULTI_SPACE_RE.replace_all(&replaced, " ").into_owned();

    if !sources.is_empty() {
        result.push_str(SOURCES_HEADER);
        for (idx, source) in sources.iter().enumerate() {
            result.push_str(&format!("\n[{}] *{}*", idx + 1, display_name(source)));
        }
    }

    result
}

fn display_name(source: &str) -> String {
    let name = source.replace('_', " ");
    match name.strip_suffix(".md") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_sources_in_first_seen_order() {
        let text = "Wear gloves【4:0†safety_manual.md】 and goggles【4:1†ppe_guide.md】. \
                    Gloves again【5:2†safety_manual.md】.";
        let out = format_citations(text);

        assert!(out.starts_with(
            "Wear gloves<sup>[1]</sup> and goggles<sup>[2]</sup>. Gloves again<sup>[1]</sup>."
        ));
        assert!(out.ends_with(
            "\n\n---\n\n**📚 Sources:**\n\n[1] *safety manual*\n[2] *ppe guide*"
        ));
    }

    #[test]
    fn every_marker_becomes_a_footnote() {
        let text = "a【1:0†x.md】 b【1:1†y】 c【2:0†x.md】";
        let out = format_citations(text);
        assert!(!out.contains('【'));
        assert_eq!(out.matches("<sup>[").count(), 3);
        assert!(out.contains("\n[1] *x*"));
        assert!(out.contains("\n[2] *y*"));
        assert!(!out.contains("\n[3]"));
    }

    #[test]
    fn accepts_alternate_brackets() {
        let out = format_citations("See⟦3:1†hazards.md⟧ here");
        assert!(out.starts_with("See<sup>[1]</sup> here"));
        assert!(out.ends_with("[1] *hazards*"));
    }

    #[test]
    fn plain_text_is_untouched() {
        let text = "No  citations   here.\n\nDouble  spaces stay.";
        assert_eq!(format_citations(text), text);
    }

    #[test]
    fn empty_source_is_dropped_without_footnote() {
        let out = format_citations("Fact【1:0† 】  next");
        assert_eq!(out, "Fact next");
    }

    #[test]
    fn is_deterministic() {
        let text = "x【1:0†b.md】 y【1:1†a.md】";
        assert_eq!(format_citations(text), format_citations(text));
    }
}
