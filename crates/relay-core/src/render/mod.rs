//! Display-ready text transforms
//!
//! Pure functions applied to the accumulated assistant text before it is
//! emitted. Order matters: citations are rewritten before fences are
//! reconstructed.

mod citations;
mod code_blocks;

pub use citations::format_citations;
pub use code_blocks::fence_code_blocks;

/// Apply every text transform in order.
pub fn post_process(text: &str) -> String {
    fence_code_blocks(&format_citations(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citations_then_fences() {
        let text = "Per the manual【1:0†site_rules.md】 check this.\nimport os";
        let out = post_process(text);
        assert!(out.starts_with(
            "Per the manual<sup>[1]</sup> check this.\n```python\nimport os\n```"
        ));
        assert!(out.ends_with("[1] *site rules*"));
    }

    #[test]
    fn identity_for_plain_text() {
        let text = "Just an answer.\n\nWith two paragraphs";
        assert_eq!(post_process(text), text);
    }
}
