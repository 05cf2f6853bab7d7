//! Fence reconstruction for raw code interpreter output
//!
//! The agent sometimes returns Python source inline with its prose. Lines are
//! classified one at a time and contiguous code runs are wrapped in
//! ```` ```python ```` fences. Heuristic only: the worst outcome is a missed
//! or spurious fence, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s+\S").unwrap());
static IMAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^!\[.*?\]\(.*?\)$").unwrap());
static EMPHASIS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\*{1,2}|_{1,2})\w").unwrap());
static NUMBERED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s+\*{0,2}\w").unwrap());
static METHOD_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*\.[a-z_]+\(").unwrap());
static CALL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*\(").unwrap());
static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-z]+.*\s+\w+").unwrap());
static PROSE_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(the |is |are |a |an |this |that |hazard|visible|image|worker)").unwrap()
});

const CODE_PREFIXES: &[&str] = &[
    "import ", "from ", "def ", "class ", "if ", "for ", "while ", "with ", "try:", "except",
    "plt.", "img.", "df.", "np.", "pd.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    /// Markdown structure; never code
    Markdown,
    Code,
    Prose,
    Other,
}

fn is_markdown(line: &str) -> bool {
    HEADING_RE.is_match(line)
        || IMAGE_RE.is_match(line)
        || line.contains("data:image/")
        || EMPHASIS_RE.is_match(line)
        || NUMBERED_RE.is_match(line)
}

fn is_code(line: &str) -> bool {
    CODE_PREFIXES.iter().any(|p| line.starts_with(p))
        || (line.contains('=')
            && !line.ends_with(':')
            && !["**", "*", "-", "•"].iter().any(|p| line.starts_with(p)))
        || line.contains("/mnt/data/")
        || METHOD_CALL_RE.is_match(line)
        || CALL_RE.is_match(line)
}

fn is_prose(line: &str) -> bool {
    if SENTENCE_RE.is_match(line) {
        let code_chars = ['(', ')', '=', '.', '/'];
        if !line.contains(code_chars) || PROSE_WORD_RE.is_match(line) {
            return true;
        }
    }
    ["- ", "* ", "• "].iter().any(|p| line.starts_with(p))
}

/// Classify one line. While a block is open a sentence ends it even when
/// it also looks like code, e.g. one that mentions a `/mnt/data/` path.
fn classify(line: &str, in_block: bool) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        LineKind::Blank
    } else if is_markdown(trimmed) {
        LineKind::Markdown
    } else if in_block && is_prose(trimmed) {
        LineKind::Prose
    } else if is_code(trimmed) {
        LineKind::Code
    } else if is_prose(trimmed) {
        LineKind::Prose
    } else {
        LineKind::Other
    }
}

/// Emit the open block wrapped in a fence. Trailing blank lines go after
/// the closing fence.
fn close_block<'a>(out: &mut Vec<&'a str>, block: &mut Vec<&'a str>) {
    if block.is_empty() {
        return;
    }
    let body_len = block
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(0, |idx| idx + 1);

    out.push("```python");
    out.extend_from_slice(&block[..body_len]);
    out.push("```");
    out.extend_from_slice(&block[body_len..]);
    block.clear();
}

/// Wrap runs of code-looking lines in fenced blocks.
///
/// Spans already inside a fence pass through untouched.
pub fn fence_code_blocks(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut in_existing_fence = false;

    for line in text.split('\n') {
        if line.trim_start().starts_with("```") {
            close_block(&mut out, &mut block);
            in_existing_fence = !in_existing_fence;
            out.push(line);
            continue;
        }
        if in_existing_fence {
            out.push(line);
            continue;
        }

        match classify(line, !block.is_empty()) {
            LineKind::Blank if block.is_empty() => out.push(line),
            LineKind::Blank | LineKind::Code => block.push(line),
            LineKind::Markdown | LineKind::Prose => {
                close_block(&mut out, &mut block);
                out.push(line);
            }
            LineKind::Other => {
                let after_blank = block.last().is_some_and(|l| l.trim().is_empty());
                if block.is_empty() || after_blank {
                    close_block(&mut out, &mut block);
                    out.push(line);
                } else {
                    block.push(line);
                }
            }
        }
    }
    close_block(&mut out, &mut block);

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_code_between_prose() {
        let text = "Here is the analysis of the image.\n\
                    import matplotlib.pyplot as plt\n\
                    img = plt.imread('/mnt/data/photo.png')\n\
                    plt.imshow(img)\n\
                    \n\
                    The image shows a worker.";
        let expected = "Here is the analysis of the image.\n\
                        ```python\n\
                        import matplotlib.pyplot as plt\n\
                        img = plt.imread('/mnt/data/photo.png')\n\
                        plt.imshow(img)\n\
                        ```\n\
                        \n\
                        The image shows a worker.";
        assert_eq!(fence_code_blocks(text), expected);
    }

    #[test]
    fn plain_text_is_untouched() {
        let text = "Hello there.\n\nNothing to see, just words\n- a bullet";
        assert_eq!(fence_code_blocks(text), text);
    }

    #[test]
    fn heading_closes_open_block() {
        assert_eq!(
            fence_code_blocks("print(x)\n## Results"),
            "```python\nprint(x)\n```\n## Results"
        );
    }

    #[test]
    fn blank_line_then_other_closes_block() {
        assert_eq!(
            fence_code_blocks("x = 1\n\n42 items"),
            "```python\nx = 1\n```\n\n42 items"
        );
    }

    #[test]
    fn other_lines_continue_block() {
        assert_eq!(
            fence_code_blocks("for row in rows:\n    print(row)\n    42"),
            "```python\nfor row in rows:\n    print(row)\n    42\n```"
        );
    }

    #[test]
    fn image_markup_is_never_code() {
        let text = "<img src=\"data:image/png;base64,AAAA\" alt=\"Generated Image\" />";
        assert_eq!(fence_code_blocks(text), text);
    }

    #[test]
    fn existing_fences_pass_through() {
        let text = "> banner\n\n```json\n{\n  \"request\": \"a = 1\"\n}\n```\n\n---";
        assert_eq!(fence_code_blocks(text), text);
    }

    #[test]
    fn sentence_with_path_closes_open_block() {
        assert_eq!(
            fence_code_blocks(
                "plt.savefig('/mnt/data/chart.png')\nThe chart is saved to /mnt/data/chart.png."
            ),
            "```python\nplt.savefig('/mnt/data/chart.png')\n```\nThe chart is saved to /mnt/data/chart.png."
        );
        // Outside a block the same sentence still reads as code
        assert_eq!(
            fence_code_blocks("The chart is saved to /mnt/data/chart.png."),
            "```python\nThe chart is saved to /mnt/data/chart.png.\n```"
        );
    }

    #[test]
    fn unterminated_block_is_flushed() {
        assert_eq!(fence_code_blocks("import os"), "```python\nimport os\n```");
    }
}
