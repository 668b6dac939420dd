//! Answer clean-up
//!
//! Models served through different runtimes leak control tokens, channel
//! markers and odd fence tags, and sometimes return bare code without
//! fences. These passes turn the raw text into predictable markdown.

use once_cell::sync::Lazy;
use regex::Regex;

/// Caption placed above code that arrived without any lead text
pub const CODE_CAPTION: &str = "Here’s the code you asked for:";

static FENCE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(```|~~~)(?:python_user_visible|py)\b").expect("fence tag pattern is valid")
});

static PYTHON_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:from|import|class|def|#|try:|except|finally:|with\b|for\b|while\b|if\b|@|Glyphs\b|GS(?:Font|Glyph|Layer|Path)\b|[A-Za-z_]\w*\s*=)",
    )
    .expect("python cue pattern is valid")
});

static CONTROL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\|[^|>]{0,80}\|>").expect("control token pattern is valid"));

static CHANNEL_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:analysis|commentary|final)\s+to=\S+(?:\s+code)?")
        .expect("channel marker pattern is valid")
});

/// Rewrite `py` / `python_user_visible` fence tags to `python`
pub fn normalize_fence_tags(text: &str) -> String {
    FENCE_TAG.replace_all(text, "${1}python").into_owned()
}

/// Wrap unfenced Python in a ```` ```python ```` block
///
/// Text that already contains a fence only gets its tags normalised. Text
/// with fewer than two Python-looking lines is returned trimmed.
pub fn normalize_model_markdown(text: &str) -> String {
    let s = text.trim();
    if s.is_empty() {
        return String::new();
    }
    if s.contains("```") || s.contains("~~~") {
        return normalize_fence_tags(s);
    }

    let lines: Vec<&str> = s.lines().collect();
    let hits = lines.iter().filter(|l| PYTHON_CUE.is_match(l)).count();
    if hits < 2 {
        return s.to_string();
    }

    let start = lines
        .iter()
        .position(|l| PYTHON_CUE.is_match(l))
        .unwrap_or(0);
    let lead = lines[..start].join("\n").trim().to_string();
    let body = lines[start..].join("\n").trim().to_string();
    let intro = if lead.is_empty() {
        CODE_CAPTION
    } else {
        lead.as_str()
    };

    format!("{}\n\n```python\n{}\n```", intro, body)
}

/// Strip control tokens and channel markers, normalise fence tags, trim
pub fn sanitize_output(text: &str) -> String {
    let s = CONTROL_TOKEN.replace_all(text, "");
    let s = CHANNEL_MARKER.replace_all(&s, "");
    normalize_fence_tags(&s).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_untouched() {
        let text = "  Kerning groups live on the glyph.\nUse the Kerning window.  ";
        assert_eq!(
            normalize_model_markdown(text),
            "Kerning groups live on the glyph.\nUse the Kerning window."
        );
        assert_eq!(normalize_model_markdown("   "), "");
    }

    #[test]
    fn test_single_cue_line_is_not_code() {
        let text = "if you want, open the font first.\nThen run the macro.";
        assert_eq!(normalize_model_markdown(text), text);
    }

    #[test]
    fn test_bare_code_gets_caption() {
        let text = "font = Glyphs.font\nfor glyph in font.glyphs:\n    print(glyph.name)";
        assert_eq!(
            normalize_model_markdown(text),
            format!("{}\n\n```python\n{}\n```", CODE_CAPTION, text)
        );
    }

    #[test]
    fn test_lead_text_is_kept() {
        let text = "This prints every glyph name.\n\nfont = Glyphs.font\nfor g in font.glyphs:\n    print(g.name)";
        let out = normalize_model_markdown(text);
        assert!(out.starts_with("This prints every glyph name.\n\n```python\nfont = Glyphs.font\n"));
        assert!(out.ends_with("print(g.name)\n```"));
    }

    #[test]
    fn test_existing_fences_only_get_tags_fixed() {
        let text = "Here:\n```py\nprint(1)\n```\n~~~python_user_visible\nx = 1\n~~~";
        assert_eq!(
            normalize_model_markdown(text),
            "Here:\n```python\nprint(1)\n```\n~~~python\nx = 1\n~~~"
        );
        // Already-correct tags are not mangled
        assert_eq!(
            normalize_fence_tags("```python\nx\n```"),
            "```python\nx\n```"
        );
    }

    #[test]
    fn test_sanitize_output() {
        let raw = "<|channel|>final to=user code Hello\n```py\nprint(1)\n```<|end|>  ";
        assert_eq!(sanitize_output(raw), "Hello\n```python\nprint(1)\n```");
    }

    #[test]
    fn test_sanitize_keeps_long_angle_spans() {
        let long = format!("<|{}|>", "a".repeat(81));
        assert_eq!(sanitize_output(&long), long);
        assert_eq!(sanitize_output("Analysis to=python done"), "done");
    }
}
