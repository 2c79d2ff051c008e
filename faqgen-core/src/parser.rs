//! FAQ parser for free-form generated text.
//!
//! A line opens a new entry when it starts with an enumeration marker such as
//! `3.`, `Q3.`, `Q3:`, `**3.**`, or `### 3)`. The lines that follow, up to the
//! next opening line, form the answer; a leading `A3.` or `A3:` label on an
//! answer line is stripped. Text before the first opening line is preamble and
//! is dropped. Input with no opening line yields no entries.

use crate::types::QaPair;
use regex::Regex;
use std::sync::LazyLock;

static QUESTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:#{1,6}\s+)?(?:\*\*|__)?(?:[Qq]\s?\d+\s*[.):]|\d+\s*[.)])(?:\*\*|__)?(?:\s+(.*?))?\s*$",
    )
    .expect("question marker pattern compiles")
});

static ANSWER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*|__)?[Aa]\s?\d+\s*[.):](?:\*\*|__)?\s*")
        .expect("answer label pattern compiles")
});

/// Text after the marker on an opening line, or `None` for other lines.
fn question_text(line: &str) -> Option<String> {
    let caps = QUESTION_MARKER.captures(line)?;
    let text = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    Some(
        text.trim_end_matches("**")
            .trim_end_matches("__")
            .trim()
            .to_string(),
    )
}

/// Split generated text into ordered question/answer pairs.
///
/// Never fails: malformed input produces fewer (possibly zero) entries.
pub fn parse_faq(raw: &str) -> Vec<QaPair> {
    let mut entries = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(question) = question_text(trimmed) {
            if let Some((q, answer)) = current.take() {
                entries.push(QaPair::new(q, answer.join(" ")));
            }
            current = Some((question, Vec::new()));
        } else if let Some((_, answer)) = current.as_mut() {
            let text = ANSWER_LABEL.replace(trimmed, "");
            let text = text.trim();
            if !text.is_empty() {
                answer.push(text.to_string());
            }
        }
    }
    if let Some((q, answer)) = current {
        entries.push(QaPair::new(q, answer.join(" ")));
    }
    entries
}

/// Render pairs back into the numbered text layout the parser reads.
pub fn render_faq(pairs: &[QaPair], start_index: usize) -> String {
    pairs
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}\n{}", start_index + i, p.question, p.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_well_formed_q_markers() {
        let text = "Q1. What is it?\nA tool.\nQ2. Who uses it?\nDevelopers.\nQ3. Is it free?\nYes.\nQ4. Where is it?\nOn GitHub.\nQ5. How do I start?\nRead the docs.";
        let pairs = parse_faq(text);
        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[0], QaPair::new("What is it?", "A tool."));
        assert_eq!(pairs[4], QaPair::new("How do I start?", "Read the docs."));
    }

    #[test]
    fn test_parse_labelled_answers() {
        let text = "Q1. What is it?\nA1. A tool.\nQ2. Why?\nA2. Because.";
        assert_eq!(
            parse_faq(text),
            vec![
                QaPair::new("What is it?", "A tool."),
                QaPair::new("Why?", "Because."),
            ]
        );
    }

    #[test]
    fn test_parse_colon_labels_and_multiline_answers() {
        let text = "Here you go.\n\nQ6: How is data stored?\nA6: In a log.\nIt is append-only.\n\n**Q7.** Can I compact it?\n**A7.** Yes.";
        assert_eq!(
            parse_faq(text),
            vec![
                QaPair::new("How is data stored?", "In a log. It is append-only."),
                QaPair::new("Can I compact it?", "Yes."),
            ]
        );
    }

    #[test]
    fn test_other_letter_prefixes_do_not_open_entries() {
        let pairs = parse_faq("Q1. Which version?\nV2. It ships in v2.\nB12 boards are unsupported.");
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            pairs[0].answer,
            "V2. It ships in v2. B12 boards are unsupported."
        );
    }

    #[test]
    fn test_parse_numeric_markers_with_preamble() {
        let text = "Sure! Here are the FAQs you asked for:\n\n6. How does replication work?\nEach key has a leader.\n\n7. What happens on failure?\nA new leader is elected.\n";
        let pairs = parse_faq(text);
        assert_eq!(
            pairs,
            vec![
                QaPair::new("How does replication work?", "Each key has a leader."),
                QaPair::new("What happens on failure?", "A new leader is elected."),
            ]
        );
    }

    #[test]
    fn test_multiline_answers_are_space_joined() {
        let text = "1. Why?\nBecause the leader\n\n   processes writes first.\nThen it replicates.";
        let pairs = parse_faq(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            pairs[0].answer,
            "Because the leader processes writes first. Then it replicates."
        );
    }

    #[test]
    fn test_markdown_decorated_markers() {
        let text = "### 1. First question?\nFirst answer.\n**2. Second question?**\nSecond answer.\n**3.** Third question?\nThird answer.\n4) Fourth question?\nFourth answer.\n5 . Fifth question?\nFifth answer.";
        let questions: Vec<String> = parse_faq(text).into_iter().map(|p| p.question).collect();
        assert_eq!(
            questions,
            vec![
                "First question?",
                "Second question?",
                "Third question?",
                "Fourth question?",
                "Fifth question?",
            ]
        );
    }

    #[test]
    fn test_no_markers_yields_empty() {
        assert!(parse_faq("Just some prose.\nWith no numbering at all.").is_empty());
        assert!(parse_faq("").is_empty());
        assert!(parse_faq("\n\n   \n").is_empty());
    }

    #[test]
    fn test_numbers_inside_prose_do_not_open_entries() {
        let text = "1. How big is the limit?\nIt is 1.5 GB per key.\n2024 brought a new tier.";
        let pairs = parse_faq(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            pairs[0].answer,
            "It is 1.5 GB per key. 2024 brought a new tier."
        );
    }

    #[test]
    fn test_question_without_answer() {
        let pairs = parse_faq("1. Lonely question?\n2. Another?\nWith answer.");
        assert_eq!(pairs[0], QaPair::new("Lonely question?", ""));
        assert_eq!(pairs[1], QaPair::new("Another?", "With answer."));
    }

    #[test]
    fn test_render_then_parse_preserves_text() {
        let pairs = vec![
            QaPair::new("What is it?", "A tool."),
            QaPair::new("Why?", "Because."),
        ];
        let rendered = render_faq(&pairs, 11);
        assert!(rendered.starts_with("11. What is it?"));
        assert_eq!(parse_faq(&rendered), pairs);
    }
}
