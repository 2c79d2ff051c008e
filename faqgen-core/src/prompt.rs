//! Prompt construction for FAQ generation.

use crate::parser::render_faq;
use crate::types::QaPair;

/// Build the generation prompt for one document.
///
/// The backend is asked for `questions` entries numbered `start_index` through
/// `start_index + questions - 1`, each written as a numbered question line
/// followed by its answer, which is the layout [`crate::parser::parse_faq`]
/// reads back.
pub fn build_prompt(content: &str, start_index: usize, questions: usize) -> String {
    let last_index = start_index + questions.saturating_sub(1);
    let mut prompt = String::with_capacity(content.len() + 1024);

    prompt.push_str(&format!(
        "Generate {questions} frequently asked questions (FAQ) for the following content. "
    ));
    prompt.push_str(
        "Read the content first and pick the questions readers are most likely to ask, \
         focusing on the parts that are hardest to understand and most likely to need help. ",
    );
    prompt.push_str(
        "Write each question on its own line as a title, then answer it in the lines \
         directly below. Repeat this for every question, one after another. ",
    );
    prompt.push_str(&format!(
        "Number the questions from {start_index} to {last_index}.\n"
    ));
    prompt.push_str("For example:\n");
    prompt.push_str(&format!("{start_index}. How do I write a prompt?\n"));
    prompt.push_str("To write a prompt, you need to ...\n");
    if last_index > start_index {
        prompt.push_str(&format!("{last_index}. How do I edit a written prompt?\n"));
        prompt.push_str("Editing a prompt is easy, you need to ...\n");
    }
    prompt.push_str("\nContent :\n");
    prompt.push_str(content);
    prompt
}

/// Render a previous record's entries as prior context for regeneration.
pub fn prior_context(entries: &[QaPair], start_index: usize) -> Option<String> {
    if entries.is_empty() {
        None
    } else {
        Some(render_faq(entries, start_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_states_index_range() {
        let prompt = build_prompt("# Guide\nSome text.", 6, 5);
        assert!(prompt.starts_with("Generate 5 frequently asked questions"));
        assert!(prompt.contains("from 6 to 10"));
        assert!(prompt.contains("6. How do I write a prompt?"));
        assert!(prompt.contains("10. How do I edit a written prompt?"));
        assert!(prompt.ends_with("Content :\n# Guide\nSome text."));
    }

    #[test]
    fn test_single_question_prompt() {
        let prompt = build_prompt("text", 1, 1);
        assert!(prompt.contains("from 1 to 1"));
        assert!(!prompt.contains("edit a written prompt"));
    }

    #[test]
    fn test_prior_context() {
        assert!(prior_context(&[], 1).is_none());
        let context = prior_context(&[QaPair::new("Why?", "Because.")], 3).unwrap();
        assert_eq!(context, "3. Why?\nBecause.");
    }
}
