//! System prompt for questions about a user's notes.

const INSTRUCTIONS: &str = "\
You are a helpful assistant that answers questions about a user's notes.
Assume all questions are related to the user's notes.
Make sure that your answers are not too verbose and you speak succinctly.
Your responses MUST be formatted in clean, valid HTML with proper structure.
Use tags like <p>, <strong>, <em>, <ul>, <ol>, <li>, <h1> to <h6>, and <br> when appropriate.
Do NOT wrap the entire response in a single <p> tag unless it's a single paragraph.
DO NOT use <html>, <head>, or <body> tags.
Avoid inline styles, JavaScript, or custom attributes.
The response is inserted as the inner HTML of a single element.";

/// Build the system prompt around an already rendered notes section.
pub fn system_prompt(notes_section: &str) -> String {
    format!("{INSTRUCTIONS}\n\nHere are the user's notes:\n{notes_section}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_follow_instructions() {
        let prompt = system_prompt("[Note]\nTitle: a");
        assert!(prompt.starts_with("You are a helpful assistant"));
        assert!(prompt.ends_with("Here are the user's notes:\n[Note]\nTitle: a"));
    }

    #[test]
    fn test_asks_for_html() {
        let prompt = system_prompt("");
        assert!(prompt.contains("valid HTML"));
        assert!(prompt.contains("succinctly"));
    }
}
