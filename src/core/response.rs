//! Chat reply utilities
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Target the 500 character chat limit, collapse newlines
//! - 1.0.0: Initial chunking helpers

/// Maximum length of a single chat message
pub const MESSAGE_LIMIT: usize = 500;

/// Split a reply into chat-sized messages.
///
/// Chat lines cannot carry newlines, so line breaks become spaces first. Splits
/// prefer word boundaries and never cut a UTF-8 character in half.
pub fn chunk_text(text: &str, max_size: usize) -> Vec<String> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        return Vec::new();
    }
    if flat.len() <= max_size {
        return vec![flat];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in flat.split(' ') {
        let needed = if current.is_empty() { word.len() } else { word.len() + 1 };
        if current.len() + needed > max_size && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if word.len() > max_size {
            chunks.extend(split_long_word(word, max_size));
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_long_word(word: &str, max_size: usize) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        if current.len() + ch.len_utf8() > max_size && !current.is_empty() {
            result.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

pub fn chunk_for_chat(text: &str) -> Vec<String> {
    chunk_text(text, MESSAGE_LIMIT)
}

/// Prefix a reply with a mention of the user it answers
pub fn mention_reply(login: &str, reply: &str) -> String {
    format!("@{login}, {reply}")
}
