/// Split an identifier into lowercase sub-words.
///
/// A new word starts at every uppercase letter after the first character;
/// underscores are kept as part of the word.
pub fn split_camel_case(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current_word = String::new();

    for (i, c) in s.chars().enumerate() {
        if i > 0 && c.is_uppercase() && !current_word.is_empty() {
            words.push(current_word.to_lowercase());
            current_word.clear();
        }
        current_word.push(c);
    }

    if !current_word.is_empty() {
        words.push(current_word.to_lowercase());
    }

    words
}

/// Sub-words long enough to count as evidence on their own.
pub fn is_significant(word: &str) -> bool {
    word.chars().count() > 2
}
