//! POSIX shell quoting for backends that accept one command string.

use std::borrow::Cow;

/// Quotes `word` so a POSIX shell reads it back as exactly one argument.
///
/// Words made only of characters with no special meaning are left as is.
#[must_use]
pub fn quote(word: &str) -> Cow<'_, str> {
    let plain = !word.is_empty()
        && word
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./=:,@%+".contains(&b));
    if plain {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r"'\''")))
    }
}

/// Joins words into one command line, quoting each one.
pub fn join<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    words
        .into_iter()
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}
