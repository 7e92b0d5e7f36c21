//! Splitting alt text into reply-sized pieces.
//!
//! Lengths are counted in characters, not bytes. A piece ends at the last line
//! break that fits, failing that at the last space, and only as a last resort
//! in the middle of a word. The break character itself is dropped.

/// Prefixes each annotation with `Image {n}:` when there is more than one.
pub fn label_annotations(annotations: &[String]) -> Vec<String> {
    if annotations.len() <= 1 {
        return annotations.to_vec();
    }
    annotations
        .iter()
        .enumerate()
        .map(|(i, text)| format!("Image {}:\n{}", i + 1, text))
        .collect()
}

/// Byte offset of the `n`th character of `text`, or its length if shorter.
fn char_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

/// Splits `text` into trimmed pieces of at most `max_len` characters.
///
/// Whitespace-only pieces are dropped.
///
/// # Panics
///
/// Panics if `max_len` is zero.
pub fn split_text(text: &str, max_len: usize) -> Vec<String> {
    assert!(max_len > 0, "chunk length must be at least 1");

    let mut chunks = Vec::new();
    let mut push = |piece: &str| {
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
    };

    let mut rest = text.trim();
    while rest.chars().count() > max_len {
        // A break right after the last allowed character still counts.
        let window = &rest[..char_offset(rest, max_len + 1)];
        let split = window.rfind('\n').or_else(|| window.rfind(' '));

        match split {
            Some(at) => {
                push(&rest[..at]);
                rest = &rest[at + 1..];
            }
            None => {
                let at = char_offset(rest, max_len);
                push(&rest[..at]);
                rest = &rest[at..];
            }
        }
    }
    push(rest);

    chunks
}

/// Labels and splits a tweet's annotations into the ordered list of reply texts.
pub fn chunk_annotations(annotations: &[String], max_len: usize) -> Vec<String> {
    label_annotations(annotations)
        .iter()
        .flat_map(|annotation| split_text(annotation, max_len))
        .collect()
}
