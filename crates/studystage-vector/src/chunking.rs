//! Greedy fixed-width text chunking.
//!
//! Chunks bound the size of each embedding request. Splitting is purely by
//! character count with no awareness of words or sentences, so the chunks of
//! a text always concatenate back to the original.

/// Default maximum number of characters per chunk.
pub const MAX_CHUNK_CHARS: usize = 1000;

/// Split `text` into consecutive chunks of at most `max_chars` characters.
///
/// Characters are Unicode scalar values, so multi-byte text is never split
/// inside a code point. A text of `L` characters yields `ceil(L / max_chars)`
/// chunks; empty text yields none. A `max_chars` of 0 is treated as 1.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::with_capacity(text.len() / max_chars + 1);
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_chunks(len: usize, max: usize) -> usize {
        len.div_ceil(max)
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", 10).is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(chunk_text("hello", 1000), vec!["hello"]);
    }

    #[test]
    fn test_exact_multiple() {
        let text = "a".repeat(3000);
        let chunks = chunk_text(&text, 1000);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() == 1000));
    }

    #[test]
    fn test_chunk_count_and_reconstruction() {
        for len in [1usize, 7, 999, 1000, 1001, 2500, 4321] {
            let text: String = (0..len)
                .map(|i| char::from(b'a' + (i % 26) as u8))
                .collect();
            let chunks = chunk_text(&text, 1000);
            assert_eq!(chunks.len(), expected_chunks(len, 1000), "len {len}");
            assert_eq!(chunks.concat(), text);
            assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
        }
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        // Hangul syllables are three bytes each in UTF-8.
        let text = "서포트벡터머신".repeat(3);
        let chunks = chunk_text(&text, 5);
        assert_eq!(chunks.len(), expected_chunks(21, 5));
        assert_eq!(chunks[0], "서포트벡터");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_whitespace_is_preserved() {
        let text = "ab \n cd\t";
        let chunks = chunk_text(text, 3);
        assert_eq!(chunks, vec!["ab ", "\n c", "d\t"]);
    }

    #[test]
    fn test_zero_width_treated_as_one() {
        assert_eq!(chunk_text("abc", 0), vec!["a", "b", "c"]);
    }
}
