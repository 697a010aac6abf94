//! Text utilities for the host delivery boundary.

/// Split a long reply into chunks that fit a platform's size limit.
///
/// The limit counts characters, not bytes, so multibyte text never
/// lands mid-character. Prefers splitting at a line boundary near the
/// limit over a hard cut; a chunk with no newline inside the window is
/// cut at the limit.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;
    loop {
        // Byte offset of the first character past the limit, if any.
        let Some((cut, _)) = rest.char_indices().nth(limit) else {
            chunks.push(rest.to_string());
            break;
        };
        let window = &rest[..cut];
        let split_at = match window.rfind('\n') {
            Some(pos) if pos > 0 => pos,
            _ => cut,
        };
        chunks.push(rest[..split_at].to_string());
        rest = rest[split_at..].trim_start_matches('\n');
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_message("short", 2000);
        assert_eq!(chunks, vec!["short".to_string()]);
    }

    #[test]
    fn prefers_line_boundaries() {
        let text = format!("{}\n{}", "a".repeat(60), "b".repeat(60));
        let chunks = split_message(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(60));
        assert_eq!(chunks[1], "b".repeat(60));
    }

    #[test]
    fn hard_cut_without_newline() {
        let text = "x".repeat(250);
        let chunks = split_message(&text, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[2].len(), 50);
    }

    #[test]
    fn every_chunk_fits_the_limit() {
        let text = "line one\nline two\nline three\n".repeat(40);
        for chunk in split_message(&text, 64) {
            assert!(
                chunk.chars().count() <= 64,
                "chunk too long: {}",
                chunk.len()
            );
        }
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        // Replies carry emoji; a cut inside one would panic.
        let text = "✅ done ".repeat(40);
        let chunks = split_message(&text, 100);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
        }
        // Hard cuts lose nothing.
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn multibyte_text_with_newlines_still_prefers_line_boundaries() {
        let text = format!("{}\n{}", "é".repeat(60), "ü".repeat(60));
        let chunks = split_message(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "é".repeat(60));
        assert_eq!(chunks[1], "ü".repeat(60));
    }
}
