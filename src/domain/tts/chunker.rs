//! Sentence-aware splitting of job text into provider-sized chunks.
//!
//! Chunks are borrowed views into the source text. `Chunk::as_str` is the
//! trimmed content that gets synthesized and is never longer than the
//! configured maximum (in characters). `Chunk::raw` additionally carries the
//! whitespace that follows the content, so joining every `raw()` yields the
//! original text byte for byte.

use super::error::InvalidInput;

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '…'];
const CJK_SENTENCE_TERMINATORS: &[char] = &['。', '！', '？'];
const CLAUSE_SEPARATORS: &[char] = &[',', ';', ':'];
const CJK_CLAUSE_SEPARATORS: &[char] = &['，', '；', '：', '、'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_chars: usize,
}

impl Chunker {
    pub fn new(max_chars: usize) -> Result<Self, InvalidInput> {
        if max_chars == 0 {
            return Err(InvalidInput(
                "maximum chunk size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { max_chars })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Lazily split `text`. The returned iterator can be cloned to restart it.
    pub fn chunks<'a>(&self, text: &'a str) -> Result<Chunks<'a>, InvalidInput> {
        if text.trim().is_empty() {
            return Err(InvalidInput("text cannot be empty".to_string()));
        }

        Ok(Chunks {
            text,
            pos: 0,
            index: 0,
            max_chars: self.max_chars,
        })
    }

    pub fn split<'a>(&self, text: &'a str) -> Result<Vec<Chunk<'a>>, InvalidInput> {
        Ok(self.chunks(text)?.collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    index: usize,
    raw: &'a str,
    content: &'a str,
}

impl<'a> Chunk<'a> {
    /// Position of the chunk in the sequence, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Trimmed content to synthesize.
    pub fn as_str(&self) -> &'a str {
        self.content
    }

    /// Content plus surrounding whitespace from the source text.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    pos: usize,
    index: usize,
    max_chars: usize,
}

impl<'a> Chunks<'a> {
    /// Byte offset where the content starting at `content_start` should end.
    fn content_end(&self, content_start: usize) -> usize {
        let window = self.text[content_start..].trim_end();

        // Byte offset just past the first `max_chars` characters.
        let limit = match window.char_indices().nth(self.max_chars) {
            Some((offset, _)) => offset,
            None => return content_start + window.len(),
        };

        let mut sentence_break = None;
        let mut clause_break = None;
        let mut space_break = None;

        for (offset, c) in window[..limit].char_indices() {
            let end = offset + c.len_utf8();
            let followed_by_space = window[end..]
                .chars()
                .next()
                .map_or(true, char::is_whitespace);

            if CJK_SENTENCE_TERMINATORS.contains(&c)
                || (SENTENCE_TERMINATORS.contains(&c) && followed_by_space)
            {
                sentence_break = Some(end);
            } else if CJK_CLAUSE_SEPARATORS.contains(&c)
                || (CLAUSE_SEPARATORS.contains(&c) && followed_by_space)
            {
                clause_break = Some(end);
            } else if c.is_whitespace() && offset > 0 {
                space_break = Some(offset);
            }
        }

        let cut = sentence_break
            .or(clause_break)
            .or(space_break)
            .unwrap_or(limit);

        content_start + window[..cut].trim_end().len()
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }

        let start = self.pos;
        let rest = &self.text[start..];
        let content_start = start + (rest.len() - rest.trim_start().len());
        if content_start >= self.text.len() {
            // Trailing whitespace is always absorbed by the previous chunk.
            self.pos = self.text.len();
            return None;
        }

        let content_end = self.content_end(content_start);
        let after = &self.text[content_end..];
        let raw_end = content_end + (after.len() - after.trim_start().len());

        let chunk = Chunk {
            index: self.index,
            raw: &self.text[start..raw_end],
            content: &self.text[content_start..content_end],
        };

        self.pos = raw_end;
        self.index += 1;
        Some(chunk)
    }
}
