//! Greedy word wrapping for event descriptions.
//!
//! Whitespace is kept at line boundaries, so joining the wrapped lines gives
//! back the normalized input text.

/// Greedy word wrapper with a fixed line width.
#[derive(Debug, Clone, Copy)]
pub struct TextWrapper {
    width: usize,
    tab_size: usize,
}

impl TextWrapper {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            tab_size: 8,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Split `text` into lines of at most `width` characters.
    pub fn wrap(&self, text: &str) -> Vec<String> {
        let normalized = self.normalize(text);
        let mut chunks = split_chunks(&normalized);
        chunks.reverse();

        let mut lines = Vec::new();
        while !chunks.is_empty() {
            let mut line: Vec<char> = Vec::new();
            while chunks
                .last()
                .is_some_and(|chunk| line.len() + chunk.len() <= self.width)
            {
                if let Some(chunk) = chunks.pop() {
                    line.extend(chunk);
                }
            }
            if let Some(chunk) = chunks.last_mut() {
                if chunk.len() > self.width {
                    self.break_long_word(chunk, &mut line);
                }
            }
            if !line.is_empty() {
                lines.push(line.into_iter().collect());
            }
        }
        lines
    }

    /// Expand tabs, then turn every whitespace character into a plain space.
    fn normalize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut column = 0;
        for ch in text.chars() {
            match ch {
                '\t' => {
                    let fill = self.tab_size - column % self.tab_size;
                    out.extend(std::iter::repeat_n(' ', fill));
                    column += fill;
                }
                '\n' | '\r' => {
                    out.push(' ');
                    column = 0;
                }
                '\x0b' | '\x0c' => {
                    out.push(' ');
                    column += 1;
                }
                _ => {
                    out.push(ch);
                    column += 1;
                }
            }
        }
        out
    }

    fn break_long_word(&self, chunk: &mut Vec<char>, line: &mut Vec<char>) {
        let space_left = self.width.saturating_sub(line.len());
        let mut end = space_left;
        if let Some(hyphen) = chunk[..space_left].iter().rposition(|&c| c == '-') {
            if hyphen > 0 && chunk[..hyphen].iter().any(|&c| c != '-') {
                end = hyphen + 1;
            }
        }
        line.extend(chunk.drain(..end));
    }
}

/// Split into whitespace runs and words. A word ends at whitespace, right
/// after a hyphen joining two letter runs, or before a `--` dash between
/// words, and the dash is a chunk of its own.
fn split_chunks(text: &str) -> Vec<Vec<char>> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = chunk_end(&chars, start);
        chunks.push(chars[start..end].to_vec());
        start = end;
    }
    chunks
}

fn chunk_end(chars: &[char], start: usize) -> usize {
    if chars[start] == ' ' {
        return start + chars[start..].iter().take_while(|&&c| c == ' ').count();
    }
    if let Some(end) = dash_end(chars, start) {
        return end;
    }

    let mut end = start + 1;
    while end < chars.len() {
        match chars[end] {
            ' ' => return end,
            '-' if hyphen_break_after(chars, end) => return end + 1,
            '-' if dash_end(chars, end).is_some() => return end,
            _ => end += 1,
        }
    }
    end
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Word characters other than digits; `_` counts.
fn is_letter(c: char) -> bool {
    is_word(c) && !c.is_numeric()
}

/// End of a `--` dash starting at `i`. The dash must follow a word character
/// or closing punctuation and be followed by a word character.
fn dash_end(chars: &[char], i: usize) -> Option<usize> {
    if i == 0 || chars[i] != '-' {
        return None;
    }
    let prev = chars[i - 1];
    if !(is_word(prev) || "!\"'&.,?".contains(prev)) {
        return None;
    }
    let len = chars[i..].iter().take_while(|&&c| c == '-').count();
    match chars.get(i + len) {
        Some(&next) if len >= 2 && is_word(next) => Some(i + len),
        _ => None,
    }
}

/// Break after the hyphen at `i` when `ll-` or `l-l-` ends at it and `ll` or
/// `l-l` follows, `l` being a letter.
fn hyphen_break_after(chars: &[char], i: usize) -> bool {
    let at = |idx: Option<usize>| idx.and_then(|k| chars.get(k)).copied();
    let letter = |idx: Option<usize>| at(idx).is_some_and(is_letter);
    let back = |n: usize| i.checked_sub(n);

    let before = letter(back(1))
        && (letter(back(2)) || (at(back(2)) == Some('-') && letter(back(3))));
    let after = letter(Some(i + 1))
        && (letter(Some(i + 2)) || (at(Some(i + 2)) == Some('-') && letter(Some(i + 3))));
    before && after
}
