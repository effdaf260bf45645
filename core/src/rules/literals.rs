//! Where the string literals and comments are in a piece of source text.
//!
//! Rules only rewrite code: a match that starts inside a quoted string, the text of a template
//! literal or a comment is never reported or fixed. Regular expression literals are not
//! recognised.

use std::ops::Range;

/// Sorted, disjoint byte ranges of `text` that are not code. String ranges exclude their quotes;
/// comment ranges include the `//` or `/* */`. A `${…}` hole inside a template literal is code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteralSpans {
    spans: Vec<Range<usize>>,
}

#[derive(Clone, Copy)]
enum State {
    Code,
    Quoted(char),
    Template,
    LineComment,
    BlockComment,
}

impl LiteralSpans {
    pub fn new(text: &str) -> LiteralSpans {
        let mut spans = Vec::new();
        let mut state = State::Code;
        let mut start = 0;
        // Open braces inside each `${` hole, innermost last.
        let mut holes: Vec<usize> = Vec::new();
        let mut chars = text.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            let next = chars.peek().map(|&(_, n)| n);
            match state {
                State::Code => match c {
                    '\'' | '"' => {
                        state = State::Quoted(c);
                        start = i + 1;
                    }
                    '`' => {
                        state = State::Template;
                        start = i + 1;
                    }
                    '/' if next == Some('/') => {
                        state = State::LineComment;
                        start = i;
                        chars.next();
                    }
                    '/' if next == Some('*') => {
                        state = State::BlockComment;
                        start = i;
                        chars.next();
                    }
                    '{' => {
                        if let Some(depth) = holes.last_mut() {
                            *depth += 1;
                        }
                    }
                    '}' => match holes.last_mut() {
                        Some(0) => {
                            holes.pop();
                            state = State::Template;
                            start = i + 1;
                        }
                        Some(depth) => *depth -= 1,
                        None => {}
                    },
                    _ => {}
                },
                State::Quoted(quote) => match c {
                    '\\' => {
                        chars.next();
                    }
                    // Unterminated; a plain string cannot span lines.
                    '\n' => {
                        spans.push(start..i);
                        state = State::Code;
                    }
                    c if c == quote => {
                        spans.push(start..i);
                        state = State::Code;
                    }
                    _ => {}
                },
                State::Template => match c {
                    '\\' => {
                        chars.next();
                    }
                    '`' => {
                        spans.push(start..i);
                        state = State::Code;
                    }
                    '$' if next == Some('{') => {
                        chars.next();
                        spans.push(start..i);
                        holes.push(0);
                        state = State::Code;
                    }
                    _ => {}
                },
                State::LineComment => {
                    if c == '\n' {
                        spans.push(start..i);
                        state = State::Code;
                    }
                }
                State::BlockComment => {
                    if c == '*' && next == Some('/') {
                        chars.next();
                        spans.push(start..i + 2);
                        state = State::Code;
                    }
                }
            }
        }
        if !matches!(state, State::Code) {
            spans.push(start..text.len());
        }
        LiteralSpans { spans }
    }

    /// Whether the byte at `offset` is inside a literal or comment.
    pub fn contains(&self, offset: usize) -> bool {
        let index = self.spans.partition_point(|span| span.end <= offset);
        self.spans
            .get(index)
            .is_some_and(|span| span.start <= offset)
    }
}
