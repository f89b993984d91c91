//! Incremental JSON tokenizer.
//!
//! Scans an append-only character stream that eventually spells one JSON
//! object and emits a token as soon as it is unambiguously decodable from
//! the partial input: object keys, array boundaries, and complete string
//! scalars. Chunk boundaries carry no meaning — a string may arrive one
//! character at a time, or a whole document in one push.
//!
//! The tokenizer is deliberately best-effort: input that stops looking like
//! JSON moves it into a terminal failed state and it simply stops emitting.
//! Authoritative validation happens at end of stream via a strict re-parse
//! of the full buffer (see [`super::document`]), so the incremental path
//! never has to be the arbiter of well-formedness.

/// Tokens emitted while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonToken {
    /// An object key completed (the string before a `:`).
    Key(String),
    /// Entered an array value.
    StartArray,
    /// Left an array value.
    EndArray,
    /// Entered a nested object value.
    StartObject,
    /// Left a nested object value.
    EndObject,
    /// A complete string scalar decoded, escapes resolved.
    StringValue(String),
    /// The top-level object closed.
    EndDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

/// In-string escape scanning state.
#[derive(Debug)]
enum EscapeState {
    None,
    /// Just saw a backslash.
    Started,
    /// Inside `\uXXXX`, holding the hex digits read so far.
    Unicode(String),
}

#[derive(Debug)]
struct StringScan {
    buf: String,
    is_key: bool,
    escape: EscapeState,
    /// First half of a UTF-16 surrogate pair from a `\u` escape.
    pending_high: Option<u16>,
}

impl StringScan {
    fn new(is_key: bool) -> Self {
        Self {
            buf: String::new(),
            is_key,
            escape: EscapeState::None,
            pending_high: None,
        }
    }

    /// Append a decoded character, flushing any unpaired surrogate first.
    fn put(&mut self, ch: char) {
        if self.pending_high.take().is_some() {
            self.buf.push('\u{FFFD}');
        }
        self.buf.push(ch);
    }

    /// Resolve one UTF-16 code unit from a `\uXXXX` escape.
    fn put_code_unit(&mut self, unit: u16) {
        match unit {
            0xD800..=0xDBFF => {
                if self.pending_high.replace(unit).is_some() {
                    self.buf.push('\u{FFFD}');
                }
            }
            0xDC00..=0xDFFF => match self.pending_high.take() {
                Some(high) => {
                    let c = 0x10000
                        + ((high as u32 - 0xD800) << 10)
                        + (unit as u32 - 0xDC00);
                    self.buf
                        .push(char::from_u32(c).unwrap_or('\u{FFFD}'));
                }
                None => self.buf.push('\u{FFFD}'),
            },
            _ => self.put(char::from_u32(unit as u32).unwrap_or('\u{FFFD}')),
        }
    }

    fn finish(mut self) -> String {
        if self.pending_high.take().is_some() {
            self.buf.push('\u{FFFD}');
        }
        self.buf
    }
}

#[derive(Debug)]
enum LexState {
    /// Before the opening `{`.
    Start,
    /// In an object, expecting a key string or `}`.
    AwaitKey,
    /// Key read, expecting `:`.
    AwaitColon,
    /// Expecting a value (also array-element position).
    AwaitValue,
    /// Inside a string scalar or key.
    InString(StringScan),
    /// Inside `true`/`false`/`null`/number.
    InLiteral,
    /// Value complete, expecting `,`, `}` or `]`.
    AfterValue,
    /// Top-level object closed; only whitespace may follow.
    Done,
    /// Input stopped looking like JSON; no further tokens.
    Failed,
}

/// Streaming tokenizer for one JSON object.
#[derive(Debug)]
pub struct JsonStreamTokenizer {
    state: LexState,
    containers: Vec<Container>,
}

impl Default for JsonStreamTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonStreamTokenizer {
    pub fn new() -> Self {
        Self {
            state: LexState::Start,
            containers: Vec::new(),
        }
    }

    /// True once the scanner has given up on the input.
    pub fn failed(&self) -> bool {
        matches!(self.state, LexState::Failed)
    }

    /// Feed a chunk and collect every token it completes.
    pub fn feed(&mut self, chunk: &str) -> Vec<JsonToken> {
        let mut out = Vec::new();
        for ch in chunk.chars() {
            if self.failed() {
                break;
            }
            self.step(ch, &mut out);
        }
        out
    }

    fn step(&mut self, ch: char, out: &mut Vec<JsonToken>) {
        let state = std::mem::replace(&mut self.state, LexState::Failed);
        self.state = match state {
            LexState::Start => match ch {
                c if c.is_whitespace() => LexState::Start,
                '{' => {
                    self.containers.push(Container::Object);
                    LexState::AwaitKey
                }
                _ => LexState::Failed,
            },

            LexState::AwaitKey => match ch {
                c if c.is_whitespace() => LexState::AwaitKey,
                '"' => LexState::InString(StringScan::new(true)),
                '}' => self.close_object(out),
                _ => LexState::Failed,
            },

            LexState::AwaitColon => match ch {
                c if c.is_whitespace() => LexState::AwaitColon,
                ':' => LexState::AwaitValue,
                _ => LexState::Failed,
            },

            LexState::AwaitValue => match ch {
                c if c.is_whitespace() => LexState::AwaitValue,
                '"' => LexState::InString(StringScan::new(false)),
                '[' => {
                    self.containers.push(Container::Array);
                    out.push(JsonToken::StartArray);
                    LexState::AwaitValue
                }
                ']' if self.in_array() => {
                    self.containers.pop();
                    out.push(JsonToken::EndArray);
                    LexState::AfterValue
                }
                '{' => {
                    self.containers.push(Container::Object);
                    out.push(JsonToken::StartObject);
                    LexState::AwaitKey
                }
                't' | 'f' | 'n' | '-' | '0'..='9' => LexState::InLiteral,
                _ => LexState::Failed,
            },

            LexState::InString(mut scan) => {
                match std::mem::replace(&mut scan.escape, EscapeState::None) {
                    EscapeState::None => match ch {
                        '\\' => {
                            scan.escape = EscapeState::Started;
                            LexState::InString(scan)
                        }
                        '"' => {
                            let is_key = scan.is_key;
                            let text = scan.finish();
                            if is_key {
                                out.push(JsonToken::Key(text));
                                LexState::AwaitColon
                            } else {
                                out.push(JsonToken::StringValue(text));
                                LexState::AfterValue
                            }
                        }
                        c => {
                            scan.put(c);
                            LexState::InString(scan)
                        }
                    },
                    EscapeState::Started => {
                        match ch {
                            '"' => scan.put('"'),
                            '\\' => scan.put('\\'),
                            '/' => scan.put('/'),
                            'b' => scan.put('\u{0008}'),
                            'f' => scan.put('\u{000C}'),
                            'n' => scan.put('\n'),
                            'r' => scan.put('\r'),
                            't' => scan.put('\t'),
                            'u' => scan.escape = EscapeState::Unicode(String::new()),
                            // Unknown escape: keep the character, stay lossy.
                            c => scan.put(c),
                        }
                        LexState::InString(scan)
                    }
                    EscapeState::Unicode(mut hex) => {
                        if ch.is_ascii_hexdigit() {
                            hex.push(ch);
                            if hex.len() == 4 {
                                let unit =
                                    u16::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
                                scan.put_code_unit(unit);
                            } else {
                                scan.escape = EscapeState::Unicode(hex);
                            }
                            LexState::InString(scan)
                        } else {
                            LexState::Failed
                        }
                    }
                }
            }

            LexState::InLiteral => match ch {
                ',' | '}' | ']' => {
                    self.state = LexState::AfterValue;
                    self.step(ch, out);
                    return;
                }
                c if c.is_whitespace() => LexState::AfterValue,
                _ => LexState::InLiteral,
            },

            LexState::AfterValue => match ch {
                c if c.is_whitespace() => LexState::AfterValue,
                ',' => match self.containers.last() {
                    Some(Container::Object) => LexState::AwaitKey,
                    Some(Container::Array) => LexState::AwaitValue,
                    None => LexState::Failed,
                },
                '}' => {
                    if matches!(self.containers.last(), Some(Container::Object)) {
                        self.close_object(out)
                    } else {
                        LexState::Failed
                    }
                }
                ']' => {
                    if self.in_array() {
                        self.containers.pop();
                        out.push(JsonToken::EndArray);
                        LexState::AfterValue
                    } else {
                        LexState::Failed
                    }
                }
                _ => LexState::Failed,
            },

            LexState::Done => match ch {
                c if c.is_whitespace() => LexState::Done,
                _ => LexState::Failed,
            },

            LexState::Failed => LexState::Failed,
        };
    }

    fn in_array(&self) -> bool {
        matches!(self.containers.last(), Some(Container::Array))
    }

    /// Pop the current object; closing the outermost one ends the document.
    fn close_object(&mut self, out: &mut Vec<JsonToken>) -> LexState {
        self.containers.pop();
        if self.containers.is_empty() {
            out.push(JsonToken::EndDocument);
            LexState::Done
        } else {
            out.push(JsonToken::EndObject);
            LexState::AfterValue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(tokenizer: &mut JsonStreamTokenizer, chunks: &[&str]) -> Vec<JsonToken> {
        let mut tokens = Vec::new();
        for chunk in chunks {
            tokens.extend(tokenizer.feed(chunk));
        }
        tokens
    }

    #[test]
    fn tokenizes_full_document() {
        let mut t = JsonStreamTokenizer::new();
        let tokens =
            t.feed(r#"{"title":"Fox","paragraphs":["a","b"],"moral":"be kind"}"#);
        assert_eq!(
            tokens,
            vec![
                JsonToken::Key("title".into()),
                JsonToken::StringValue("Fox".into()),
                JsonToken::Key("paragraphs".into()),
                JsonToken::StartArray,
                JsonToken::StringValue("a".into()),
                JsonToken::StringValue("b".into()),
                JsonToken::EndArray,
                JsonToken::Key("moral".into()),
                JsonToken::StringValue("be kind".into()),
                JsonToken::EndDocument,
            ]
        );
    }

    #[test]
    fn chunk_boundaries_are_invisible() {
        // Split mid-key, mid-value, and mid-escape.
        let mut t = JsonStreamTokenizer::new();
        let tokens = feed_all(
            &mut t,
            &[r#"{"ti"#, r#"tle":"The B"#, r#"rave \"Fox\""}"#],
        );
        assert_eq!(tokens[0], JsonToken::Key("title".into()));
        assert_eq!(
            tokens[1],
            JsonToken::StringValue("The Brave \"Fox\"".into())
        );
        assert_eq!(tokens[2], JsonToken::EndDocument);
    }

    #[test]
    fn one_char_at_a_time() {
        let doc = r#"{"paragraphs":["one","two","three"]}"#;
        let mut t = JsonStreamTokenizer::new();
        let mut tokens = Vec::new();
        for ch in doc.chars() {
            tokens.extend(t.feed(&ch.to_string()));
        }
        let strings: Vec<_> = tokens
            .iter()
            .filter_map(|tok| match tok {
                JsonToken::StringValue(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(strings, vec!["one", "two", "three"]);
    }

    #[test]
    fn decodes_unicode_escapes() {
        let mut t = JsonStreamTokenizer::new();
        let tokens = t.feed(r#"{"title":"café 😀"}"#);
        assert_eq!(tokens[1], JsonToken::StringValue("café 😀".into()));
    }

    #[test]
    fn lone_surrogate_becomes_replacement_char() {
        let mut t = JsonStreamTokenizer::new();
        let tokens = t.feed(r#"{"title":"x\ud83dy"}"#);
        assert_eq!(tokens[1], JsonToken::StringValue("x\u{FFFD}y".into()));
    }

    #[test]
    fn null_and_numbers_emit_no_string_values() {
        let mut t = JsonStreamTokenizer::new();
        let tokens = t.feed(r#"{"moral":null,"count":3,"ok":true}"#);
        assert!(
            !tokens
                .iter()
                .any(|tok| matches!(tok, JsonToken::StringValue(_))),
            "literals must not surface as strings: {:?}",
            tokens
        );
        assert_eq!(tokens.last(), Some(&JsonToken::EndDocument));
    }

    #[test]
    fn nested_object_values_are_walked() {
        let mut t = JsonStreamTokenizer::new();
        let tokens = t.feed(r#"{"meta":{"inner":"x"},"title":"T"}"#);
        assert!(tokens.contains(&JsonToken::StartObject));
        assert!(tokens.contains(&JsonToken::EndObject));
        assert!(tokens.contains(&JsonToken::Key("inner".into())));
        assert!(tokens.contains(&JsonToken::StringValue("T".into())));
        assert_eq!(tokens.last(), Some(&JsonToken::EndDocument));
    }

    #[test]
    fn garbage_input_fails_quietly() {
        let mut t = JsonStreamTokenizer::new();
        let tokens = t.feed("I'm sorry, I can't produce that story.");
        assert!(tokens.is_empty());
        assert!(t.failed());
        // Further input is ignored, not panicked on.
        assert!(t.feed(r#"{"title":"x"}"#).is_empty());
    }

    #[test]
    fn truncated_string_emits_nothing_for_it() {
        let mut t = JsonStreamTokenizer::new();
        let tokens = t.feed(r#"{"title":"cut off mid-str"#);
        assert_eq!(tokens, vec![JsonToken::Key("title".into())]);
        assert!(!t.failed());
    }
}
