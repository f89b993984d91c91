//! Projects raw JSON tokens onto story stream events.
//!
//! The tokenizer knows nothing about stories; this layer does. It watches
//! for the `title`, `paragraphs` and `moral` keys at the top level of the
//! document, assigns paragraph indexes in arrival order, and enforces
//! first-value-wins for the scalar fields so a duplicated key late in the
//! stream cannot rewrite what the client already rendered.

use super::events::StoryStreamEvent;
use super::tokenizer::JsonToken;

/// Which top-level field the next value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    None,
    Title,
    Paragraphs,
    Moral,
    /// A key we stream past without emitting anything.
    Other,
}

#[derive(Debug)]
pub struct StoryProjector {
    focus: Focus,
    /// Depth of nested containers below the top-level object. Keys and
    /// values inside nested structures never change focus.
    depth: u32,
    next_paragraph: u32,
    title_emitted: bool,
    moral_emitted: bool,
}

impl Default for StoryProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryProjector {
    pub fn new() -> Self {
        Self {
            focus: Focus::None,
            depth: 0,
            next_paragraph: 0,
            title_emitted: false,
            moral_emitted: false,
        }
    }

    /// Apply one token; at most one event falls out.
    pub fn apply(&mut self, token: JsonToken) -> Option<StoryStreamEvent> {
        match token {
            JsonToken::Key(name) => {
                if self.depth == 0 {
                    self.focus = match name.as_str() {
                        "title" => Focus::Title,
                        "paragraphs" => Focus::Paragraphs,
                        "moral" => Focus::Moral,
                        _ => Focus::Other,
                    };
                }
                None
            }
            JsonToken::StartArray | JsonToken::StartObject => {
                self.depth += 1;
                None
            }
            JsonToken::EndArray | JsonToken::EndObject => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    self.focus = Focus::None;
                }
                None
            }
            JsonToken::StringValue(text) => self.string_value(text),
            JsonToken::EndDocument => None,
        }
    }

    fn string_value(&mut self, text: String) -> Option<StoryStreamEvent> {
        match self.focus {
            Focus::Title if self.depth == 0 => {
                if self.title_emitted {
                    return None;
                }
                self.title_emitted = true;
                Some(StoryStreamEvent::Title { text })
            }
            Focus::Moral if self.depth == 0 => {
                if self.moral_emitted {
                    return None;
                }
                self.moral_emitted = true;
                Some(StoryStreamEvent::Moral { text })
            }
            // Paragraphs are the strings directly inside the array.
            Focus::Paragraphs if self.depth == 1 => {
                let index = self.next_paragraph;
                self.next_paragraph += 1;
                Some(StoryStreamEvent::Paragraph { index, text })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(tokens: Vec<JsonToken>) -> Vec<StoryStreamEvent> {
        let mut projector = StoryProjector::new();
        tokens
            .into_iter()
            .filter_map(|t| projector.apply(t))
            .collect()
    }

    #[test]
    fn paragraph_indexes_follow_arrival_order() {
        let events = project(vec![
            JsonToken::Key("paragraphs".into()),
            JsonToken::StartArray,
            JsonToken::StringValue("first".into()),
            JsonToken::StringValue("second".into()),
            JsonToken::StringValue("third".into()),
            JsonToken::EndArray,
        ]);
        let indexes: Vec<u32> = events
            .iter()
            .map(|e| match e {
                StoryStreamEvent::Paragraph { index, .. } => *index,
                other => panic!("unexpected event: {:?}", other),
            })
            .collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn duplicate_title_key_keeps_first_value() {
        let events = project(vec![
            JsonToken::Key("title".into()),
            JsonToken::StringValue("First".into()),
            JsonToken::Key("title".into()),
            JsonToken::StringValue("Second".into()),
        ]);
        assert_eq!(
            events,
            vec![StoryStreamEvent::Title {
                text: "First".into()
            }]
        );
    }

    #[test]
    fn duplicate_moral_key_keeps_first_value() {
        let events = project(vec![
            JsonToken::Key("moral".into()),
            JsonToken::StringValue("Share".into()),
            JsonToken::Key("moral".into()),
            JsonToken::StringValue("Hoard".into()),
        ]);
        assert_eq!(
            events,
            vec![StoryStreamEvent::Moral {
                text: "Share".into()
            }]
        );
    }

    #[test]
    fn unknown_keys_emit_nothing() {
        let events = project(vec![
            JsonToken::Key("genre".into()),
            JsonToken::StringValue("adventure".into()),
            JsonToken::Key("title".into()),
            JsonToken::StringValue("T".into()),
        ]);
        assert_eq!(events, vec![StoryStreamEvent::Title { text: "T".into() }]);
    }

    #[test]
    fn nested_object_keys_do_not_shadow_top_level_fields() {
        let events = project(vec![
            JsonToken::Key("meta".into()),
            JsonToken::StartObject,
            JsonToken::Key("title".into()),
            JsonToken::StringValue("inner".into()),
            JsonToken::EndObject,
            JsonToken::Key("title".into()),
            JsonToken::StringValue("outer".into()),
        ]);
        assert_eq!(
            events,
            vec![StoryStreamEvent::Title {
                text: "outer".into()
            }]
        );
    }

    #[test]
    fn nested_arrays_inside_paragraphs_are_ignored() {
        // Strings below the first array level are not paragraphs.
        let events = project(vec![
            JsonToken::Key("paragraphs".into()),
            JsonToken::StartArray,
            JsonToken::StringValue("real".into()),
            JsonToken::StartArray,
            JsonToken::StringValue("nested".into()),
            JsonToken::EndArray,
            JsonToken::StringValue("also real".into()),
            JsonToken::EndArray,
        ]);
        assert_eq!(
            events,
            vec![
                StoryStreamEvent::Paragraph {
                    index: 0,
                    text: "real".into()
                },
                StoryStreamEvent::Paragraph {
                    index: 1,
                    text: "also real".into()
                },
            ]
        );
    }
}
