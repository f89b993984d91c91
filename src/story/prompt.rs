//! Prompt assembly. Pure string building over a hydrated request.

use std::fmt::Write as _;

use super::{CharacterRole, GenerationMode, GenerationRequest};

/// Build the user prompt for one generation request.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut prompt = String::with_capacity(1024);
    let paragraphs = request.story_length().paragraph_count();

    let _ = writeln!(
        prompt,
        "Write a {} children's story of exactly {} paragraphs in a {} tone.",
        request.genre.display_name, paragraphs, request.tone.display_name
    );

    prompt.push_str("\nCharacters:\n");
    for character in &request.characters {
        let _ = write!(
            prompt,
            "- {} ({})",
            character.name,
            role_label(character.role)
        );
        if let Some(age) = character.age {
            let _ = write!(prompt, ", age {}", age);
        }
        if let Some(relationship) = &character.relationship {
            let _ = write!(prompt, ", {}", relationship);
        }
        match &character.appearance {
            Some(appearance) if !appearance.trim().is_empty() => {
                let _ = write!(prompt, ": {}", appearance.trim());
            }
            _ => {}
        }
        prompt.push('\n');
    }

    if request.mode == GenerationMode::Growth {
        if let Some(topic) = &request.growth_topic {
            let _ = writeln!(
                prompt,
                "\nThe story should gently help the hero work through: {}. \
                 Weave this theme through the plot rather than stating it outright.",
                topic.display_name
            );
        }
    }

    if let Some(lesson) = &request.moral_lesson {
        let _ = writeln!(
            prompt,
            "\nEnd with a moral about {}.",
            lesson.display_name
        );
    } else {
        prompt.push_str("\nEnd with a short moral that fits the story.\n");
    }

    if let Some(custom) = &request.custom_instructions {
        if !custom.trim().is_empty() {
            let _ = writeln!(prompt, "\nAdditional instructions: {}", custom.trim());
        }
    }

    prompt.push_str(
        "\nRespond with a single JSON object: {\"title\": string, \
         \"paragraphs\": string[], \"moral\": string}. \
         The paragraphs array must contain the story text in order, one \
         paragraph per element, with no markdown and no numbering.",
    );

    prompt
}

fn role_label(role: CharacterRole) -> &'static str {
    match role {
        CharacterRole::Hero => "the hero",
        CharacterRole::Sidekick => "sidekick",
        CharacterRole::Pet => "pet",
        CharacterRole::Friend => "friend",
        CharacterRole::Family => "family member",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::{CatalogEntry, CharacterInfo, GenerationMode, GenerationRequest};
    use uuid::Uuid;

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry {
            id: Uuid::new_v4(),
            name: name.to_lowercase(),
            display_name: name.to_string(),
            description: None,
        }
    }

    fn hero(name: &str) -> CharacterInfo {
        CharacterInfo {
            id: Uuid::new_v4(),
            name: name.to_string(),
            character_type: "child".into(),
            appearance: Some("curly red hair".into()),
            age: Some(6),
            role: CharacterRole::Hero,
            relationship: None,
        }
    }

    fn base_request() -> GenerationRequest {
        GenerationRequest {
            mode: GenerationMode::Fun,
            characters: vec![hero("Maya")],
            genre: entry("Adventure"),
            tone: entry("Playful"),
            length: entry("Short"),
            growth_topic: None,
            moral_lesson: None,
            custom_instructions: None,
        }
    }

    #[test]
    fn includes_genre_tone_and_paragraph_count() {
        let prompt = build_prompt(&base_request());
        assert!(prompt.contains("Adventure"));
        assert!(prompt.contains("Playful"));
        assert!(prompt.contains("exactly 5 paragraphs"));
        assert!(prompt.contains("Maya (the hero), age 6"));
    }

    #[test]
    fn growth_mode_weaves_the_topic() {
        let mut request = base_request();
        request.mode = GenerationMode::Growth;
        request.growth_topic = Some(entry("Fear of the Dark"));
        let prompt = build_prompt(&request);
        assert!(prompt.contains("Fear of the Dark"));
    }

    #[test]
    fn sibling_relationship_reaches_the_prompt() {
        let mut request = base_request();
        let mut sibling = hero("Ben");
        sibling.role = CharacterRole::Friend;
        sibling.relationship = Some("Maya's brother".into());
        request.characters.push(sibling);
        let prompt = build_prompt(&request);
        assert!(prompt.contains("Maya's brother"));
    }

    #[test]
    fn custom_instructions_are_passed_through() {
        let mut request = base_request();
        request.custom_instructions = Some("Include a talking boat.".into());
        let prompt = build_prompt(&request);
        assert!(prompt.contains("Include a talking boat."));
    }
}
