//! Generation-request hydration.
//!
//! Turns the ids the client posted into a fully-hydrated
//! [`GenerationRequest`]: one batch character fetch, one batch catalog
//! fetch, role inference for non-hero characters, and sibling-relationship
//! derivation for families with more than one child.

use std::collections::HashMap;

use uuid::Uuid;

use super::store::{CharacterRow, StoryStore};
use super::{CatalogEntry, CharacterInfo, CharacterRole, GenerationMode, GenerationRequest};
use crate::error::GenerationError;

/// Validated ids and options extracted from the request body.
#[derive(Debug, Clone)]
pub struct HydrationInput {
    pub mode: GenerationMode,
    pub hero_id: Uuid,
    pub character_ids: Vec<Uuid>,
    pub genre_id: Uuid,
    pub tone_id: Uuid,
    pub length_id: Uuid,
    pub growth_topic_id: Option<Uuid>,
    pub moral_lesson_id: Option<Uuid>,
    pub custom_instructions: Option<String>,
}

/// Hydrate a request for `user_id`. Two round trips: characters, catalog.
pub async fn build_request(
    store: &StoryStore,
    user_id: Uuid,
    input: HydrationInput,
) -> Result<GenerationRequest, GenerationError> {
    let mut character_ids = Vec::with_capacity(1 + input.character_ids.len());
    character_ids.push(input.hero_id);
    character_ids.extend_from_slice(&input.character_ids);

    let rows = store.fetch_characters(user_id, &character_ids).await?;
    let characters = hydrate_characters(input.hero_id, &character_ids, rows)?;

    let mut catalog_ids = vec![input.genre_id, input.tone_id, input.length_id];
    catalog_ids.extend(input.growth_topic_id);
    catalog_ids.extend(input.moral_lesson_id);
    let mut catalog: HashMap<Uuid, CatalogEntry> = store
        .fetch_catalog(&catalog_ids)
        .await?
        .into_iter()
        .map(|row| {
            (
                row.id,
                CatalogEntry {
                    id: row.id,
                    name: row.name,
                    display_name: row.display_name,
                    description: row.description,
                },
            )
        })
        .collect();

    let mut take = |kind: &'static str, id: Uuid| {
        catalog
            .remove(&id)
            .ok_or(GenerationError::MissingParameter {
                kind,
                id: id.to_string(),
            })
    };

    let genre = take("genre", input.genre_id)?;
    let tone = take("tone", input.tone_id)?;
    let length = take("length", input.length_id)?;
    // Optional rows that fail to resolve are dropped, not fatal; growth
    // mode's topic requirement was already enforced at the HTTP boundary.
    let growth_topic = input.growth_topic_id.and_then(|id| take("growth_topic", id).ok());
    let moral_lesson = input.moral_lesson_id.and_then(|id| take("moral_lesson", id).ok());

    Ok(GenerationRequest {
        mode: input.mode,
        characters,
        genre,
        tone,
        length,
        growth_topic,
        moral_lesson,
        custom_instructions: input.custom_instructions,
    })
}

/// Order hero first, infer roles, derive sibling relationships.
fn hydrate_characters(
    hero_id: Uuid,
    requested_order: &[Uuid],
    rows: Vec<CharacterRow>,
) -> Result<Vec<CharacterInfo>, GenerationError> {
    let mut by_id: HashMap<Uuid, CharacterRow> =
        rows.into_iter().map(|row| (row.id, row)).collect();

    let hero_row = by_id
        .remove(&hero_id)
        .ok_or_else(|| GenerationError::CharacterNotFound(hero_id.to_string()))?;

    let mut first_child_name = (hero_row.character_type == "child")
        .then(|| hero_row.name.clone());

    let mut characters = vec![to_info(hero_row, CharacterRole::Hero, None)];
    for id in requested_order.iter().skip(1) {
        // Unresolved companion ids are skipped; only the hero is required.
        let Some(row) = by_id.remove(id) else { continue };
        let role = infer_role(&row.character_type);
        let relationship = if row.character_type == "child" {
            match &first_child_name {
                Some(first) => Some(sibling_relationship(first, row.gender.as_deref())),
                None => {
                    first_child_name = Some(row.name.clone());
                    None
                }
            }
        } else {
            None
        };
        characters.push(to_info(row, role, relationship));
    }
    Ok(characters)
}

fn to_info(row: CharacterRow, role: CharacterRole, relationship: Option<String>) -> CharacterInfo {
    CharacterInfo {
        id: row.id,
        name: row.name,
        character_type: row.character_type,
        appearance: row.appearance,
        age: row.age,
        role,
        relationship,
    }
}

/// Static character-type to story-role mapping for non-hero characters.
fn infer_role(character_type: &str) -> CharacterRole {
    match character_type {
        "pet" => CharacterRole::Pet,
        "storybook_character" => CharacterRole::Sidekick,
        "child" | "magical_creature" => CharacterRole::Friend,
        _ => CharacterRole::Friend,
    }
}

/// `"<firstChildName>'s brother|sister|sibling"`, chosen by gender.
fn sibling_relationship(first_child_name: &str, gender: Option<&str>) -> String {
    let noun = match gender {
        Some("male") => "brother",
        Some("female") => "sister",
        _ => "sibling",
    };
    format!("{}'s {}", first_child_name, noun)
}
