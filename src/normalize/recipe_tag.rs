//! Recipe tag normalization

use serde::Deserialize;

use super::{decode, require, RelationProperty, TitleProperty};
use crate::domain::{Collection, RawRecord, RecipeTag};
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct RecipeTagRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: Option<RecipeTagProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct RecipeTagProperties {
    #[serde(default)]
    title: Option<TitleProperty>,
    #[serde(default)]
    related_recipes: Option<RelationProperty>,
}

/// The recipe tags collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecipeTags;

impl Collection for RecipeTags {
    type Entity = RecipeTag;

    const NAME: &'static str = "recipe_tags";
    const PAGE_CEILING: usize = 2;

    fn normalize(record: &RawRecord) -> Result<RecipeTag> {
        let raw: RecipeTagRecord = decode(Self::NAME, record)?;

        let id = require(
            raw.id.filter(|id| !id.is_empty()),
            Self::NAME,
            "<unknown>",
            "id",
        )?;
        let props = raw.properties.unwrap_or_default();

        let title = require(
            props.title.as_ref().and_then(TitleProperty::text),
            Self::NAME,
            &id,
            "title",
        )?
        .to_string();

        // An absent relation is an empty tag, not an error.
        let related_recipes = props
            .related_recipes
            .and_then(|p| p.relation)
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.id)
            .collect();

        Ok(RecipeTag {
            id,
            title,
            related_recipes,
        })
    }

    fn entity_id(entity: &RecipeTag) -> &str {
        &entity.id
    }
}
