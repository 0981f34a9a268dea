//! Property-Based Tests for Normalization
//!
//! # Test Properties
//!
//! 1. **Rating Range**: numeric ratings 0-5 normalize, anything above fails
//! 2. **Text Fidelity**: titles and author names come through unchanged
//! 3. **Relation Order**: recipe references keep upstream order

#![cfg(test)]

use proptest::prelude::*;
use serde_json::json;

use super::book::parse_rating;
use super::book::tests::book_record;
use super::recipe_tag::tests::recipe_tag_record;
use super::{Books, RecipeTags};
use crate::domain::Collection;

fn title_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ,.'!?-]{1,60}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_rating_range(value in 0u16..500) {
        let parsed = parse_rating(&value.to_string());
        if value <= 5 {
            prop_assert_eq!(parsed.unwrap().map(|r| r.value() as u16), Some(value));
        } else {
            prop_assert!(parsed.is_err());
        }
    }

    #[test]
    fn prop_book_title_fidelity(title in title_strategy(), author in title_strategy()) {
        let mut record = book_record("b-prop", &title, "reading");
        record["properties"]["Author Name"] =
            json!({"rollup": {"array": [{"title": [{"plain_text": author.clone()}]}]}});

        let book = Books::normalize(&record).unwrap();
        prop_assert_eq!(book.title, title);
        prop_assert_eq!(book.author_name, author);
    }

    #[test]
    fn prop_relation_order(ids in prop::collection::vec("[a-f0-9]{8}", 0..20)) {
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let tag = RecipeTags::normalize(&recipe_tag_record("t-prop", "Tag", &refs)).unwrap();
        prop_assert_eq!(tag.related_recipes, ids);
    }
}
