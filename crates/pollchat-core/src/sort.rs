//! Unified ordering of the merged conversation list
//!
//! Favorites come first whatever the criteria, ordered among themselves by
//! rank. Everything else is ordered by the chosen criteria, which defaults to
//! activity (last update, then message count). Ties fall back to the id so
//! the comparator is a total order and sorting is deterministic.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::Conversation;

/// Field a conversation list is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortCriteria {
    /// Last update, with message count breaking same-instant ties
    #[default]
    Activity,
    Title,
    CreatedAt,
    UpdatedAt,
}

/// Direction applied to the criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[serde(alias = "asc")]
    Ascending,
    #[default]
    #[serde(alias = "desc")]
    Descending,
}

impl SortOrder {
    const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Options for [`compare`] and [`sort_conversations`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortOptions {
    pub criteria: SortCriteria,
    pub order: SortOrder,
    pub favorite_first: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            criteria: SortCriteria::Activity,
            order: SortOrder::Descending,
            favorite_first: true,
        }
    }
}

/// Compare two conversations for display order.
#[must_use]
pub fn compare(a: &Conversation, b: &Conversation, options: &SortOptions) -> Ordering {
    let ordering = if options.favorite_first {
        match (a.is_favorite, b.is_favorite) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => compare_favorites(a, b, options),
            (false, false) => compare_by_criteria(a, b, options),
        }
    } else {
        compare_by_criteria(a, b, options)
    };

    ordering.then_with(|| a.id.cmp(&b.id))
}

/// Sort `conversations` in place with [`compare`].
pub fn sort_conversations(conversations: &mut [Conversation], options: &SortOptions) {
    conversations.sort_by(|a, b| compare(a, b, options));
}

fn compare_favorites(a: &Conversation, b: &Conversation, options: &SortOptions) -> Ordering {
    match (a.favorite_rank, b.favorite_rank) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => match options.criteria {
            SortCriteria::Activity => options.order.apply(a.updated_at.cmp(&b.updated_at)),
            _ => compare_by_criteria(a, b, options),
        },
    }
}

fn compare_by_criteria(a: &Conversation, b: &Conversation, options: &SortOptions) -> Ordering {
    match options.criteria {
        // Busier conversation first on equal recency, whatever the order
        SortCriteria::Activity => options
            .order
            .apply(a.updated_at.cmp(&b.updated_at))
            .then_with(|| b.message_count.cmp(&a.message_count)),
        SortCriteria::Title => options.order.apply(compare_titles(&a.title, &b.title)),
        SortCriteria::CreatedAt => options.order.apply(a.created_at.cmp(&b.created_at)),
        SortCriteria::UpdatedAt => options.order.apply(a.updated_at.cmp(&b.updated_at)),
    }
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
