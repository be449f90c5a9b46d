//! Favorite rank management
//!
//! Favorites carry a 1-based `favorite_rank`. `reorder` moves a single item
//! and may leave duplicates or gaps behind; `normalize` is the bulk repair
//! that renumbers every favorite densely. `validate` only reports.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Conversation, ConversationId};

/// Rank a newly favorited conversation receives (append to the end).
#[must_use]
pub fn next_rank<'a, I>(conversations: I) -> u32
where
    I: IntoIterator<Item = &'a Conversation>,
{
    let favorites = conversations
        .into_iter()
        .filter(|c| c.is_favorite)
        .count();
    u32::try_from(favorites).unwrap_or(u32::MAX - 1) + 1
}

/// Favorite fields to write onto a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritePatch {
    pub is_favorite: bool,
    pub favorite_rank: Option<u32>,
}

impl FavoritePatch {
    /// Write the patch onto `conversation` and bump its update time.
    pub fn apply(self, conversation: &mut Conversation) {
        conversation.is_favorite = self.is_favorite;
        conversation.favorite_rank = self.favorite_rank;
        conversation.touch();
    }

    /// Copy of `conversation` with the patch applied.
    #[must_use]
    pub fn applied_to(self, conversation: &Conversation) -> Conversation {
        let mut patched = conversation.clone();
        self.apply(&mut patched);
        patched
    }
}

/// Patch that (un)favorites `conversation` within `conversations`.
///
/// Favoriting appends to the end; favoriting something already ranked keeps
/// its rank. Unfavoriting always clears the rank.
#[must_use]
pub fn set_favorite(
    conversations: &[Conversation],
    conversation: &Conversation,
    favorite: bool,
) -> FavoritePatch {
    if !favorite {
        return FavoritePatch {
            is_favorite: false,
            favorite_rank: None,
        };
    }

    if conversation.is_favorite {
        if let Some(rank) = conversation.favorite_rank {
            return FavoritePatch {
                is_favorite: true,
                favorite_rank: Some(rank),
            };
        }
    }

    let others = conversations
        .iter()
        .filter(|other| other.id != conversation.id);
    FavoritePatch {
        is_favorite: true,
        favorite_rank: Some(next_rank(others)),
    }
}

/// Set the rank of one favorite without renumbering its siblings.
pub fn reorder(
    conversations: &[Conversation],
    id: &ConversationId,
    new_rank: u32,
) -> Result<Vec<Conversation>> {
    if new_rank == 0 {
        return Err(Error::InvalidInput(
            "Favorite rank must be a positive integer".to_string(),
        ));
    }

    let target = conversations
        .iter()
        .find(|conversation| &conversation.id == id)
        .ok_or_else(|| Error::NotFound(id.to_string()))?;
    if !target.is_favorite {
        return Err(Error::InvalidInput(format!(
            "Conversation {id} is not a favorite"
        )));
    }

    Ok(conversations
        .iter()
        .map(|conversation| {
            let mut conversation = conversation.clone();
            if &conversation.id == id && conversation.favorite_rank != Some(new_rank) {
                conversation.favorite_rank = Some(new_rank);
                conversation.touch();
            }
            conversation
        })
        .collect())
}

/// Renumber favorites densely as 1..N, keeping their current relative order.
///
/// Favorites without a rank go last, most recently updated first. Stray
/// ranks on non-favorites are cleared. Input order is preserved.
#[must_use]
pub fn normalize(conversations: &[Conversation]) -> Vec<Conversation> {
    let mut favorites = conversations
        .iter()
        .filter(|conversation| conversation.is_favorite)
        .collect::<Vec<_>>();
    favorites.sort_by(|a, b| favorite_position(a, b));

    let assigned = favorites
        .iter()
        .zip(1u32..)
        .map(|(conversation, rank)| (conversation.id.clone(), rank))
        .collect::<BTreeMap<_, _>>();

    conversations
        .iter()
        .map(|conversation| {
            let mut conversation = conversation.clone();
            let rank = assigned.get(&conversation.id).copied();
            if conversation.favorite_rank != rank {
                conversation.favorite_rank = rank;
                conversation.touch();
            }
            conversation
        })
        .collect()
}

fn favorite_position(a: &Conversation, b: &Conversation) -> Ordering {
    match (a.favorite_rank, b.favorite_rank) {
        (Some(left), Some(right)) => left
            .cmp(&right)
            .then_with(|| b.updated_at.cmp(&a.updated_at)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.updated_at.cmp(&a.updated_at),
    }
    .then_with(|| a.id.cmp(&b.id))
}

/// One inconsistency in the favorite rank sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RankIssue {
    /// Several favorites share a rank
    Duplicate {
        rank: u32,
        ids: Vec<ConversationId>,
    },
    /// No favorite holds this rank although a higher one exists
    Gap { rank: u32 },
    /// A favorite has no rank at all
    Missing { id: ConversationId },
    /// A non-favorite still carries a rank
    OnNonFavorite { id: ConversationId, rank: u32 },
}

impl fmt::Display for RankIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { rank, ids } => {
                let ids = ids
                    .iter()
                    .map(ConversationId::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "rank {rank} is shared by {ids}")
            }
            Self::Gap { rank } => write!(f, "rank {rank} is unused"),
            Self::Missing { id } => write!(f, "favorite {id} has no rank"),
            Self::OnNonFavorite { id, rank } => {
                write!(f, "non-favorite {id} still has rank {rank}")
            }
        }
    }
}

/// Result of [`validate`]. Reported as data, never as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankValidation {
    pub is_valid: bool,
    pub errors: Vec<RankIssue>,
    pub suggestions: Vec<String>,
}

/// Report duplicate ranks, gaps and unranked favorites without mutating anything.
#[must_use]
pub fn validate(conversations: &[Conversation]) -> RankValidation {
    let mut errors = Vec::new();
    let mut by_rank: BTreeMap<u32, Vec<ConversationId>> = BTreeMap::new();

    for conversation in conversations {
        match (conversation.is_favorite, conversation.favorite_rank) {
            (true, Some(rank)) => by_rank
                .entry(rank)
                .or_default()
                .push(conversation.id.clone()),
            (true, None) => errors.push(RankIssue::Missing {
                id: conversation.id.clone(),
            }),
            (false, Some(rank)) => errors.push(RankIssue::OnNonFavorite {
                id: conversation.id.clone(),
                rank,
            }),
            (false, None) => {}
        }
    }

    for (rank, ids) in &by_rank {
        if ids.len() > 1 {
            errors.push(RankIssue::Duplicate {
                rank: *rank,
                ids: ids.clone(),
            });
        }
    }

    let used = by_rank.keys().copied().collect::<BTreeSet<_>>();
    if let Some(max) = used.last().copied() {
        errors.extend(
            (1..max)
                .filter(|rank| !used.contains(rank))
                .map(|rank| RankIssue::Gap { rank }),
        );
    }

    let suggestions = suggestions_for(&errors);
    RankValidation {
        is_valid: errors.is_empty(),
        errors,
        suggestions,
    }
}

fn suggestions_for(errors: &[RankIssue]) -> Vec<String> {
    let mut suggestions = Vec::new();
    if errors.is_empty() {
        return suggestions;
    }

    if errors
        .iter()
        .any(|issue| matches!(issue, RankIssue::Missing { .. }))
    {
        suggestions.push("Unranked favorites will be placed after ranked ones".to_string());
    }
    if errors
        .iter()
        .any(|issue| matches!(issue, RankIssue::OnNonFavorite { .. }))
    {
        suggestions.push("Clear ranks left on non-favorite conversations".to_string());
    }
    suggestions.push("Normalize favorites to renumber them 1..N".to_string());
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn favorite(id: &str, rank: Option<u32>) -> Conversation {
        let mut conversation = Conversation::new("owner-1", id);
        conversation.id = id.into();
        conversation.is_favorite = true;
        conversation.favorite_rank = rank;
        conversation
    }

    fn plain(id: &str) -> Conversation {
        let mut conversation = Conversation::new("owner-1", id);
        conversation.id = id.into();
        conversation
    }

    fn ranks(conversations: &[Conversation]) -> Vec<(&str, Option<u32>)> {
        conversations
            .iter()
            .map(|c| (c.id.as_str(), c.favorite_rank))
            .collect()
    }

    #[test]
    fn next_rank_appends_after_favorites() {
        let list = vec![favorite("a", Some(1)), favorite("b", Some(2)), plain("c")];
        assert_eq!(next_rank(&list), 3);
        assert_eq!(next_rank(&Vec::<Conversation>::new()), 1);
    }

    #[test]
    fn favoriting_assigns_next_rank() {
        let list = vec![favorite("a", Some(1)), plain("b")];
        let patch = set_favorite(&list, &list[1], true);
        assert_eq!(
            patch,
            FavoritePatch {
                is_favorite: true,
                favorite_rank: Some(2),
            }
        );
    }

    #[test]
    fn unranked_favorite_gets_next_rank_without_counting_itself() {
        let list = vec![favorite("a", Some(1)), favorite("b", None)];
        let patch = set_favorite(&list, &list[1], true);
        assert_eq!(patch.favorite_rank, Some(2));
        assert_eq!(
            patch.favorite_rank,
            Some(next_rank(list.iter().filter(|c| c.id != "b")))
        );
    }

    #[test]
    fn favoriting_twice_keeps_rank() {
        let list = vec![favorite("a", Some(1)), favorite("b", Some(2))];
        let patch = set_favorite(&list, &list[0], true);
        assert_eq!(patch.favorite_rank, Some(1));
    }

    #[test]
    fn unfavoriting_clears_rank() {
        let list = vec![favorite("a", Some(1))];
        let mut target = list[0].clone();
        set_favorite(&list, &target, false).apply(&mut target);
        assert!(!target.is_favorite);
        assert_eq!(target.favorite_rank, None);
    }

    #[test]
    fn reorder_only_touches_target() {
        let list = vec![
            favorite("a", Some(1)),
            favorite("b", Some(2)),
            favorite("c", Some(3)),
        ];
        let reordered = reorder(&list, &"c".into(), 1).unwrap();
        assert_eq!(
            ranks(&reordered),
            vec![("a", Some(1)), ("b", Some(2)), ("c", Some(1))]
        );
        assert!(!validate(&reordered).is_valid);
    }

    #[test]
    fn reorder_rejects_bad_input() {
        let list = vec![favorite("a", Some(1)), plain("b")];
        assert!(matches!(
            reorder(&list, &"a".into(), 0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            reorder(&list, &"b".into(), 1),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            reorder(&list, &"zzz".into(), 1),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn normalize_renumbers_densely() {
        let mut stale = favorite("d", None);
        stale.updated_at -= 10_000;
        let mut fresh = favorite("e", None);
        fresh.updated_at += 10_000;

        let list = vec![
            favorite("a", Some(5)),
            plain("b"),
            favorite("c", Some(2)),
            stale,
            fresh,
        ];
        let normalized = normalize(&list);
        assert_eq!(
            ranks(&normalized),
            vec![
                ("a", Some(2)),
                ("b", None),
                ("c", Some(1)),
                ("d", Some(4)),
                ("e", Some(3)),
            ]
        );
        assert!(validate(&normalized).is_valid);
    }

    #[test]
    fn normalize_clears_stray_rank_on_non_favorite() {
        let mut stray = plain("b");
        stray.favorite_rank = Some(7);
        let normalized = normalize(&[favorite("a", Some(1)), stray]);
        assert_eq!(ranks(&normalized), vec![("a", Some(1)), ("b", None)]);
    }

    #[test]
    fn validate_reports_every_issue_kind() {
        let mut stray = plain("e");
        stray.favorite_rank = Some(9);
        let list = vec![
            favorite("a", Some(1)),
            favorite("b", Some(1)),
            favorite("c", Some(4)),
            favorite("d", None),
            stray,
        ];

        let report = validate(&list);
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![
                RankIssue::Missing { id: "d".into() },
                RankIssue::OnNonFavorite {
                    id: "e".into(),
                    rank: 9,
                },
                RankIssue::Duplicate {
                    rank: 1,
                    ids: vec!["a".into(), "b".into()],
                },
                RankIssue::Gap { rank: 2 },
                RankIssue::Gap { rank: 3 },
            ]
        );
        assert!(report
            .suggestions
            .iter()
            .any(|suggestion| suggestion.contains("Normalize")));
    }

    #[test]
    fn validate_accepts_dense_sequence() {
        let list = vec![favorite("a", Some(2)), favorite("b", Some(1)), plain("c")];
        let report = validate(&list);
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn rank_issue_display() {
        assert_eq!(RankIssue::Gap { rank: 3 }.to_string(), "rank 3 is unused");
    }
}
