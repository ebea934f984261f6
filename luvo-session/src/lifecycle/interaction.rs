use serde::{Deserialize, Serialize};

/// A like or dislike. Shares are handled separately because they are
/// unbounded per user while reactions are exclusive per (stream, user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl std::fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReactionKind::Like => write!(f, "like"),
            ReactionKind::Dislike => write!(f, "dislike"),
        }
    }
}

impl std::str::FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            _ => Err(format!("unknown reaction kind: {s}")),
        }
    }
}

/// What a toggle request does to the existing reaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    /// No row existed; insert one.
    Added,
    /// The same kind existed; delete it.
    Removed,
    /// The opposite kind existed; flip it in place.
    Flipped,
}

/// Toggling replaces rather than accumulates: at most one like-or-dislike
/// row per (stream, user) at any time.
pub fn decide_toggle(existing: Option<ReactionKind>, requested: ReactionKind) -> ToggleAction {
    match existing {
        None => ToggleAction::Added,
        Some(kind) if kind == requested => ToggleAction::Removed,
        Some(_) => ToggleAction::Flipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_decision_table() {
        assert_eq!(decide_toggle(None, ReactionKind::Like), ToggleAction::Added);
        assert_eq!(
            decide_toggle(Some(ReactionKind::Like), ReactionKind::Like),
            ToggleAction::Removed
        );
        assert_eq!(
            decide_toggle(Some(ReactionKind::Dislike), ReactionKind::Like),
            ToggleAction::Flipped
        );
        assert_eq!(
            decide_toggle(Some(ReactionKind::Like), ReactionKind::Dislike),
            ToggleAction::Flipped
        );
    }

    #[test]
    fn kind_round_trip() {
        assert_eq!("like".parse::<ReactionKind>().unwrap(), ReactionKind::Like);
        assert_eq!(ReactionKind::Dislike.to_string(), "dislike");
        assert!("share".parse::<ReactionKind>().is_err());
    }
}
