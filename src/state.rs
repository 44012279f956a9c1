//! The shared game state contract.
//!
//! [`GameState`] is the only entity the caller and screens agree on. Its JSON
//! shape is the wire payload of both `set-state` and `new-state`:
//!
//! ```json
//! {"min":1,"max":90,"calls":[],"available":[],"running":false,"all":[],"video":false}
//! ```
//!
//! `video` is either the literal `false` or a clip file name such as
//! `"quack.webm"`.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::call_names;
use crate::error::{BingoError, Result};

/// A callable bingo number.
pub type Number = i32;

/// Default lower bound for a fresh game.
pub const DEFAULT_MIN: Number = 1;

/// Default upper bound for a fresh game.
pub const DEFAULT_MAX: Number = 90;

/// Largest board [`Action::Start`](crate::reducer::Action::Start) accepts.
pub const MAX_BOARD_SIZE: usize = 10_000;

/// Number of recent calls a screen shows beside the board.
pub const RECENT_CALLS: usize = 5;

// ── Video clips ─────────────────────────────────────────────────────

/// Announcement clips the caller can overlay on every screen.
///
/// Serialized as the clip's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoClip {
    #[serde(rename = "silence.mkv")]
    Silence,
    #[serde(rename = "nice.webm")]
    Nice,
    #[serde(rename = "quack.webm")]
    Quack,
    #[serde(rename = "woohoo.mkv")]
    Woohoo,
}

impl VideoClip {
    /// Every clip, in the order the caller's controls list them.
    pub const ALL: [VideoClip; 4] = [
        VideoClip::Silence,
        VideoClip::Nice,
        VideoClip::Quack,
        VideoClip::Woohoo,
    ];

    /// File name of the clip, as served to screens.
    pub fn file_name(&self) -> &'static str {
        match self {
            VideoClip::Silence => "silence.mkv",
            VideoClip::Nice => "nice.webm",
            VideoClip::Quack => "quack.webm",
            VideoClip::Woohoo => "woohoo.mkv",
        }
    }

    /// Button label on the caller's control surface.
    pub fn label(&self) -> &'static str {
        match self {
            VideoClip::Silence => "SILENCE",
            VideoClip::Nice => "Nice",
            VideoClip::Quack => "Quack",
            VideoClip::Woohoo => "WooHoo",
        }
    }
}

impl fmt::Display for VideoClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// `Option<VideoClip>` on the wire: `false` when no overlay is playing.
mod video_overlay {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::VideoClip;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Clip(VideoClip),
    }

    pub fn serialize<S: Serializer>(
        video: &Option<VideoClip>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match video {
            Some(clip) => clip.serialize(serializer),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<VideoClip>, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Ok(None),
            Raw::Flag(true) => Err(D::Error::custom(
                "video must be `false` or a clip file name",
            )),
            Raw::Clip(clip) => Ok(Some(clip)),
        }
    }
}

// ── GameState ───────────────────────────────────────────────────────

/// Configuration and progress of a single bingo game.
///
/// The caller owns the authoritative copy; screens hold replicas that are
/// replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Lowest callable number (inclusive).
    pub min: Number,
    /// Highest callable number (inclusive).
    pub max: Number,
    /// Numbers called so far, oldest first.
    pub calls: Vec<Number>,
    /// Numbers not yet called.
    pub available: Vec<Number>,
    /// Whether a game is in progress.
    pub running: bool,
    /// Every number on the board, ascending. Fixed once a game starts.
    pub all: Vec<Number>,
    /// Overlay currently playing on the screens, if any.
    #[serde(with = "video_overlay")]
    pub video: Option<VideoClip>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            calls: Vec::new(),
            available: Vec::new(),
            running: false,
            all: Vec::new(),
            video: None,
        }
    }
}

impl GameState {
    /// The most recent call.
    pub fn last_call(&self) -> Option<Number> {
        self.calls.last().copied()
    }

    /// Announcement phrase for the most recent call, if it has one.
    pub fn last_call_name(&self) -> Option<&'static str> {
        self.last_call().and_then(call_names::call_name)
    }

    /// Up to `count` most recent calls, newest first.
    pub fn recent_calls(&self, count: usize) -> impl Iterator<Item = Number> + '_ {
        self.calls.iter().rev().take(count).copied()
    }

    /// `(called, total)` for a progress bar.
    pub fn progress(&self) -> (usize, usize) {
        (self.calls.len(), self.all.len())
    }

    /// Whether `number` has been called in the current game.
    pub fn is_called(&self, number: Number) -> bool {
        self.calls.contains(&number)
    }

    /// Verify that `calls` and `available` partition `all` without duplicates.
    ///
    /// The reducer maintains this for every `start` and `call`; arbitrary
    /// `set` updates and snapshots from the wire can break it.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::InconsistentState`] describing the first
    /// violation found.
    pub fn check_invariants(&self) -> Result<()> {
        let all: HashSet<Number> = self.all.iter().copied().collect();
        if all.len() != self.all.len() {
            return Err(BingoError::InconsistentState(
                "`all` contains duplicates".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.all.len());
        for &n in &self.calls {
            if !seen.insert(n) {
                return Err(BingoError::InconsistentState(format!(
                    "{n} was called more than once"
                )));
            }
        }
        for &n in &self.available {
            if !seen.insert(n) {
                return Err(BingoError::InconsistentState(format!(
                    "{n} is both called and available"
                )));
            }
        }

        if seen != all {
            return Err(BingoError::InconsistentState(
                "`calls` and `available` do not cover `all`".into(),
            ));
        }
        Ok(())
    }
}

/// Ascending sequence `min..=max`. Empty when `min > max`.
pub fn number_range(min: Number, max: Number) -> Vec<Number> {
    (min..=max).collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn running(calls: Vec<Number>, available: Vec<Number>) -> GameState {
        GameState {
            min: 1,
            max: 5,
            all: number_range(1, 5),
            calls,
            available,
            running: true,
            video: None,
        }
    }

    #[test]
    fn default_matches_fresh_game() {
        let state = GameState::default();
        assert_eq!((state.min, state.max), (1, 90));
        assert!(!state.running);
        assert!(state.calls.is_empty() && state.available.is_empty() && state.all.is_empty());
        assert_eq!(state.video, None);
    }

    #[test]
    fn default_serializes_video_as_false() {
        let json = serde_json::to_value(GameState::default()).unwrap();
        assert_eq!(json["video"], serde_json::Value::Bool(false));
        assert_eq!(json["min"], 1);
        assert_eq!(json["max"], 90);
    }

    #[test]
    fn video_clip_serializes_as_file_name() {
        for clip in VideoClip::ALL {
            let json = serde_json::to_string(&clip).unwrap();
            assert_eq!(json, format!("\"{}\"", clip.file_name()));
        }
    }

    #[test]
    fn video_true_is_rejected() {
        let mut json = serde_json::to_value(GameState::default()).unwrap();
        json["video"] = serde_json::Value::Bool(true);
        assert!(serde_json::from_value::<GameState>(json).is_err());
    }

    #[test]
    fn video_unknown_clip_is_rejected() {
        let mut json = serde_json::to_value(GameState::default()).unwrap();
        json["video"] = "cat.gif".into();
        assert!(serde_json::from_value::<GameState>(json).is_err());
    }

    #[test]
    fn playing_clip_parses() {
        let mut json = serde_json::to_value(GameState::default()).unwrap();
        json["video"] = "woohoo.mkv".into();
        let state: GameState = serde_json::from_value(json).unwrap();
        assert_eq!(state.video, Some(VideoClip::Woohoo));
    }

    #[test]
    fn number_range_is_inclusive() {
        assert_eq!(number_range(3, 6), vec![3, 4, 5, 6]);
        assert!(number_range(6, 3).is_empty());
    }

    #[test]
    fn recent_calls_are_newest_first() {
        let state = running(vec![4, 1, 5, 2, 3], vec![]);
        let recent: Vec<_> = state.recent_calls(3).collect();
        assert_eq!(recent, vec![3, 2, 5]);
        assert_eq!(state.last_call(), Some(3));
        assert_eq!(state.progress(), (5, 5));
    }

    #[test]
    fn last_call_name_uses_call_table() {
        let state = running(vec![1], vec![2, 3, 4, 5]);
        assert_eq!(state.last_call_name(), Some("Kelly's eye"));
        assert_eq!(GameState::default().last_call_name(), None);
    }

    #[test]
    fn check_invariants_accepts_partition() {
        running(vec![3, 1], vec![2, 4, 5]).check_invariants().unwrap();
        GameState::default().check_invariants().unwrap();
    }

    #[test]
    fn check_invariants_rejects_duplicate_call() {
        let err = running(vec![3, 3], vec![1, 2, 4, 5])
            .check_invariants()
            .unwrap_err();
        assert!(matches!(err, BingoError::InconsistentState(_)));
    }

    #[test]
    fn check_invariants_rejects_overlap() {
        let err = running(vec![3], vec![1, 2, 3, 4, 5])
            .check_invariants()
            .unwrap_err();
        assert!(matches!(err, BingoError::InconsistentState(_)));
    }

    #[test]
    fn check_invariants_rejects_missing_number() {
        let err = running(vec![3], vec![1, 2, 4])
            .check_invariants()
            .unwrap_err();
        assert!(matches!(err, BingoError::InconsistentState(_)));
    }
}
