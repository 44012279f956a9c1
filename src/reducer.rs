//! Pure state transitions for the caller.
//!
//! [`reduce`] computes the next [`GameState`] from the current one and an
//! [`Action`]. It performs no I/O; publishing the result is the job of
//! [`Caller::dispatch`](crate::caller::Caller::dispatch).

use crate::error::{BingoError, Result};
use crate::state::{number_range, GameState, Number, VideoClip, MAX_BOARD_SIZE};

/// A caller-initiated transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Begin a new game over `min..=max`.
    Start,
    /// Overwrite a single field.
    Set(Update),
    /// Call the number at `index` in `available`.
    Call {
        /// Position in `available`, usually drawn uniformly at random.
        index: usize,
    },
}

/// A single-field overwrite carried by [`Action::Set`].
///
/// No validation happens here. Input layers keep `min >= 1` and
/// `max >= min + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Min(Number),
    Max(Number),
    Running(bool),
    Video(Option<VideoClip>),
    Calls(Vec<Number>),
    Available(Vec<Number>),
    All(Vec<Number>),
}

impl Update {
    fn apply(self, state: &mut GameState) {
        match self {
            Update::Min(min) => state.min = min,
            Update::Max(max) => state.max = max,
            Update::Running(running) => state.running = running,
            Update::Video(video) => state.video = video,
            Update::Calls(calls) => state.calls = calls,
            Update::Available(available) => state.available = available,
            Update::All(all) => state.all = all,
        }
    }
}

/// Compute the state that follows `action`.
///
/// A `Call` whose index is past the end of `available` returns an unchanged
/// copy of `state`; it is never an error.
///
/// # Errors
///
/// Returns [`BingoError::InvalidRange`] when `Start` is dispatched with
/// `min >= max` or with more than [`MAX_BOARD_SIZE`] numbers.
pub fn reduce(state: &GameState, action: &Action) -> Result<GameState> {
    let mut next = state.clone();

    match action {
        Action::Start => {
            let size = i64::from(state.max) - i64::from(state.min) + 1;
            if state.min >= state.max || size > MAX_BOARD_SIZE as i64 {
                return Err(BingoError::InvalidRange {
                    min: state.min,
                    max: state.max,
                });
            }
            next.running = true;
            next.calls.clear();
            next.available = number_range(state.min, state.max);
            next.all = next.available.clone();
        }
        Action::Set(update) => update.clone().apply(&mut next),
        Action::Call { index } => {
            if let Some(&called) = next.available.get(*index) {
                if !next.calls.contains(&called) {
                    next.calls.push(called);
                }
                if let Some(pos) = next.available.iter().position(|&n| n == called) {
                    next.available.remove(pos);
                }
            }
        }
    }

    Ok(next)
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

    fn with_range(min: Number, max: Number) -> GameState {
        GameState {
            min,
            max,
            ..GameState::default()
        }
    }

    #[test]
    fn start_fills_board() {
        let state = reduce(&with_range(1, 5), &Action::Start).unwrap();
        assert_eq!(state.all, vec![1, 2, 3, 4, 5]);
        assert_eq!(state.available, state.all);
        assert!(state.calls.is_empty());
        assert!(state.running);
    }

    #[test]
    fn start_keeps_video_and_range() {
        let mut before = with_range(10, 12);
        before.video = Some(VideoClip::Nice);
        let state = reduce(&before, &Action::Start).unwrap();
        assert_eq!((state.min, state.max), (10, 12));
        assert_eq!(state.video, Some(VideoClip::Nice));
    }

    #[test]
    fn start_clears_previous_calls() {
        let first = reduce(&with_range(1, 3), &Action::Start).unwrap();
        let called = reduce(&first, &Action::Call { index: 0 }).unwrap();
        let restarted = reduce(&called, &Action::Start).unwrap();
        assert!(restarted.calls.is_empty());
        assert_eq!(restarted.available, vec![1, 2, 3]);
    }

    #[test]
    fn start_rejects_empty_range() {
        let err = reduce(&with_range(5, 5), &Action::Start).unwrap_err();
        assert!(matches!(err, BingoError::InvalidRange { min: 5, max: 5 }));

        let err = reduce(&with_range(9, 2), &Action::Start).unwrap_err();
        assert!(matches!(err, BingoError::InvalidRange { min: 9, max: 2 }));
    }

    #[test]
    fn start_rejects_oversized_board() {
        let err = reduce(&with_range(i32::MIN, i32::MAX), &Action::Start).unwrap_err();
        assert!(matches!(
            err,
            BingoError::InvalidRange {
                min: i32::MIN,
                max: i32::MAX
            }
        ));

        let too_big = with_range(1, MAX_BOARD_SIZE as Number + 1);
        assert!(reduce(&too_big, &Action::Start).is_err());

        let largest = reduce(&with_range(1, MAX_BOARD_SIZE as Number), &Action::Start).unwrap();
        assert_eq!(largest.all.len(), MAX_BOARD_SIZE);
    }

    #[test]
    fn call_moves_number() {
        let state = reduce(&with_range(1, 5), &Action::Start).unwrap();
        let state = reduce(&state, &Action::Call { index: 2 }).unwrap();
        assert_eq!(state.calls, vec![3]);
        assert_eq!(state.available, vec![1, 2, 4, 5]);
        assert_eq!(state.all, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn call_out_of_range_is_noop() {
        let state = reduce(&with_range(1, 3), &Action::Start).unwrap();
        let after = reduce(&state, &Action::Call { index: 3 }).unwrap();
        assert_eq!(after, state);

        let after = reduce(&state, &Action::Call { index: usize::MAX }).unwrap();
        assert_eq!(after, state);
    }

    #[test]
    fn call_on_empty_board_is_noop() {
        let state = GameState::default();
        let after = reduce(&state, &Action::Call { index: 0 }).unwrap();
        assert_eq!(after, state);
    }

    #[test]
    fn call_does_not_duplicate_already_called_number() {
        let mut state = reduce(&with_range(1, 3), &Action::Start).unwrap();
        state.calls = vec![2];
        let after = reduce(&state, &Action::Call { index: 1 }).unwrap();
        assert_eq!(after.calls, vec![2]);
        assert_eq!(after.available, vec![1, 3]);
    }

    #[test]
    fn call_removes_only_first_instance() {
        let mut state = with_range(1, 3);
        state.available = vec![2, 1, 2];
        let after = reduce(&state, &Action::Call { index: 0 }).unwrap();
        assert_eq!(after.calls, vec![2]);
        assert_eq!(after.available, vec![1, 2]);
    }

    #[test]
    fn set_overwrites_one_field() {
        let state = GameState::default();
        let after = reduce(&state, &Action::Set(Update::Max(75))).unwrap();
        assert_eq!(after.max, 75);
        assert_eq!(after.min, state.min);

        let after = reduce(&after, &Action::Set(Update::Video(Some(VideoClip::Quack)))).unwrap();
        assert_eq!(after.video, Some(VideoClip::Quack));

        let after = reduce(&after, &Action::Set(Update::Running(true))).unwrap();
        assert!(after.running);
    }

    #[test]
    fn set_does_not_validate() {
        let after = reduce(&GameState::default(), &Action::Set(Update::Min(500))).unwrap();
        assert_eq!(after.min, 500);
        assert_eq!(after.max, 90);

        let after = reduce(&after, &Action::Set(Update::Calls(vec![7, 7]))).unwrap();
        assert_eq!(after.calls, vec![7, 7]);
    }

    #[test]
    fn set_same_value_is_identity() {
        let state = reduce(&with_range(1, 4), &Action::Start).unwrap();
        let after = reduce(&state, &Action::Set(Update::Running(true))).unwrap();
        assert_eq!(after, state);
        let after = reduce(&state, &Action::Set(Update::All(state.all.clone()))).unwrap();
        assert_eq!(after, state);
    }

    #[test]
    fn reduce_does_not_touch_input() {
        let state = reduce(&with_range(1, 4), &Action::Start).unwrap();
        let snapshot = state.clone();
        let _ = reduce(&state, &Action::Call { index: 0 }).unwrap();
        assert_eq!(state, snapshot);
    }
}
