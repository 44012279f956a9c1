//! The caller: sole owner and writer of the authoritative game state.
//!
//! [`Caller::dispatch`] is the boundary where the pure [`reduce`] meets the
//! publish effect. Each successful dispatch publishes the complete new state
//! exactly once, after it has been computed.
//!
//! ```
//! use bingo_relay::caller::Caller;
//! use bingo_relay::relay::{Relay, DEFAULT_ROOM};
//!
//! let relay = Relay::new();
//! let mut screen = relay.subscribe(DEFAULT_ROOM);
//! let mut caller = Caller::new(relay.publisher(DEFAULT_ROOM));
//!
//! caller.set_max(5).unwrap();
//! caller.start().unwrap();
//! caller.call(2).unwrap();
//! assert_eq!(caller.state().calls, vec![3]);
//!
//! // set-max, start, call
//! let mut seen = 0;
//! while screen.try_recv().is_some() {
//!     seen += 1;
//! }
//! assert_eq!(seen, 3);
//! ```

use rand::Rng;
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::Snapshot;
use crate::reducer::{reduce, Action, Update};
use crate::state::{GameState, Number, VideoClip};

/// Fire-and-forget sink for state snapshots.
///
/// Implementations must not block: [`Caller::dispatch`] is synchronous.
pub trait Publisher {
    /// Publish one complete snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot could not be handed to the channel,
    /// e.g. [`BingoError::NotConnected`](crate::BingoError::NotConnected).
    fn publish(&self, snapshot: Snapshot) -> Result<()>;
}

impl<P: Publisher + ?Sized> Publisher for &P {
    fn publish(&self, snapshot: Snapshot) -> Result<()> {
        (**self).publish(snapshot)
    }
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&self, snapshot: Snapshot) -> Result<()> {
        (**self).publish(snapshot)
    }
}

/// Owns the authoritative [`GameState`] and publishes it after every change.
#[derive(Debug)]
pub struct Caller<P> {
    state: GameState,
    publisher: P,
}

impl<P: Publisher> Caller<P> {
    /// A caller with the default (not running) state.
    ///
    /// Nothing is published until the first dispatch.
    pub fn new(publisher: P) -> Self {
        Self::with_state(GameState::default(), publisher)
    }

    /// A caller that starts from an existing state.
    pub fn with_state(state: GameState, publisher: P) -> Self {
        Self { state, publisher }
    }

    /// The authoritative state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The publisher snapshots are handed to.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Release the publisher, dropping the state.
    pub fn into_publisher(self) -> P {
        self.publisher
    }

    /// Apply `action` and publish the resulting state.
    ///
    /// A failed publish (for example while disconnected) is logged and the
    /// snapshot is lost; the new state is kept either way.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::InvalidRange`](crate::BingoError::InvalidRange)
    /// if `Start` is dispatched with `min >= max`. The state is left untouched
    /// and nothing is published.
    pub fn dispatch(&mut self, action: Action) -> Result<&GameState> {
        let next = reduce(&self.state, &action)?;

        if let Action::Call { index } = action {
            if index >= self.state.available.len() {
                warn!(
                    index,
                    available = self.state.available.len(),
                    "call index out of range, nothing called"
                );
            }
        }
        debug!(?action, "dispatched");

        self.state = next;
        match Snapshot::from_state(&self.state) {
            Ok(snapshot) => {
                if let Err(e) = self.publisher.publish(snapshot) {
                    warn!("snapshot not published: {e}");
                }
            }
            Err(e) => warn!("failed to serialize snapshot: {e}"),
        }

        Ok(&self.state)
    }

    /// Start a game over the configured range.
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub fn start(&mut self) -> Result<&GameState> {
        self.dispatch(Action::Start)
    }

    /// Call the number at `index` in `available`.
    ///
    /// An out-of-range index changes nothing but still publishes.
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub fn call(&mut self, index: usize) -> Result<&GameState> {
        self.dispatch(Action::Call { index })
    }

    /// Call a uniformly random available number and return it.
    ///
    /// Returns `Ok(None)` without dispatching when every number is called.
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub fn call_random<R: Rng>(&mut self, rng: &mut R) -> Result<Option<Number>> {
        let remaining = self.state.available.len();
        if remaining == 0 {
            debug!("no numbers left to call");
            return Ok(None);
        }
        let index = rng.gen_range(0..remaining);
        let called = self.state.available.get(index).copied();
        self.dispatch(Action::Call { index })?;
        Ok(called)
    }

    /// Set the lowest callable number.
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub fn set_min(&mut self, min: Number) -> Result<&GameState> {
        self.dispatch(Action::Set(Update::Min(min)))
    }

    /// Set the highest callable number.
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub fn set_max(&mut self, max: Number) -> Result<&GameState> {
        self.dispatch(Action::Set(Update::Max(max)))
    }

    /// End the game. The board and calls stay as they were.
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub fn end(&mut self) -> Result<&GameState> {
        self.dispatch(Action::Set(Update::Running(false)))
    }

    /// Show `clip` on every screen.
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub fn play_video(&mut self, clip: VideoClip) -> Result<&GameState> {
        self.dispatch(Action::Set(Update::Video(Some(clip))))
    }

    /// Clear the overlay once playback has finished.
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub fn video_ended(&mut self) -> Result<&GameState> {
        self.dispatch(Action::Set(Update::Video(None)))
    }
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
    use crate::error::BingoError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;

    /// Records every snapshot it is given.
    #[derive(Default)]
    struct Recorder {
        published: RefCell<Vec<Snapshot>>,
        fail: bool,
    }

    impl Recorder {
        fn states(&self) -> Vec<GameState> {
            self.published
                .borrow()
                .iter()
                .map(|s| s.game_state().unwrap())
                .collect()
        }
    }

    impl Publisher for Recorder {
        fn publish(&self, snapshot: Snapshot) -> Result<()> {
            if self.fail {
                return Err(BingoError::NotConnected);
            }
            self.published.borrow_mut().push(snapshot);
            Ok(())
        }
    }

    #[test]
    fn new_caller_publishes_nothing() {
        let recorder = Recorder::default();
        let caller = Caller::new(&recorder);
        assert_eq!(caller.state(), &GameState::default());
        assert!(recorder.published.borrow().is_empty());
    }

    #[test]
    fn each_dispatch_publishes_new_state_once() {
        let recorder = Recorder::default();
        let mut caller = Caller::new(&recorder);

        caller.set_max(5).unwrap();
        caller.start().unwrap();
        caller.call(2).unwrap();

        let states = recorder.states();
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].max, 5);
        assert_eq!(states[1].available, vec![1, 2, 3, 4, 5]);
        assert_eq!(states[2].calls, vec![3]);
        assert_eq!(&states[2], caller.state());
    }

    #[test]
    fn out_of_range_call_still_publishes() {
        let recorder = Recorder::default();
        let mut caller = Caller::new(&recorder);
        caller.set_max(3).unwrap();
        caller.start().unwrap();
        let before = caller.state().clone();

        caller.call(10).unwrap();
        assert_eq!(caller.state(), &before);
        assert_eq!(recorder.states().last(), Some(&before));
        assert_eq!(recorder.published.borrow().len(), 3);
    }

    #[test]
    fn set_to_same_value_republishes() {
        let recorder = Recorder::default();
        let mut caller = Caller::new(&recorder);
        caller.set_min(1).unwrap();
        caller.set_min(1).unwrap();

        let states = recorder.states();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0], states[1]);
        assert_eq!(states[1], GameState::default());
    }

    #[test]
    fn rejected_start_publishes_nothing() {
        let recorder = Recorder::default();
        let mut caller = Caller::new(&recorder);
        caller.set_min(90).unwrap();

        let err = caller.start().unwrap_err();
        assert!(matches!(err, BingoError::InvalidRange { min: 90, max: 90 }));
        assert!(!caller.state().running);
        assert_eq!(recorder.published.borrow().len(), 1);
    }

    #[test]
    fn publish_failure_keeps_new_state() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut caller = Caller::new(&recorder);
        caller.start().unwrap();
        assert!(caller.state().running);
        assert_eq!(caller.state().available.len(), 90);
    }

    #[test]
    fn call_random_drains_board_without_repeats() {
        let recorder = Recorder::default();
        let mut caller = Caller::new(&recorder);
        caller.set_max(10).unwrap();
        caller.start().unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let mut drawn = Vec::new();
        while let Some(n) = caller.call_random(&mut rng).unwrap() {
            drawn.push(n);
            caller.state().check_invariants().unwrap();
        }

        assert_eq!(drawn, caller.state().calls);
        drawn.sort_unstable();
        assert_eq!(drawn, (1..=10).collect::<Vec<_>>());
        assert!(caller.state().available.is_empty());
        // set-max, start, ten calls; the exhausted draw publishes nothing
        assert_eq!(recorder.published.borrow().len(), 12);
    }

    #[test]
    fn video_overlay_lifecycle() {
        let recorder = Recorder::default();
        let mut caller = Caller::new(&recorder);
        caller.play_video(VideoClip::Quack).unwrap();
        assert_eq!(caller.state().video, Some(VideoClip::Quack));
        caller.video_ended().unwrap();
        assert_eq!(caller.state().video, None);
    }

    #[test]
    fn end_keeps_board() {
        let recorder = Recorder::default();
        let mut caller = Caller::new(&recorder);
        caller.set_max(4).unwrap();
        caller.start().unwrap();
        caller.call(0).unwrap();
        caller.end().unwrap();

        let state = caller.state();
        assert!(!state.running);
        assert_eq!(state.calls, vec![1]);
        assert_eq!(state.all, vec![1, 2, 3, 4]);
    }
}
