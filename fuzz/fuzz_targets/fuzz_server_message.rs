#![no_main]

use bingo_relay::protocol::ServerMessage;
use bingo_relay::ViewerMirror;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(msg) = serde_json::from_slice::<ServerMessage>(data) else {
        return;
    };

    // Screens store whatever arrives and decode it lazily.
    let mut mirror = ViewerMirror::new();
    mirror.apply(msg.into());
    if let Ok(state) = mirror.game_state() {
        let _ = state.check_invariants();
        let _ = state.last_call_name();
        let _ = state.recent_calls(5).count();
    }
});
