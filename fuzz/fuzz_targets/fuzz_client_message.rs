#![no_main]

use bingo_relay::protocol::ClientMessage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Frames the relay reads from untrusted connections.
    if let Ok(ClientMessage::SetState(snapshot)) = serde_json::from_slice::<ClientMessage>(data) {
        // The relay forwards the payload verbatim, so it must re-encode.
        let _ = serde_json::to_string(&snapshot);
    }
});
