#![allow(dead_code)]

pub use procexec_test_utils::builders;
pub use procexec_test_utils::fake_launcher::{FakeLauncher, RecordedLaunch, fake_resolver};
pub use procexec_test_utils::{init_tracing, with_timeout};

use std::sync::{Arc, Mutex};

use procexec::types::OutputSink;

/// Sink that appends every chunk to a shared buffer.
pub fn recording_sink() -> (OutputSink, Arc<Mutex<Vec<u8>>>) {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let writer = Arc::clone(&buf);
    let sink: OutputSink = Arc::new(move |chunk: &[u8]| {
        writer.lock().unwrap().extend_from_slice(chunk);
    });
    (sink, buf)
}
