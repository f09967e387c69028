// src/exec/pump.rs

//! Output pump: one OS thread per captured pipe.
//!
//! Each pump reads until EOF and then reports its result to the completion
//! state. Pumps for stdout and stderr run concurrently; draining them one
//! after the other would deadlock against a child blocked on a full pipe
//! that nobody is reading.

use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::thread;

use tracing::{debug, trace, warn};

use crate::errors::ProcessError;
use crate::process::state::Completion;
use crate::types::{OutputSink, StreamKind, StreamOutput};

/// Bytes requested per `read` call.
pub const CHUNK_SIZE: usize = 4096;

/// Read `reader` to EOF.
///
/// With a `sink`, every chunk is handed over and dropped, and the returned
/// buffer stays empty. Without one, everything is accumulated. The reader
/// (and so its descriptor) is dropped before returning.
pub fn drain<R: Read>(stream: StreamKind, mut reader: R, sink: Option<&OutputSink>) -> StreamOutput {
    let mut collected = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(collected),
            Ok(n) => {
                trace!(%stream, bytes = n, "read chunk");
                match sink {
                    Some(sink) => sink(&chunk[..n]),
                    None => collected.extend_from_slice(&chunk[..n]),
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(ProcessError::read(stream, &err)),
        }
    }
}

/// Start a background pump for one stream.
pub(crate) fn spawn_pump(
    stream: StreamKind,
    reader: Box<dyn Read + Send>,
    sink: Option<OutputSink>,
    completion: Arc<Completion>,
) {
    let worker_completion = Arc::clone(&completion);
    let spawned = thread::Builder::new()
        .name(format!("procexec-{stream}"))
        .spawn(move || {
            debug!(%stream, "output pump started");
            let output = drain(stream, reader, sink.as_ref());
            match &output {
                Ok(bytes) => debug!(%stream, bytes = bytes.len(), "output pump reached EOF"),
                Err(err) => warn!(%stream, error = %err, "output pump failed"),
            }
            worker_completion.stream_finished(stream, output);
        });

    if let Err(err) = spawned {
        warn!(%stream, error = %err, "could not start output pump");
        completion.stream_finished(stream, Err(ProcessError::read(stream, &err)));
    }
}
