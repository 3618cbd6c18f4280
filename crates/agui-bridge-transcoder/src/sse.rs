//! Line splitter for `text/event-stream` bodies.
//!
//! Turns a body byte stream into a `Stream` of raw lines. Network chunks can
//! end mid-line, so partial lines are buffered until their `\n` arrives.
//! Lines are kept as bytes; the classifier decides how to decode them.

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use tokio_stream::StreamExt;

/// Longest line kept in full; anything past it is dropped.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Split a body byte stream into lines, trimming `\n` / `\r\n`.
///
/// A trailing line without a terminator is still yielded at end of stream.
/// The first transport error is yielded once and ends the stream.
pub fn split_lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<Vec<u8>, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    split_lines_with_limit(byte_stream, MAX_LINE_BYTES)
}

/// [`split_lines`] with an explicit line limit.
///
/// A line longer than `max_line` is yielded cut to `max_line` bytes as soon
/// as the buffer passes the limit; the rest of it, up to the next `\n`, is
/// discarded. The cut line no longer parses, so the classifier reports it as
/// malformed and the stream carries on from the following line.
pub fn split_lines_with_limit<S, E>(
    byte_stream: S,
    max_line: usize,
) -> impl Stream<Item = Result<Vec<u8>, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    futures::stream::unfold(
        LineState {
            byte_stream: Box::pin(byte_stream),
            buffer: Vec::new(),
            max_line,
            discarding: false,
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(newline_pos) = state.buffer.iter().position(|b| *b == b'\n') {
                    let mut line: Vec<u8> = state.buffer.drain(..=newline_pos).collect();
                    if state.discarding {
                        state.discarding = false;
                        continue;
                    }
                    line.pop();
                    trim_carriage_return(&mut line);
                    line.truncate(state.max_line);
                    return Some((Ok(line), state));
                }

                if state.discarding {
                    state.buffer.clear();
                } else if state.buffer.len() > state.max_line {
                    let mut line = std::mem::take(&mut state.buffer);
                    line.truncate(state.max_line);
                    state.discarding = true;
                    tracing::warn!(limit = state.max_line, "SSE line over limit, truncating");
                    return Some((Ok(line), state));
                }

                if state.done {
                    if state.buffer.is_empty() {
                        return None;
                    }
                    let mut line = std::mem::take(&mut state.buffer);
                    trim_carriage_return(&mut line);
                    return Some((Ok(line), state));
                }

                // Need more data from the stream
                match state.byte_stream.next().await {
                    Some(Ok(chunk)) => state.buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        state.done = true;
                        state.buffer.clear();
                        return Some((Err(e), state));
                    }
                    None => state.done = true,
                }
            }
        },
    )
}

fn trim_carriage_return(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}

struct LineState<S> {
    byte_stream: Pin<Box<S>>,
    buffer: Vec<u8>,
    max_line: usize,
    /// Inside an over-long line, dropping bytes until its `\n`.
    discarding: bool,
    done: bool,
}
