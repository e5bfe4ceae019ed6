use std::{
    ops::{Deref, DerefMut},
    vec::Drain,
};

use crate::mapping::MetricType;

pub(crate) const SMALLEST_VALID_PAYLOAD: &[u8] = b"a:0|c";

fn type_suffix(metric_type: MetricType) -> &'static [u8] {
    match metric_type {
        MetricType::Count => b"|c",
        MetricType::Timer => b"|ms",
        MetricType::Gauge => b"|g",
    }
}

/// Formats StatsD lines for a fixed metric name prefix.
#[derive(Clone, Debug)]
pub(crate) struct LineFormatter {
    prefix: Vec<u8>,
}

impl LineFormatter {
    /// Creates a new `LineFormatter`.
    ///
    /// The prefix is trimmed of surrounding whitespace; if anything remains, it is written in front of every metric name
    /// followed by a `.`.
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim();
        let mut buf = Vec::with_capacity(prefix.len() + 1);
        if !prefix.is_empty() {
            buf.extend_from_slice(prefix.as_bytes());
            buf.push(b'.');
        }
        Self { prefix: buf }
    }

    /// Formats a record for the given metric.
    ///
    /// Negative gauge values produce two lines: the gauge is first reset to zero, and then adjusted by the value, as a
    /// leading sign on a gauge value means "adjust by" rather than "set to" in StatsD.
    pub fn format(&self, name: &str, value: i64, metric_type: MetricType) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.prefix.len() + name.len() + 24);
        if metric_type == MetricType::Gauge && value < 0 {
            self.write_line(&mut buf, name, 0, metric_type);
            buf.push(b'\n');
        }
        self.write_line(&mut buf, name, value, metric_type);
        buf
    }

    fn write_line(&self, buf: &mut Vec<u8>, name: &str, value: i64, metric_type: MetricType) {
        let mut int_writer = itoa::Buffer::new();

        buf.extend_from_slice(&self.prefix);
        buf.extend_from_slice(name.as_bytes());
        buf.push(b':');
        buf.extend_from_slice(int_writer.format(value).as_bytes());
        buf.extend_from_slice(type_suffix(metric_type));
    }
}

/// Packs records into larger payloads for more efficient network I/O.
///
/// StatsD lines are newline delimited, so multiple records can be sent in a single datagram and split apart by the
/// server. Each payload holds one or more complete records, separated by `\n`, and never exceeds the maximum payload
/// length.
pub(crate) struct PayloadWriter {
    max_payload_len: usize,
    payloads_buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PayloadWriter {
    /// Creates a new `PayloadWriter` with the given maximum payload length.
    pub fn new(max_payload_len: usize) -> Self {
        // NOTE: This should also be handled in the builder, but we want to just double check here that we're getting a
        // properly sanitized value.
        assert!(
            max_payload_len >= SMALLEST_VALID_PAYLOAD.len(),
            "maximum payload length is too small to allow any metrics to be written (must be {} or greater)",
            SMALLEST_VALID_PAYLOAD.len()
        );

        Self { max_payload_len, payloads_buf: Vec::with_capacity(max_payload_len), offsets: Vec::new() }
    }

    fn last_offset(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Returns the number of bytes in the current payload.
    fn current_payload_len(&self) -> usize {
        self.payloads_buf.len() - self.last_offset()
    }

    /// Finalizes the current payload and starts a new one.
    ///
    /// If the current payload is empty, this method does nothing.
    fn finalize_current_payload(&mut self) {
        if self.current_payload_len() == 0 {
            return;
        }

        self.offsets.push(self.payloads_buf.len());
    }

    /// Writes a record to the current payload.
    ///
    /// If the record is larger than the maximum payload length, it is discarded. If the current payload cannot fit the
    /// record without exceeding the maximum payload length, the current payload is finalized first and the record
    /// starts a new one.
    ///
    /// Returns `true` if the record was written, or `false` if it was discarded.
    pub fn write(&mut self, record: &[u8]) -> bool {
        if record.len() > self.max_payload_len {
            return false;
        }

        let current_payload_len = self.current_payload_len();
        if current_payload_len > 0 && current_payload_len + 1 + record.len() > self.max_payload_len {
            self.finalize_current_payload();
        }

        if self.current_payload_len() > 0 {
            self.payloads_buf.push(b'\n');
        }
        self.payloads_buf.extend_from_slice(record);

        true
    }

    /// Returns `true` if nothing has been written since the payloads were last consumed.
    pub fn is_empty(&self) -> bool {
        self.payloads_buf.is_empty()
    }

    /// Returns a consuming iterator over all payloads written by this writer.
    ///
    /// The iterator will yield payloads in the order they were written, and the payloads will be cleared from the
    /// writer when the iterator is dropped.
    pub fn payloads(&mut self) -> Payloads<'_> {
        self.finalize_current_payload();

        Payloads::new(&mut self.payloads_buf, &mut self.offsets)
    }
}

/// Iterator over all payloads written by a `PayloadWriter`.
pub(crate) struct Payloads<'a> {
    payloads_buf: ConsumingBufferSwap<'a, u8>,
    start: usize,
    offsets: Drain<'a, usize>,
}

impl<'a> Payloads<'a> {
    fn new(payload_buf: &'a mut Vec<u8>, offsets: &'a mut Vec<usize>) -> Self {
        Self { payloads_buf: ConsumingBufferSwap::new(payload_buf), start: 0, offsets: offsets.drain(..) }
    }

    /// Returns the number of remaining payloads.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns the next payload.
    ///
    /// If there are no more payloads, `None` is returned.
    pub fn next_payload(&mut self) -> Option<&[u8]> {
        let offset = self.offsets.next()?;

        let offset_buf = &self.payloads_buf[self.start..offset];
        self.start = offset;

        Some(offset_buf)
    }
}

// Takes the buffer out of its owner for the lifetime of `Payloads`.
//
// The owner is left holding an empty buffer from the start, so even if the drop logic never runs the writer is left
// cleared. On drop, the original allocation is cleared and handed back so it can be reused.
struct ConsumingBufferSwap<'a, T> {
    source: &'a mut Vec<T>,
    original: Vec<T>,
}

impl<'a, T> ConsumingBufferSwap<'a, T> {
    fn new(source: &'a mut Vec<T>) -> Self {
        let original = std::mem::take(source);
        Self { source, original }
    }
}

impl<T> Drop for ConsumingBufferSwap<'_, T> {
    fn drop(&mut self) {
        self.original.clear();
        std::mem::swap(self.source, &mut self.original);
    }
}

impl<T> Deref for ConsumingBufferSwap<'_, T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.original
    }
}

impl<T> DerefMut for ConsumingBufferSwap<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.original
    }
}
