//! Naming convention engine.
//!
//! Pure text transforms between snake_case, camelCase, PascalCase and
//! kebab-case. Every convention is buffer-size-aware: `max_output_len`
//! computes the worst-case output length before writing, and `try_apply`
//! fails explicitly when the destination is smaller than the computed bound
//! instead of truncating.

use crate::Naming;

/// Returned by [`NamingConvention::try_apply`] when the destination buffer
/// cannot hold the converted name. The buffer may be partially written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("destination buffer too small for converted name")]
pub struct SizeError;

/// A reversible-or-not identifier case transform.
pub trait NamingConvention {
    /// Worst-case output length in bytes for a source of `source_len` bytes.
    fn max_output_len(&self, source_len: usize) -> usize;

    /// Convert `source` into `dest`, returning the number of bytes written.
    ///
    /// Callers must pre-size `dest` using [`max_output_len`]; an undersized
    /// buffer yields [`SizeError`], never silent truncation.
    ///
    /// [`max_output_len`]: NamingConvention::max_output_len
    fn try_apply(&self, source: &str, dest: &mut [u8]) -> Result<usize, SizeError>;

    /// Convert `source` into a freshly allocated string.
    fn apply(&self, source: &str) -> String;
}

/// snake_case: lowercases every letter, separating words with `_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCase;

/// kebab-case: lowercases every letter, separating words with `-`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KebabCase;

/// PascalCase: upper-cases the first character of every word, passing all
/// other characters through unchanged. One-directional: existing uppercase
/// runs are not canonicalized.
#[derive(Debug, Clone, Copy, Default)]
pub struct PascalCase;

/// camelCase: PascalCase with the very first emitted character forced
/// lowercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCase;

/// Convention instance for a [`Naming`] value.
#[must_use]
pub fn convention(naming: Naming) -> &'static dyn NamingConvention {
    match naming {
        Naming::SnakeCase => &SnakeCase,
        Naming::CamelCase => &CamelCase,
        Naming::PascalCase => &PascalCase,
        Naming::KebabCase => &KebabCase,
    }
}

/// Separator insertion may add one extra byte per two source bytes.
const fn separated_bound(source_len: usize) -> usize {
    source_len + source_len / 2 + source_len % 2
}

impl NamingConvention for SnakeCase {
    fn max_output_len(&self, source_len: usize) -> usize {
        separated_bound(source_len)
    }

    fn try_apply(&self, source: &str, dest: &mut [u8]) -> Result<usize, SizeError> {
        let mut sink = SliceSink::new(dest);
        if separated_into(source, '_', &mut sink) {
            Ok(sink.len())
        } else {
            Err(SizeError)
        }
    }

    fn apply(&self, source: &str) -> String {
        let mut sink = StringSink::with_capacity(self.max_output_len(source.len()));
        separated_into(source, '_', &mut sink);
        sink.into_string()
    }
}

impl NamingConvention for KebabCase {
    fn max_output_len(&self, source_len: usize) -> usize {
        separated_bound(source_len)
    }

    fn try_apply(&self, source: &str, dest: &mut [u8]) -> Result<usize, SizeError> {
        let mut sink = SliceSink::new(dest);
        if separated_into(source, '-', &mut sink) {
            Ok(sink.len())
        } else {
            Err(SizeError)
        }
    }

    fn apply(&self, source: &str) -> String {
        let mut sink = StringSink::with_capacity(self.max_output_len(source.len()));
        separated_into(source, '-', &mut sink);
        sink.into_string()
    }
}

impl NamingConvention for PascalCase {
    fn max_output_len(&self, source_len: usize) -> usize {
        source_len
    }

    fn try_apply(&self, source: &str, dest: &mut [u8]) -> Result<usize, SizeError> {
        let mut sink = SliceSink::new(dest);
        if cased_into(source, false, &mut sink) {
            Ok(sink.len())
        } else {
            Err(SizeError)
        }
    }

    fn apply(&self, source: &str) -> String {
        let mut sink = StringSink::with_capacity(self.max_output_len(source.len()));
        cased_into(source, false, &mut sink);
        sink.into_string()
    }
}

impl NamingConvention for CamelCase {
    fn max_output_len(&self, source_len: usize) -> usize {
        source_len
    }

    fn try_apply(&self, source: &str, dest: &mut [u8]) -> Result<usize, SizeError> {
        let mut sink = SliceSink::new(dest);
        if cased_into(source, true, &mut sink) {
            Ok(sink.len())
        } else {
            Err(SizeError)
        }
    }

    fn apply(&self, source: &str) -> String {
        let mut sink = StringSink::with_capacity(self.max_output_len(source.len()));
        cased_into(source, true, &mut sink);
        sink.into_string()
    }
}

/// Output sink abstracting over bounded and unbounded destinations.
trait Sink {
    /// Returns `false` when the destination cannot hold `c`.
    fn push(&mut self, c: char) -> bool;
    /// Drop the final byte if it equals the (ASCII) separator `c`.
    fn pop_if(&mut self, c: char);
}

struct StringSink(String);

impl StringSink {
    fn with_capacity(capacity: usize) -> Self {
        Self(String::with_capacity(capacity))
    }

    fn into_string(self) -> String {
        self.0
    }
}

impl Sink for StringSink {
    fn push(&mut self, c: char) -> bool {
        self.0.push(c);
        true
    }

    fn pop_if(&mut self, c: char) {
        if self.0.ends_with(c) {
            self.0.pop();
        }
    }
}

struct SliceSink<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> SliceSink<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl Sink for SliceSink<'_> {
    fn push(&mut self, c: char) -> bool {
        let width = c.len_utf8();
        if self.len + width > self.buf.len() {
            return false;
        }
        c.encode_utf8(&mut self.buf[self.len..]);
        self.len += width;
        true
    }

    fn pop_if(&mut self, c: char) {
        if self.len > 0 && self.buf[self.len - 1] == c as u8 {
            self.len -= 1;
        }
    }
}

/// Shared transform for the separator conventions (snake/kebab).
///
/// An uppercase run is treated as an acronym: the separator is inserted
/// before an uppercase character only when it neither starts a word nor
/// continues a preceding uppercase run. A trailing separator is stripped.
fn separated_into(source: &str, sep: char, sink: &mut impl Sink) -> bool {
    let mut is_delimiter = true;
    let mut acronym = false;
    for c in source.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() {
                if !(is_delimiter || acronym) && !sink.push(sep) {
                    return false;
                }
                for lower in c.to_lowercase() {
                    if !sink.push(lower) {
                        return false;
                    }
                }
                acronym = true;
            } else {
                if !sink.push(c) {
                    return false;
                }
                acronym = false;
            }
            is_delimiter = false;
        } else if !is_delimiter {
            // Non-alphanumeric characters delimit words and are dropped.
            if !sink.push(sep) {
                return false;
            }
            is_delimiter = true;
        }
    }
    sink.pop_if(sep);
    true
}

/// Shared transform for the casing conventions (Pascal/camel).
///
/// The first character of every run following a delimiter (including the
/// start) is upper-cased; every other character passes through unchanged.
/// With `lower_first`, the very first emitted character is lower-cased
/// instead.
fn cased_into(source: &str, lower_first: bool, sink: &mut impl Sink) -> bool {
    let mut is_delimiter = true;
    let mut first = true;
    for c in source.chars() {
        if c.is_alphanumeric() {
            if is_delimiter {
                if first && lower_first {
                    for lower in c.to_lowercase() {
                        if !sink.push(lower) {
                            return false;
                        }
                    }
                } else {
                    for upper in c.to_uppercase() {
                        if !sink.push(upper) {
                            return false;
                        }
                    }
                }
                is_delimiter = false;
            } else if !sink.push(c) {
                return false;
            }
            first = false;
        } else {
            is_delimiter = true;
        }
    }
    true
}
