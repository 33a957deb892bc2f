use heapless::Vec;

use super::TERMINATOR;
use crate::errors::ParseError;

/// one complete line and the tick its terminator arrived on
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentence<const N: usize> {
    bytes: Vec<u8, N>,
    tick: u64,
}

impl<const N: usize> Sentence<N> {
    /// the line without its `\n`
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }
}

/// Collects uart bytes one at a time into a fixed line buffer.
///
/// A finished line moves into a single ready slot so the next byte can start the next line immediately. Whoever
/// parses takes the sentence out of the slot. If they are too slow, the newer sentence replaces the older one.
#[derive(Debug)]
pub struct SentenceAssembler<const N: usize> {
    line: Vec<u8, N>,
    /// the line outgrew the buffer. drop bytes until the next terminator
    overflowed: bool,
    ready: Option<Sentence<N>>,
    dropped_sentences: u32,
}

impl<const N: usize> Default for SentenceAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SentenceAssembler<N> {
    pub const fn new() -> Self {
        Self {
            line: Vec::new(),
            overflowed: false,
            ready: None,
            dropped_sentences: 0,
        }
    }

    /// returns true exactly when `byte` finished a sentence.
    ///
    /// an overlong line is an error once. the rest of it is silently dropped up to and including its terminator
    pub fn feed_byte(&mut self, byte: u8, tick: u64) -> Result<bool, ParseError> {
        if byte == TERMINATOR {
            if self.overflowed {
                self.overflowed = false;
                self.line.clear();
                return Ok(false);
            }

            let bytes = core::mem::take(&mut self.line);

            if self.ready.replace(Sentence { bytes, tick }).is_some() {
                self.dropped_sentences = self.dropped_sentences.saturating_add(1);
            }

            return Ok(true);
        }

        if self.overflowed {
            return Ok(false);
        }

        if self.line.push(byte).is_err() {
            self.overflowed = true;
            self.line.clear();
            return Err(ParseError::Overflow);
        }

        Ok(false)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_some()
    }

    pub fn take_sentence(&mut self) -> Option<Sentence<N>> {
        self.ready.take()
    }

    /// sentences that were replaced before anyone parsed them
    pub fn dropped_sentences(&self) -> u32 {
        self.dropped_sentences
    }
}
