//! Block coder.
//!
//! Pulls tokens from the optimal parser and emits them through the context
//! model into the range encoder. After every committed token it updates the
//! state automaton and the rep distances. Every 4 KiB of input it drains
//! the encoded bytes to the sink and reports progress.

use std::io::{Read, Write};
use std::ops::ControlFlow;

use crate::constants::{END_MARKER_DISTANCE, MATCH_MAX_LEN, MATCH_MIN_LEN, NUM_REP_DISTANCES};
use crate::error::Result;
use crate::lz::{BinTree, MatchFinder};
use crate::options::EncoderOptions;
use crate::parsing::LzmaProperties;
use crate::rangecoder::RangeEncoder;
use crate::state::State;

use super::model::{num_pos_states, ContextModel};
use super::optimal::{Back, Committed, Optimizer, NUM_OPTS};

/// Input bytes coded between two progress reports.
const PROGRESS_INTERVAL: u64 = 1 << 12;

/// Observer of a running compression.
///
/// Called between blocks with the input consumed and the output produced so
/// far. Returning [`ControlFlow::Break`] stops the encoder: what has been
/// committed is flushed, an end marker is written, and
/// [`CodeStatus::Cancelled`] is returned.
pub trait CodeProgress {
    fn progress(&mut self, processed_in: u64, processed_out: u64) -> ControlFlow<()>;
}

impl<F: FnMut(u64, u64) -> ControlFlow<()>> CodeProgress for F {
    fn progress(&mut self, processed_in: u64, processed_out: u64) -> ControlFlow<()> {
        self(processed_in, processed_out)
    }
}

/// Progress observer that never interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl CodeProgress for NoProgress {
    fn progress(&mut self, _processed_in: u64, _processed_out: u64) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// How a call to [`Encoder::code`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStatus {
    /// All input was coded.
    Finished,
    /// The progress observer asked to stop; the output is a complete,
    /// end-marker-terminated stream of the input consumed so far.
    Cancelled,
}

/// LZMA encoder.
///
/// ```rust
/// use lzma_stream::{Encoder, EncoderOptions, NoProgress};
///
/// let mut encoder = Encoder::new(EncoderOptions::default().with_end_marker(true))?;
/// let mut out = Vec::new();
/// encoder.code(&b"hello hello hello"[..], &mut out, &mut NoProgress)?;
/// assert!(!out.is_empty());
/// # Ok::<(), lzma_stream::LzmaError>(())
/// ```
pub struct Encoder {
    options: EncoderOptions,
    model: ContextModel,
    optimizer: Optimizer,
    rc: RangeEncoder,
    state: State,
    prev_byte: u8,
    reps: [u32; NUM_REP_DISTANCES],
    pos_state_mask: u32,
    write_end_marker: bool,
    processed_in: u64,
}

impl Encoder {
    /// Validate `options` and allocate the model.
    pub fn new(options: EncoderOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            model: ContextModel::new(options.lc, options.lp, options.dist_table_size()),
            optimizer: Optimizer::new(options.fast_bytes, options.pb),
            rc: RangeEncoder::new(),
            state: State::new(),
            prev_byte: 0,
            reps: [0; NUM_REP_DISTANCES],
            pos_state_mask: (1 << options.pb) - 1,
            write_end_marker: options.end_marker,
            processed_in: 0,
            options,
        })
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn properties(&self) -> LzmaProperties {
        self.options.properties()
    }

    /// Write the five property bytes.
    pub fn write_properties<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.properties().to_bytes())?;
        Ok(())
    }

    /// Input bytes consumed by the last call to [`code`](Self::code).
    pub fn processed_in(&self) -> u64 {
        self.processed_in
    }

    fn reset(&mut self) {
        self.state = State::new();
        self.prev_byte = 0;
        self.reps = [0; NUM_REP_DISTANCES];
        self.rc.reset();
        self.optimizer.reset();
        self.model.init(
            num_pos_states(self.options.pb),
            self.options.fast_bytes + 1 - MATCH_MIN_LEN,
        );
        self.processed_in = 0;
    }

    /// Compress everything `input` yields into `output`.
    ///
    /// The raw stream is written without a header. Errors from either side
    /// abort immediately; bytes already written then form a truncated stream.
    pub fn code<R: Read, W: Write, P: CodeProgress>(
        &mut self,
        input: R,
        output: &mut W,
        progress: &mut P,
    ) -> Result<CodeStatus> {
        let mut mf = BinTree::new(
            self.options.match_finder,
            input,
            self.options.dictionary_size,
            NUM_OPTS as u32,
            self.options.fast_bytes,
            MATCH_MAX_LEN + 1,
        )?;
        self.reset();
        log::debug!(
            "encoding: lc={} lp={} pb={} dictionary={} fast_bytes={} match_finder={:?} end_marker={}",
            self.options.lc,
            self.options.lp,
            self.options.pb,
            self.options.dictionary_size,
            self.options.fast_bytes,
            self.options.match_finder,
            self.options.end_marker
        );

        loop {
            let finished = self.code_one_block(&mut mf)?;
            self.drain(output)?;
            if finished {
                output.flush()?;
                log::debug!(
                    "encoded {} bytes into {}",
                    self.processed_in,
                    self.rc.processed_size()
                );
                return Ok(CodeStatus::Finished);
            }
            log::trace!("block done: in={} out={}", self.processed_in, self.rc.processed_size());
            if progress
                .progress(self.processed_in, self.rc.processed_size())
                .is_break()
            {
                log::warn!("compression cancelled after {} bytes", self.processed_in);
                self.flush(true);
                self.drain(output)?;
                output.flush()?;
                return Ok(CodeStatus::Cancelled);
            }
        }
    }

    fn drain<W: Write>(&mut self, output: &mut W) -> Result<()> {
        output.write_all(self.rc.pending())?;
        self.rc.clear_pending();
        Ok(())
    }

    #[inline]
    fn pos_state(&self) -> usize {
        (self.processed_in as u32 & self.pos_state_mask) as usize
    }

    /// Code tokens until 4 KiB more input is consumed or the input ends.
    /// Returns `true` once the stream is complete.
    fn code_one_block<M: MatchFinder>(&mut self, mf: &mut M) -> Result<bool> {
        let block_start = self.processed_in;

        if self.processed_in == 0 {
            if mf.available_bytes() == 0 {
                self.flush(self.write_end_marker);
                return Ok(true);
            }
            // The first byte has no history to match against.
            self.optimizer.read_match_distances(mf)?;
            let pos_state = self.pos_state();
            self.model.encode_is_match(&mut self.rc, self.state, pos_state, 0);
            self.state.update_literal();
            let byte = mf.index_byte(-(self.optimizer.additional_offset as i32));
            self.model.literal.encode(&mut self.rc, 0, self.prev_byte, byte);
            self.prev_byte = byte;
            self.optimizer.additional_offset -= 1;
            self.processed_in += 1;
        }
        if mf.available_bytes() == 0 {
            self.flush(self.write_end_marker);
            return Ok(true);
        }

        loop {
            let committed = Committed {
                state: self.state,
                prev_byte: self.prev_byte,
                reps: &self.reps,
                position: self.processed_in,
            };
            let (len, back) = self.optimizer.get_optimum(mf, &self.model, committed)?;
            let pos_state = self.pos_state();
            let offset = self.optimizer.additional_offset as i32;

            match back {
                Back::Literal => {
                    self.model.encode_is_match(&mut self.rc, self.state, pos_state, 0);
                    let byte = mf.index_byte(-offset);
                    if self.state.is_char() {
                        self.model
                            .literal
                            .encode(&mut self.rc, self.processed_in, self.prev_byte, byte);
                    } else {
                        let match_byte = mf.index_byte(-(self.reps[0] as i32) - 1 - offset);
                        self.model.literal.encode_matched(
                            &mut self.rc,
                            self.processed_in,
                            self.prev_byte,
                            match_byte,
                            byte,
                        );
                    }
                    self.prev_byte = byte;
                    self.state.update_literal();
                }
                Back::Rep(index) => {
                    self.model.encode_is_match(&mut self.rc, self.state, pos_state, 1);
                    self.model
                        .encode_rep_choice(&mut self.rc, index, len, self.state, pos_state);
                    if len == 1 {
                        self.state.update_short_rep();
                    } else {
                        self.model
                            .rep_len
                            .encode(&mut self.rc, len - MATCH_MIN_LEN, pos_state);
                        self.state.update_rep();
                    }
                    let distance = self.reps[index];
                    self.reps.copy_within(0..index, 1);
                    self.reps[0] = distance;
                    self.prev_byte = mf.index_byte(len as i32 - 1 - offset);
                }
                Back::Match(distance) => {
                    self.model.encode_is_match(&mut self.rc, self.state, pos_state, 1);
                    self.model.encode_is_rep(&mut self.rc, self.state, 0);
                    self.state.update_match();
                    self.model
                        .len
                        .encode(&mut self.rc, len - MATCH_MIN_LEN, pos_state);
                    self.model.encode_distance(&mut self.rc, distance, len);
                    self.reps.copy_within(0..NUM_REP_DISTANCES - 1, 1);
                    self.reps[0] = distance;
                    self.prev_byte = mf.index_byte(len as i32 - 1 - offset);
                }
            }

            self.optimizer.additional_offset -= len;
            self.processed_in += len as u64;

            if self.optimizer.additional_offset == 0 {
                self.model.refresh_prices();
                if mf.available_bytes() == 0 {
                    self.flush(self.write_end_marker);
                    return Ok(true);
                }
                if self.processed_in - block_start >= PROGRESS_INTERVAL {
                    return Ok(false);
                }
            }
        }
    }

    /// Zero-length match at the largest distance: decoders stop here.
    fn encode_end_marker(&mut self) {
        let pos_state = self.pos_state();
        self.model.encode_is_match(&mut self.rc, self.state, pos_state, 1);
        self.model.encode_is_rep(&mut self.rc, self.state, 0);
        self.state.update_match();
        self.model.len.encode(&mut self.rc, 0, pos_state);
        self.model
            .encode_distance(&mut self.rc, END_MARKER_DISTANCE, MATCH_MIN_LEN);
    }

    fn flush(&mut self, end_marker: bool) {
        if end_marker {
            self.encode_end_marker();
        }
        self.rc.flush();
    }
}
