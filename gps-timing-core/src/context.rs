//! `GpsTime` owns everything: the config, the clock, the sentence assembler, the PPS filter, and the shared timing
//! snapshot.
//!
//! On a single thread, call the methods on `GpsTime` directly. With interrupts (or threads), `split` it into one
//! handle per execution context:
//!
//! - `SentenceHandler` for the uart. `feed_byte` is cheap. `process_sentence` does the real parsing and can run later
//! - `PulseHandler` for the PPS edge
//! - `TimingReader` for everyone else. it is `Copy`, so hand out as many as you like
use crate::clock::MonotonicClock;
use crate::config::Config;
use crate::errors::{ConfigError, ParseError, TimeError};
use crate::logging::{debug, info, trace, warn};
use crate::nmea::{Rmc, SentenceAssembler, parse_rmc};
use crate::pps::{PpsFilter, PulseOutcome};
use crate::timing::{SharedTiming, TimeAnchor, TimingState};

/// The GPS timing context.
///
/// `W` is the number of pulses in the PPS window. `N` is the longest sentence we will assemble. NMEA says 82 bytes,
/// but receivers don't always agree.
pub struct GpsTime<C, const W: usize = 32, const N: usize = 128> {
    config: Config,
    clock: C,
    shared: SharedTiming,
    assembler: SentenceAssembler<N>,
    pps: PpsFilter<W>,
}

impl<C: MonotonicClock, const W: usize, const N: usize> GpsTime<C, W, N> {
    /// the tick rate always comes from the clock. whatever is in `config.ticks_per_second` is replaced
    pub fn new(mut config: Config, clock: C) -> Result<Self, ConfigError> {
        config.ticks_per_second = clock.ticks_per_second();
        config.validate()?;

        info!(
            "gps time on uart{} at {} baud, pps on gpio{}, {} ticks/s, {} pulse window",
            config.uart_id, config.uart_baud, config.pps_gpio, config.ticks_per_second, W
        );

        let shared = SharedTiming::new(TimingState::new(W as u32, config.upscale()));

        Ok(Self {
            pps: PpsFilter::new(&config),
            assembler: SentenceAssembler::new(),
            shared,
            config,
            clock,
        })
    }

    /// tear down and get the pieces back
    pub fn into_parts(self) -> (Config, C) {
        (self.config, self.clock)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn split(&mut self) -> (SentenceHandler<'_, C, N>, PulseHandler<'_, C, W>, TimingReader<'_, C>) {
        let sentences = SentenceHandler {
            assembler: &mut self.assembler,
            shared: &self.shared,
            clock: &self.clock,
        };

        let pulses = PulseHandler {
            pps: &mut self.pps,
            shared: &self.shared,
            clock: &self.clock,
        };

        let reader = TimingReader {
            config: &self.config,
            shared: &self.shared,
            clock: &self.clock,
        };

        (sentences, pulses, reader)
    }

    pub fn reader(&self) -> TimingReader<'_, C> {
        TimingReader {
            config: &self.config,
            shared: &self.shared,
            clock: &self.clock,
        }
    }

    /// returns true if `byte` finished a sentence
    pub fn feed_byte(&mut self, byte: u8) -> bool {
        self.split().0.feed_byte(byte)
    }

    /// parse the sentence `feed_byte` finished, if there is one
    pub fn process_sentence(&mut self) -> Result<Option<Rmc>, ParseError> {
        self.split().0.process_sentence()
    }

    /// parse `line` as if its terminator arrived at `tick`
    pub fn process_sentence_at(&mut self, line: &[u8], tick: u64) -> Result<Option<Rmc>, ParseError> {
        self.split().0.process_sentence_at(line, tick)
    }

    /// feed and process a whole chunk of uart bytes. returns how many sentences were completed
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        self.split().0.feed(bytes)
    }

    pub fn on_pulse_edge(&mut self) -> PulseOutcome {
        self.split().1.on_pulse_edge()
    }

    /// for edges that were timestamped by hardware
    pub fn on_pulse_edge_at(&mut self, tick: u64) -> PulseOutcome {
        self.split().1.on_pulse_edge_at(tick)
    }

    pub fn utc_time(&self) -> Result<u64, TimeError> {
        self.reader().utc_time()
    }

    pub fn utc_time_at(&self, tick: u64) -> Result<u64, TimeError> {
        self.reader().utc_time_at(tick)
    }

    pub fn frequency_shift_ppb(&self) -> i32 {
        self.reader().frequency_shift_ppb()
    }

    pub fn snapshot(&self) -> TimingState {
        self.shared.snapshot()
    }

    pub fn parse_errors(&self) -> u32 {
        self.shared.snapshot().parse_errors
    }

    pub fn dropped_sentences(&self) -> u32 {
        self.assembler.dropped_sentences()
    }

    /// log the whole state
    pub fn dump(&self) {
        let state = self.snapshot();

        info!("{}", state);
        info!(
            "parse errors: {}, dropped sentences: {}",
            state.parse_errors,
            self.dropped_sentences()
        );
    }
}

/// owns the uart side. only one of these exists at a time
pub struct SentenceHandler<'a, C, const N: usize> {
    assembler: &'a mut SentenceAssembler<N>,
    shared: &'a SharedTiming,
    clock: &'a C,
}

impl<C: MonotonicClock, const N: usize> SentenceHandler<'_, C, N> {
    /// returns true if `byte` finished a sentence. an overflow is counted here
    pub fn feed_byte(&mut self, byte: u8) -> bool {
        let tick = self.clock.now_ticks();

        match self.assembler.feed_byte(byte, tick) {
            Ok(ready) => ready,
            Err(err) => {
                self.count_error(err);
                false
            }
        }
    }

    /// parse the finished sentence, if there is one. errors are counted and also returned
    pub fn process_sentence(&mut self) -> Result<Option<Rmc>, ParseError> {
        let Some(sentence) = self.assembler.take_sentence() else {
            return Ok(None);
        };

        self.process_sentence_at(sentence.as_bytes(), sentence.tick())
    }

    pub fn process_sentence_at(&mut self, line: &[u8], tick: u64) -> Result<Option<Rmc>, ParseError> {
        // all of the parsing happens out here. only the publish is inside the critical section
        let rmc = match parse_rmc(line) {
            Ok(rmc) => rmc,
            Err(err) => {
                self.count_error(err);
                return Err(err);
            }
        };

        match rmc {
            None => {
                trace!("ignoring sentence");
            }
            Some(Rmc::Void) => {
                self.shared.update(|state| state.solution_active = false);

                debug!("rmc: no fix");
            }
            Some(Rmc::Fix(fix)) => {
                let anchor = TimeAnchor {
                    utc_secs: fix.utc_secs,
                    tick,
                };

                let first = self.shared.update(|state| {
                    let first = state.anchor.is_none();

                    state.solution_active = true;
                    state.position = fix.position;
                    state.anchor = Some(anchor);

                    first
                });

                if first {
                    info!("first gps fix: {} at tick {}", anchor.utc_secs, anchor.tick);
                } else {
                    debug!("rmc: {} at tick {}", anchor.utc_secs, anchor.tick);
                }
            }
        }

        Ok(rmc)
    }

    /// returns how many sentences were completed
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let mut completed = 0;

        for &byte in bytes {
            if self.feed_byte(byte) {
                completed += 1;

                // already counted and logged
                let _ = self.process_sentence();
            }
        }

        completed
    }

    pub fn dropped_sentences(&self) -> u32 {
        self.assembler.dropped_sentences()
    }

    fn count_error(&self, err: ParseError) {
        warn!("nmea error {}: {}", err.code(), err);

        self.shared
            .update(|state| state.parse_errors = state.parse_errors.saturating_add(1));
    }
}

/// owns the PPS filter
pub struct PulseHandler<'a, C, const W: usize> {
    pps: &'a mut PpsFilter<W>,
    shared: &'a SharedTiming,
    clock: &'a C,
}

impl<C: MonotonicClock, const W: usize> PulseHandler<'_, C, W> {
    pub fn on_pulse_edge(&mut self) -> PulseOutcome {
        let now = self.clock.now_ticks();

        self.on_pulse_edge_at(now)
    }

    pub fn on_pulse_edge_at(&mut self, tick: u64) -> PulseOutcome {
        let outcome = self.pps.on_pulse(tick);

        let pps = &*self.pps;
        self.shared.update(|state| pps.publish(state));

        outcome
    }
}

/// read-only access to the time and the frequency estimate
pub struct TimingReader<'a, C> {
    config: &'a Config,
    shared: &'a SharedTiming,
    clock: &'a C,
}

impl<C> Clone for TimingReader<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for TimingReader<'_, C> {}

impl<C: MonotonicClock> TimingReader<'_, C> {
    pub fn snapshot(&self) -> TimingState {
        self.shared.snapshot()
    }

    pub fn utc_time(&self) -> Result<u64, TimeError> {
        let now = self.clock.now_ticks();

        self.utc_time_at(now)
    }

    pub fn utc_time_at(&self, tick: u64) -> Result<u64, TimeError> {
        self.snapshot().utc_time_at(tick, self.config)
    }

    pub fn frequency_shift_ppb(&self) -> i32 {
        self.snapshot().frequency_shift_ppb
    }

    pub fn smoothed_interval_scaled(&self) -> Option<i64> {
        self.snapshot().smoothed_interval_scaled
    }

    pub fn pulse_count(&self) -> u32 {
        self.snapshot().pulse_count
    }
}
