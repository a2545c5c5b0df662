// ABOUTME: Per-channel audio state machine and worker thread
// ABOUTME: Workers tick at the frame interval, applying envelopes and advancing playback

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::buffer::ClearListener;

use super::envelope::{FrequencyEnvelope, VolumeEnvelope};
use super::sample::AudioSample;
use super::{
    MAX_VOLUME, STATUS_ENABLED, STATUS_FREQUENCY_ENVELOPE, STATUS_PLAYING, STATUS_RELEASING,
    STATUS_VOLUME_ENVELOPE,
};

/// Parameter id: square wave duty cycle.
pub const PARAM_DUTY_CYCLE: u8 = 0;
/// Parameter id: channel volume.
pub const PARAM_VOLUME: u8 = 2;
/// Parameter id: channel frequency.
pub const PARAM_FREQUENCY: u8 = 3;
/// Parameter flag: a 16-bit value follows instead of an 8-bit one.
pub const PARAM_16BIT: u8 = 0x80;

/// The waveform a channel plays.
#[derive(Clone)]
pub enum Waveform {
    /// Square wave with an adjustable duty cycle
    Square,
    /// Triangle wave
    Triangle,
    /// Sawtooth wave
    Sawtooth,
    /// Sine wave
    Sine,
    /// White noise
    Noise,
    /// Sample playback from shared blocks
    Sample(Arc<AudioSample>),
}

impl Waveform {
    /// Map a non-negative waveform selector to a built-in waveform.
    pub fn from_builtin(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(Waveform::Square),
            1 => Some(Waveform::Triangle),
            2 => Some(Waveform::Sawtooth),
            3 => Some(Waveform::Sine),
            4 => Some(Waveform::Noise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayState {
    Idle,
    Playing,
    Releasing,
}

struct ChannelInner {
    state: PlayState,
    waveform: Waveform,
    volume: u8,
    frequency: u16,
    duration_ms: i32,
    duty_cycle: u8,
    started: Option<Instant>,
    volume_envelope: Option<Box<dyn VolumeEnvelope>>,
    frequency_envelope: Option<Box<dyn FrequencyEnvelope>>,
    // Observable effect of the envelopes, updated every frame.
    current_volume: u8,
    current_frequency: u16,
    // Sample playback position in bytes and an optional rate override.
    playback_pos: usize,
    rate_override: u32,
}

impl ChannelInner {
    fn new() -> Self {
        Self {
            state: PlayState::Idle,
            waveform: Waveform::Square,
            volume: 0,
            frequency: 0,
            duration_ms: 0,
            duty_cycle: 127,
            started: None,
            volume_envelope: None,
            frequency_envelope: None,
            current_volume: 0,
            current_frequency: 0,
            playback_pos: 0,
            rate_override: 0,
        }
    }

    fn elapsed_ms(&self, now: Instant) -> u32 {
        self.started
            .map(|s| now.saturating_duration_since(s).as_millis() as u32)
            .unwrap_or(0)
    }

    fn stop_note(&mut self) {
        self.state = PlayState::Idle;
        self.started = None;
        self.playback_pos = 0;
        self.current_volume = 0;
    }

    /// Bytes of sample consumed per frame at the effective playback rate.
    fn sample_step(&self, sample: &AudioSample, frame: Duration) -> usize {
        let mut rate = if self.rate_override != 0 {
            self.rate_override
        } else {
            sample.sample_rate()
        } as u64;
        let base = sample.base_frequency();
        if base != 0 && self.current_frequency != 0 {
            rate = rate * self.current_frequency as u64 / base as u64;
        }
        (rate * frame.as_millis() as u64 / 1000) as usize
    }

    fn advance(&mut self, now: Instant, frame: Duration) {
        if self.state == PlayState::Idle {
            return;
        }
        let elapsed = self.elapsed_ms(now);

        if let Some(env) = &self.frequency_envelope {
            self.current_frequency = env.frequency_at(elapsed, self.frequency);
        } else {
            self.current_frequency = self.frequency;
        }

        match &self.volume_envelope {
            Some(env) => {
                self.current_volume = env.volume_at(elapsed, self.volume, self.duration_ms);
                if env.is_finished(elapsed, self.duration_ms) {
                    self.stop_note();
                    return;
                }
                if env.is_released(elapsed, self.duration_ms) {
                    self.state = PlayState::Releasing;
                }
            }
            None => {
                self.current_volume = self.volume;
                if self.duration_ms >= 0 && elapsed >= self.duration_ms as u32 {
                    self.stop_note();
                    return;
                }
            }
        }

        if let Waveform::Sample(sample) = &self.waveform {
            let step = self.sample_step(sample, frame);
            self.playback_pos += step;
            let (loop_start, loop_end) = sample.loop_window();
            if self.playback_pos >= loop_end && loop_end > loop_start {
                self.playback_pos = loop_start + (self.playback_pos - loop_start) % (loop_end - loop_start);
            } else if self.playback_pos >= sample.size() {
                self.playback_pos = sample.size();
            }
        }
    }
}

/// One audio channel: a state machine shared between the dispatcher and its
/// worker thread.
///
/// All command-facing operations return a status byte, 1 for accepted and 0
/// for refused or not ready.
pub struct AudioChannel {
    number: u8,
    frame: Duration,
    enabled: AtomicBool,
    worker_live: AtomicBool,
    inner: Mutex<ChannelInner>,
}

impl AudioChannel {
    /// Create a disabled channel ticking at `frame` when enabled.
    pub fn new(number: u8, frame: Duration) -> Arc<Self> {
        Arc::new(Self {
            number,
            frame,
            enabled: AtomicBool::new(false),
            worker_live: AtomicBool::new(false),
            inner: Mutex::new(ChannelInner::new()),
        })
    }

    /// The channel number.
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Whether the channel is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Enable the channel, spawning its worker if none is live.
    pub fn enable(self: &Arc<Self>) -> u8 {
        if self.enabled.swap(true, Ordering::SeqCst) {
            return 1;
        }
        if !self.worker_live.swap(true, Ordering::SeqCst) {
            let channel = Arc::clone(self);
            std::thread::spawn(move || channel.worker());
        }
        log::debug!("channel {} enabled", self.number);
        1
    }

    /// Disable the channel; its worker winds down within a frame.
    pub fn disable(&self) -> u8 {
        self.enabled.store(false, Ordering::SeqCst);
        1
    }

    /// Cancel the current note, disable, wait for the worker to wind down,
    /// then re-enable. Refused on a disabled channel.
    pub fn reset(self: &Arc<Self>) -> u8 {
        if !self.is_enabled() {
            return 0;
        }
        self.disable();
        // Give the worker a bounded window to acknowledge before respawning.
        for _ in 0..200 {
            if !self.worker_live.load(Ordering::SeqCst) {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.inner.lock().stop_note();
        self.enable()
    }

    fn worker(&self) {
        let ticker = crossbeam::channel::tick(self.frame);
        loop {
            while self.enabled.load(Ordering::SeqCst) {
                if ticker.recv().is_err() {
                    break;
                }
                let now = Instant::now();
                self.inner.lock().advance(now, self.frame);
            }
            self.inner.lock().stop_note();
            self.worker_live.store(false, Ordering::SeqCst);
            // An enable may have raced the wind-down and seen the worker
            // still live; pick the channel back up instead of exiting.
            if self.enabled.load(Ordering::SeqCst)
                && !self.worker_live.swap(true, Ordering::SeqCst)
            {
                continue;
            }
            break;
        }
        log::debug!("channel {} worker stopped", self.number);
    }

    /// Begin playback of a note. Refused while another note is in flight or
    /// when the channel is disabled.
    pub fn play(&self, volume: u8, frequency: u16, duration_ms: i32) -> u8 {
        if !self.is_enabled() {
            return 0;
        }
        let mut inner = self.inner.lock();
        if inner.state != PlayState::Idle {
            return 0;
        }
        inner.volume = volume.min(MAX_VOLUME);
        inner.frequency = frequency;
        inner.duration_ms = duration_ms;
        inner.current_volume = inner.volume;
        inner.current_frequency = frequency;
        inner.playback_pos = 0;
        inner.started = Some(Instant::now());
        inner.state = PlayState::Playing;
        1
    }

    /// Pack the channel state into a status byte.
    pub fn status(&self) -> u8 {
        let inner = self.inner.lock();
        let mut status = 0;
        if self.is_enabled() {
            status |= STATUS_ENABLED;
        }
        match inner.state {
            PlayState::Playing => status |= STATUS_PLAYING,
            PlayState::Releasing => status |= STATUS_PLAYING | STATUS_RELEASING,
            PlayState::Idle => {}
        }
        if inner.volume_envelope.is_some() {
            status |= STATUS_VOLUME_ENVELOPE;
        }
        if inner.frequency_envelope.is_some() {
            status |= STATUS_FREQUENCY_ENVELOPE;
        }
        status
    }

    /// Set the channel volume.
    ///
    /// On an idle channel a non-zero volume starts an indefinite note at the
    /// current frequency; on a playing note volume zero schedules its end.
    pub fn set_volume(&self, volume: u8) -> u8 {
        if !self.is_enabled() {
            return 0;
        }
        let volume = volume.min(MAX_VOLUME);
        let mut inner = self.inner.lock();
        match inner.state {
            PlayState::Idle => {
                if volume == 0 {
                    return 1;
                }
                inner.volume = volume;
                inner.current_volume = volume;
                inner.duration_ms = -1;
                inner.playback_pos = 0;
                inner.started = Some(Instant::now());
                inner.state = PlayState::Playing;
                1
            }
            _ => {
                if volume == 0 {
                    // End the note now; a volume envelope turns this into the
                    // start of its release phase.
                    let elapsed = inner.elapsed_ms(Instant::now());
                    inner.duration_ms = elapsed as i32;
                    if inner.volume_envelope.is_none() {
                        inner.stop_note();
                    }
                } else {
                    inner.volume = volume;
                }
                1
            }
        }
    }

    /// Retune the channel; affects the note in flight.
    pub fn set_frequency(&self, frequency: u16) -> u8 {
        if !self.is_enabled() {
            return 0;
        }
        let mut inner = self.inner.lock();
        inner.frequency = frequency;
        inner.current_frequency = frequency;
        1
    }

    /// Select the waveform for subsequent notes.
    pub fn set_waveform(&self, waveform: Waveform) -> u8 {
        if !self.is_enabled() {
            return 0;
        }
        let mut inner = self.inner.lock();
        inner.playback_pos = 0;
        inner.waveform = waveform;
        1
    }

    /// Override the sample playback rate; 0 restores the sample's own rate.
    pub fn set_sample_rate(&self, rate: u32) -> u8 {
        if !self.is_enabled() {
            return 0;
        }
        self.inner.lock().rate_override = rate;
        1
    }

    /// Adjust the duration of the note in flight.
    pub fn set_duration(&self, duration_ms: i32) -> u8 {
        if !self.is_enabled() {
            return 0;
        }
        self.inner.lock().duration_ms = duration_ms;
        1
    }

    /// Seek sample playback to a byte position. Refused for built-in
    /// waveforms.
    pub fn seek(&self, byte_position: usize) -> u8 {
        if !self.is_enabled() {
            return 0;
        }
        let mut inner = self.inner.lock();
        let size = match &inner.waveform {
            Waveform::Sample(sample) => sample.size(),
            _ => return 0,
        };
        inner.playback_pos = byte_position.min(size);
        1
    }

    /// Set a per-waveform parameter.
    pub fn set_parameter(&self, parameter: u8, value: u16) -> u8 {
        if !self.is_enabled() {
            return 0;
        }
        match parameter & !PARAM_16BIT {
            PARAM_DUTY_CYCLE => {
                self.inner.lock().duty_cycle = value as u8;
                1
            }
            PARAM_VOLUME => self.set_volume(value as u8),
            PARAM_FREQUENCY => self.set_frequency(value),
            other => {
                log::debug!("channel {}: unknown parameter {other}", self.number);
                0
            }
        }
    }

    /// Attach or clear the volume envelope.
    pub fn set_volume_envelope(&self, envelope: Option<Box<dyn VolumeEnvelope>>) -> u8 {
        self.inner.lock().volume_envelope = envelope;
        1
    }

    /// Attach or clear the frequency envelope.
    pub fn set_frequency_envelope(&self, envelope: Option<Box<dyn FrequencyEnvelope>>) -> u8 {
        self.inner.lock().frequency_envelope = envelope;
        1
    }

    /// Force the channel back to idle, cancelling any note and envelope
    /// progress.
    pub fn cancel(&self) {
        self.inner.lock().stop_note();
    }

    /// Envelope-applied volume, as the worker last computed it.
    pub fn current_volume(&self) -> u8 {
        self.inner.lock().current_volume
    }

    /// Envelope-applied frequency, as the worker last computed it.
    pub fn current_frequency(&self) -> u16 {
        self.inner.lock().current_frequency
    }

    /// Current sample playback position in bytes.
    pub fn playback_position(&self) -> usize {
        self.inner.lock().playback_pos
    }

    /// Square wave duty cycle, 0..=255 scale.
    pub fn duty_cycle(&self) -> u8 {
        self.inner.lock().duty_cycle
    }
}

/// The engine's fixed array of channels.
pub struct ChannelSet {
    channels: Vec<Arc<AudioChannel>>,
}

impl ChannelSet {
    /// Create `count` channels and enable the first `enabled` of them.
    pub fn new(count: usize, enabled: usize, frame: Duration) -> Arc<Self> {
        let channels: Vec<_> = (0..count)
            .map(|n| AudioChannel::new(n as u8, frame))
            .collect();
        for channel in channels.iter().take(enabled) {
            channel.enable();
        }
        Arc::new(Self { channels })
    }

    /// Fetch a channel by number.
    pub fn get(&self, number: u8) -> Option<&Arc<AudioChannel>> {
        self.channels.get(number as usize)
    }

    /// Number of channels carried.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the set is empty (it never is in practice).
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Cancel every note in flight.
    pub fn cancel_all(&self) {
        for channel in &self.channels {
            channel.cancel();
        }
    }
}

impl Drop for ChannelSet {
    fn drop(&mut self) {
        for channel in &self.channels {
            channel.disable();
        }
    }
}

impl ClearListener for ChannelSet {
    fn buffer_cleared(&self, _id: u16) {}

    fn store_cleared(&self) {
        self.cancel_all();
    }
}
