// ABOUTME: Audio command dispatch: routes channel commands, sample management and envelopes
// ABOUTME: Every audio command answers with exactly one status byte downstream

use std::sync::Arc;

use crate::audio::envelope::{
    AdsrEnvelope, FrequencyStepPhase, MultiphaseAdsrEnvelope, SteppedFrequencyEnvelope,
    VolumeSubPhase,
};
use crate::audio::sample::{AudioSample, FORMAT_WITH_RATE};
use crate::audio::{Waveform, DEFAULT_SAMPLE_RATE, SAMPLE_BASE_ID};
use crate::Result;

use super::commands::*;
use super::StreamProcessor;

/// Translate a negative sample selector (as carried in the channel byte of
/// the sample commands, or a waveform below -1) into the sample id space.
/// The sum is widened and truncated, so a non-negative selector wraps below
/// the base instead of overflowing.
fn sample_id_for(selector: i8) -> u16 {
    let slot = -(selector as i32) - 1;
    (SAMPLE_BASE_ID as i32 + slot) as u16
}

impl StreamProcessor {
    /// Dispatch one audio command: `channel, command, args...`.
    ///
    /// Exactly one status byte goes downstream per command, status 0 when the
    /// command was refused or could not be parsed.
    pub(crate) fn vdu_audio(&mut self) -> Result<()> {
        let channel = self.read_byte()?;
        let command = self.read_byte()?;
        let status = self.audio_command(channel, command).unwrap_or(0);
        self.output.send_audio_status(channel, status);
        Ok(())
    }

    fn audio_command(&mut self, channel: u8, command: u8) -> Result<u8> {
        match command {
            AUDIO_PLAY => {
                let volume = self.read_byte()?;
                let frequency = self.read_word()?;
                let duration = self.read_word()?;
                // The all-ones duration plays until stopped.
                let duration = if duration == u16::MAX { -1 } else { duration as i32 };
                Ok(self.with_channel(channel, |ch| ch.play(volume, frequency, duration)))
            }
            AUDIO_STATUS => Ok(self.with_channel(channel, |ch| ch.status())),
            AUDIO_VOLUME => {
                let volume = self.read_byte()?;
                Ok(self.with_channel(channel, |ch| ch.set_volume(volume)))
            }
            AUDIO_FREQUENCY => {
                let frequency = self.read_word()?;
                Ok(self.with_channel(channel, |ch| ch.set_frequency(frequency)))
            }
            AUDIO_WAVEFORM => {
                let waveform = self.read_byte()? as i8;
                let sample_id = if waveform == WAVEFORM_SAMPLE {
                    self.read_word()?
                } else {
                    0
                };
                Ok(self.set_waveform(channel, waveform, sample_id))
            }
            AUDIO_SAMPLE => self.sample_command(channel),
            AUDIO_ENV_VOLUME => {
                let kind = self.read_byte()?;
                self.set_volume_envelope(channel, kind)
            }
            AUDIO_ENV_FREQUENCY => {
                let kind = self.read_byte()?;
                self.set_frequency_envelope(channel, kind)
            }
            AUDIO_ENABLE => Ok(self
                .ctx
                .channels
                .get(channel)
                .map(|ch| ch.enable())
                .unwrap_or(0)),
            AUDIO_DISABLE => Ok(self
                .ctx
                .channels
                .get(channel)
                .map(|ch| ch.disable())
                .unwrap_or(0)),
            AUDIO_RESET => Ok(self
                .ctx
                .channels
                .get(channel)
                .map(|ch| ch.reset())
                .unwrap_or(0)),
            AUDIO_SEEK => {
                let position = self.read_24()?;
                Ok(self.with_channel(channel, |ch| ch.seek(position as usize)))
            }
            AUDIO_DURATION => {
                let duration = self.read_24()?;
                let duration = if duration == 0xFF_FFFF { -1 } else { duration as i32 };
                Ok(self.with_channel(channel, |ch| ch.set_duration(duration)))
            }
            AUDIO_SAMPLERATE => {
                let rate = self.read_word()?;
                Ok(self.with_channel(channel, |ch| ch.set_sample_rate(rate as u32)))
            }
            AUDIO_SET_PARAM => {
                let parameter = self.read_byte()?;
                let value = if parameter & crate::audio::channel::PARAM_16BIT != 0 {
                    self.read_word()?
                } else {
                    self.read_byte()? as u16
                };
                Ok(self.with_channel(channel, |ch| ch.set_parameter(parameter, value)))
            }
            other => {
                log::debug!("vdu_audio: unknown command {other}, channel {channel}");
                Ok(0)
            }
        }
    }

    fn with_channel(&self, channel: u8, f: impl FnOnce(&Arc<crate::audio::AudioChannel>) -> u8) -> u8 {
        match self.ctx.channels.get(channel) {
            Some(ch) => f(ch),
            None => {
                log::debug!("vdu_audio: channel {channel} out of range");
                0
            }
        }
    }

    fn set_waveform(&mut self, channel: u8, waveform: i8, explicit_id: u16) -> u8 {
        let resolved = if waveform >= 0 {
            Waveform::from_builtin(waveform as u8)
        } else {
            let id = if waveform == WAVEFORM_SAMPLE {
                explicit_id
            } else {
                sample_id_for(waveform)
            };
            match self.ctx.samples.get(id) {
                Some(sample) => Some(Waveform::Sample(sample)),
                None => {
                    log::debug!("set_waveform: sample {id} not found");
                    None
                }
            }
        };
        match resolved {
            Some(waveform) => self.with_channel(channel, |ch| ch.set_waveform(waveform)),
            None => 0,
        }
    }

    /// Sample management. The channel byte carries a negative sample
    /// selector for the per-channel actions.
    fn sample_command(&mut self, channel: u8) -> Result<u8> {
        let action = self.read_byte()?;
        let sample_id = sample_id_for(channel as i8);
        match action {
            SAMPLE_LOAD => {
                let length = self.read_24()? as usize;
                self.load_sample(sample_id, length)
            }
            SAMPLE_CLEAR => {
                log::debug!("sample_command: clear sample {sample_id}");
                Ok(self.ctx.samples.remove(sample_id) as u8)
            }
            SAMPLE_FROM_BUFFER => {
                let buffer_id = self.read_word()?;
                let format = self.read_byte()?;
                let rate = if format & FORMAT_WITH_RATE != 0 {
                    self.read_word()? as u32
                } else {
                    DEFAULT_SAMPLE_RATE
                };
                Ok(self.create_sample(buffer_id, format, rate))
            }
            SAMPLE_SET_FREQUENCY => {
                let frequency = self.read_word()?;
                Ok(self.set_sample_frequency(sample_id, frequency))
            }
            SAMPLE_BUFFER_SET_FREQUENCY => {
                let buffer_id = self.read_word()?;
                let frequency = self.read_word()?;
                Ok(self.set_sample_frequency(buffer_id, frequency))
            }
            SAMPLE_SET_REPEAT_START => {
                let start = self.read_24()?;
                Ok(self.set_sample_repeat_start(sample_id, start))
            }
            SAMPLE_BUFFER_SET_REPEAT_START => {
                let buffer_id = self.read_word()?;
                let start = self.read_24()?;
                Ok(self.set_sample_repeat_start(buffer_id, start))
            }
            SAMPLE_SET_REPEAT_LENGTH => {
                let length = self.read_24()?;
                Ok(self.set_sample_repeat_length(sample_id, length))
            }
            SAMPLE_BUFFER_SET_REPEAT_LENGTH => {
                let buffer_id = self.read_word()?;
                let length = self.read_24()?;
                Ok(self.set_sample_repeat_length(buffer_id, length))
            }
            SAMPLE_DEBUG_INFO => {
                let buffer_id = self.read_word()?;
                Ok(self.sample_debug_info(buffer_id))
            }
            other => {
                log::debug!("sample_command: unknown action {other}");
                Ok(0)
            }
        }
    }

    /// Load a sample: clear the backing buffer, stream the bytes in, then
    /// register a sample over them with engine defaults.
    fn load_sample(&mut self, sample_id: u16, length: usize) -> Result<u8> {
        self.ctx.store.lock().clear(sample_id);
        if self.buffer_write(sample_id, length).is_err() {
            return Ok(0);
        }
        Ok(self.create_sample(sample_id, 0, DEFAULT_SAMPLE_RATE))
    }

    /// Build a sample over an existing buffer's current block list, replacing
    /// any sample already registered under that id.
    fn create_sample(&mut self, buffer_id: u16, format: u8, rate: u32) -> u8 {
        let Some(blocks) = self.ctx.store.lock().blocks_cloned(buffer_id) else {
            log::debug!("create_sample: buffer {buffer_id} not found");
            return 0;
        };
        match AudioSample::from_blocks(blocks, format, rate) {
            Some(sample) => {
                self.ctx.samples.insert(buffer_id, Arc::new(sample));
                1
            }
            None => {
                log::debug!("create_sample: buffer {buffer_id} is empty");
                0
            }
        }
    }

    fn set_sample_frequency(&self, sample_id: u16, frequency: u16) -> u8 {
        match self.ctx.samples.get(sample_id) {
            Some(sample) => {
                sample.set_base_frequency(frequency as u32);
                1
            }
            None => {
                log::debug!("set_sample_frequency: sample {sample_id} not found");
                0
            }
        }
    }

    fn set_sample_repeat_start(&self, sample_id: u16, start: u32) -> u8 {
        match self.ctx.samples.get(sample_id) {
            Some(sample) => {
                sample.set_repeat_start(start);
                1
            }
            None => {
                log::debug!("set_sample_repeat_start: sample {sample_id} not found");
                0
            }
        }
    }

    fn set_sample_repeat_length(&self, sample_id: u16, length: u32) -> u8 {
        match self.ctx.samples.get(sample_id) {
            Some(sample) => {
                sample.set_repeat_length(length);
                1
            }
            None => {
                log::debug!("set_sample_repeat_length: sample {sample_id} not found");
                0
            }
        }
    }

    fn sample_debug_info(&self, sample_id: u16) -> u8 {
        let Some(sample) = self.ctx.samples.get(sample_id) else {
            log::debug!("sample {sample_id}: not registered");
            return 0;
        };
        log::debug!(
            "sample {sample_id}: {} blocks, {} bytes, format {:?}, rate {} Hz, base {} Hz, repeat {}+{}",
            sample.blocks().len(),
            sample.size(),
            sample.format(),
            sample.sample_rate(),
            sample.base_frequency(),
            sample.repeat_start(),
            sample.repeat_length(),
        );
        1
    }

    /// Parse and attach a volume envelope. The payload is consumed before the
    /// enabled check so a refused command cannot desynchronise the stream.
    fn set_volume_envelope(&mut self, channel: u8, kind: u8) -> Result<u8> {
        match kind {
            ENVELOPE_NONE => {
                Ok(self.with_enabled_channel(channel, |ch| ch.set_volume_envelope(None)))
            }
            ENVELOPE_ADSR => {
                let attack = self.read_word()?;
                let decay = self.read_word()?;
                let sustain = self.read_byte()?;
                let release = self.read_word()?;
                let envelope = AdsrEnvelope::new(attack, decay, sustain, release);
                Ok(self.with_enabled_channel(channel, move |ch| {
                    ch.set_volume_envelope(Some(Box::new(envelope)))
                }))
            }
            ENVELOPE_MULTIPHASE_ADSR => {
                let attack = self.read_sub_phases()?;
                let sustain = self.read_sub_phases()?;
                let release = self.read_sub_phases()?;
                let envelope = MultiphaseAdsrEnvelope::new(attack, sustain, release);
                Ok(self.with_enabled_channel(channel, move |ch| {
                    ch.set_volume_envelope(Some(Box::new(envelope)))
                }))
            }
            other => {
                log::debug!("set_volume_envelope: unknown envelope type {other}");
                Ok(0)
            }
        }
    }

    fn read_sub_phases(&mut self) -> Result<Vec<VolumeSubPhase>> {
        let count = self.read_byte()?;
        let mut phases = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let level = self.read_byte()?;
            let duration_ms = self.read_word()?;
            phases.push(VolumeSubPhase { level, duration_ms });
        }
        Ok(phases)
    }

    fn set_frequency_envelope(&mut self, channel: u8, kind: u8) -> Result<u8> {
        match kind {
            ENVELOPE_NONE => {
                Ok(self.with_enabled_channel(channel, |ch| ch.set_frequency_envelope(None)))
            }
            FREQUENCY_ENVELOPE_STEPPED => {
                let phase_count = self.read_byte()?;
                let control = self.read_byte()?;
                let step_length = self.read_word()?;
                let mut phases = Vec::with_capacity(phase_count as usize);
                for _ in 0..phase_count {
                    let adjustment = self.read_word()? as i16;
                    let count = self.read_word()?;
                    phases.push(FrequencyStepPhase { adjustment, count });
                }
                let envelope = SteppedFrequencyEnvelope::from_control(phases, step_length, control);
                Ok(self.with_enabled_channel(channel, move |ch| {
                    ch.set_frequency_envelope(Some(Box::new(envelope)))
                }))
            }
            other => {
                log::debug!("set_frequency_envelope: unknown envelope type {other}");
                Ok(0)
            }
        }
    }

    fn with_enabled_channel(
        &self,
        channel: u8,
        f: impl FnOnce(&Arc<crate::audio::AudioChannel>) -> u8,
    ) -> u8 {
        match self.ctx.channels.get(channel) {
            Some(ch) if ch.is_enabled() => f(ch),
            _ => 0,
        }
    }
}
