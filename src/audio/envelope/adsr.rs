// ABOUTME: ADSR volume envelope
// ABOUTME: Linear attack to peak, decay to sustain, hold, linear release to zero

use crate::audio::MAX_VOLUME;

use super::{lerp, VolumeEnvelope};

/// Attack/decay/sustain/release envelope with millisecond phase lengths.
///
/// The sustain level is expressed on the 0..=127 scale and applied relative
/// to the note's base volume.
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    attack_ms: u16,
    decay_ms: u16,
    sustain: u8,
    release_ms: u16,
}

impl AdsrEnvelope {
    /// Build an envelope from the wire parameters.
    pub fn new(attack_ms: u16, decay_ms: u16, sustain: u8, release_ms: u16) -> Self {
        Self {
            attack_ms,
            decay_ms,
            sustain: sustain.min(MAX_VOLUME),
            release_ms,
        }
    }

    /// Level while the note is held (attack, decay or sustain).
    fn held_level(&self, elapsed_ms: u32, base: u32) -> u32 {
        let attack = self.attack_ms as u32;
        let decay = self.decay_ms as u32;
        let sustain = self.sustain as u32 * base / MAX_VOLUME as u32;
        if elapsed_ms < attack {
            lerp(0, base, elapsed_ms, attack)
        } else if elapsed_ms < attack + decay {
            lerp(base, sustain, elapsed_ms - attack, decay)
        } else {
            sustain
        }
    }
}

impl VolumeEnvelope for AdsrEnvelope {
    fn volume_at(&self, elapsed_ms: u32, base_volume: u8, duration_ms: i32) -> u8 {
        let base = base_volume.min(MAX_VOLUME) as u32;
        if duration_ms < 0 || elapsed_ms < duration_ms as u32 {
            return self.held_level(elapsed_ms, base) as u8;
        }
        // Release ramps down from wherever the held curve left off.
        let at_release = self.held_level(duration_ms as u32, base);
        let into_release = elapsed_ms - duration_ms as u32;
        lerp(at_release, 0, into_release, self.release_ms as u32) as u8
    }

    fn is_released(&self, elapsed_ms: u32, duration_ms: i32) -> bool {
        duration_ms >= 0 && elapsed_ms >= duration_ms as u32
    }

    fn is_finished(&self, elapsed_ms: u32, duration_ms: i32) -> bool {
        duration_ms >= 0 && elapsed_ms >= duration_ms as u32 + self.release_ms as u32
    }
}
