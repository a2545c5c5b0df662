// ABOUTME: Multi-phase ADSR volume envelope
// ABOUTME: Attack plays once, sustain sub-phases loop while held, release plays out

use crate::audio::MAX_VOLUME;

use super::{lerp, VolumeEnvelope};

/// One sub-phase of a multi-phase envelope: a target level on the 0..=127
/// scale reached linearly over a duration.
#[derive(Debug, Clone, Copy)]
pub struct VolumeSubPhase {
    /// Target level, 0..=127
    pub level: u8,
    /// Time to reach it, in milliseconds
    pub duration_ms: u16,
}

/// Volume envelope made of three sub-phase lists.
///
/// The attack list plays once from silence. The sustain list loops for as
/// long as the note is held. The release list plays once down to silence.
#[derive(Debug, Clone, Default)]
pub struct MultiphaseAdsrEnvelope {
    attack: Vec<VolumeSubPhase>,
    sustain: Vec<VolumeSubPhase>,
    release: Vec<VolumeSubPhase>,
}

fn total(phases: &[VolumeSubPhase]) -> u32 {
    phases.iter().map(|p| p.duration_ms as u32).sum()
}

fn last_level(phases: &[VolumeSubPhase], fallback: u32) -> u32 {
    phases.last().map(|p| p.level as u32).unwrap_or(fallback)
}

/// Walk a phase list at time `t`, interpolating from `start` into each phase.
/// Returns the final level of the list when `t` runs past it.
fn walk(phases: &[VolumeSubPhase], mut t: u32, start: u32) -> u32 {
    let mut level = start;
    for phase in phases {
        let span = phase.duration_ms as u32;
        if t < span {
            return lerp(level, phase.level as u32, t, span);
        }
        t -= span;
        level = phase.level as u32;
    }
    level
}

impl MultiphaseAdsrEnvelope {
    /// Build an envelope from the three wire phase lists.
    pub fn new(
        attack: Vec<VolumeSubPhase>,
        sustain: Vec<VolumeSubPhase>,
        release: Vec<VolumeSubPhase>,
    ) -> Self {
        Self {
            attack,
            sustain,
            release,
        }
    }

    fn release_total(&self) -> u32 {
        total(&self.release)
    }

    /// Level on the 0..=127 scale while the note is held.
    fn held_level(&self, elapsed_ms: u32) -> u32 {
        let attack_total = total(&self.attack);
        if elapsed_ms < attack_total {
            return walk(&self.attack, elapsed_ms, 0);
        }
        let attack_final = last_level(&self.attack, 0);
        let sustain_total = total(&self.sustain);
        if sustain_total == 0 {
            return last_level(&self.sustain, attack_final);
        }
        let into_sustain = elapsed_ms - attack_total;
        // First lap ramps in from the attack's final level, later laps from
        // the sustain list's own final level.
        let start = if into_sustain < sustain_total {
            attack_final
        } else {
            last_level(&self.sustain, attack_final)
        };
        walk(&self.sustain, into_sustain % sustain_total, start)
    }
}

impl VolumeEnvelope for MultiphaseAdsrEnvelope {
    fn volume_at(&self, elapsed_ms: u32, base_volume: u8, duration_ms: i32) -> u8 {
        let base = base_volume.min(MAX_VOLUME) as u32;
        let scale = |level: u32| (level * base / MAX_VOLUME as u32) as u8;
        if duration_ms < 0 || elapsed_ms < duration_ms as u32 {
            return scale(self.held_level(elapsed_ms));
        }
        let start = self.held_level(duration_ms as u32);
        let into_release = elapsed_ms - duration_ms as u32;
        if into_release >= self.release_total() {
            return 0;
        }
        scale(walk(&self.release, into_release, start))
    }

    fn is_released(&self, elapsed_ms: u32, duration_ms: i32) -> bool {
        duration_ms >= 0 && elapsed_ms >= duration_ms as u32
    }

    fn is_finished(&self, elapsed_ms: u32, duration_ms: i32) -> bool {
        duration_ms >= 0 && elapsed_ms >= duration_ms as u32 + self.release_total()
    }
}
