// SPDX-License-Identifier: GPL-3.0-only

//! Audio cue generation
//!
//! The mapper decides *when* and *at what pitch and position* a beep plays.
//! Playback, 3D attenuation and rolloff belong to the [`AudioRenderer`].

mod cue;

pub use cue::{
    AudioCueMapper, AudioCueState, CueConfig, CueMode, CueTrigger, CurveKey, PitchCurve,
};

/// Plays one-shot spatial beeps
pub trait AudioRenderer {
    fn play(&mut self, trigger: &CueTrigger);
}

/// Collects cues instead of playing them
impl AudioRenderer for Vec<CueTrigger> {
    fn play(&mut self, trigger: &CueTrigger) {
        self.push(*trigger);
    }
}

impl<R: AudioRenderer + ?Sized> AudioRenderer for &mut R {
    fn play(&mut self, trigger: &CueTrigger) {
        (**self).play(trigger);
    }
}
