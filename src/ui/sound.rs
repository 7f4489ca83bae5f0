/// Sound backend: procedural 8-bit style cues via rodio.
///
/// Each `GameEvent` maps to at most one `Cue`. All cue buffers are generated
/// as in-memory WAVs at init time; playback is fire-and-forget.
///
/// Without the "sound" feature the stub SoundEngine does nothing.

use crate::sim::event::GameEvent;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Cue {
    Jump,
    Coin,
    PowerUp,
    Bump,
    Stomp,
    Fire,
    Hit,
    Die,
    Clear,
    GameOver,
    Fanfare,
}

impl Cue {
    pub const ALL: [Cue; 11] = [
        Cue::Jump, Cue::Coin, Cue::PowerUp, Cue::Bump, Cue::Stomp, Cue::Fire,
        Cue::Hit, Cue::Die, Cue::Clear, Cue::GameOver, Cue::Fanfare,
    ];

    pub fn for_event(event: &GameEvent) -> Option<Cue> {
        match event {
            GameEvent::Jumped => Some(Cue::Jump),
            GameEvent::CoinCollected { .. } => Some(Cue::Coin),
            GameEvent::PowerUp { .. } => Some(Cue::PowerUp),
            GameEvent::BlockBumped { .. } => Some(Cue::Bump),
            GameEvent::EnemyStomped { .. } => Some(Cue::Stomp),
            GameEvent::EnemyShot { .. } => Some(Cue::Hit),
            GameEvent::ProjectileFired { .. } => Some(Cue::Fire),
            GameEvent::LifeLost { .. } => Some(Cue::Die),
            GameEvent::LevelComplete { .. } => Some(Cue::Clear),
            GameEvent::GameOver { .. } => Some(Cue::GameOver),
            GameEvent::GameComplete { .. } => Some(Cue::Fanfare),
            GameEvent::LevelStarted { .. } => None,
        }
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Cue;
    use crate::sim::event::GameEvent;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<Cue, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("audio output unavailable: {e}");
                    return None;
                }
            };
            let buffers = Cue::ALL.iter()
                .map(|&cue| (cue, Arc::new(make_wav(&generate(cue)))))
                .collect();
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play_events(&self, events: &[GameEvent]) {
            for cue in events.iter().filter_map(Cue::for_event) {
                self.play(cue);
            }
        }

        pub fn play(&self, cue: Cue) {
            let Some(buf) = self.buffers.get(&cue) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn generate(cue: Cue) -> Vec<f32> {
        match cue {
            Cue::Jump => sweep(320.0, 720.0, 0.09, 0.22),
            Cue::Coin => notes(&[(988.0, 0.05), (1319.0, 0.12)], 0.25), // B5, E6
            Cue::PowerUp => notes(&[(523.0, 0.06), (659.0, 0.06), (784.0, 0.06), (1047.0, 0.12)], 0.25),
            Cue::Bump => sweep(180.0, 90.0, 0.07, 0.3),
            Cue::Stomp => sweep(600.0, 150.0, 0.1, 0.3),
            Cue::Fire => sweep(1400.0, 500.0, 0.06, 0.18),
            Cue::Hit => notes(&[(660.0, 0.04), (440.0, 0.06)], 0.22),
            Cue::Die => notes(&[(440.0, 0.12), (370.0, 0.12), (311.0, 0.12), (261.0, 0.2)], 0.3),
            Cue::Clear => notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.3)], 0.3),
            Cue::GameOver => notes(&[(392.0, 0.2), (330.0, 0.2), (262.0, 0.4)], 0.3),
            Cue::Fanfare => notes(
                &[(523.0, 0.1), (523.0, 0.1), (784.0, 0.1), (1047.0, 0.2), (784.0, 0.1), (1047.0, 0.4)],
                0.3,
            ),
        }
    }

    /// Note sequence, sine plus octave harmonic for a retro edge.
    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in seq {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.6);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Linear pitch sweep with a fade out.
    fn sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let freq = from + (to - from) * p;
                phase += freq * TAU / SAMPLE_RATE as f32;
                phase.sin() * (1.0 - p) * volume
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * bits_per_sample as u32 / 8;
        let block_align = bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&1u16.to_le_bytes()); // mono
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_sizes_match_payload() {
            let wav = make_wav(&generate(Cue::Coin));
            let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]) as usize;
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(wav.len(), 44 + data_size);
        }

        #[test]
        fn every_cue_has_samples() {
            for cue in Cue::ALL {
                assert!(!generate(cue).is_empty(), "{cue:?}");
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_events(&self, _events: &[GameEvent]) {}
    pub fn play(&self, _cue: Cue) {}
}
