/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
/// The consume sound has one variant per host profile.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

use crate::domain::content::AudioVariant;
use crate::sim::event::GameEvent;

/// Every effect the engine can play.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Sfx {
    Consume(AudioVariant),
    Mutation,
    Absorb,
    Heal,
    Phase,
    Burst,
    PulseWarning,
    PulseDeadly,
    LevelUp,
    Death,
}

/// Sound cue for an event, if any. Text and tick events are silent.
pub fn cue(event: &GameEvent, host: AudioVariant) -> Option<Sfx> {
    Some(match event {
        GameEvent::Consumed { .. } => Sfx::Consume(host),
        GameEvent::MutationActivated(_) => Sfx::Mutation,
        GameEvent::EnemyAbsorbed { .. } => Sfx::Absorb,
        GameEvent::SelfHealTriggered => Sfx::Heal,
        GameEvent::PhaseEngaged { .. } => Sfx::Phase,
        GameEvent::TeleportBurst => Sfx::Burst,
        GameEvent::HazardWarning { .. } => Sfx::PulseWarning,
        GameEvent::HazardDeadly { .. } => Sfx::PulseDeadly,
        GameEvent::LevelAdvanced(_) => Sfx::LevelUp,
        GameEvent::RunEnded { .. } => Sfx::Death,
        _ => return None,
    })
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Sfx;
    use crate::domain::content::AudioVariant;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<Sfx, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::info!("audio output unavailable: {e}");
                    return None;
                }
            };

            // ── Generate all sound buffers ──
            let mut buffers = HashMap::new();
            for variant in [
                AudioVariant::ProteinPowder,
                AudioVariant::CaffeineOverload,
                AudioVariant::GoldPlated,
                AudioVariant::PoliticalChaos,
            ] {
                buffers.insert(Sfx::Consume(variant), Arc::new(make_wav(&gen_consume(variant))));
            }
            buffers.insert(Sfx::Mutation, Arc::new(make_wav(&gen_mutation())));
            buffers.insert(Sfx::Absorb, Arc::new(make_wav(&gen_absorb())));
            buffers.insert(Sfx::Heal, Arc::new(make_wav(&gen_heal())));
            buffers.insert(Sfx::Phase, Arc::new(make_wav(&gen_sweep(300.0, 900.0, 0.18))));
            buffers.insert(Sfx::Burst, Arc::new(make_wav(&gen_sweep(1200.0, 400.0, 0.1))));
            buffers.insert(Sfx::PulseWarning, Arc::new(make_wav(&gen_blip(880.0, 0.06, 0.2))));
            buffers.insert(Sfx::PulseDeadly, Arc::new(make_wav(&gen_zap())));
            buffers.insert(Sfx::LevelUp, Arc::new(make_wav(&gen_level_up())));
            buffers.insert(Sfx::Death, Arc::new(make_wav(&gen_death())));

            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let Some(buf) = self.buffers.get(&sfx) else { return };
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
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn samples_for(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Simple sine blip at given frequency and duration
    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(duration);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32); // linear fade out
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Linear pitch sweep between two frequencies.
    fn gen_sweep(from: f32, to: f32, duration: f32) -> Vec<f32> {
        let n = samples_for(duration);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let freq = from + (to - from) * p;
                phase += freq / SAMPLE_RATE as f32;
                (phase * TAU).sin() * (1.0 - p).powf(0.7) * 0.25
            })
            .collect()
    }

    /// Notes played back to back with a square-ish timbre.
    fn gen_arpeggio(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = samples_for(note_dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Noise burst with a descending tone underneath.
    fn gen_noise(duration: f32, base: f32, span: f32, noise_mix: f32, seed: u32) -> Vec<f32> {
        let n = samples_for(duration);
        let mut rng: u32 = seed;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = base + (1.0 - t) * span;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * freq * TAU).sin();
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(0.8);
                (tone * (1.0 - noise_mix) + noise * noise_mix) * env * 0.3
            })
            .collect()
    }

    /// Consume: one flavour per host.
    fn gen_consume(variant: AudioVariant) -> Vec<f32> {
        match variant {
            // Heavy low thump
            AudioVariant::ProteinPowder => gen_noise(0.12, 90.0, 120.0, 0.25, 777),
            // Jittery double blip
            AudioVariant::CaffeineOverload => {
                let mut s = gen_blip(1400.0, 0.03, 0.25);
                s.extend(gen_blip(1800.0, 0.03, 0.25));
                s
            }
            // Bright chime C6 → E6 → G6
            AudioVariant::GoldPlated => gen_arpeggio(&[1047.0, 1319.0, 1568.0], 0.045, 0.25),
            // Dissonant crunch
            AudioVariant::PoliticalChaos => gen_noise(0.1, 300.0, 400.0, 0.6, 4242),
        }
    }

    fn gen_mutation() -> Vec<f32> {
        gen_arpeggio(&[523.0, 659.0, 784.0, 1047.0], 0.08, 0.3)
    }

    fn gen_absorb() -> Vec<f32> {
        let mut s = gen_sweep(200.0, 700.0, 0.12);
        s.extend(gen_blip(700.0, 0.08, 0.25));
        s
    }

    fn gen_heal() -> Vec<f32> {
        gen_arpeggio(&[784.0, 1047.0], 0.1, 0.25)
    }

    /// Deadly pulse: harsh buzz.
    fn gen_zap() -> Vec<f32> {
        let n = samples_for(0.2);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - i as f32 / n as f32;
                let square = if (t * 110.0 * TAU).sin() >= 0.0 { 1.0 } else { -1.0 };
                square * env * 0.15
            })
            .collect()
    }

    /// Level advance: ascending fanfare with a sustained top note.
    fn gen_level_up() -> Vec<f32> {
        let mut samples = gen_arpeggio(&[523.0, 659.0, 784.0], 0.1, 0.3);
        let last_freq = 1047.0_f32;
        let n = samples_for(0.25);
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            samples.push((t * last_freq * TAU).sin() * env * 0.3);
        }
        samples
    }

    /// Death: sad descending tone
    fn gen_death() -> Vec<f32> {
        let notes = [440.0_f32, 370.0, 311.0, 261.0]; // A4→F#4→Eb4→C4
        let note_dur = 0.12;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = samples_for(note_dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                samples.push((t * freq * TAU).sin() * env * 0.3);
            }
        }
        // Final fade
        let fade_len = samples.len() / 4;
        let total = samples.len();
        for i in (total - fade_len)..total {
            samples[i] *= (total - i) as f32 / fade_len as f32;
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
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
        fn wav_header_matches_payload() {
            let samples = gen_mutation();
            let wav = make_wav(&samples);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + samples.len() * 2);
        }

        #[test]
        fn consume_variants_differ() {
            let a = gen_consume(AudioVariant::ProteinPowder);
            let b = gen_consume(AudioVariant::GoldPlated);
            assert_ne!(a.len(), b.len());
            assert!(a.iter().chain(&b).all(|s| s.abs() <= 1.0));
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::MutationId;

    #[test]
    fn consume_uses_host_variant() {
        let ev = GameEvent::Consumed { cell: crate::domain::grid::Cell::new(1, 1), score: 10 };
        assert_eq!(cue(&ev, AudioVariant::GoldPlated), Some(Sfx::Consume(AudioVariant::GoldPlated)));
    }

    #[test]
    fn text_events_are_silent() {
        let ev = GameEvent::TextCleared { channel: crate::sim::event::TextChannel::Host };
        assert_eq!(cue(&ev, AudioVariant::ProteinPowder), None);
        assert_eq!(
            cue(&GameEvent::MutationActivated(MutationId::SpineFangs), AudioVariant::ProteinPowder),
            Some(Sfx::Mutation)
        );
    }
}
