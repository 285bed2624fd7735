/// Sound engine: procedural chiptune effects and background music via rodio.
///
/// All fixed sounds are generated as in-memory WAV buffers at init time.
/// Effects are fire-and-forget (non-blocking) via detached Sinks; the
/// background music is two looping Sinks (melody, bass + click track)
/// that are paused and resumed by the BGM toggle.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rand::Rng;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    /// Overall loudness of the looping music relative to effects.
    const BGM_VOLUME: f32 = 0.6;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_enabled: bool,
        sfx_count: Arc<Vec<u8>>,
        sfx_apply: Arc<Vec<u8>>,
        sfx_start: Arc<Vec<u8>>,
        sfx_go: Arc<Vec<u8>>,
        sfx_slide: Arc<Vec<u8>>,
        sfx_win: Arc<Vec<u8>>,
        sfx_lose: Arc<Vec<u8>>,
        sfx_reset: Arc<Vec<u8>>,
        bgm: Vec<Sink>,
    }

    impl SoundEngine {
        pub fn new(sfx_enabled: bool) -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("no audio output, running silent: {e}");
                    return None;
                }
            };

            // ── Generate all sound buffers ──
            let sfx_count = Arc::new(make_wav(&gen_count_change()));
            let sfx_apply = Arc::new(make_wav(&gen_apply()));
            let sfx_start = Arc::new(make_wav(&gen_start()));
            let sfx_go = Arc::new(make_wav(&gen_go()));
            let sfx_slide = Arc::new(make_wav(&gen_slide()));
            let sfx_win = Arc::new(make_wav(&gen_win()));
            let sfx_lose = Arc::new(make_wav(&gen_lose()));
            let sfx_reset = Arc::new(make_wav(&gen_reset()));

            // Music starts paused; the caller decides via set_bgm()
            let mut bgm = Vec::with_capacity(2);
            for track in [gen_melody(), gen_bass()] {
                let sink = match Sink::try_new(&handle) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::warn!("could not open music sink: {e}");
                        continue;
                    }
                };
                if let Ok(src) = Decoder::new(Cursor::new(make_wav(&track))) {
                    sink.pause();
                    sink.set_volume(BGM_VOLUME);
                    sink.append(src.repeat_infinite());
                    bgm.push(sink);
                }
            }

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_enabled,
                sfx_count,
                sfx_apply,
                sfx_start,
                sfx_go,
                sfx_slide,
                sfx_win,
                sfx_lose,
                sfx_reset,
                bgm,
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            self.play_owned(buf.as_ref().clone());
        }

        fn play_owned(&self, buf: Vec<u8>) {
            if !self.sfx_enabled { return; }
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = Decoder::new(Cursor::new(buf)) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn set_bgm(&self, on: bool) {
            for sink in &self.bgm {
                if on { sink.play(); } else { sink.pause(); }
            }
        }

        pub fn play_count_change(&self) { self.play(&self.sfx_count); }
        pub fn play_apply(&self) { self.play(&self.sfx_apply); }
        pub fn play_start(&self) { self.play(&self.sfx_start); }
        pub fn play_go(&self) { self.play(&self.sfx_go); }
        pub fn play_win(&self) { self.play(&self.sfx_win); }
        pub fn play_lose(&self) { self.play(&self.sfx_lose); }
        pub fn play_reset(&self) { self.play(&self.sfx_reset); }

        /// One path segment being drawn. Vertical bounces vary in pitch
        /// so a long drop doesn't drone.
        pub fn play_step(&self, horizontal: bool) {
            if horizontal {
                self.play(&self.sfx_slide);
            } else {
                let freq = rand::thread_rng().gen_range(800.0..1000.0);
                self.play_owned(make_wav(&sweep(Wave::Sine, freq, freq, 0.05, 0.08)));
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    #[derive(Clone, Copy)]
    enum Wave {
        Sine,
        Triangle,
        Sawtooth,
        Square,
    }

    impl Wave {
        /// Sample at `phase` (in cycles).
        fn at(self, phase: f32) -> f32 {
            let p = phase.fract();
            match self {
                Wave::Sine => (p * TAU).sin(),
                Wave::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
                Wave::Sawtooth => 2.0 * p - 1.0,
                Wave::Square => if p < 0.5 { 1.0 } else { -1.0 },
            }
        }
    }

    fn samples_for(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Exponential pitch glide from `f0` to `f1` with an exponential
    /// fade from `volume` down to 1% of full scale.
    fn sweep(wave: Wave, f0: f32, f1: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(duration);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = f0 * (f1 / f0).powf(t);
                let env = volume * (0.01 / volume).powf(t);
                let s = wave.at(phase) * env;
                phase += freq / SAMPLE_RATE as f32;
                s
            })
            .collect()
    }

    /// Linear pitch glide, same fade as `sweep`.
    fn glide(wave: Wave, f0: f32, f1: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(duration);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = f0 + (f1 - f0) * t;
                let env = volume * (0.01 / volume).powf(t);
                let s = wave.at(phase) * env;
                phase += freq / SAMPLE_RATE as f32;
                s
            })
            .collect()
    }

    /// A held note: 50ms attack to `peak`, settle to `sustain` by
    /// `hold` of the duration, then release to silence.
    fn note(wave: Wave, freq: f32, duration: f32, peak: f32, sustain: f32, hold: f32) -> Vec<f32> {
        let n = samples_for(duration);
        let attack = 0.05_f32.min(duration * 0.5);
        let settle = duration * hold;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = if t < attack {
                    peak * t / attack
                } else if t < settle {
                    peak + (sustain - peak) * (t - attack) / (settle - attack).max(1e-6)
                } else {
                    sustain * (1.0 - (t - settle) / (duration - settle).max(1e-6))
                };
                wave.at(t * freq) * env
            })
            .collect()
    }

    /// Add `src` into `dst` starting `at` seconds in, growing `dst` as needed.
    fn mix_at(dst: &mut Vec<f32>, src: &[f32], at: f32) {
        let offset = samples_for(at);
        if dst.len() < offset + src.len() {
            dst.resize(offset + src.len(), 0.0);
        }
        for (d, s) in dst[offset..].iter_mut().zip(src) {
            *d += s;
        }
    }

    /// Count change: soft 800Hz beep
    fn gen_count_change() -> Vec<f32> {
        sweep(Wave::Sine, 800.0, 800.0, 0.1, 0.2)
    }

    /// Apply: two overlapping confirmation tones
    fn gen_apply() -> Vec<f32> {
        let mut out = sweep(Wave::Sine, 600.0, 600.0, 0.15, 0.3);
        mix_at(&mut out, &sweep(Wave::Sine, 900.0, 900.0, 0.15, 0.3), 0.05);
        out
    }

    /// Start: rising triangle whoosh 400Hz → 800Hz
    fn gen_start() -> Vec<f32> {
        sweep(Wave::Triangle, 400.0, 800.0, 0.3, 0.3)
    }

    /// GO: sharp 1kHz ping
    fn gen_go() -> Vec<f32> {
        sweep(Wave::Sine, 1000.0, 1000.0, 0.08, 0.4)
    }

    /// Horizontal move: sliding sawtooth 600Hz → 400Hz
    fn gen_slide() -> Vec<f32> {
        glide(Wave::Sawtooth, 600.0, 400.0, 0.08, 0.15)
    }

    /// Reset: descending sawtooth sweep 800Hz → 200Hz
    fn gen_reset() -> Vec<f32> {
        sweep(Wave::Sawtooth, 800.0, 200.0, 0.25, 0.3)
    }

    /// Win: C5→E5→G5→C6 arpeggio with high sparkles on top
    fn gen_win() -> Vec<f32> {
        let notes = [
            (523.25_f32, 0.0_f32, 0.15_f32), // C5
            (659.25, 0.15, 0.15),            // E5
            (783.99, 0.3, 0.3),              // G5
            (1046.50, 0.6, 0.4),             // C6
        ];
        let mut out = Vec::new();
        for &(freq, at, dur) in &notes {
            mix_at(&mut out, &note(Wave::Sine, freq, dur, 0.4, 0.3, 0.7), at);
        }
        let mut rng = rand::thread_rng();
        for i in 0..5 {
            let freq = rng.gen_range(2000.0..3000.0);
            mix_at(&mut out, &sweep(Wave::Sine, freq, freq, 0.1, 0.15), i as f32 * 0.1);
        }
        out
    }

    /// Lose: G4→F4→D4 descent with a soft low hum
    fn gen_lose() -> Vec<f32> {
        let notes = [
            (392.00_f32, 0.0_f32, 0.3_f32), // G4
            (349.23, 0.3, 0.3),             // F4
            (293.66, 0.6, 0.5),             // D4
        ];
        let mut out = Vec::new();
        for &(freq, at, dur) in &notes {
            mix_at(&mut out, &note(Wave::Sine, freq, dur, 0.25, 0.15, 0.7), at);
        }
        mix_at(&mut out, &sweep(Wave::Triangle, 220.0, 220.0, 0.8, 0.15), 0.4);
        out
    }

    // ── Background music ──

    /// Melody loop: C D E G E D C(long) D E F G(long), 3.9s
    fn gen_melody() -> Vec<f32> {
        let melody = [
            (523.25_f32, 0.3_f32), // C5
            (587.33, 0.3),         // D5
            (659.25, 0.3),         // E5
            (783.99, 0.3),         // G5
            (659.25, 0.3),         // E5
            (587.33, 0.3),         // D5
            (523.25, 0.6),         // C5
            (587.33, 0.3),         // D5
            (659.25, 0.3),         // E5
            (698.46, 0.3),         // F5
            (783.99, 0.6),         // G5
        ];
        let mut out = Vec::new();
        for &(freq, dur) in &melody {
            out.extend(note(Wave::Sine, freq, dur, 0.15, 0.1, 0.7));
        }
        out
    }

    /// Bass loop: C3 D3 E3 G3 at 0.6s each, with a click every 0.3s
    fn gen_bass() -> Vec<f32> {
        let bass = [130.81_f32, 146.83, 164.81, 196.00];
        let mut out = Vec::new();
        for &freq in &bass {
            out.extend(note(Wave::Triangle, freq, 0.6, 0.08, 0.05, 0.8));
        }
        let click = sweep(Wave::Square, 1600.0, 1600.0, 0.05, 0.03);
        for beat in 0..8 {
            mix_at(&mut out, &click, beat as f32 * 0.3);
        }
        out
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
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

}

// ════════════════════════════════════════════════════════════
//  Public API — compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new(_sfx_enabled: bool) -> Option<Self> { Some(SoundEngine) }
    pub fn set_bgm(&self, _on: bool) {}
    pub fn play_count_change(&self) {}
    pub fn play_apply(&self) {}
    pub fn play_start(&self) {}
    pub fn play_go(&self) {}
    pub fn play_step(&self, _horizontal: bool) {}
    pub fn play_win(&self) {}
    pub fn play_lose(&self) {}
    pub fn play_reset(&self) {}
}
