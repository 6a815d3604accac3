//! Procedural sound cues.
//!
//! Each game event maps to a fixed recipe of voices (oscillator tones,
//! filtered noise sweeps, soft plucks) rendered to mono `f32` PCM on demand.
//! Playback goes through an [`AudioOutput`] opened lazily on the first user
//! gesture; if it cannot be opened the engine simply stays silent.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;

pub const SAMPLE_RATE: u32 = 44_100;

// Tone envelope shape (seconds / sustain ratio)
const ATTACK: f32 = 0.01;
const DECAY: f32 = 0.06;
const SUSTAIN: f32 = 0.4;
const RELEASE: f32 = 0.06;
const TAIL: f32 = 0.02;
const SILENCE: f32 = 0.0001;

const PLUCK_CUTOFF_HZ: f32 = 2400.0;
const PLUCK_ATTACK: f32 = 0.008;
const PLUCK_FLOOR_HZ: f32 = 120.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Countdown tick, 3 down to 1.
    Countdown(u8),
    Start,
    PlayerShot,
    EnemyShot,
    Hit,
    Explode,
    GameOver { victory: bool },
}

impl SoundCue {
    /// Every distinct cue, in a stable order.
    pub const ALL: [SoundCue; 10] = [
        SoundCue::Countdown(3),
        SoundCue::Countdown(2),
        SoundCue::Countdown(1),
        SoundCue::Start,
        SoundCue::PlayerShot,
        SoundCue::EnemyShot,
        SoundCue::Hit,
        SoundCue::Explode,
        SoundCue::GameOver { victory: true },
        SoundCue::GameOver { victory: false },
    ];

    pub fn name(&self) -> String {
        match self {
            SoundCue::Countdown(n) => format!("countdown_{n}"),
            SoundCue::Start => "start".into(),
            SoundCue::PlayerShot => "player_shot".into(),
            SoundCue::EnemyShot => "enemy_shot".into(),
            SoundCue::Hit => "hit".into(),
            SoundCue::Explode => "explode".into(),
            SoundCue::GameOver { victory: true } => "victory".into(),
            SoundCue::GameOver { victory: false } => "defeat".into(),
        }
    }

    pub fn voices(&self) -> Vec<Voice> {
        use Waveform::*;
        match *self {
            SoundCue::Countdown(n) => {
                // Slightly falling pitch: 3 → 2 → 1
                let freq = match n {
                    3 => 480.0,
                    2 => 420.0,
                    _ => 360.0,
                };
                vec![Voice::Pluck {
                    freq,
                    dur: 0.16,
                    vol: 0.16,
                    start: 0.0,
                }]
            }
            SoundCue::Start => [523.25, 659.25, 783.99]
                .iter()
                .enumerate()
                .map(|(i, &freq)| Voice::tone(Triangle, freq, 0.12, 0.15).at(i as f32 * 0.12))
                .collect(),
            SoundCue::PlayerShot => vec![Voice::tone(Square, 920.0, 0.08, 0.12)],
            SoundCue::EnemyShot => vec![Voice::tone(Sawtooth, 420.0, 0.1, 0.1)],
            SoundCue::Hit => vec![Voice::tone(Triangle, 180.0, 0.1, 0.18)],
            SoundCue::Explode => vec![Voice::Noise {
                dur: 0.22,
                vol: 0.28,
                f0: 1200.0,
                f1: 2000.0,
                start: 0.0,
            }],
            SoundCue::GameOver { victory: true } => vec![
                Voice::tone(Triangle, 440.0, 0.25, 0.18),
                Voice::tone(Triangle, 660.0, 0.25, 0.18).at(0.3),
            ],
            SoundCue::GameOver { victory: false } => vec![Voice::tone(Square, 140.0, 0.5, 0.22)],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// One sample at normalised phase `phase` ∈ [0, 1).
    fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

/// A single sound layer. Times are seconds; `start` offsets it in the cue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Voice {
    Tone {
        wave: Waveform,
        freq: f32,
        dur: f32,
        vol: f32,
        start: f32,
    },
    /// White noise through a band-pass swept from `f0` to `f1`.
    Noise {
        dur: f32,
        vol: f32,
        f0: f32,
        f1: f32,
        start: f32,
    },
    /// Low-passed sine with a short downward pitch bend.
    Pluck {
        freq: f32,
        dur: f32,
        vol: f32,
        start: f32,
    },
}

impl Voice {
    pub fn tone(wave: Waveform, freq: f32, dur: f32, vol: f32) -> Self {
        Voice::Tone {
            wave,
            freq,
            dur,
            vol,
            start: 0.0,
        }
    }

    /// The same voice, starting `offset` seconds into the cue.
    pub fn at(mut self, offset: f32) -> Self {
        match &mut self {
            Voice::Tone { start, .. } | Voice::Noise { start, .. } | Voice::Pluck { start, .. } => {
                *start = offset
            }
        }
        self
    }

    pub fn start(&self) -> f32 {
        match *self {
            Voice::Tone { start, .. } | Voice::Noise { start, .. } | Voice::Pluck { start, .. } => {
                start
            }
        }
    }

    /// Rendered length in seconds, excluding the start offset.
    pub fn length(&self) -> f32 {
        match *self {
            Voice::Tone { dur, .. } => dur + RELEASE + TAIL,
            Voice::Noise { dur, .. } => dur,
            Voice::Pluck { dur, .. } => dur + TAIL,
        }
    }

    pub fn render(&self, sample_rate: u32, rng: &mut impl Rng) -> Vec<f32> {
        match *self {
            Voice::Tone {
                wave,
                freq,
                dur,
                vol,
                ..
            } => render_tone(wave, freq, dur, vol, sample_rate),
            Voice::Noise {
                dur,
                vol,
                f0,
                f1,
                ..
            } => render_noise(dur, vol, f0, f1, sample_rate, rng),
            Voice::Pluck { freq, dur, vol, .. } => render_pluck(freq, dur, vol, sample_rate),
        }
    }
}

// ── Envelopes & filters ──────────────────────────────────────────────────────

/// Piecewise-linear envelope through `points`, held flat past either end.
fn linear_env(points: &[(f32, f32)], t: f32) -> f32 {
    let Some(&(first_t, first_v)) = points.first() else {
        return 0.0;
    };
    if t <= first_t {
        return first_v;
    }
    for pair in points.windows(2) {
        let (t0, v0) = pair[0];
        let (t1, v1) = pair[1];
        if t <= t1 {
            let k = if t1 > t0 { (t - t0) / (t1 - t0) } else { 1.0 };
            return v0 + (v1 - v0) * k;
        }
    }
    points.last().map(|&(_, v)| v).unwrap_or(0.0)
}

/// Exponential ramp from `v0` at `t0` to `v1` at `t1`; both must be positive.
fn exp_ramp(v0: f32, v1: f32, t0: f32, t1: f32, t: f32) -> f32 {
    if t <= t0 {
        v0
    } else if t >= t1 {
        v1
    } else {
        v0 * (v1 / v0).powf((t - t0) / (t1 - t0))
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    fn set_coefficients(&mut self, b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) {
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    fn set_lowpass(&mut self, cutoff: f32, q: f32, sample_rate: f32) {
        let w0 = 2.0 * PI * (cutoff / sample_rate);
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q.max(0.1));
        self.set_coefficients(
            (1.0 - cos_w0) * 0.5,
            1.0 - cos_w0,
            (1.0 - cos_w0) * 0.5,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        );
    }

    /// Constant 0 dB peak gain band-pass.
    fn set_bandpass(&mut self, center: f32, q: f32, sample_rate: f32) {
        let w0 = 2.0 * PI * (center / sample_rate);
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q.max(0.1));
        self.set_coefficients(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha);
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

// ── Voice renderers ──────────────────────────────────────────────────────────

fn sample_count(seconds: f32, sample_rate: u32) -> usize {
    (seconds.max(0.0) * sample_rate as f32).round() as usize
}

fn render_tone(wave: Waveform, freq: f32, dur: f32, vol: f32, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let env = [
        (0.0, 0.0),
        (ATTACK, vol),
        (ATTACK + DECAY, vol * SUSTAIN),
        (dur + RELEASE, SILENCE),
    ];
    let mut phase = 0.0f32;
    (0..sample_count(dur + RELEASE + TAIL, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            let s = wave.sample(phase) * linear_env(&env, t);
            phase = (phase + freq / sr).fract();
            s
        })
        .collect()
}

fn render_noise(
    dur: f32,
    vol: f32,
    f0: f32,
    f1: f32,
    sample_rate: u32,
    rng: &mut impl Rng,
) -> Vec<f32> {
    let sr = sample_rate as f32;
    let gain = [(0.0, vol), (dur, 0.001)];
    let mut filter = Biquad::default();
    (0..sample_count(dur, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            let center = f0 + (f1 - f0) * (t / dur).min(1.0);
            filter.set_bandpass(center, 1.0, sr);
            let white = rng.gen::<f32>() * 2.0 - 1.0;
            filter.process(white) * linear_env(&gain, t)
        })
        .collect()
}

fn render_pluck(freq: f32, dur: f32, vol: f32, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let bent = PLUCK_FLOOR_HZ.max(freq * 0.6);
    let mut filter = Biquad::default();
    filter.set_lowpass(PLUCK_CUTOFF_HZ, std::f32::consts::FRAC_1_SQRT_2, sr);
    let mut phase = 0.0f32;
    (0..sample_count(dur + TAIL, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            let f = exp_ramp(freq, bent, 0.0, dur * 0.9, t);
            let amp = if t < PLUCK_ATTACK {
                exp_ramp(SILENCE, vol, 0.0, PLUCK_ATTACK, t)
            } else {
                exp_ramp(vol, SILENCE, PLUCK_ATTACK, dur, t)
            };
            let s = filter.process(Waveform::Sine.sample(phase)) * amp;
            phase = (phase + f / sr).fract();
            s
        })
        .collect()
}

/// Render every voice of `cue` and mix them into one buffer.
pub fn render_cue(cue: SoundCue, sample_rate: u32, rng: &mut impl Rng) -> Vec<f32> {
    let voices = cue.voices();
    let total = voices
        .iter()
        .map(|v| sample_count(v.start() + v.length(), sample_rate))
        .max()
        .unwrap_or(0);
    let mut mix = vec![0.0f32; total];
    for voice in &voices {
        let offset = sample_count(voice.start(), sample_rate);
        for (dst, s) in mix[offset..].iter_mut().zip(voice.render(sample_rate, rng)) {
            *dst += s;
        }
    }
    for s in &mut mix {
        *s = s.clamp(-1.0, 1.0);
    }
    mix
}

// ── Output ───────────────────────────────────────────────────────────────────

/// A sink for rendered cues, typically a sound device.
pub trait AudioOutput {
    fn play(&mut self, cue: SoundCue, samples: &[f32], sample_rate: u32) -> Result<()>;
}

/// Opens the output on first use.
pub type OutputFactory = Box<dyn FnMut() -> Result<Box<dyn AudioOutput>>>;

enum OutputState {
    /// Waiting for the first user gesture.
    Locked,
    Ready(Box<dyn AudioOutput>),
    /// Opening failed or no backend exists; stay silent.
    Unavailable,
}

pub struct AudioEngine {
    state: OutputState,
    factory: Option<OutputFactory>,
    muted: bool,
    sample_rate: u32,
    rng: StdRng,
}

impl AudioEngine {
    pub fn new(factory: OutputFactory, seed: u64) -> Self {
        AudioEngine {
            state: OutputState::Locked,
            factory: Some(factory),
            muted: false,
            sample_rate: SAMPLE_RATE,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// An engine that never produces sound.
    pub fn silent() -> Self {
        AudioEngine {
            state: OutputState::Unavailable,
            factory: None,
            muted: true,
            sample_rate: SAMPLE_RATE,
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, OutputState::Ready(_))
    }

    /// Open the output. Safe to call repeatedly; only the first call in the
    /// locked state does anything.
    pub fn unlock(&mut self) -> bool {
        if let OutputState::Locked = self.state {
            self.state = match self.factory.take().map(|mut open| open()) {
                Some(Ok(output)) => {
                    tracing::info!(sample_rate = self.sample_rate, "Audio output opened");
                    OutputState::Ready(output)
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Audio output unavailable, continuing silently");
                    OutputState::Unavailable
                }
                None => OutputState::Unavailable,
            };
        }
        self.is_available()
    }

    pub fn play(&mut self, cue: SoundCue) {
        if self.muted {
            return;
        }
        let OutputState::Ready(output) = &mut self.state else {
            return;
        };
        let samples = render_cue(cue, self.sample_rate, &mut self.rng);
        if let Err(e) = output.play(cue, &samples, self.sample_rate) {
            tracing::warn!(
                error = %e,
                cue = %cue.name(),
                "Dropping audio output after play failure"
            );
            self.state = OutputState::Unavailable;
        }
    }
}

#[cfg(feature = "audio")]
mod device {
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle};

    use super::{AudioOutput, SoundCue};
    use crate::error::{GameError, Result};

    /// Plays cues on the default system device.
    pub struct RodioOutput {
        _stream: OutputStream,
        handle: OutputStreamHandle,
    }

    impl RodioOutput {
        pub fn open() -> Result<Self> {
            let (stream, handle) =
                OutputStream::try_default().map_err(|e| GameError::Audio(e.to_string()))?;
            Ok(RodioOutput {
                _stream: stream,
                handle,
            })
        }
    }

    impl AudioOutput for RodioOutput {
        fn play(&mut self, _cue: SoundCue, samples: &[f32], sample_rate: u32) -> Result<()> {
            self.handle
                .play_raw(SamplesBuffer::new(1, sample_rate, samples.to_vec()))
                .map_err(|e| GameError::Audio(e.to_string()))
        }
    }
}

#[cfg(feature = "audio")]
pub use device::RodioOutput;

/// Factory for the system audio device, or a failing one when the crate was
/// built without the `audio` feature.
pub fn system_output() -> OutputFactory {
    #[cfg(feature = "audio")]
    {
        Box::new(|| -> Result<Box<dyn AudioOutput>> { Ok(Box::new(RodioOutput::open()?)) })
    }
    #[cfg(not(feature = "audio"))]
    {
        Box::new(|| -> Result<Box<dyn AudioOutput>> {
            Err(crate::error::GameError::Audio(
                "built without the `audio` feature".into(),
            ))
        })
    }
}

// ── WAV export ───────────────────────────────────────────────────────────────

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Render every cue into `dir` as `<name>.wav`.
pub fn export_cues(dir: &Path, sample_rate: u32, seed: u64) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut rng = StdRng::seed_from_u64(seed);
    SoundCue::ALL
        .iter()
        .map(|&cue| {
            let path = dir.join(format!("{}.wav", cue.name()));
            write_wav(&path, &render_cue(cue, sample_rate, &mut rng), sample_rate)?;
            Ok(path)
        })
        .collect()
}
