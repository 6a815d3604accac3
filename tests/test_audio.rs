use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use grid_shooter::audio::{
    self, render_cue, AudioEngine, AudioOutput, OutputFactory, SoundCue, Voice, Waveform,
    SAMPLE_RATE,
};
use grid_shooter::GameError;

struct CountingOutput {
    plays: Rc<RefCell<Vec<SoundCue>>>,
    fail: bool,
}

impl AudioOutput for CountingOutput {
    fn play(
        &mut self,
        cue: SoundCue,
        _samples: &[f32],
        _sample_rate: u32,
    ) -> grid_shooter::Result<()> {
        if self.fail {
            return Err(GameError::Audio("device lost".into()));
        }
        self.plays.borrow_mut().push(cue);
        Ok(())
    }
}

fn engine(fail: bool) -> (AudioEngine, Rc<RefCell<Vec<SoundCue>>>, Rc<RefCell<u32>>) {
    let plays = Rc::new(RefCell::new(Vec::new()));
    let opens = Rc::new(RefCell::new(0));
    let (p, o) = (plays.clone(), opens.clone());
    let factory: OutputFactory = Box::new(move || -> grid_shooter::Result<Box<dyn AudioOutput>> {
        *o.borrow_mut() += 1;
        Ok(Box::new(CountingOutput {
            plays: p.clone(),
            fail,
        }))
    });
    (AudioEngine::new(factory, 9), plays, opens)
}

#[test]
fn every_cue_renders_within_range() {
    let mut rng = StdRng::seed_from_u64(5);
    for cue in SoundCue::ALL {
        let samples = render_cue(cue, SAMPLE_RATE, &mut rng);
        assert!(!samples.is_empty(), "{} is empty", cue.name());
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(samples.iter().any(|s| s.abs() > 0.01), "{} is silent", cue.name());
    }
}

#[test]
fn cue_lengths_include_release_tail_and_offsets() {
    let mut rng = StdRng::seed_from_u64(5);
    // 0.08 s tone + 0.06 s release + 0.02 s tail
    let shot = render_cue(SoundCue::PlayerShot, SAMPLE_RATE, &mut rng);
    assert!((shot.len() as i64 - 7056).abs() <= 1);

    let explode = render_cue(SoundCue::Explode, SAMPLE_RATE, &mut rng);
    assert!((explode.len() as i64 - 9702).abs() <= 1);

    // Second victory note starts 0.3 s in
    let victory = render_cue(SoundCue::GameOver { victory: true }, SAMPLE_RATE, &mut rng);
    let expected = ((0.3 + 0.25 + 0.06 + 0.02) * SAMPLE_RATE as f32).round() as i64;
    assert!((victory.len() as i64 - expected).abs() <= 1);
}

#[test]
fn countdown_pitch_falls() {
    let pitch = |n| match SoundCue::Countdown(n).voices()[0] {
        Voice::Pluck { freq, .. } => freq,
        other => panic!("unexpected voice {other:?}"),
    };
    assert_eq!(pitch(3), 480.0);
    assert_eq!(pitch(2), 420.0);
    assert_eq!(pitch(1), 360.0);
}

#[test]
fn start_cue_is_a_rising_arpeggio() {
    let voices = SoundCue::Start.voices();
    assert_eq!(voices.len(), 3);
    let mut last = 0.0;
    for (i, v) in voices.iter().enumerate() {
        let Voice::Tone { wave, freq, .. } = *v else {
            panic!("unexpected voice {v:?}");
        };
        assert_eq!(wave, Waveform::Triangle);
        assert!(freq > last);
        assert!((v.start() - i as f32 * 0.12).abs() < 1e-6);
        last = freq;
    }
}

#[test]
fn cue_names_are_unique() {
    let mut names: Vec<_> = SoundCue::ALL.iter().map(SoundCue::name).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), SoundCue::ALL.len());
}

// ── Engine ────────────────────────────────────────────────────────────────────

#[test]
fn engine_is_silent_until_unlocked() {
    let (mut audio, plays, opens) = engine(false);
    audio.play(SoundCue::Hit);
    assert!(plays.borrow().is_empty());
    assert_eq!(*opens.borrow(), 0);

    assert!(audio.unlock());
    assert!(audio.unlock());
    assert_eq!(*opens.borrow(), 1);

    audio.play(SoundCue::Hit);
    assert_eq!(*plays.borrow(), vec![SoundCue::Hit]);
}

#[test]
fn muted_engine_plays_nothing() {
    let (mut audio, plays, _) = engine(false);
    audio.unlock();
    audio.set_muted(true);
    assert!(audio.is_muted());
    audio.play(SoundCue::Explode);
    assert!(plays.borrow().is_empty());

    audio.set_muted(false);
    audio.play(SoundCue::Explode);
    assert_eq!(plays.borrow().len(), 1);
}

#[test]
fn failing_open_leaves_engine_unavailable() {
    let factory: OutputFactory = Box::new(|| -> grid_shooter::Result<Box<dyn AudioOutput>> {
        Err(GameError::Audio("no device".into()))
    });
    let mut audio = AudioEngine::new(factory, 0);
    assert!(!audio.unlock());
    assert!(!audio.is_available());
    audio.play(SoundCue::Start);
}

#[test]
fn play_failure_disables_output() {
    let (mut audio, _, _) = engine(true);
    assert!(audio.unlock());
    audio.play(SoundCue::Hit);
    assert!(!audio.is_available());
    // Later cues are dropped quietly
    audio.play(SoundCue::Hit);
}

#[test]
fn silent_engine_never_opens() {
    let mut audio = AudioEngine::silent();
    assert!(!audio.unlock());
    audio.play(SoundCue::Start);
}

// ── WAV export ────────────────────────────────────────────────────────────────

#[test]
fn export_writes_one_wav_per_cue() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("sounds");
    let written = audio::export_cues(&out, 22_050, 3).unwrap();
    assert_eq!(written.len(), SoundCue::ALL.len());
    assert!(written.iter().any(|p| p.ends_with("victory.wav")));

    let reader = hound::WavReader::open(out.join("player_shot.wav")).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 22_050);
    assert_eq!(spec.bits_per_sample, 16);
    assert!((reader.len() as i64 - 3528).abs() <= 1);
}
