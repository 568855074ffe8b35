//! Integration Tests
//!
//! End-to-end tests for the Salvo render pipeline.

use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use salvo::engine::io::{export_audio, generate_test_tone};
use salvo::render::{
    compensation_gain, generate_sequence, mix_sequence, normalize_with_diff, pitch_shift,
    plan_sequence, time_between_ms, SeedSource,
};
use salvo::{
    AudioBuffer, ExportFormat, LoopGenerator, LoopSettings, SampleTuning, WavCodec,
    WeaponFireSample,
};

const RATE: u32 = 48000;

/// Tuning that leaves a full-length tone untouched by envelope and pitch
fn still_tuning() -> SampleTuning {
    SampleTuning {
        rand_offset_cents: 0,
        loop_fadeout_start_ms: 0,
        loop_fadeout_length_ms: 0,
        ..SampleTuning::default()
    }
}

fn tone_sample(path: &str, frequency: f32, secs: f32, tuning: SampleTuning) -> WeaponFireSample {
    let tone = generate_test_tone(frequency, secs, RATE);
    WeaponFireSample::with_tuning(tone, path, path, tuning)
}

fn write_tone(dir: &Path, name: &str, frequency: f32, secs: f32) -> PathBuf {
    let path = dir.join(name);
    export_audio(
        &generate_test_tone(frequency, secs, RATE),
        &path,
        ExportFormat::default(),
    )
    .unwrap();
    path
}

// === Sequence Determinism ===

#[test]
fn test_same_seed_same_shot_plan() {
    let owned: Vec<WeaponFireSample> = (0..4)
        .map(|i| tone_sample(&format!("s{}.wav", i), 200.0, 0.3, SampleTuning::default()))
        .collect();
    let samples: Vec<&WeaponFireSample> = owned.iter().collect();

    for seed in [0u64, 42, 1_000_000] {
        let a = plan_sequence(&samples, 31, &mut SeedSource::new(seed)).unwrap();
        let b = plan_sequence(&samples, 31, &mut SeedSource::new(seed)).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn test_solo_sample_fires_every_shot() {
    let mut owned: Vec<WeaponFireSample> = (0..3)
        .map(|i| tone_sample(&format!("s{}.wav", i), 200.0, 0.3, SampleTuning::default()))
        .collect();
    owned[1].set_solo(true);
    let samples: Vec<&WeaponFireSample> = owned.iter().collect();

    let plan = plan_sequence(&samples, 50, &mut SeedSource::new(3)).unwrap();
    assert!(plan.iter().all(|draw| draw.sample_index == 1));
}

// === Mixer ===

#[test]
fn test_mix_length_formula() {
    for (rpm, count) in [(600u32, 4usize), (750, 7), (1100, 2), (1, 1)] {
        let shots: Vec<AudioBuffer> = (0..count)
            .map(|i| generate_test_tone(300.0, 0.1 + 0.05 * i as f32, RATE))
            .collect();
        let result = mix_sequence(&shots, rpm, false).unwrap();

        let spacing_ms = time_between_ms(rpm) as f64;
        let expected_ms = (count - 1) as f64 * spacing_ms + shots[count - 1].duration_ms();
        assert_abs_diff_eq!(result.buffer.duration_ms(), expected_ms, epsilon = 1e-6);
    }
}

#[test]
fn test_second_normalize_reports_no_gain() {
    let shots = vec![generate_test_tone(300.0, 0.2, RATE).with_gain(-9.0); 3];
    let first = mix_sequence(&shots, 900, true).unwrap();
    assert!(first.gain_diff_db > 0.0);

    let second = normalize_with_diff(&first.buffer);
    assert_eq!(second.gain_diff_db, 0.0);
}

// === Pitch ===

#[test]
fn test_pitch_shift_direction() {
    let tone = generate_test_tone(440.0, 0.5, RATE);

    let same = pitch_shift(&tone, 0.0);
    assert_eq!(same.sample_rate, RATE);
    assert_eq!(same.len(), tone.len());

    let up = pitch_shift(&tone, 24.0);
    let down = pitch_shift(&tone, -24.0);
    assert_eq!(up.sample_rate, RATE);
    assert_eq!(down.sample_rate, RATE);
    assert!(up.len() < tone.len());
    assert!(down.len() > tone.len());
}

// === Sample Invariants ===

#[test]
fn test_positive_headroom_clamps() {
    let sample = tone_sample(
        "loud.wav",
        440.0,
        0.5,
        SampleTuning {
            headroom_db: 3.0,
            ..SampleTuning::default()
        },
    );
    assert_eq!(sample.tuning().headroom_db, -0.01);
}

#[test]
fn test_fade_parameters_clamp_to_buffer() {
    let sample = tone_sample(
        "short.wav",
        440.0,
        0.25,
        SampleTuning {
            rand_offset_cents: -30,
            loop_fadeout_start_ms: -50,
            loop_fadeout_length_ms: 10_000,
            tail_offset_ms: 900,
            tail_fadein_ms: 40,
            ..SampleTuning::default()
        },
    );
    let tuning = sample.tuning();

    assert_eq!(tuning.rand_offset_cents, 30);
    assert_eq!(tuning.loop_fadeout_start_ms, 0);
    assert_eq!(tuning.loop_fadeout_length_ms, 250);
    assert_eq!(tuning.tail_offset_ms, 250);
    assert_eq!(tuning.tail_fadein_ms, 0);
}

// === End-to-End ===

#[test]
fn test_four_shots_at_600_rpm_last_1300_ms() {
    let owned: Vec<WeaponFireSample> = (0..3)
        .map(|i| tone_sample(&format!("s{}.wav", i), 220.0 + 110.0 * i as f32, 1.0, still_tuning()))
        .collect();
    let samples: Vec<&WeaponFireSample> = owned.iter().collect();

    let mut settings = LoopSettings::default();
    settings.set_fire_count(4);
    settings.set_rpm(600);
    settings.normalize = false;

    let (count, rpm) = settings.count_and_rpm(false);
    let shots = generate_sequence(&samples, count, true, &mut SeedSource::new(42)).unwrap();
    let mix = mix_sequence(&shots, rpm, settings.normalize).unwrap();

    assert_eq!(mix.buffer.len(), 3 * 4800 + 48000);
    assert_abs_diff_eq!(mix.buffer.duration_ms(), 1300.0, epsilon = 1e-9);
    assert_eq!(mix.gain_diff_db, 0.0);
}

#[test]
fn test_tail_boost_is_clip_limited() {
    let tail = generate_test_tone(440.0, 0.5, RATE).normalized(1.5);
    assert_abs_diff_eq!(tail.peak_dbfs(), -1.5, epsilon = 1e-4);

    let gain = compensation_gain(&tail, 2.0);
    assert_abs_diff_eq!(gain, 1.49, epsilon = 1e-3);
    assert_abs_diff_eq!(tail.with_gain(gain).peak_dbfs(), -0.01, epsilon = 1e-3);
}

#[test]
fn test_full_export_to_wav_files() {
    let dir = tempdir().unwrap();
    let sources = dir.path().join("sources");
    std::fs::create_dir_all(&sources).unwrap();
    let paths = vec![
        write_tone(&sources, "rifle_a.wav", 180.0, 0.4),
        write_tone(&sources, "rifle_b.wav", 240.0, 0.4),
    ];

    let mut generator = LoopGenerator::with_codec(Box::new(WavCodec::default()));
    generator.open_files(&paths).unwrap();
    generator.set_target_directory(dir.path().join("results"));
    {
        let settings = generator.settings_mut();
        settings.prefix = "rifle".to_string();
        settings.variations = 1;
        settings.set_fire_count(6);
    }

    let written = generator.export_all().unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "rifle_default_0.wav",
            "rifle_default_1.wav",
            "rifle_tail_0.wav",
            "rifle_tail_1.wav",
            "rifle_burst_0.wav",
            "rifle_loop_0.wav",
        ]
    );

    let render_dir = dir.path().join("results").join("rifle").join("render");
    for name in &names {
        let reader = hound::WavReader::open(render_dir.join(name)).unwrap();
        assert!(reader.duration() > 0);
    }

    let config = generator.export_project().unwrap();
    assert!(config.ends_with("rifle/config.json"));
}
