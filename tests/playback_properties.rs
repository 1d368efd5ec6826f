//! End-to-end behaviour of the playback buffer through the public API

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use voice_playback::resample::output_len;
use voice_playback::{resample, AudioAsset, PlaybackBuffer, SoundPlayer, StreamConfig, Visualizer};

#[derive(Default)]
struct RecordingVisualizer {
    loads: Mutex<Vec<String>>,
    frames: AtomicUsize,
    last_len: AtomicUsize,
}

impl Visualizer for RecordingVisualizer {
    fn load(&self, stream_name: &str) {
        self.loads.lock().push(stream_name.to_string());
    }

    fn update(&self, _stream_name: &str, samples: &[f32]) {
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        self.frames.fetch_add(1, Ordering::SeqCst);
        self.last_len.store(samples.len(), Ordering::SeqCst);
    }
}

fn recording_buffer(sample_rate: u32) -> (Arc<PlaybackBuffer>, Arc<RecordingVisualizer>) {
    let viz = Arc::new(RecordingVisualizer::default());
    let buffer = Arc::new(PlaybackBuffer::new(sample_rate, viz.clone()));
    (buffer, viz)
}

/// Simulated driver: drains one callback's worth at the real cadence
fn spawn_driver(
    buffer: Arc<PlaybackBuffer>,
    config: StreamConfig,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<Vec<i16>> {
    thread::spawn(move || {
        let mut played = Vec::new();
        let mut data = vec![0i16; config.buffer_size * config.channels as usize];
        let mut scratch = Vec::new();
        while running.load(Ordering::SeqCst) {
            buffer.fill_output(&mut data, config.channels as usize, &mut scratch);
            played.extend_from_slice(&data);
            thread::sleep(config.callback_period());
        }
        played
    })
}

#[test]
fn silence_when_nothing_is_queued() {
    let (buffer, viz) = recording_buffer(24_000);
    for n in [1, 2, 511, 4096, 10_000] {
        let frame = buffer.drain(n);
        assert_eq!(frame.len(), n);
        assert!(frame.iter().all(|&s| s == 0));
    }
    assert_eq!(viz.frames.load(Ordering::SeqCst), 0);
}

#[test]
fn exact_drain_leaves_the_rest() {
    let (buffer, _) = recording_buffer(24_000);
    let chunk: Vec<i16> = (0..100).map(|i| i * 3 - 150).collect();
    buffer.enqueue(&chunk, false);

    assert_eq!(buffer.drain(60), chunk[..60].to_vec());
    assert_eq!(buffer.pending_samples(), 40);
    assert!(!buffer.is_absent());
}

#[test]
fn short_buffer_is_zero_padded_and_retired() {
    let (buffer, _) = recording_buffer(24_000);
    buffer.enqueue(&[11, 22, 33], false);

    assert_eq!(buffer.drain(6), vec![11, 22, 33, 0, 0, 0]);
    assert!(buffer.is_absent());
}

#[test]
fn any_drain_pattern_reconstructs_the_stream() {
    let chunks: Vec<Vec<i16>> = vec![
        (1..=7).collect(),
        (8..=8).collect(),
        (9..=40).collect(),
        (41..=45).collect(),
    ];
    let expected: Vec<i16> = (1..=45).collect();

    for pattern in [vec![1], vec![4096], vec![3, 5, 7], vec![45], vec![44, 2]] {
        let (buffer, _) = recording_buffer(24_000);
        for chunk in &chunks {
            buffer.enqueue(chunk, false);
        }

        let mut played = Vec::new();
        let mut sizes = pattern.iter().cycle();
        while played.len() < expected.len() + 10 {
            let n = *sizes.next().unwrap();
            played.extend(buffer.drain(n));
        }

        assert_eq!(&played[..expected.len()], &expected[..], "pattern {pattern:?}");
        assert!(played[expected.len()..].iter().all(|&s| s == 0));
    }
}

#[test]
fn resample_identity_and_length() {
    let x: Vec<f32> = (0..1234).map(|i| ((i * 37) % 101) as f32 / 101.0 - 0.5).collect();
    assert_eq!(resample(&x, 22_050, 22_050).unwrap(), x);

    for (from, to) in [(44_100, 24_000), (16_000, 24_000), (48_000, 22_050)] {
        let y = resample(&x, from, to).unwrap();
        let exact = x.len() as f64 * to as f64 / from as f64;
        assert!((y.len() as f64 - exact).abs() <= 1.0);
        assert_eq!(y.len(), output_len(x.len(), from, to));
    }
}

#[test]
fn session_reset_retriggers_load_once() {
    let (buffer, viz) = recording_buffer(24_000);

    buffer.enqueue(&[500; 64], true);
    buffer.enqueue(&[500; 64], true);
    while !buffer.is_absent() {
        buffer.drain(32);
    }
    buffer.await_drained();
    assert!(buffer.is_absent());
    assert_eq!(viz.loads.lock().len(), 1);

    buffer.enqueue(&[500; 64], true);
    buffer.enqueue(&[500; 64], true);
    assert_eq!(viz.loads.lock().len(), 2);
}

#[test]
fn streaming_scenario_at_24k_with_4096_frames() {
    let (buffer, viz) = recording_buffer(24_000);

    // A single short chunk pads out the first callback
    buffer.enqueue(&[1000; 1000], false);
    let first = buffer.drain(4096);
    assert!(first[..1000].iter().all(|&s| s == 1000));
    assert!(first[1000..].iter().all(|&s| s == 0));
    assert_eq!(first.len() - 1000, 3096);
    assert!(buffer.is_absent());

    // Two visualized chunks back to back
    let a: Vec<i16> = (0..5000).map(|i| (i % 1000) as i16 + 1).collect();
    let b: Vec<i16> = (0..5000).map(|i| -((i % 1000) as i16) - 1).collect();
    buffer.enqueue(&a, true);
    buffer.enqueue(&b, true);

    let calls: Vec<Vec<i16>> = (0..3).map(|_| buffer.drain(4096)).collect();
    let joined: Vec<i16> = a.iter().chain(&b).copied().collect();

    assert_eq!(calls[0], joined[..4096].to_vec());
    assert_eq!(calls[1], joined[4096..8192].to_vec());
    assert_eq!(&calls[2][..1808], &joined[8192..]);
    assert!(calls[2][1808..].iter().all(|&s| s == 0));

    let real: usize = calls.iter().flatten().filter(|&&s| s != 0).count();
    assert_eq!(real, 10_000);
    assert_eq!(viz.loads.lock().as_slice(), &["Aria".to_string()]);
    assert_eq!(viz.frames.load(Ordering::SeqCst), 3);
    assert_eq!(viz.last_len.load(Ordering::SeqCst), 4096);
}

#[test]
fn one_shot_sound_plays_through_a_running_driver() {
    let config = StreamConfig::mono(24_000, 240);
    let (buffer, viz) = recording_buffer(config.sample_rate);
    let running = Arc::new(AtomicBool::new(true));
    let driver = spawn_driver(Arc::clone(&buffer), config, Arc::clone(&running));

    // 50 ms stereo cue, folded to mono
    let stereo: Vec<f32> = (0..1200).flat_map(|_| [0.5f32, 0.0]).collect();
    let asset = AudioAsset::new(stereo, 2, 24_000).unwrap();
    SoundPlayer::new(Arc::clone(&buffer), config.buffer_size).play(&asset);

    // await_drained is only an estimate; give the driver a few more periods
    for _ in 0..50 {
        if buffer.is_absent() {
            break;
        }
        thread::sleep(config.callback_period());
    }
    running.store(false, Ordering::SeqCst);
    let played = driver.join().unwrap();

    assert!(buffer.is_absent());
    let real: Vec<i16> = played.into_iter().filter(|&s| s != 0).collect();
    assert_eq!(real, vec![8192; 1200]);
    assert_eq!(viz.frames.load(Ordering::SeqCst), 0);
    assert!(viz.loads.lock().is_empty());
}

#[test]
fn stereo_output_duplicates_speech() {
    let config = StreamConfig {
        sample_rate: 24_000,
        buffer_size: 4,
        channels: 2,
    };
    let (buffer, _) = recording_buffer(config.sample_rate);
    SoundPlayer::new(Arc::clone(&buffer), config.buffer_size)
        .stream_speech([vec![0.25f32, -0.25, 0.5]]);

    let mut data = vec![1i16; 8];
    let mut scratch = vec![0i16; config.buffer_size];
    buffer.fill_output(&mut data, 2, &mut scratch);
    assert_eq!(data, vec![8192, 8192, -8192, -8192, 16384, 16384, 0, 0]);
}
