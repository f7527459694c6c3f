//! Playback of processed audio through the default output device.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::dsp::meter::{window_level, METER_INTERVAL_MS};
use crate::error::{CompressorError, Result};

/// Plays a mono buffer on the default output device.
///
/// Blocks until the buffer is exhausted. `on_level` receives a meter reading
/// every 50 ms, taken from the current playback position.
pub fn play<F>(samples: Arc<Vec<f32>>, sample_rate: u32, mut on_level: F) -> Result<()>
where
    F: FnMut(f32),
{
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| CompressorError::Playback("No default output device available".into()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| CompressorError::Playback(e.to_string()))?;

    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(CompressorError::Playback(format!(
            "Unsupported sample format: {}",
            supported.sample_format()
        )));
    }

    let mut config: cpal::StreamConfig = supported.into();
    config.sample_rate = sample_rate;
    let device_channels = usize::from(config.channels.max(1));

    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);
        device
            .build_output_stream(
                &config,
                move |output: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut index = position.load(Ordering::Relaxed);
                    for frame in output.chunks_mut(device_channels) {
                        let value = samples.get(index).copied().unwrap_or(0.0);
                        frame.fill(value);
                        if index < samples.len() {
                            index += 1;
                        }
                    }
                    position.store(index, Ordering::Relaxed);
                    if index >= samples.len() {
                        finished.store(true, Ordering::Release);
                    }
                },
                |err| tracing::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| CompressorError::Playback(e.to_string()))?
    };

    stream
        .play()
        .map_err(|e| CompressorError::Playback(e.to_string()))?;
    tracing::debug!(
        "Playback started: {} samples at {} Hz on {} channels",
        samples.len(),
        sample_rate,
        device_channels
    );

    let interval = Duration::from_millis(u64::from(METER_INTERVAL_MS));
    while !finished.load(Ordering::Acquire) {
        on_level(window_level(&samples, position.load(Ordering::Relaxed)));
        std::thread::sleep(interval);
    }
    on_level(0.0);

    drop(stream);
    Ok(())
}
