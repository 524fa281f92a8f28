//! CLI Command Implementations

use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::engine::io::{probe_wav, validate_audio_file, AudioFormat};
use crate::error::Result;
use crate::markers::{format_timestamp, MarkerLayoutEngine};
use crate::project::ProjectData;

/// Validate an audio file and print what is known about it.
pub fn probe(path: &Path) -> Result<()> {
    let size = std::fs::metadata(path)?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = validate_audio_file(&name, size)?;
    info!("Probing {} ({})", path.display(), format);

    println!("File:     {}", path.display());
    println!("Format:   {}", format);
    println!("Size:     {} bytes", size);

    if format == AudioFormat::Wav {
        let wav = probe_wav(path)?;
        println!("Rate:     {} Hz", wav.sample_rate);
        println!("Channels: {}", wav.channels);
        println!(
            "Duration: {:.3}s ({})",
            wav.duration_secs,
            format_timestamp(wav.duration_secs)
        );
    }
    Ok(())
}

/// Lay out a project's markers and print lanes, spans and ticks.
pub fn layout(config: &Config, project: &Path, duration: f64, width: f64, json: bool) -> Result<()> {
    let project = ProjectData::load(project)?;
    let engine = MarkerLayoutEngine::new(config.layout.clone());
    let result = engine.layout(&project.markers, duration, width);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} markers, {} lanes ({} visible)",
        project.markers.len(),
        result.max_layer + 1,
        result.visible_layers
    );
    let mut markers: Vec<_> = project.markers.iter().collect();
    markers.sort_by(|a, b| a.start.total_cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    for marker in markers {
        let layer = result.layer(&marker.id).unwrap_or_default();
        let span = result.rect(&marker.id);
        let clipped = if result.is_clipped(&marker.id) {
            " (clipped)"
        } else {
            ""
        };
        println!(
            "  lane {} {:>6}-{:<6} x={:>8.1} w={:>8.1}  {}{}",
            layer,
            format_timestamp(marker.start),
            format_timestamp(marker.end),
            span.map(|s| s.x).unwrap_or_default(),
            span.map(|s| s.width).unwrap_or_default(),
            marker.label,
            clipped
        );
    }
    Ok(())
}

/// Print the time axis for a duration.
pub fn ticks(config: &Config, duration: f64, width: f64) -> Result<()> {
    let engine = MarkerLayoutEngine::new(config.layout.clone());
    let geometry = engine.geometry(duration, width);
    for tick in crate::markers::time_axis_ticks(&geometry) {
        println!("{:>8} x={:.1}", tick.label, tick.x);
    }
    Ok(())
}
