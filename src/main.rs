mod caption;
mod error;
mod json3;
mod parser;
mod processor;
mod serialiser;
mod transcript;

use crate::error::SubclipError;
use crate::processor::ClipWindow;
use crate::serialiser::OutputFormat;
use crate::transcript::TranscriptClient;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use log::{debug, info, warn};

fn main() {
    env_logger::init();

    match run() {
        Ok(()) => (),
        Err(err) => {
            println!("\n✗ Error: {}", err);
            for cause in err.chain().skip(1) {
                println!("    {}", cause);
            }
            if let Some(SubclipError::Service(_)) = err.downcast_ref::<SubclipError>() {
                println!("\nThis video may not have subtitles available.");
            }
        }
    }
}

#[derive(ClapParser, Debug)]
#[command(about = "Download YouTube subtitles, optionally clipped to a time range")]
struct Cli {
    #[arg(help = "YouTube video ID (from youtube.com/watch?v=VIDEO_ID)")]
    video_id: String,
    #[arg(
        value_name = "FILE",
        help = "Output filename for JSON3 subtitles. Other formats replace its extension.",
        default_value = "clip.json3"
    )]
    output_filename: PathBuf,
    #[arg(
        long,
        value_name = "MS",
        allow_negative_numbers = true,
        help = "Clip start time in milliseconds (inclusive)."
    )]
    start_ms: Option<i64>,
    #[arg(
        long,
        value_name = "MS",
        allow_negative_numbers = true,
        help = "Clip end time in milliseconds (exclusive)."
    )]
    end_ms: Option<i64>,
    #[arg(
        long,
        value_name = "CLOCK",
        value_parser = parser::parse_offset,
        conflicts_with = "start_ms",
        help = "Clip start as a clock offset, e.g. 1:02:03,500 (inclusive)."
    )]
    start: Option<i64>,
    #[arg(
        long,
        value_name = "CLOCK",
        value_parser = parser::parse_offset,
        conflicts_with = "end_ms",
        help = "Clip end as a clock offset, e.g. 1:05 (exclusive)."
    )]
    end: Option<i64>,
    #[arg(
        short,
        long,
        value_name = "CODE",
        default_value = "et",
        help = "Preferred subtitle language code. The first listed track is used when it is missing."
    )]
    lang: String,
    #[arg(
        short,
        long = "format",
        value_enum,
        default_values_t = [OutputFormat::Json3],
        help = "Output format. May be given more than once."
    )]
    formats: Vec<OutputFormat>,
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 15,
        help = "Network timeout for each request."
    )]
    timeout_secs: u64,
}

impl Cli {
    fn window(&self) -> Result<ClipWindow, SubclipError> {
        ClipWindow::new(self.start_ms.or(self.start), self.end_ms.or(self.end))
    }

    /// Requested formats in order, each at most once.
    fn formats(&self) -> Vec<OutputFormat> {
        let mut formats = Vec::new();
        for format in &self.formats {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }
        formats
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    debug!("{:?}", cli);

    let window = cli.window()?;
    let client = TranscriptClient::new(Duration::from_secs(cli.timeout_secs))?;

    println!("Checking available transcripts...");
    let tracks = client.list_tracks(&cli.video_id)?;

    println!("\nAvailable transcripts:");
    for track in &tracks {
        println!("  - Language: {} ({})", track.language, track.language_code);
        println!("    Auto-generated: {}", track.is_generated);
    }

    println!("\nTrying to fetch '{}' subtitles...", cli.lang);
    let selection = transcript::select_track(&tracks, &cli.lang).ok_or_else(|| {
        SubclipError::Service("No transcripts are listed for this video".to_string())
    })?;
    if selection.fell_back {
        println!("'{}' not found, trying first available language...", cli.lang);
        warn!(
            "no '{}' track, falling back to '{}'",
            cli.lang, selection.track.language_code
        );
    }
    let track = selection.track;

    let mut doc = client
        .fetch_json3(track)
        .context("Failed to download JSON3 subtitles")?;

    let original_count = doc.events.len();
    doc.events = processor::clip_events(std::mem::take(&mut doc.events), &window);
    let clipped_count = doc.events.len();
    info!("kept {} of {} events", clipped_count, original_count);

    let written = serialiser::output_paths(&cli.formats(), &cli.output_filename);
    for (format, path) in &written {
        serialiser::serialise(&doc, *format, path)
            .context(format!("Failed to write '{}'", path.display()))?;
    }

    println!("\n✓ Subtitles saved successfully!");
    for (format, path) in &written {
        println!("  - {}: {}", format.label(), path.display());
    }
    if !window.is_unbounded() {
        let start_label = window
            .start_ms
            .map_or_else(|| "beginning".to_string(), |s| s.to_string());
        let end_label = window
            .end_ms
            .map_or_else(|| "end".to_string(), |e| e.to_string());
        println!("  - Time range: {}ms to {}ms", start_label, end_label);
        println!("  - Events kept: {}/{}", clipped_count, original_count);
    }
    println!("\nLanguage: {} ({})", track.language, track.language_code);
    println!("Auto-generated: {}", track.is_generated);

    Ok(())
}
