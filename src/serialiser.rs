use crate::caption::Caption;
use crate::json3::Json3Document;
use crate::processor;

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::debug;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The clipped JSON3 document
    Json3,
    /// Numbered SRT captions
    Srt,
    /// Plain text, one caption per line
    Txt,
}

impl OutputFormat {
    /// Where this format ends up given the requested output file.
    /// JSON3 uses the name verbatim, the others swap the extension.
    pub fn path_for(self, output: &Path) -> PathBuf {
        match self {
            OutputFormat::Json3 => output.to_path_buf(),
            OutputFormat::Srt => output.with_extension("srt"),
            OutputFormat::Txt => output.with_extension("txt"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Json3 => "JSON3 format",
            OutputFormat::Srt => "SRT format",
            OutputFormat::Txt => "Plain text",
        }
    }
}

/// Resolve the file each requested format is written to.
///
/// When another format already claims the requested name (`out.srt` with both
/// SRT and JSON3), JSON3 moves to the `json3` extension.
pub fn output_paths(formats: &[OutputFormat], output: &Path) -> Vec<(OutputFormat, PathBuf)> {
    let taken = |path: &Path| {
        formats
            .iter()
            .any(|f| *f != OutputFormat::Json3 && f.path_for(output) == path)
    };
    formats
        .iter()
        .map(|&format| {
            let mut path = format.path_for(output);
            if format == OutputFormat::Json3 && taken(path.as_path()) {
                path = output.with_extension("json3");
            }
            (format, path)
        })
        .collect()
}

/// Write `doc` to `output` in the given format.
///
/// The data goes to a temporary file next to `output` first and is renamed into
/// place once complete, so a failure never leaves a truncated file behind.
pub fn serialise(doc: &Json3Document, format: OutputFormat, output: &Path) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = temp_file_for(output, dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        match format {
            OutputFormat::Json3 => write_json3(&mut writer, doc)?,
            OutputFormat::Srt => write_srt(&mut writer, &processor::to_captions(&doc.events))?,
            OutputFormat::Txt => write_txt(&mut writer, &processor::to_captions(&doc.events))?,
        }
        writer.flush().context("Failed to write to output file.")?;
    }
    tmp.persist(output)
        .context(format!("Failed to save '{}'", output.display()))?;
    debug!("wrote {:?} to {}", format, output.display());
    Ok(())
}

/// A temporary file in `dir` carrying the permissions `output` should end up with:
/// those of the file being replaced, otherwise 0666 less the umask.
fn temp_file_for(output: &Path, dir: &Path) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let tmp = builder
        .tempfile_in(dir)
        .context(format!("Failed to create file in '{}'", dir.display()))?;
    if let Ok(meta) = std::fs::metadata(output) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .context(format!("Failed to copy permissions of '{}'", output.display()))?;
    }
    Ok(tmp)
}

fn write_json3<W: Write>(buf: &mut W, doc: &Json3Document) -> Result<()> {
    serde_json::to_writer_pretty(buf, doc).context("Failed to write JSON3 output.")?;
    Ok(())
}

fn write_srt<W: Write>(buf: &mut W, captions: &[Caption]) -> Result<()> {
    for caption in captions {
        writeln!(buf, "{}", caption.sequence_number)?;
        write_ts(buf, caption.show_at)?;
        write!(buf, " --> ")?;
        write_ts(buf, caption.hide_at)?;
        writeln!(buf)?;
        for line in &caption.text {
            writeln!(buf, "{}", line)?;
        }
        writeln!(buf)?;
    }
    Ok(())
}

fn write_txt<W: Write>(buf: &mut W, captions: &[Caption]) -> Result<()> {
    for caption in captions {
        writeln!(buf, "{}", caption.text.join(" "))?;
    }
    Ok(())
}

fn write_ts<W: Write>(buf: &mut W, timestamp: Duration) -> Result<()> {
    let total_secs = timestamp.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = timestamp.subsec_millis();
    write!(
        buf,
        "{:02}:{:02}:{:02},{:03}",
        hours, minutes, seconds, millis
    )?;
    Ok(())
}
