//! Where assembled audio goes when the user presses Play.

use std::path::{Path, PathBuf};

use tracing::info;
use tts_core::AudioFormat;

pub trait AudioSink: Send {
    fn play(&mut self, audio: &[u8], format: AudioFormat) -> anyhow::Result<()>;
}

/// Writes each played reply to `<dir>/reply-NNN.<ext>`.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    played: usize,
    last: Option<PathBuf>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            played: 0,
            last: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn last_path(&self) -> Option<&Path> {
        self.last.as_deref()
    }
}

impl AudioSink for FileSink {
    fn play(&mut self, audio: &[u8], format: AudioFormat) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        self.played += 1;
        let path = self
            .dir
            .join(format!("reply-{:03}.{}", self.played, format.file_extension()));
        std::fs::write(&path, audio)?;
        info!(
            path = %path.display(),
            bytes = audio.len(),
            mime = format.mime_type(),
            "Audio written"
        );
        self.last = Some(path);
        Ok(())
    }
}

/// Collects played audio in memory.
impl AudioSink for Vec<Vec<u8>> {
    fn play(&mut self, audio: &[u8], _format: AudioFormat) -> anyhow::Result<()> {
        self.push(audio.to_vec());
        Ok(())
    }
}
