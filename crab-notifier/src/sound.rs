//! Notification sound
//!
//! Playback is fire-and-forget: `play` must return immediately and a
//! failure never affects the caller beyond a log line.

use std::io::Write;
use std::process::Stdio;
use thiserror::Error;

/// Sound playback error
#[derive(Debug, Error)]
pub enum SoundError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("terminal bell failed: {0}")]
    Bell(#[source] std::io::Error),
}

/// Something that can ring for a new order
pub trait SoundPlayer: Send + 'static {
    fn play(&self) -> Result<(), SoundError>;
}

/// ASCII BEL on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl SoundPlayer for TerminalBell {
    fn play(&self) -> Result<(), SoundError> {
        let mut out = std::io::stdout().lock();
        out.write_all(b"\x07").map_err(SoundError::Bell)?;
        out.flush().map_err(SoundError::Bell)
    }
}

/// External player, e.g. `paplay /usr/share/sounds/freedesktop/stereo/bell.oga`
#[derive(Debug, Clone)]
pub struct CommandSound {
    program: String,
    args: Vec<String>,
}

impl CommandSound {
    /// Build from a split command line; `None` when empty
    pub fn from_parts(parts: &[String]) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl SoundPlayer for CommandSound {
    /// Must be called from within a tokio runtime
    fn play(&self) -> Result<(), SoundError> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| SoundError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let program = self.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    tracing::debug!(%program, %status, "Sound command exited with failure");
                }
                Err(e) => tracing::debug!(%program, "Sound command wait failed: {e}"),
                _ => {}
            }
        });
        Ok(())
    }
}

impl SoundPlayer for Box<dyn SoundPlayer> {
    fn play(&self) -> Result<(), SoundError> {
        (**self).play()
    }
}

/// Pick the configured player, falling back to the terminal bell
pub fn from_config(command: Option<&[String]>) -> Box<dyn SoundPlayer> {
    match command.and_then(CommandSound::from_parts) {
        Some(sound) => Box::new(sound),
        None => Box::new(TerminalBell),
    }
}
