use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use crate::settings::CONFIG_FILE;
use crate::telemetry::TIMINGS_FILE;

#[derive(Parser, Debug)]
#[command(name = "bezi-bridge", version, about = "Send a prompt to Bezi and print its reply")]
pub struct Cli {
    /// Prompt or file path
    pub prompt: Option<String>,

    /// Full path to Bezi.exe
    #[arg(short = 'b', long = "bezi_path")]
    pub bezi_path: Option<String>,

    /// Init session
    #[arg(short, long)]
    pub init: bool,

    /// Enable console trace
    #[arg(short, long)]
    pub debug: bool,

    /// Session config file
    #[arg(long, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory holding ref_busy.png, ref_ready.png and ref_ready_active.png
    #[arg(long, default_value = ".")]
    pub refs: PathBuf,

    /// Locate the state indicator by this automation id instead of its 56x56 size
    #[arg(long)]
    pub indicator_id: Option<String>,

    /// CSV file that receives call timings
    #[arg(long, default_value = TIMINGS_FILE)]
    pub timings: PathBuf,
}

impl Cli {
    /// The prompt text: file contents when the argument names an existing file,
    /// else the argument itself
    pub fn resolve_prompt(&self) -> Result<Option<String>> {
        let Some(arg) = self.prompt.as_deref() else {
            return Ok(None);
        };
        let path = Path::new(arg);
        if path.is_file() {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read prompt file {}", path.display()))?;
            Ok(Some(text))
        } else {
            Ok(Some(arg.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_short_and_long_flags() {
        let cli = Cli::parse_from(["bezi-bridge", "Hello", "-b", r"C:\Bezi.exe", "-d"]);
        assert_eq!(cli.prompt.as_deref(), Some("Hello"));
        assert_eq!(cli.bezi_path.as_deref(), Some(r"C:\Bezi.exe"));
        assert!(cli.debug);
        assert!(!cli.init);
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
        assert_eq!(cli.timings, PathBuf::from(TIMINGS_FILE));
        assert!(cli.indicator_id.is_none());
    }

    #[test]
    fn init_needs_no_prompt() {
        let cli = Cli::parse_from(["bezi-bridge", "--init", "--bezi_path", "x.exe"]);
        assert!(cli.init);
        assert!(cli.prompt.is_none());
        assert_eq!(cli.resolve_prompt().unwrap(), None);
    }

    #[test]
    fn literal_prompt_is_used_as_is() {
        let cli = Cli::parse_from(["bezi-bridge", "make the cube red"]);
        assert_eq!(cli.resolve_prompt().unwrap().as_deref(), Some("make the cube red"));
    }

    #[test]
    fn prompt_file_contents_are_read() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "line one\nline two").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cli = Cli::parse_from(["bezi-bridge", path.as_str()]);
        assert_eq!(
            cli.resolve_prompt().unwrap().as_deref(),
            Some("line one\nline two")
        );
    }
}
