use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::{Path, PathBuf};

/// invigilate: watch a process' memory for banned words
///
/// Scans the readable memory of a running process for the configured banned
/// words. Every word found is logged once per process, together with the
/// bytes around it, and the process' nice value is raised by one.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Process to invigilate.
    #[arg(short, long, value_parser = validate_pid)]
    pub pid: i32,

    /// Path to configuration file.
    ///
    /// If not provided, the default locations are checked. They are
    /// `/etc/invigilate/config.toml` and `/etc/invigilate/config.d/*.toml`,
    /// where the latter being a glob pattern. If they don't exist, the default
    /// configuration is used.
    #[arg(short, long, value_parser = validate_file)]
    pub config: Option<PathBuf>,

    /// Comma separated banned words, overriding `[words].list`.
    #[arg(short, long)]
    pub words: Option<String>,

    /// Start of a single range to scan. Decimal or `0x` prefixed hex.
    #[arg(long, value_parser = parse_address, requires = "size")]
    pub addr: Option<u64>,

    /// Length of the range started at `--addr`.
    #[arg(long, value_parser = parse_address, requires = "addr")]
    pub size: Option<u64>,

    /// Keep auditing every `[scan].interval` until interrupted.
    #[arg(long, conflicts_with = "addr")]
    pub watch: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

impl Cli {
    /// The single range requested on the command line, if any.
    pub fn range(&self) -> Option<(u64, u64)> {
        self.addr.zip(self.size)
    }
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}

#[inline(always)]
fn validate_pid(pid: &str) -> Result<i32, String> {
    let pid: i32 = pid
        .parse()
        .map_err(|_| format!("`{pid}` is not a valid process id"))?;
    if pid > 0 {
        Ok(pid)
    } else {
        Err("Process id must be positive".to_string())
    }
}

fn parse_address(value: &str) -> Result<u64, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| format!("`{value}` is not a valid address"))
}
