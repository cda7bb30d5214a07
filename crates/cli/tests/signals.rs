#![forbid(unsafe_code)]

#[cfg(unix)]
mod unix {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use std::fs;
    use std::io;
    use std::path::Path;
    use std::process::{Child, Command, Output, Stdio};
    use std::thread::sleep;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    /// A process that sits still long enough to be invigilated.
    fn spawn_target() -> io::Result<Child> {
        Command::new("sleep")
            .arg("30")
            .env("LC_ALL", "C")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
    }

    fn invigilate(config: &Path, target: &Child, extra: &[&str]) -> io::Result<Child> {
        Command::new(env!("CARGO_BIN_EXE_invigilate"))
            .arg("--config")
            .arg(config)
            .arg("--pid")
            .arg(target.id().to_string())
            .args(extra)
            .arg("-v")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }

    #[test]
    fn sigterm_stops_watch_mode() -> io::Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.toml");
        write_config(&config_path)?;
        let mut target = spawn_target()?;

        let child = invigilate(&config_path, &target, &["--watch"])?;
        sleep(Duration::from_millis(500));
        kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).ok();
        let output = wait_for_output(child)?;
        let _ = target.kill();

        let combined = combined(&output);
        assert!(output.status.success(), "{combined}");
        assert!(combined.contains("audit finished"));
        assert!(
            combined.contains("shutdown requested") || combined.contains("audit interrupted")
        );
        Ok(())
    }

    #[test]
    fn one_shot_audit_exits_on_its_own() -> io::Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.toml");
        write_config(&config_path)?;
        let mut target = spawn_target()?;

        let child = invigilate(&config_path, &target, &["--words", "kernel,panic"])?;
        let output = wait_for_output(child)?;
        let _ = target.kill();

        let combined = combined(&output);
        assert!(output.status.success(), "{combined}");
        assert!(combined.contains("banned words installed"));
        assert!(combined.contains("audit finished"));
        Ok(())
    }

    #[test]
    fn missing_process_is_an_error() -> io::Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.toml");
        write_config(&config_path)?;

        let output = Command::new(env!("CARGO_BIN_EXE_invigilate"))
            .arg("--config")
            .arg(&config_path)
            .args(["--pid", &i32::MAX.to_string()])
            .output()?;
        assert!(!output.status.success());
        assert!(combined(&output).contains("failed to attach"));
        Ok(())
    }

    fn write_config(path: &Path) -> io::Result<()> {
        let contents = "[words]\nlist = \"kernel,panic\"\n\n\
[report]\nbefore = 8\nafter = 8\n\n\
[scan]\ninterval = 1\n";
        fs::write(path, contents)
    }

    fn combined(output: &Output) -> String {
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        combined
    }

    fn wait_for_output(mut child: Child) -> io::Result<Output> {
        let start = Instant::now();
        loop {
            if child.try_wait()?.is_some() {
                break;
            }
            if start.elapsed() > Duration::from_secs(10) {
                let _ = child.kill();
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "invigilate process did not exit",
                ));
            }
            sleep(Duration::from_millis(50));
        }
        child.wait_with_output()
    }
}
