//! pshtt prober
//!
//! Runs `pshtt --json --timeout <secs> <domain>` and parses the single
//! result object it prints. No retries: any failure is returned as-is.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use stn_core::{ProbeResult, DEFAULT_TIMEOUT_SECS};

use crate::{ProbeError, Prober};

/// pshtt invocation settings
#[derive(Debug, Clone)]
pub struct PshttConfig {
    /// Program to run
    pub program: String,
    /// Per-request timeout handed to pshtt
    pub timeout_secs: u64,
    /// Wall-clock limit for the whole process
    pub deadline_secs: u64,
}

impl Default for PshttConfig {
    fn default() -> Self {
        Self {
            program: "pshtt".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            deadline_secs: 300,
        }
    }
}

impl PshttConfig {
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_deadline(mut self, secs: u64) -> Self {
        self.deadline_secs = secs;
        self
    }
}

/// Prober backed by the pshtt command-line tool
#[derive(Debug, Clone, Default)]
pub struct PshttProber {
    config: PshttConfig,
}

impl PshttProber {
    pub fn new(config: PshttConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PshttConfig {
        &self.config
    }

    fn command(&self, domain: &str) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("--json")
            .arg("--timeout")
            .arg(self.config.timeout_secs.to_string())
            .arg(domain)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Check that the tool runs `--version` cleanly; returns its version line
    pub async fn check(&self) -> Result<String, ProbeError> {
        let output = Command::new(&self.config.program)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Launch {
                program: self.config.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Unusable {
                program: self.config.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl Prober for PshttProber {
    async fn probe(&self, domain: &str) -> Result<ProbeResult, ProbeError> {
        debug!("Running {} for {}", self.config.program, domain);

        let deadline = Duration::from_secs(self.config.deadline_secs);
        let output = tokio::time::timeout(deadline, self.command(domain).output())
            .await
            .map_err(|_| ProbeError::TimedOut {
                domain: domain.to_string(),
                secs: self.config.deadline_secs,
            })?
            .map_err(|source| ProbeError::Launch {
                program: self.config.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            warn!("{} exited with {} for {}", self.config.program, output.status, domain);
            return Err(ProbeError::Exit {
                domain: domain.to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }

        let mut result = parse_pshtt_output(&stdout)?;
        result.stdout = stdout;
        result.stderr = stderr;
        Ok(result)
    }

    fn name(&self) -> &str {
        "pshtt"
    }
}

/// Parse pshtt's `--json` output: an array holding exactly one object
pub fn parse_pshtt_output(stdout: &str) -> Result<ProbeResult, ProbeError> {
    let mut values: Vec<serde_json::Value> = serde_json::from_str(stdout)?;

    if values.len() != 1 {
        return Err(ProbeError::Shape(values.len()));
    }

    Ok(serde_json::from_value(values.remove(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const PSHTT_OUTPUT: &str = r#"[
        {
            "Domain": "example.com",
            "Base Domain": "example.com",
            "Canonical URL": "https://example.com",
            "Live": true,
            "Redirect": false,
            "Valid HTTPS": true,
            "Defaults to HTTPS": true,
            "Downgrades HTTPS": false,
            "Strictly Forces HTTPS": true,
            "HTTPS Bad Chain": false,
            "HSTS": true,
            "HSTS Header": "max-age=31536000; includeSubDomains; preload",
            "HSTS Max Age": 31536000,
            "HSTS Entire Domain": true,
            "HSTS Preload Ready": true,
            "HSTS Preload Pending": false,
            "HSTS Preloaded": false,
            "endpoints": {
                "https": {"headers": {"Strict-Transport-Security": "max-age=31536000"}, "url": "https://example.com"},
                "httpswww": {"headers": {}, "url": "https://www.example.com"},
                "http": {"headers": {}, "url": "http://example.com"},
                "httpwww": {"headers": {}, "url": "http://www.example.com"}
            }
        }
    ]"#;

    #[test]
    fn test_parse_pshtt_output() {
        let result = parse_pshtt_output(PSHTT_OUTPUT).unwrap();
        assert!(result.valid_https);
        assert!(result.hsts_entire_domain);
        assert!(!result.hsts_preloaded);
        assert_eq!(result.endpoints.len(), 4);
    }

    #[test]
    fn test_parse_rejects_empty_array() {
        assert!(matches!(parse_pshtt_output("[]"), Err(ProbeError::Shape(0))));
    }

    #[test]
    fn test_parse_rejects_bare_object() {
        assert!(matches!(
            parse_pshtt_output(r#"{"Live": true}"#),
            Err(ProbeError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_pshtt_output(""), Err(ProbeError::Parse(_))));
        assert!(matches!(
            parse_pshtt_output("Traceback (most recent call last):"),
            Err(ProbeError::Parse(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = PshttConfig::default();
        assert_eq!(config.program, "pshtt");
        assert_eq!(config.timeout_secs, 5);
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_launch() {
        let prober = PshttProber::new(
            PshttConfig::default().with_program("/nonexistent/stn-pshtt-missing"),
        );
        let result = prober.probe("example.com").await;
        assert!(matches!(result, Err(ProbeError::Launch { .. })));
        assert!(matches!(prober.check().await, Err(ProbeError::Launch { .. })));
    }

    #[cfg(unix)]
    mod fake_tool {
        use super::*;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, body: &str) -> String {
            let path = dir.path().join("fake-pshtt");
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "#!/bin/sh").unwrap();
            writeln!(file, "{}", body).unwrap();
            drop(file);
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[tokio::test]
        async fn test_probe_success_keeps_raw_output() {
            let dir = TempDir::new().unwrap();
            let json_path = dir.path().join("out.json");
            std::fs::write(&json_path, PSHTT_OUTPUT).unwrap();
            let program = script(
                &dir,
                &format!("cat '{}'\necho 'note' >&2", json_path.display()),
            );

            let prober = PshttProber::new(PshttConfig::default().with_program(&program));
            let result = prober.probe("example.com").await.unwrap();
            assert!(result.defaults_to_https);
            assert!(result.stdout.contains("\"Domain\": \"example.com\""));
            assert_eq!(result.stderr.trim(), "note");
        }

        #[tokio::test]
        async fn test_probe_passes_timeout_and_domain() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "echo \"$@\" >&2\nexit 3");

            let prober = PshttProber::new(PshttConfig::default().with_program(&program));
            match prober.probe("example.com").await {
                Err(ProbeError::Exit { stderr, .. }) => {
                    assert_eq!(stderr.trim(), "--json --timeout 5 example.com");
                }
                other => panic!("expected exit error, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_check_reports_version() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "[ \"$1\" = --version ] && echo 'v0.6.10'");

            let prober = PshttProber::new(PshttConfig::default().with_program(&program));
            assert_eq!(prober.check().await.unwrap(), "v0.6.10");
        }

        #[tokio::test]
        async fn test_check_rejects_failing_tool() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "echo 'ModuleNotFoundError: pshtt' >&2\nexit 1");

            let prober = PshttProber::new(PshttConfig::default().with_program(&program));
            match prober.check().await {
                Err(ProbeError::Unusable { stderr, .. }) => {
                    assert_eq!(stderr, "ModuleNotFoundError: pshtt");
                }
                other => panic!("expected unusable error, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_probe_deadline() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "sleep 5");

            let prober = PshttProber::new(
                PshttConfig::default().with_program(&program).with_deadline(1),
            );
            let result = prober.probe("example.com").await;
            assert!(matches!(result, Err(ProbeError::TimedOut { secs: 1, .. })));
        }

        #[tokio::test]
        async fn test_probe_unparseable_output() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "echo 'not json'");

            let prober = PshttProber::new(PshttConfig::default().with_program(&program));
            let result = prober.probe("example.com").await;
            assert!(matches!(result, Err(ProbeError::Parse(_))));
        }
    }
}
