//! CLI-based converter using external per-platform scripts
//!
//! The production converter is a family of shell scripts laid out as
//! `{script_dir}/{platform}/lottie_to_{format}.sh`. The `(platform, format)`
//! table is resolved once at startup — unsupported hosts fail fast instead
//! of surfacing mid-job.

use super::traits::{ConvertRequest, Converter};
use crate::config::ConverterConfig;
use crate::error::{Error, Result};
use crate::types::OutputFormat;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Platforms the conversion scripts are shipped for
const SUPPORTED_PLATFORMS: &[&str] = &["linux_amd64", "windows_amd64"];

/// Identify the host as a `{os}_{arch}` platform key
///
/// # Errors
///
/// Returns [`Error::UnsupportedPlatform`] when no conversion scripts exist
/// for the host.
pub fn host_platform() -> Result<String> {
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        other => other,
    };
    let platform = format!("{}_{}", std::env::consts::OS, arch);
    if SUPPORTED_PLATFORMS.contains(&platform.as_str()) {
        Ok(platform)
    } else {
        Err(Error::UnsupportedPlatform(platform))
    }
}

/// Converter that shells out to the platform's conversion scripts
#[derive(Debug)]
pub struct CliConverter {
    scripts: HashMap<OutputFormat, PathBuf>,
    shell: PathBuf,
}

impl CliConverter {
    /// Resolve the script table for this host
    ///
    /// Scripts that do not exist on disk are left out of the table; asking
    /// for their format later fails with [`Error::UnsupportedFormat`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] when neither the config
    /// override nor the host maps to a shipped platform.
    pub fn resolve(config: &ConverterConfig) -> Result<Self> {
        let platform = match &config.platform {
            Some(p) if SUPPORTED_PLATFORMS.contains(&p.as_str()) => p.clone(),
            Some(p) => return Err(Error::UnsupportedPlatform(p.clone())),
            None => host_platform()?,
        };

        let platform_dir = config.script_dir.join(&platform);
        let mut scripts = HashMap::new();
        for format in OutputFormat::all() {
            let script = platform_dir.join(format!("lottie_to_{}.sh", format.as_str()));
            if script.is_file() {
                scripts.insert(format, script);
            } else {
                tracing::debug!(
                    format = %format,
                    script = %script.display(),
                    "conversion script not found, format disabled"
                );
            }
        }

        let shell = which::which("bash").unwrap_or_else(|_| PathBuf::from("bash"));
        Ok(Self { scripts, shell })
    }

    /// Script path for one output format
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] when no script was resolved for
    /// the format.
    pub fn script_for(&self, format: OutputFormat) -> Result<&Path> {
        self.scripts
            .get(&format)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::UnsupportedFormat(format.to_string()))
    }

    /// Build the script argument list for one request
    ///
    /// Quality is clamped to [1, 100]; width/height are omitted entirely
    /// when both are 0 so the script falls back to the source's native
    /// dimensions.
    fn build_args(script: &Path, request: &ConvertRequest) -> Vec<String> {
        let mut args = vec![
            script.display().to_string(),
            "--output".to_string(),
            request.output.display().to_string(),
        ];
        if !(request.width == 0 && request.height == 0) {
            args.push("--height".to_string());
            args.push(request.height.to_string());
            args.push("--width".to_string());
            args.push(request.width.to_string());
        }
        args.push("--fps".to_string());
        args.push(request.frame_rate.to_string());
        args.push("--quality".to_string());
        args.push(request.quality.clamp(1, 100).to_string());
        args.push(request.input.display().to_string());
        args
    }

    fn asset_id(request: &ConvertRequest) -> String {
        request
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.input.display().to_string())
    }
}

#[async_trait]
impl Converter for CliConverter {
    async fn convert(&self, request: &ConvertRequest) -> Result<()> {
        let script = self.script_for(request.format)?.to_path_buf();
        let args = Self::build_args(&script, request);
        let shell = self.shell.clone();
        let unique_id = Self::asset_id(request);

        tracing::debug!(
            script = %script.display(),
            input = %request.input.display(),
            output = %request.output.display(),
            "running conversion script"
        );

        // Blocking process invocation stays off the async scheduler.
        let id = unique_id.clone();
        let output = tokio::task::spawn_blocking(move || {
            Command::new(&shell).args(&args).output()
        })
        .await
        .map_err(|e| Error::Converter {
            unique_id: unique_id.clone(),
            reason: format!("conversion task panicked: {}", e),
        })?
        .map_err(|e| Error::Converter {
            unique_id: id.clone(),
            reason: format!("failed to spawn converter: {}", e),
        })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::Converter {
                unique_id: id,
                reason: format!(
                    "converter exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            })
        }
    }

    fn name(&self) -> &'static str {
        "cli-lottie"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn write_scripts(dir: &Path, platform: &str, formats: &[OutputFormat]) {
        let platform_dir = dir.join(platform);
        std::fs::create_dir_all(&platform_dir).unwrap();
        for format in formats {
            std::fs::write(
                platform_dir.join(format!("lottie_to_{}.sh", format.as_str())),
                "#!/bin/bash\nexit 0\n",
            )
            .unwrap();
        }
    }

    fn config_with(dir: &Path, platform: &str) -> ConverterConfig {
        ConverterConfig {
            script_dir: dir.to_path_buf(),
            source_extension: "tgs".into(),
            platform: Some(platform.to_string()),
        }
    }

    fn request(width: u32, height: u32, quality: u8) -> ConvertRequest {
        ConvertRequest {
            input: PathBuf::from("/ws/u1.tgs"),
            output: PathBuf::from("/ws/u1.gif"),
            width,
            height,
            frame_rate: 60,
            quality,
            format: OutputFormat::Gif,
        }
    }

    #[test]
    fn resolve_builds_table_for_present_scripts() {
        let dir = tempfile::tempdir().unwrap();
        write_scripts(
            dir.path(),
            "linux_amd64",
            &[OutputFormat::Gif, OutputFormat::Png],
        );
        let converter =
            CliConverter::resolve(&config_with(dir.path(), "linux_amd64")).unwrap();

        assert!(converter.script_for(OutputFormat::Gif).is_ok());
        assert!(converter.script_for(OutputFormat::Png).is_ok());
        assert!(matches!(
            converter.script_for(OutputFormat::Webp),
            Err(Error::UnsupportedFormat(f)) if f == "webp"
        ));
    }

    #[test]
    fn resolve_rejects_unknown_platform_override() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConverter::resolve(&config_with(dir.path(), "freebsd_arm")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform(p) if p == "freebsd_arm"));
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn host_platform_maps_x86_64_linux_to_linux_amd64() {
        assert_eq!(host_platform().unwrap(), "linux_amd64");
    }

    #[test]
    fn args_carry_explicit_dimensions() {
        let script = PathBuf::from("lib/linux_amd64/lottie_to_gif.sh");
        let args = CliConverter::build_args(&script, &request(512, 256, 90));
        let joined = args.join(" ");
        assert!(joined.contains("--height 256"));
        assert!(joined.contains("--width 512"));
        assert!(joined.contains("--fps 60"));
        assert!(joined.contains("--quality 90"));
        assert!(joined.ends_with("/ws/u1.tgs"), "input comes last: {joined}");
    }

    #[test]
    fn args_omit_dimensions_when_native() {
        let script = PathBuf::from("lib/linux_amd64/lottie_to_gif.sh");
        let args = CliConverter::build_args(&script, &request(0, 0, 90));
        let joined = args.join(" ");
        assert!(!joined.contains("--height"));
        assert!(!joined.contains("--width"));
    }

    #[test]
    fn args_clamp_quality_into_range() {
        let script = PathBuf::from("lib/linux_amd64/lottie_to_gif.sh");
        let low = CliConverter::build_args(&script, &request(0, 0, 0));
        assert!(low.join(" ").contains("--quality 1"));
        let high = CliConverter::build_args(&script, &request(0, 0, 255));
        assert!(high.join(" ").contains("--quality 100"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn convert_runs_script_and_reports_exit_status() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let platform_dir = dir.path().join("linux_amd64");
        std::fs::create_dir_all(&platform_dir).unwrap();

        // A script that succeeds and one that fails
        let ok_script = platform_dir.join("lottie_to_gif.sh");
        std::fs::write(&ok_script, "#!/bin/bash\nexit 0\n").unwrap();
        let fail_script = platform_dir.join("lottie_to_png.sh");
        std::fs::write(&fail_script, "#!/bin/bash\necho boom >&2\nexit 3\n").unwrap();
        for script in [&ok_script, &fail_script] {
            std::fs::set_permissions(script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let converter =
            CliConverter::resolve(&config_with(dir.path(), "linux_amd64")).unwrap();

        let ok = converter.convert(&request(0, 0, 90)).await;
        assert!(ok.is_ok());

        let mut png_request = request(0, 0, 90);
        png_request.format = OutputFormat::Png;
        let err = converter.convert(&png_request).await.unwrap_err();
        match err {
            Error::Converter { unique_id, reason } => {
                assert_eq!(unique_id, "u1");
                assert!(reason.contains("boom"), "stderr surfaced: {reason}");
            }
            other => panic!("expected Converter error, got {other:?}"),
        }
    }

    #[test]
    fn converter_name_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        write_scripts(dir.path(), "linux_amd64", &[OutputFormat::Gif]);
        let converter =
            CliConverter::resolve(&config_with(dir.path(), "linux_amd64")).unwrap();
        assert_eq!(converter.name(), "cli-lottie");
    }
}
