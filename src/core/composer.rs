//! Mesh composer - turns a validated ship into a single STL file.
//!
//! Composition itself happens inside Blender. [`BlenderComposer`] writes a JSON
//! manifest and a small driver script into the output's scratch directory, runs
//! Blender headless on the script, and removes both files once the process exits.
//! Callers only see the [`MeshComposer`] trait, so the subprocess mechanism can be
//! swapped (or faked in tests) without touching the command layer.

use crate::core::ship::Socket;
use serde::Serialize;
use std::{
    future::Future,
    path::{Path, PathBuf},
    process::Stdio,
};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Driver script run by Blender; `__MANIFEST_PATH__` is replaced before writing.
const SCRIPT_TEMPLATE: &str = include_str!("compose_mesh.py");
const MANIFEST_PLACEHOLDER: &str = "__MANIFEST_PATH__";

const SCRIPT_FILE_NAME: &str = "compose_mesh.py";
const MANIFEST_FILE_NAME: &str = "compose_manifest.json";

/// Rotations applied to every placed component, in order, after it takes the socket
/// anchor's transform. Component assets are authored with a different up/forward axis
/// than the anchors: 90 degrees about X, then 180 degrees about Y.
pub const CORRECTIVE_ROTATIONS: [(&str, f64); 2] = [
    ("X", std::f64::consts::FRAC_PI_2),
    ("Y", std::f64::consts::PI),
];

/// Lines of Blender stderr kept in a failure report
const STDERR_TAIL_LINES: usize = 20;

/// Failures of a composition run
#[derive(Debug, Error)]
pub enum ComposerError {
    /// No `<hull>.blend` scene in the assets directory
    #[error("no scene for hull at {}", path.display())]
    MissingHullScene {
        /// Where the scene was expected
        path: PathBuf,
    },

    /// Writing or removing the driver files failed
    #[error("driver file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest could not be serialized
    #[error("could not serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// The tool could not be started
    #[error("could not start {}: {source}", binary.display())]
    Spawn {
        /// Executable that failed to start
        binary: PathBuf,
        /// Underlying spawn error
        source: std::io::Error,
    },

    /// The tool exited unsuccessfully
    #[error("Blender exited with {status}: {stderr}")]
    ToolFailed {
        /// Exit status as reported by the OS
        status: String,
        /// Tail of the tool's stderr
        stderr: String,
    },

    /// The tool exited successfully but wrote nothing
    #[error("Blender finished but produced no mesh at {}", path.display())]
    MissingOutput {
        /// Expected output path
        path: PathBuf,
    },
}

/// A composed mesh on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshFile {
    /// Location of the exported STL
    pub path: PathBuf,
}

/// Anything that can compose a hull and its components into one mesh file.
pub trait MeshComposer: Send + Sync {
    /// Composes `sockets` onto the hull scene for `hull_type` and writes the result to
    /// `output_path`. `sockets` have already been filtered to known components.
    fn compose(
        &self,
        hull_type: &str,
        sockets: &[Socket],
        output_path: &Path,
    ) -> impl Future<Output = Result<MeshFile, ComposerError>> + Send;
}

#[derive(Debug, Serialize)]
struct ManifestSocket<'a> {
    key: &'a str,
    component: &'a str,
    asset: PathBuf,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    hull_scene: PathBuf,
    sockets: Vec<ManifestSocket<'a>>,
    corrective_rotations: &'static [(&'static str, f64)],
    output: PathBuf,
}

/// Drives Blender in batch mode
#[derive(Debug, Clone)]
pub struct BlenderComposer {
    binary: PathBuf,
    assets_dir: PathBuf,
}

impl BlenderComposer {
    /// `binary` is the Blender executable, `assets_dir` holds `<hull>.blend` scenes
    /// and `<component>.blend` assets.
    pub fn new(binary: impl Into<PathBuf>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            assets_dir: assets_dir.into(),
        }
    }

    /// Path of the scene file for a hull type
    #[must_use]
    pub fn hull_scene_path(&self, hull_type: &str) -> PathBuf {
        self.assets_dir.join(format!("{hull_type}.blend"))
    }

    /// Path of the asset file for a component
    #[must_use]
    pub fn component_asset_path(&self, component: &str) -> PathBuf {
        self.assets_dir.join(format!("{component}.blend"))
    }

    fn build_manifest<'a>(
        &self,
        hull_scene: &Path,
        sockets: &'a [Socket],
        output_path: &Path,
    ) -> std::io::Result<Manifest<'a>> {
        let sockets = sockets
            .iter()
            .map(|socket| {
                let asset = std::path::absolute(self.component_asset_path(&socket.component))?;
                if !asset.exists() {
                    warn!(
                        component = %socket.component,
                        "Component asset missing, Blender will skip it"
                    );
                }
                Ok(ManifestSocket {
                    key: &socket.key,
                    component: &socket.component,
                    asset,
                })
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        Ok(Manifest {
            hull_scene: std::path::absolute(hull_scene)?,
            sockets,
            corrective_rotations: &CORRECTIVE_ROTATIONS,
            output: std::path::absolute(output_path)?,
        })
    }

    async fn run_tool(&self, script_path: &Path) -> Result<(), ComposerError> {
        info!(binary = %self.binary.display(), "Running Blender");
        let output = Command::new(&self.binary)
            .arg("--background")
            .arg("--factory-startup")
            .arg("--python-exit-code")
            .arg("1")
            .arg("--python")
            .arg(script_path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ComposerError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!(target: "blender", "{line}");
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(ComposerError::ToolFailed {
                status: output.status.to_string(),
                stderr: tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_LINES),
            })
        }
    }
}

impl MeshComposer for BlenderComposer {
    async fn compose(
        &self,
        hull_type: &str,
        sockets: &[Socket],
        output_path: &Path,
    ) -> Result<MeshFile, ComposerError> {
        let hull_scene = self.hull_scene_path(hull_type);
        if !hull_scene.exists() {
            return Err(ComposerError::MissingHullScene { path: hull_scene });
        }

        let work_dir = output_path.parent().unwrap_or_else(|| Path::new("."));
        let script_path = work_dir.join(SCRIPT_FILE_NAME);
        let manifest_path = work_dir.join(MANIFEST_FILE_NAME);

        let manifest = self.build_manifest(&hull_scene, sockets, output_path)?;
        tokio::fs::write(&manifest_path, serde_json::to_vec(&manifest)?).await?;
        let script = render_script(&std::path::absolute(&manifest_path)?)?;
        tokio::fs::write(&script_path, script).await?;

        let result = self.run_tool(&script_path).await;

        for driver_file in [&script_path, &manifest_path] {
            if let Err(e) = tokio::fs::remove_file(driver_file).await {
                warn!("Failed to remove {}: {}", driver_file.display(), e);
            }
        }
        result?;

        if !output_path.exists() {
            return Err(ComposerError::MissingOutput {
                path: output_path.to_path_buf(),
            });
        }

        info!(hull_type, sockets = sockets.len(), "Mesh composed");
        Ok(MeshFile {
            path: output_path.to_path_buf(),
        })
    }
}

/// Fills the script template with the manifest location as a Python string literal.
fn render_script(manifest_path: &Path) -> Result<String, ComposerError> {
    // A JSON string literal is also a valid Python string literal.
    let literal = serde_json::to_string(manifest_path)?;
    Ok(SCRIPT_TEMPLATE.replace(MANIFEST_PLACEHOLDER, &literal))
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn assets_with_hull(hull: &str) -> tempfile::TempDir {
        let assets = tempfile::tempdir().unwrap();
        std::fs::write(assets.path().join(format!("{hull}.blend")), b"BLENDER").unwrap();
        assets
    }

    fn driver_files_removed(work: &Path) -> bool {
        !work.join(SCRIPT_FILE_NAME).exists() && !work.join(MANIFEST_FILE_NAME).exists()
    }

    #[test]
    fn test_render_script_embeds_manifest_literal() {
        let script = render_script(Path::new("/tmp/scratch \"x\"/compose_manifest.json")).unwrap();
        assert!(!script.contains(MANIFEST_PLACEHOLDER));
        assert!(script.contains(r#"MANIFEST_PATH = "/tmp/scratch \"x\"/compose_manifest.json""#));
        assert!(script.contains("bpy.ops.export_mesh.stl"));
    }

    #[test]
    fn test_manifest_contents() {
        let assets = assets_with_hull("Raines");
        std::fs::write(assets.path().join("Bulkhead.blend"), b"BLENDER").unwrap();
        let composer = BlenderComposer::new("blender", assets.path());
        let sockets = vec![Socket::new("anchor-1", "Bulkhead"), Socket::new("anchor-2", "Gone")];

        let manifest = composer
            .build_manifest(
                &composer.hull_scene_path("Raines"),
                &sockets,
                Path::new("/tmp/out/Raines.stl"),
            )
            .unwrap();
        let json: serde_json::Value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(json["sockets"].as_array().unwrap().len(), 2);
        assert_eq!(json["sockets"][0]["key"], "anchor-1");
        assert_eq!(json["sockets"][1]["component"], "Gone");
        assert!(
            json["sockets"][0]["asset"]
                .as_str()
                .unwrap()
                .ends_with("Bulkhead.blend")
        );
        assert_eq!(json["corrective_rotations"][0][0], "X");
        assert_eq!(json["corrective_rotations"][1][0], "Y");
        assert_eq!(json["output"], "/tmp/out/Raines.stl");
    }

    #[tokio::test]
    async fn test_missing_hull_scene_skips_tool() {
        let assets = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let composer = BlenderComposer::new("/nonexistent/blender", assets.path());

        let err = composer
            .compose("Raines", &[], &work.path().join("Raines.stl"))
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::MissingHullScene { .. }));
        assert!(driver_files_removed(work.path()));
    }

    #[tokio::test]
    async fn test_failing_tool_is_fatal_and_cleans_up() {
        let assets = assets_with_hull("Raines");
        let work = tempfile::tempdir().unwrap();
        let composer = BlenderComposer::new("false", assets.path());

        let err = composer
            .compose("Raines", &[Socket::new("a", "b")], &work.path().join("Raines.stl"))
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::ToolFailed { .. }));
        assert!(driver_files_removed(work.path()));
    }

    #[tokio::test]
    async fn test_tool_without_output_is_error() {
        let assets = assets_with_hull("Raines");
        let work = tempfile::tempdir().unwrap();
        let composer = BlenderComposer::new("true", assets.path());

        let err = composer
            .compose("Raines", &[], &work.path().join("Raines.stl"))
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::MissingOutput { .. }));
        assert!(driver_files_removed(work.path()));
    }

    #[tokio::test]
    async fn test_unstartable_tool_is_spawn_error() {
        let assets = assets_with_hull("Raines");
        let work = tempfile::tempdir().unwrap();
        let composer = BlenderComposer::new("/nonexistent/blender", assets.path());

        let err = composer
            .compose("Raines", &[], &work.path().join("Raines.stl"))
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::Spawn { .. }));
        assert!(driver_files_removed(work.path()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_returns_mesh() {
        use std::os::unix::fs::PermissionsExt;

        let assets = assets_with_hull("Raines");
        let work = tempfile::tempdir().unwrap();

        // Stand-in for Blender: writes an STL to the manifest's output path.
        let fake = assets.path().join("fake-blender.sh");
        std::fs::write(
            &fake,
            "#!/bin/sh\n\
             dir=$(dirname \"$6\")\n\
             out=$(sed -n 's/.*\"output\":\"\\([^\"]*\\)\".*/\\1/p' \"$dir/compose_manifest.json\")\n\
             printf 'solid composed\\nendsolid composed\\n' > \"$out\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let composer = BlenderComposer::new(&fake, assets.path());
        let output = work.path().join("Raines.stl");
        let mesh = composer.compose("Raines", &[], &output).await.unwrap();

        assert_eq!(mesh.path, output);
        assert!(output.exists());
        assert!(driver_files_removed(work.path()));
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\nd", 2), "c\nd");
        assert_eq!(tail("a", 5), "a");
    }
}
