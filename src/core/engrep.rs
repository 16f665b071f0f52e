//! Ship-to-mesh pipeline behind `/engrep`.
//!
//! Reads the staged ship file, checks it against the reference lists, and hands the
//! surviving sockets to a [`MeshComposer`]. Every input problem becomes an
//! [`EngrepRejection`] with a fixed reply; only I/O trouble with the reference lists
//! and composer failures are returned as errors.

use crate::{
    config::settings::PathsConfig,
    core::{
        composer::{MeshComposer, MeshFile},
        reference::ValidationLists,
        scratch::sanitize_filename,
        ship::{self, UploadKind},
    },
    errors::Result,
};
use std::path::Path;
use tracing::{info, warn};

/// Why a conversion was refused before reaching the composer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngrepRejection {
    /// A `.fleet` file was uploaded
    FleetFile,
    /// A `.missile` file was uploaded
    MissileFile,
    /// The file is not a readable ship descriptor
    MalformedShip,
    /// The hull type is not in the hull list
    UnknownHull(String),
}

impl EngrepRejection {
    /// Message shown to the user
    #[must_use]
    pub const fn reply(&self) -> &'static str {
        match self {
            Self::FleetFile => "Sorry sir thats above my pay grade",
            Self::MissileFile => "Sorry sir thats not my area of expertise",
            Self::MalformedShip => "Sorry sir I couldnt make sense of that ship file",
            Self::UnknownHull(_) => "Sorry sir I havent worked with that hull before",
        }
    }

    /// Reason written to the command log after `engrep - `
    #[must_use]
    pub const fn log_reason(&self) -> &'static str {
        match self {
            Self::FleetFile => ".fleet file",
            Self::MissileFile => ".missile file",
            Self::MalformedShip => "malformed ship file",
            Self::UnknownHull(_) => "invalid hull type",
        }
    }
}

/// Result of a conversion attempt
#[derive(Debug)]
pub enum EngrepOutcome {
    /// The composed mesh, ready to upload
    Mesh(MeshFile),
    /// The request was refused
    Rejected(EngrepRejection),
}

/// Checks the upload's name before anything is downloaded.
#[must_use]
pub fn check_upload(filename: &str) -> Option<EngrepRejection> {
    match UploadKind::classify(filename) {
        UploadKind::Fleet => Some(EngrepRejection::FleetFile),
        UploadKind::Missile => Some(EngrepRejection::MissileFile),
        UploadKind::Ship => None,
    }
}

/// Runs the pipeline on a staged ship file, writing `<hull name>.stl` into `work_dir`.
///
/// The staged file keeps the upload's name, so disallowed extensions are refused
/// here too and never reach the composer.
///
/// # Errors
/// Returns an error if the ship file or a reference list cannot be read, or if the
/// composer fails. Input problems are reported as `EngrepOutcome::Rejected` instead.
pub async fn run_engrep<C: MeshComposer>(
    paths: &PathsConfig,
    composer: &C,
    ship_path: &Path,
    work_dir: &Path,
) -> Result<EngrepOutcome> {
    let staged_name = ship_path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    if let Some(rejection) = check_upload(&staged_name) {
        return Ok(EngrepOutcome::Rejected(rejection));
    }

    let descriptor = match ship::read_ship_file(ship_path).await {
        Ok(descriptor) => descriptor,
        Err(e) if e.is_malformed() => {
            warn!("Rejecting ship file: {}", e);
            return Ok(EngrepOutcome::Rejected(EngrepRejection::MalformedShip));
        }
        Err(e) => return Err(e.into()),
    };

    let lists = ValidationLists::load(&paths.hulls_file, &paths.components_file).await?;
    if !lists.is_known_hull(&descriptor.hull_type) {
        info!(hull_type = %descriptor.hull_type, "Unknown hull type");
        return Ok(EngrepOutcome::Rejected(EngrepRejection::UnknownHull(
            descriptor.hull_type,
        )));
    }

    let sockets = lists.retain_known(descriptor.sockets);
    // Hull types look like "Stock/Raines Frigate"; the mesh is named after the last part.
    let output_path = work_dir.join(format!("{}.stl", sanitize_filename(&descriptor.hull_type)));
    let mesh = composer
        .compose(&descriptor.hull_type, &sockets, &output_path)
        .await?;
    Ok(EngrepOutcome::Mesh(mesh))
}
