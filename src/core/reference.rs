//! Validation filter for ship descriptors.
//!
//! Two flat newline-delimited files list the hull types and component names the bot
//! has assets for. An unknown hull aborts the conversion; an unknown component is
//! dropped and the rest of the ship is still composed.

use crate::{core::ship::Socket, errors::Result};
use std::{collections::HashSet, path::Path};
use tracing::debug;

/// Known hull types and component names
#[derive(Debug, Clone, Default)]
pub struct ValidationLists {
    hulls: HashSet<String>,
    components: HashSet<String>,
}

fn parse_list(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

impl ValidationLists {
    /// Builds lists from file contents.
    #[must_use]
    pub fn parse(hulls: &str, components: &str) -> Self {
        Self {
            hulls: parse_list(hulls),
            components: parse_list(components),
        }
    }

    /// Reads both reference files. Called on every conversion, never cached.
    ///
    /// # Errors
    /// Returns an I/O error if either file cannot be read.
    pub async fn load(hulls_path: &Path, components_path: &Path) -> Result<Self> {
        let hulls = tokio::fs::read_to_string(hulls_path).await?;
        let components = tokio::fs::read_to_string(components_path).await?;
        Ok(Self::parse(&hulls, &components))
    }

    /// Whether the hull type has a scene
    #[must_use]
    pub fn is_known_hull(&self, hull_type: &str) -> bool {
        self.hulls.contains(hull_type)
    }

    /// Whether the component has an asset
    #[must_use]
    pub fn is_known_component(&self, component: &str) -> bool {
        self.components.contains(component)
    }

    /// Keeps sockets whose component is known, preserving order.
    #[must_use]
    pub fn retain_known(&self, sockets: Vec<Socket>) -> Vec<Socket> {
        let total = sockets.len();
        let kept: Vec<Socket> = sockets
            .into_iter()
            .filter(|socket| self.is_known_component(&socket.component))
            .collect();
        if kept.len() < total {
            debug!(
                dropped = total - kept.len(),
                kept = kept.len(),
                "Skipping sockets with unknown components"
            );
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn lists() -> ValidationLists {
        ValidationLists::parse(
            "Stock/Sprinter Corvette\nStock/Raines Frigate\n",
            "Stock/Bulkhead\n\nStock/FR4800 Reactor \n",
        )
    }

    #[test]
    fn test_known_hull() {
        let lists = lists();
        assert!(lists.is_known_hull("Stock/Raines Frigate"));
        assert!(!lists.is_known_hull("Stock/Solomon Battleship"));
        assert!(!lists.is_known_hull(""));
    }

    #[test]
    fn test_retain_known_drops_only_unknown_components() {
        let sockets = vec![
            Socket::new("a", "Stock/Bulkhead"),
            Socket::new("b", "Modded/Laser"),
            Socket::new("c", "Stock/FR4800 Reactor"),
            Socket::new("d", "Stock/Mystery"),
            Socket::new("e", "Stock/Bulkhead"),
        ];

        let kept = lists().retain_known(sockets);
        let keys: Vec<&str> = kept.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "c", "e"]);
    }

    #[tokio::test]
    async fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let hulls = dir.path().join("hulls.txt");
        let components = dir.path().join("components.txt");
        std::fs::write(&hulls, "Raines\n").unwrap();
        std::fs::write(&components, "Bulkhead\n").unwrap();

        let lists = ValidationLists::load(&hulls, &components).await.unwrap();
        assert!(lists.is_known_hull("Raines"));
        assert!(lists.is_known_component("Bulkhead"));
    }

    #[tokio::test]
    async fn test_missing_reference_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let hulls = dir.path().join("hulls.txt");
        std::fs::write(&hulls, "Raines\n").unwrap();

        let result = ValidationLists::load(&hulls, &dir.path().join("components.txt")).await;
        assert!(result.is_err());
    }
}
