//! Simulated images and containers for the Docker level.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static PORTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+):([0-9]+)$").expect("valid port mapping regex"));

/// Host/container port pair from `-p <host>:<container>`.
///
/// Both sides are kept exactly as typed; only the `digits:digits` shape is
/// checked, never the numeric range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub host: String,
    pub container: String,
}

impl PortMapping {
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = PORTS_RE.captures(raw)?;
        Some(Self {
            host: caps[1].to_string(),
            container: caps[2].to_string(),
        })
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub ports: PortMapping,
    pub running: bool,
    pub logs: Vec<String>,
}

impl Container {
    pub fn status(&self) -> &'static str {
        if self.running { "Up" } else { "Exited" }
    }
}

/// In-memory resource model keyed by name.
///
/// Images are never removed once pulled. A container always references an
/// image that existed when it was created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resources {
    images: BTreeSet<String>,
    containers: BTreeMap<String, Container>,
}

impl Resources {
    pub fn has_image(&self, name: &str) -> bool {
        self.images.contains(name)
    }

    pub fn add_image(&mut self, name: &str) {
        self.images.insert(name.to_string());
    }

    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.images.iter().map(String::as_str)
    }

    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers.get(name)
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    /// Insert or replace a container.
    ///
    /// Returns `false` and leaves the state untouched if the image is unknown.
    pub fn put_container(&mut self, container: Container) -> bool {
        if !self.has_image(&container.image) {
            return false;
        }
        self.containers.insert(container.name.clone(), container);
        true
    }
}
