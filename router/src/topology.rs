use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{RouterConfig, TopologyDocument};
use crate::error::{Error, Result};
use crate::router::Router;

/// Thin external-collaborator harness: parses a topology file,
/// instantiates one [`Router`] per entry sharing a common `update_time`,
/// and brings the whole set up or down together.
///
/// No ordering guarantee is required or provided between different
/// routers' startup broadcasts — the protocol tolerates any interleaving
/// — so routers are started in file order and stopped in reverse, purely
/// for predictable shutdown logging.
pub struct Topology {
    routers: Vec<Arc<Router>>,
}

impl Topology {
    /// Reads and parses a topology file, then binds (but does not start)
    /// one router per entry.
    pub async fn load(path: impl AsRef<Path>, update_time: Duration) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::TopologyIo {
            path: path.display().to_string(),
            source,
        })?;
        let document: TopologyDocument = serde_json::from_str(&raw)?;

        let mut routers = Vec::with_capacity(document.routers.len());
        for spec in document.routers {
            let config = RouterConfig::new(spec.name, update_time, spec.ports);
            routers.push(Router::new(config).await?);
        }
        Ok(Self { routers })
    }

    pub fn routers(&self) -> &[Arc<Router>] {
        &self.routers
    }

    pub fn router(&self, name: &str) -> Option<&Arc<Router>> {
        self.routers.iter().find(|r| r.name() == name)
    }

    /// Starts every router in construction order.
    pub fn start_all(&self) -> Result<()> {
        for router in &self.routers {
            info!(router = router.name(), "starting");
            router.start()?;
        }
        Ok(())
    }

    /// Stops every router in reverse construction order.
    pub async fn stop_all(&self) -> Result<()> {
        for router in self.routers.iter().rev() {
            info!(router = router.name(), "stopping");
            router.stop().await?;
        }
        Ok(())
    }
}
