use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("router {name} is not in the expected state for this operation")]
    InvalidState { name: String },
    #[error("failed to bind link endpoint: {0}")]
    Net(#[from] router_net::Error),
    #[error("failed to parse topology file: {0}")]
    Topology(#[from] serde_json::Error),
    #[error("failed to read topology file {path}: {source}")]
    TopologyIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
