pub mod client;
pub mod discovery;
pub mod types;

pub use client::ClusterClient;
pub use discovery::{find, Candidate, Found, ObjectLister};
pub use types::ClusterStats;
