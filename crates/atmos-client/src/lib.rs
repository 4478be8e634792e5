//! Async client for the EMC Atmos / ECS object REST API.
//!
//! [`AtmosClient`] exposes one method per REST operation: object CRUD,
//! metadata, ACLs, tag and directory listings, versions, object info,
//! shareable URLs and access tokens. Requests are signed with the tenant's
//! shared secret and sent to the configured hosts in rotation.
//!
//! ```no_run
//! use atmos_client::{AtmosClient, AtmosConfig, ContentSource, ObjectOptions};
//! use atmos_model::{Metadata, ObjectPath};
//!
//! # async fn demo() -> atmos_model::AtmosResult<()> {
//! let client = AtmosClient::new(AtmosConfig::from_env())?;
//! let path = ObjectPath::new("/reports/q1.txt")?.into();
//! let options = ObjectOptions::default().with_metadata(Metadata::new("owner", "alice", true));
//! let id = client
//!     .create_object(Some(&path), ContentSource::from("hello"), &options, None)
//!     .await?;
//! let content = client.read_object(&id.into(), None, None).await?;
//! assert_eq!(content.as_ref(), b"hello");
//! # Ok(())
//! # }
//! ```
//!
//! Listings return a [`Page`](atmos_model::Page); pass its token back through
//! [`ListOptions`](atmos_model::ListOptions) until no token is returned.

pub mod balancer;
pub mod client;
pub mod config;
pub mod content;
pub mod options;

pub use balancer::LoadBalancer;
pub use client::AtmosClient;
pub use config::{AtmosConfig, Protocol};
pub use content::ContentSource;
pub use options::ObjectOptions;
