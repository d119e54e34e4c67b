//! Core traits for the DockDNS agent
//!
//! This module defines the abstract interfaces that all collaborators implement.
//!
//! - [`DnsProvider`]: Read and write records at a DNS backend
//! - [`PublicIpSource`]: Resolve the host's public addresses
//! - [`DomainSource`]: Supply dynamically discovered domain records
//! - [`ContainerEventSource`]: Subscribe to container lifecycle events

pub mod container_events;
pub mod dns_provider;
pub mod domain_source;
pub mod ip_source;

pub use container_events::{ContainerEvent, ContainerEventSource, ContainerEventStream};
pub use dns_provider::{DnsProvider, DnsProviderFactory};
pub use domain_source::DomainSource;
pub use ip_source::PublicIpSource;
