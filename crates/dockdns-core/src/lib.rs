// # dockdns-core
//
// Core library for the DockDNS reconciliation agent.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping DNS records in
// line with static configuration and container metadata:
// - **DomainRecord / Record**: Desired and provider-side record models, with
//   per-zone override resolution
// - **DnsProvider**: Trait for reading and writing records at a backend
// - **PublicIpSource / DomainSource / ContainerEventSource**: Collaborator traits
// - **SyncEngine**: One reconciliation pass (merge, defaults, routing, diff, purge)
// - **Scheduler**: Debounced multi-trigger scheduling of passes
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from backends
// 2. **Stateless Passes**: The provider is the only source of truth
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: A pass over unchanged state issues no writes

pub mod config;
pub mod engine;
pub mod error;
pub mod provider;
pub mod record;
pub mod registry;
pub mod schedule;
pub mod shutdown;
pub mod traits;

// Re-export core types for convenience
pub use config::{AppConfig, DnsConfig, DockerConfig, LogConfig, LogFormat, Zone};
pub use engine::{EngineEvent, PassSummary, SyncEngine, ZoneTarget};
pub use error::{Error, Result};
pub use provider::DryRunProvider;
pub use record::{DomainRecord, Record, RecordSource, RecordType};
pub use registry::ProviderRegistry;
pub use schedule::{DockerTrigger, IntervalTrigger, ScheduledTask, Scheduler, Trigger, TriggerEvent};
pub use shutdown::{Shutdown, ShutdownHandle};
pub use traits::{ContainerEvent, ContainerEventSource, DnsProvider, DomainSource, PublicIpSource};
