//! Provider decorators shared by every backend

pub mod dry_run;

pub use dry_run::DryRunProvider;
