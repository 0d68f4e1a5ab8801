//! Lightweight host-resource monitoring daemon.
//!
//! The core is a supervised periodic collection pipeline: a
//! [`supervisor::Supervisor`] runs the [`system::Collector`] loop as a
//! cancellable background task, each cycle fans out to four concurrent
//! samplers, and the merged [`system::ResourceSnapshot`] is published to a
//! shared [`system::SnapshotStore`] that readers pull copies from.

pub mod config;
pub mod supervisor;
pub mod system;
