#![doc = "docs-publish-core: core logic library for docs-publish."]

//! This crate contains the publishing pipeline, its data model and the traits it is driven
//! through. Network clients for concrete object stores live in the CLI crate.
//!
//! # Usage
//! Build a [`config::DeployConfig`], then call [`deploy::deploy`] with a
//! [`contract::CommandRunner`] (usually [`runner::SystemRunner`]) and a
//! [`contract::StoreConnector`].

pub mod config;
pub mod contract;
pub mod credentials;
pub mod deploy;
pub mod enumerate;
pub mod generator;
pub mod pages;
pub mod publish;
pub mod runner;
