//! QuickBom: construction estimating as plain-text files
//!
//! Materials, assemblies, assembly groups, templates and jobs live as YAML
//! files under a project directory. The [`selection`] module validates a
//! user's picks against each group's rule (REQUIRED, CHOOSE_ONE, OPTIONAL,
//! CONFLICT) and costs them; [`server`] exposes that over HTTP.

pub mod cli;
pub mod core;
pub mod entities;
pub mod selection;
pub mod server;
