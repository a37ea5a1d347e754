//! CLI command implementations

pub mod asm;
pub mod backup;
pub mod cat;
pub mod completions;
pub mod grp;
pub mod init;
pub mod job;
pub mod mat;
pub mod report;
pub mod select;
pub mod serve;
pub mod tmpl;
