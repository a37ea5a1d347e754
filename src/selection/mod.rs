//! Assembly-group selection engine
//!
//! - [`model`] - group types, resolved groups, selections, outcomes
//! - [`validator`] - constraint checking and cost breakdown
//! - [`defaults`] - default seeding and toggle semantics

pub mod defaults;
pub mod model;
pub mod validator;

pub use defaults::{default_selection, toggle};
pub use model::{
    ErrorKind, GroupType, ResolvedGroup, ResolvedItem, Selection, ValidationError,
    ValidationOutcome,
};
pub use validator::validate_selection;
