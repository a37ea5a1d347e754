//! Entity type definitions
//!
//! **Catalog:**
//! - [`Material`] - Priced items bought by the unit
//! - [`Assembly`] - Bills of materials with a derived unit cost
//! - [`Category`] - Buckets that hold assembly groups
//! - [`Group`] - Selection constraints (REQUIRED, CHOOSE_ONE, OPTIONAL, CONFLICT) over assemblies
//!
//! **Estimating:**
//! - [`Template`] - Assembly bundles, optionally configured through groups
//! - [`Job`] - Construction projects with a template and a timeline

pub mod assembly;
pub mod category;
pub mod group;
pub mod job;
pub mod material;
pub mod template;

pub use assembly::Assembly;
pub use category::Category;
pub use group::Group;
pub use job::Job;
pub use material::Material;
pub use template::Template;
