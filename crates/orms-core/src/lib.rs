pub mod command;
pub mod config;
pub mod error;
pub mod exec;
pub mod paths;
pub mod plan;
pub mod registry;
pub mod types;

pub use command::ExternalCommand;
pub use error::{OrmsError, Result};
pub use plan::{parse_invocation, plan, Plan};
pub use registry::ServiceRegistry;
pub use types::{Orm, Target, Verb};
