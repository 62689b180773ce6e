//! Iteration configuration
//!
//! Declarative YAML configuration for the model iterator:
//!
//! ```yaml
//! num_epochs: 10
//! hook_freq: 1
//! num_steps: 5000
//! val_freq: 250
//! test_mode: "false"
//! ```

mod load;
mod schema;
mod validate;

pub use load::{load_config, parse_config};
pub use schema::IterConfig;
pub use validate::{validate_config, ValidationError};
