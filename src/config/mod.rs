// Configuration: seeding settings and fixture data

pub mod fixtures;
pub mod settings;

pub use fixtures::Fixtures;
pub use settings::{CredentialSource, FileSettings, Overrides, Settings};
