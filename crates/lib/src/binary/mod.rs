//! Binary kinds: object files, module interfaces, libraries and executables,
//! plus the configuration that decides which library variants are built.

pub mod config;
pub mod members;
pub mod target;

pub use config::{BinConfig, ConfigError, LibVariant, LibVariants};
pub use members::{BinContext, LibMembers};
pub use target::{BinKinds, register};
