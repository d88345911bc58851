pub mod resolver;

pub use resolver::{
    ARCH_PATTERNS, ResolveError, ResolvedCheckpoint, architecture_for_stem,
    resolve,
};
