//! Keyword-list persistence of orbits, acquisition metadata and model state

pub mod keywordlist;
pub mod orbit;
pub mod annotation;

pub use keywordlist::Keywordlist;
pub use orbit::OrbitReader;
pub use annotation::AnnotationParser;
