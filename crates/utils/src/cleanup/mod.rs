//! Scoped resource guards that restore state on every exit path

pub mod handler;

pub use handler::FileSnapshot;
