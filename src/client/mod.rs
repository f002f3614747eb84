//! Client-side state layers: they consume the same event stream the server
//! pushes, alongside REST cold-start fetches, and keep a local view that is
//! ordered, duplicate-free, and scoped to the active conversation.

pub mod summary;
pub mod timeline;
