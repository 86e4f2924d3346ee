/*
Local-mode helpers run by the binary around the pipelines:
feeding recorded events into the in-process broker and preloading
history entries that would normally be created elsewhere.
*/
mod replay;
mod seed;

pub use replay::replay_file;
pub use seed::seed_history;
