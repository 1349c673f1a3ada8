mod engine;

pub use engine::SearchEngine;
