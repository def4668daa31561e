pub mod ai;
pub mod content;
pub mod effects;
pub mod entity;
pub mod grid;
pub mod rules;
