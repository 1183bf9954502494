//! One module per rule family.

pub mod clitic;
pub mod definite_article;
pub mod future_shte;
pub mod misc;
pub mod no_infinitive;
