pub mod completions;
pub mod health;
pub mod tools;
pub mod voice;
