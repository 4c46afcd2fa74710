//! The three pipeline stages as pure functions of one (group, invocation) coordinate.

pub mod amplify;
pub mod generate;
pub mod shade;
