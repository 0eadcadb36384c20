#![deny(warnings)]

pub mod audio;
pub mod config;
pub mod corpus;
pub mod emotion;
pub mod pipeline;
pub mod prosody;
pub mod segment;
pub mod tts;
pub mod util;
