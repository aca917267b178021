//! Prompt groups. A prompt chains several backend reads into one guided
//! message for the agent.

pub mod review;
