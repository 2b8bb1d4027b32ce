#![allow(dead_code)]

pub mod phonation_env;
pub mod voice_data;
