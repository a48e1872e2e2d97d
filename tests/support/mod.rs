#![allow(dead_code)]

pub mod app_root;
pub mod fixtures;
