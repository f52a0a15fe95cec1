pub(crate) mod config;
pub(crate) mod controller;
pub(crate) mod effects;
pub(crate) mod persistence;
pub(crate) mod render;
