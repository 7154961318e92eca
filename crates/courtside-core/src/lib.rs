// Library root: the aggregation engine's building blocks, leaves first.

pub mod calendar;
pub mod config;
pub mod db;
pub mod efficiency;
pub mod error;
pub mod facts;
pub mod roster;
pub mod window;
pub mod writer;
