#![cfg_attr(doc, doc = include_str!("../README.md"))]

#[cfg(feature = "binance")]
pub mod binance;
pub mod error;
pub mod types;
pub mod ws;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;
