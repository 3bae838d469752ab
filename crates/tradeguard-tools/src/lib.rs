//! Tool management and execution framework for tradeguard
//!
//! This crate provides the `Tool` trait, a registry that executes tools by
//! name, and the trading tools agents are allowed to call. Tools here do no
//! validation of their own beyond decoding arguments: argument policy and
//! session order limits are enforced by the tool guardrail before a tool
//! from this registry is ever executed.

pub mod quote;
pub mod registry;
pub mod tool;
pub mod trading;

pub use quote::QuoteTool;
pub use registry::ToolRegistry;
pub use tool::Tool;
pub use trading::{Instrument, OrderTool, PlaceOrderTool, Side};
