//! Processors and host-side collaborators for Stagehand orchestration.
//!
//! This crate implements the execution layer the orchestrator drives: the
//! pluggable `Processor` capability with one implementation per resource kind
//! (scripts, styles, blocks), the in-process `HostRegistry` those processors
//! register against, the `TriggerHost` seam with its `HookBus` implementation,
//! and a recording `MockProcessor` for tests.

pub mod block;
pub mod host;
pub mod mock;
pub mod processor;
pub mod script;
pub mod style;
pub mod trigger;

pub use block::BlockProcessor;
pub use host::{HostRegistry, TagFilter};
pub use mock::{MockProcessor, ProcessorCall};
pub use processor::{select_processor, Processor};
pub use script::ScriptProcessor;
pub use style::StyleProcessor;
pub use trigger::{HookBus, TriggerHost};
