//! Services - capture logic and state management
//!
//! This module contains the core capture services:
//! - `capture` - Step state machine that owns and mutates the session
//! - `change_feed` - Push-on-change revisions for review consumers
//! - `floor_stabilizer` - Optional debounced automatic floor lock
//! - `capture_loop` - Async shell feeding poses and actions to the state machine

pub mod capture;
pub mod capture_loop;
pub mod change_feed;
pub mod floor_stabilizer;

// Re-export commonly used types
pub use capture::CaptureStateMachine;
pub use capture_loop::{CaptureAction, CaptureLoop};
pub use change_feed::{ChangeFeed, Revision, ReviewSnapshot, SessionChange};
pub use floor_stabilizer::FloorStabilizer;
