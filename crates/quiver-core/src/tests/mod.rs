//! Test module for quiver-core
//!
//! This module contains end-to-end tests for the query session:
//! - Typing, ranking and drop-down reveal
//! - Tab completion (commit vs. path extension) and Shift-Tab
//! - Enter launching, usage accounting and history recording
//! - History recall, Shift-Delete removal and catalog demotion
//! - Debounced presentation scheduling
//! - Rebuild completion and icon delivery re-validation
//!
//! Component-level tests live next to their modules.
