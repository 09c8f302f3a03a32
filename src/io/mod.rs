//! I/O utilities for file handling
//!
//! This module provides traits and implementations for the byte-level
//! operations the codec performs on an open source or sink.

pub mod seekable;
pub mod byte_order;
pub mod fill_order;
pub mod source;
