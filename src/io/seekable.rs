//! Seekable reader and writer traits
//!
//! This module provides unified traits for byte sources and sinks that
//! support both sequential access and seeking. The codec never opens files
//! itself; callers hand it anything that satisfies these traits.

use std::io::{Read, Seek, Write};

/// Trait for readers that can both read and seek
///
/// This trait combines the Read and Seek traits for use with
/// the directory codec and the transfer engine.
pub trait SeekableReader: Read + Seek {}

// Blanket implementation for any type that implements the required traits
impl<T: Read + Seek> SeekableReader for T {}

/// Trait for writers that can both write and seek
///
/// Writing a TIFF requires seeking back to patch directory pointers and
/// strip/tile offset tables once their values are known.
pub trait SeekableWriter: Write + Seek {}

impl<T: Write + Seek> SeekableWriter for T {}
