//! Core TIFF data structures

use std::fmt;

use crate::io::byte_order::ByteOrder;
use crate::tiff::header::TiffVariant;
use crate::tiff::ifd::IFD;

/// Represents a TIFF file with its Image File Directories (IFDs)
#[derive(Debug)]
pub struct TIFF {
    /// Image File Directories in the TIFF file, in chain order
    pub ifds: Vec<IFD>,
    /// Classic or BigTIFF container
    pub variant: TiffVariant,
    pub byte_order: ByteOrder,
}

impl TIFF {
    /// Creates a new empty TIFF structure
    pub fn new(variant: TiffVariant, byte_order: ByteOrder) -> Self {
        TIFF {
            ifds: Vec::new(),
            variant,
            byte_order,
        }
    }

    pub fn is_big_tiff(&self) -> bool {
        self.variant.is_big_tiff()
    }

    /// Returns the main (first) IFD if available
    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    /// Returns the number of IFDs in the TIFF file
    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }

    /// Returns all reduced-resolution IFDs (NewSubfileType bit 0 set)
    pub fn overviews(&self) -> Vec<&IFD> {
        self.ifds.iter()
            .filter(|ifd| ifd.is_reduced_resolution())
            .collect()
    }
}

impl fmt::Display for TIFF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TIFF File:")?;
        writeln!(f, "  Format: {} ({})", self.variant.name(), self.byte_order.name())?;
        writeln!(f, "  Number of IFDs: {}", self.ifds.len())?;
        writeln!(f, "  Overviews: {}", self.overviews().len())?;

        for ifd in &self.ifds {
            write!(f, "{}", ifd)?;
        }

        Ok(())
    }
}
