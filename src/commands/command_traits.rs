//! Traits shared by the `tiffkit` subcommands

use clap::ArgMatches;

use crate::tiff::errors::TiffResult;

/// One CLI operation, configured up front and run once
pub trait Command {
    fn execute(&self) -> TiffResult<()>;
}

/// Picks and configures the command the parsed arguments ask for
pub trait CommandFactory {
    /// Fails when the arguments are inconsistent (missing output, bad region, ...)
    fn create_command(&self, args: &ArgMatches) -> TiffResult<Box<dyn Command>>;
}
