pub mod series;

use std::io::{self, Write};

use seriesq_core::PROGNAME;

/// One-line usage shown after option errors.
const USAGE: &str = "Usage: seriesq [options] [query ... | series ... | source ...]";

/// Print every option error, then the usage hint.
pub fn write_usage_errors<W: Write>(w: &mut W, messages: &[String]) -> io::Result<()> {
    for message in messages {
        writeln!(w, "{PROGNAME}: error - {message}")?;
    }
    writeln!(w, "{USAGE}")?;
    writeln!(w, "Try '{PROGNAME} --help' for more information.")
}
