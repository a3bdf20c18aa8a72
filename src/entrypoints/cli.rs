use clap::Parser;

/// Parse settings from the command line arguments.
pub fn parse_args<T: Parser>() -> Result<T, clap::Error> {
    T::try_parse()
}
