mod expand_dims;

use clap::Parser;

#[macro_use]
extern crate clap;

fn main() {
    use Commands::*;
    match Cli::parse().command {
        ExpandDims(args) => args.invoke(),
    }
}

#[derive(Parser)]
#[clap(name = "kernel-utils")]
#[clap(version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ExpandDims kernel on a generated tensor
    ExpandDims(expand_dims::ExpandDimsArgs),
}

#[derive(Args, Default)]
struct LogArgs {
    /// Log level, may be "off", "trace", "debug", "info", "warn" or "error".
    #[clap(long)]
    log: Option<String>,
}

impl LogArgs {
    fn init(&self) {
        use log::LevelFilter;
        use simple_logger::SimpleLogger;
        let log = self
            .log
            .as_ref()
            .and_then(|log| match log.to_lowercase().as_str() {
                "off" | "none" => Some(LevelFilter::Off),
                "trace" => Some(LevelFilter::Trace),
                "debug" => Some(LevelFilter::Debug),
                "info" => Some(LevelFilter::Info),
                "warn" => Some(LevelFilter::Warn),
                "error" => Some(LevelFilter::Error),
                _ => None,
            })
            .unwrap_or(LevelFilter::Warn);
        SimpleLogger::new().with_level(log).init().unwrap();
    }
}
