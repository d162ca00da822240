use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jarload")]
#[command(version)]
#[command(about = "Inspect JAR/ZIP archives the way a class loader sees them", long_about = None)]
#[command(after_help = "Examples:\n  \
  jarload app.jar -l                 list packages and names for the classpath index\n  \
  jarload app.jar -m                 print manifest main attributes\n  \
  jarload app.jar -p                 preload the archive and summarize its table\n  \
  jarload app.jar -x a/b/Foo.class   write one resource to stdout")]
pub struct Cli {
    /// JAR or ZIP file path
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// List classpath index data
    #[arg(short = 'l')]
    pub list: bool,

    /// Print manifest main attributes
    #[arg(short = 'm')]
    pub manifest: bool,

    /// Preload the archive and list the table
    #[arg(short = 'p')]
    pub preload: bool,

    /// Write the named resource to stdout
    #[arg(short = 'x', value_name = "NAME")]
    pub extract: Option<String>,

    /// Open as a JAR and report protection domains
    #[arg(short = 's', long)]
    pub secure: bool,

    /// Reopen the archive for every operation instead of caching the handle
    #[arg(long)]
    pub no_lock: bool,

    /// Verbose logging (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}
