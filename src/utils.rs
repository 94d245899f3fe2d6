use std::path::PathBuf;
use std::process;

pub fn print_usage() -> ! {
    println!("usage: jsh [-hvp]");
    println!("   -h   print this help message");
    println!("   -v   echo each accepted command line");
    println!("   -p   do not print a command prompt");
    process::exit(1);
}

/// History lives in the home directory; sessions without one simply
/// skip persistence.
pub fn history_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".jsh_history"))
}
