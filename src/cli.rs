use clap::Parser;
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "subraptor",
    version,
    long_version = LONG_VERSION,
    about = "Two-phase subdomain brute-forcing and permutation pipeline",
    long_about = "subraptor gathers candidate subdomains from a wordlist, subfinder and passive sources,\nresolves them with shuffledns, permutes the results with alterx or dnsgen and resolves again."
)]
pub struct Args {
    /// Target domain name
    #[arg(short = 'd', long = "domain", value_name = "DOMAIN")]
    pub domain: Option<String>,

    /// DNS wordlist filename
    #[arg(short = 'w', long = "wordlist", value_name = "FILE")]
    pub wordlist: Option<PathBuf>,

    /// Resolver filename
    #[arg(short = 'r', long = "resolver", value_name = "FILE")]
    pub resolver: Option<PathBuf>,

    /// Fast flag for dnsgen
    #[arg(short = 'f', long = "fast")]
    pub fast: bool,

    /// Enrich flag for alterx
    #[arg(long = "enrich")]
    pub enrich: bool,

    /// All flag for subfinder
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Permutation tool (alterx or dnsgen)
    #[arg(long = "permutation-tool", alias = "pt", value_name = "TOOL")]
    pub permutation_tool: Option<String>,

    /// Also permute candidates that did not resolve in phase 1
    #[arg(short = 'u', long = "include-unresolved")]
    pub include_unresolved: bool,

    /// Clean up all files except the final result
    #[arg(short = 'c', long = "cleanup")]
    pub cleanup: bool,

    /// Collectors to run besides the wordlist (comma-separated)
    #[arg(long = "sources", value_delimiter = ',')]
    pub sources: Option<Vec<String>>,

    /// Session cookie for AbuseIPDB
    #[arg(long = "abuseipdb-session", value_name = "COOKIE")]
    pub abuseipdb_session: Option<String>,

    /// Timeout for passive HTTP sources in seconds
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Only show resolved subdomains
    #[arg(short = 's', long = "silent")]
    pub silent: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Output filename inside the domain directory
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<String>,

    /// Print the final result as a JSON document
    #[arg(long = "json")]
    pub json: bool,

    /// Configuration file path
    #[arg(long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,
}
