use clap::Parser;
use log::error;
use std::process;
use subraptor::{config, Args, PipelineEngine};

const BANNER: &str = r#"
           _                       _
 ___ _   _| |__  _ __ __ _ _ __ | |_ ___  _ __
/ __| | | | '_ \| '__/ _` | '_ \| __/ _ \| '__|
\__ \ |_| | |_) | | | (_| | |_) | || (_) | |
|___/\__,_|_.__/|_|  \__,_| .__/ \__\___/|_|
                          |_|
      Two-phase subdomain brute-forcing
"#;

fn init_logger(args: &Args) {
    let level = if args.silent {
        log::LevelFilter::Error
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    if !args.verbose {
        builder.format_timestamp(None);
    }
    builder.init();
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logger(&args);

    if !args.silent {
        eprintln!("{}", BANNER);
    }

    let config = match config::build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let mut engine = match PipelineEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = engine.run(&mut handle).await {
        error!("{}", e);
        process::exit(1);
    }
}
