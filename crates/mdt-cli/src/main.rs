use clap::Parser;

mod cli;
mod commands;
mod content;

fn main() {
    tracing_subscriber::fmt::init();
    let cli = cli::Cli::parse();
    match commands::run_command(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    }
}
