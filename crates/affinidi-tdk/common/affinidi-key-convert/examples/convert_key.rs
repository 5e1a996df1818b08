use affinidi_key_convert::{KeyConverter, OutputType};
use clap::Parser;
use std::{
    fs,
    io::{self, Read},
};
use tracing_subscriber::filter;

/// Affinidi JWK <-> PEM Key Conversion Tool
///
/// JSON input (starting with `{`) is written as PEM, anything else is read
/// as PEM or bare base64 DER and written as JWK.
#[derive(Parser)]
#[command(name = "convert_key")]
#[command(bin_name = "convert_key")]
struct Cli {
    /// File to convert, reads stdin when omitted
    #[arg(short, long)]
    file_name: Option<String>,

    /// Write the private key when converting a JWK
    #[arg(short, long)]
    private: bool,
}

fn load_input(file: Option<&str>) -> String {
    match file {
        Some(file) => {
            fs::read_to_string(file).unwrap_or_else(|_| panic!("Failed to read file: {file}"))
        }
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .expect("Failed to read stdin");
            input
        }
    }
}

fn main() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Logging failed, exiting...");

    let args = Cli::parse();
    let input = load_input(args.file_name.as_deref());
    let converter = KeyConverter::default();

    if input.trim_start().starts_with('{') {
        let output = if args.private {
            OutputType::Private
        } else {
            OutputType::Public
        };
        match converter.jwk_to_pem(&input, output) {
            Ok(pem) => print!("{pem}"),
            Err(e) => {
                eprintln!("{} {:?}: {e}", e.code(), e.params());
                std::process::exit(1);
            }
        }
    } else {
        match converter.pem_to_jwk(&input) {
            Ok(result) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result.jwk).expect("Couldn't serialize JWK")
                );
                for warning in &result.warnings {
                    eprintln!("warning: {} {:?}", warning.key, warning.params);
                }
            }
            Err(e) => {
                eprintln!("{} {:?}: {e}", e.code(), e.params());
                std::process::exit(1);
            }
        }
    }
}
