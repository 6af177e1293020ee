//! Key command - derives a cache key from a JSON document

use std::io::Read;

use anyhow::Context;
use clap::Args;
use serde_json::Value;

use crate::domain::cache::{CacheKeyGenerator, Sha256KeyGenerator, canonical_string};

#[derive(Debug, Args)]
pub struct KeyArgs {
    /// JSON document; read from stdin when omitted
    pub input: Option<String>,

    /// Also print the canonical text that is hashed
    #[arg(long)]
    pub canonical: bool,
}

/// Print the key for the given input
pub async fn run(args: KeyArgs) -> anyhow::Result<()> {
    let raw = match args.input {
        Some(input) => input,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read input from stdin")?;
            buf
        }
    };

    let (key, canonical) = derive(&raw)?;

    if args.canonical {
        println!("{}", canonical);
    }
    println!("{}", key);

    Ok(())
}

fn derive(raw: &str) -> anyhow::Result<(String, String)> {
    let value: Value = serde_json::from_str(raw).context("Input is not valid JSON")?;
    let key = Sha256KeyGenerator::new().generate(&value);

    Ok((key.to_string(), canonical_string(&value)))
}
