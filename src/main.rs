//! objwire-inspect - load protocol documents and print the resulting catalog.
//!
//! Exits non-zero when a document is malformed or the protocols are
//! inconsistent (duplicate interfaces, unresolved enum references, members
//! newer than their interface).

use clap::Parser;
use std::path::PathBuf;

use objwire::protocol::{Catalog, ProtocolDef};
use objwire::Config;

#[derive(Debug, Parser)]
#[command(name = "objwire-inspect", version, about = "Validate and describe objwire protocol documents")]
struct Cli {
    /// Protocol documents (JSON).
    #[arg(required = true)]
    protocols: Vec<PathBuf>,

    /// Configuration file (JSON).
    #[arg(long, env = "OBJWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Only describe this interface.
    #[arg(long)]
    interface: Option<String>,

    /// Print descriptors as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_json_str(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    objwire::observability::init_tracing_with(&config.observability);

    let mut protocols = Vec::with_capacity(cli.protocols.len());
    for path in &cli.protocols {
        let text = std::fs::read_to_string(path)?;
        let protocol = ProtocolDef::from_json_str(&text)?;
        tracing::info!(path = %path.display(), protocol = %protocol.name, "loaded protocol");
        protocols.push(protocol);
    }
    let catalog = Catalog::from_protocols(protocols)?;

    match (&cli.interface, cli.json) {
        (Some(name), true) => println!("{}", serde_json::to_string_pretty(catalog.require(name)?.as_ref())?),
        (Some(name), false) => {
            catalog.require(name)?;
            if let Some(text) = catalog.describe_interface(name) {
                println!("{}", text);
            }
        }
        (None, true) => {
            let interfaces: Vec<_> = catalog
                .list_names()
                .iter()
                .filter_map(|name| catalog.interface(name).cloned())
                .collect();
            println!("{}", serde_json::to_string_pretty(&interfaces)?);
        }
        (None, false) => println!("{}", catalog.describe()),
    }

    Ok(())
}
