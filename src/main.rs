use std::{
    io::Read,
    path::Path,
    sync::Arc,
};

use clap::Parser;
use datacat::{
    Catalog,
    DataDir,
    Element,
    Error,
    LocalStore,
    Result,
    cli::{self, Cli, CollectionAction, Command, ElementAction},
    mcp,
    search::{self, SearchParams},
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DATACAT_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let store = Arc::new(LocalStore::from_data_dir(&data_dir)?);

    match cli.command {
        Command::Search(args) => {
            let catalog = Catalog::open(store);
            let mut params =
                SearchParams::new(args.query).with_limit(args.limit);
            if let Some(types) = args.types {
                params = params.with_types(types);
            }
            let response = catalog.search(&params)?;
            if args.json {
                search::format_json(&response)?;
            } else {
                search::format_human(&response);
            }
        }
        Command::Suggest(args) => {
            let catalog = Catalog::open(store);
            let response = catalog.suggest(&args.query, args.limit)?;
            if args.json {
                search::format_json(&response)?;
            } else if response.suggestions.is_empty() {
                println!("No suggestions.");
            } else {
                for suggestion in &response.suggestions {
                    println!("{suggestion}");
                }
            }
        }
        Command::Rebuild(args) => {
            cmd_rebuild(&Catalog::new(store), &args)?;
        }
        Command::Stats(args) => {
            let catalog = Catalog::open(store);
            let stats = catalog.stats();
            if args.json {
                search::format_json(&stats)?;
            } else {
                println!("Data directory: {}", data_dir.root().display());
                search::format_stats_human(&stats);
            }
        }
        Command::Collection { action } => {
            let catalog = Catalog::new(store);
            match action {
                CollectionAction::List { json } => {
                    collection_list(&catalog, json)?;
                }
                CollectionAction::Show { collection } => {
                    search::format_json(&catalog.list(&collection)?)?;
                }
            }
        }
        Command::Element { action } => {
            // Mutations update the index incrementally, so it must exist.
            let catalog = Catalog::open(store);
            cmd_element(&catalog, action)?;
        }
        Command::Mcp => {
            mcp::run_mcp(Catalog::open(store))?;
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

fn cmd_rebuild(catalog: &Catalog, args: &cli::RebuildArgs) -> Result<()> {
    let response = match &args.collection {
        Some(document_type) => catalog.rebuild_collection(document_type)?,
        None => catalog.rebuild()?,
    };

    if args.json {
        search::format_json(&response)?;
    } else {
        println!("{}", response.message);
        search::format_stats_human(&response.stats);
    }
    Ok(())
}

fn collection_list(catalog: &Catalog, json: bool) -> Result<()> {
    let collections = catalog.collections()?;

    if json {
        return search::format_json(&collections);
    }
    for info in &collections {
        let status = match (info.present, info.elements) {
            (false, _) => "absent".to_string(),
            (true, Some(n)) => format!("{n} elements"),
            (true, None) => "unreadable".to_string(),
        };
        println!("{:<16} {:<22} {status}", info.document_type, info.file_name);
    }
    Ok(())
}

fn cmd_element(catalog: &Catalog, action: ElementAction) -> Result<()> {
    let element = match action {
        ElementAction::Get { collection, id } => catalog.get(&collection, &id)?,
        ElementAction::Add { collection, body } => {
            catalog.create(&collection, read_body(&body)?)?
        }
        ElementAction::Update {
            collection,
            id,
            body,
        } => catalog.update(&collection, &id, read_body(&body)?)?,
        ElementAction::Remove { collection, id } => {
            catalog.delete(&collection, &id)?
        }
    };
    search::format_json(&element)
}

/// Parse a JSON object given inline, as `@path`, or as `-` for stdin.
fn read_body(body: &str) -> Result<Element> {
    let text = if body == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else if let Some(path) = body.strip_prefix('@') {
        std::fs::read_to_string(Path::new(path))?
    } else {
        body.to_string()
    };

    match serde_json::from_str(&text)? {
        Value::Object(element) => Ok(element),
        _ => Err(Error::InvalidArgument(
            "element body must be a JSON object".into(),
        )),
    }
}
