//! Main entry point for the jarload CLI application.
//!
//! Opens one archive as a classpath resource file and runs the requested
//! inspections against it.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use jarload::{
    Cli, CodeSourceProvider, IndexRegistrar, ResourceFile, ResourceFileOptions,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = cli
        .file
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", cli.file.display()))?;

    let mut options = ResourceFileOptions::default().lock_archives(!cli.no_lock);
    if cli.secure {
        let code_source = url::Url::from_file_path(&path)
            .map_err(|_| anyhow::anyhow!("cannot build URL for {}", path.display()))?;
        options = options.secure(Arc::new(CodeSourceProvider::new(code_source)));
    }
    let file = ResourceFile::new(&path, options)?;

    if !(cli.list || cli.manifest || cli.preload || cli.extract.is_some()) {
        bail!("nothing to do: pass one of -l, -m, -p or -x NAME");
    }

    if cli.manifest {
        print_manifest(&file)?;
    }
    if cli.list {
        print_index(&file)?;
    }
    if cli.preload {
        print_preload(&file)?;
    }
    if let Some(name) = &cli.extract {
        extract(&file, name, cli.secure)?;
    }

    file.close();
    Ok(())
}

fn print_manifest(file: &ResourceFile) -> Result<()> {
    match file.load_manifest_attributes()? {
        Some(attributes) => {
            let mut attributes: Vec<_> = attributes.into_iter().collect();
            attributes.sort();
            for (name, value) in attributes {
                println!("{name}: {value}");
            }
        }
        None => eprintln!("no usable manifest"),
    }
    Ok(())
}

fn print_index(file: &ResourceFile) -> Result<()> {
    let data = file.build_class_path_cache_data()?;

    println!("class packages:");
    for package in data.class_packages() {
        println!("  {}", display_package(package));
    }
    println!("resource packages:");
    for package in data.resource_packages() {
        println!("  {}", display_package(package));
    }

    let duplicates = data.duplicate_names();
    if !duplicates.is_empty() {
        println!("shared names:");
        for record in duplicates {
            println!("  {:<30}  {}", record.short_name, record.full_name);
        }
    }
    println!("{} entries", data.name_records().len());
    Ok(())
}

fn print_preload(file: &ResourceFile) -> Result<()> {
    let Some(table) = file.preload(file.path())? else {
        println!("archive is not preloadable");
        return Ok(());
    };

    let mut names: Vec<_> = table.iter().map(|r| (r.name(), r.len())).collect();
    names.sort();
    for (name, len) in names {
        println!("{len:>10}  {name}");
    }
    println!(
        "{} resources in {} slots",
        table.len(),
        table.capacity()
    );
    Ok(())
}

fn extract(file: &ResourceFile, name: &str, secure: bool) -> Result<()> {
    let resource = file
        .get_resource(name)?
        .with_context(|| format!("{name} not found in {}", file.path().display()))?;

    if secure {
        if let Some(domain) = resource.protection_domain()? {
            eprintln!(
                "{}: code source {}, {} signer(s)",
                resource.url()?,
                domain.code_source,
                domain.signers.len()
            );
        }
    }

    let bytes = resource.bytes()?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&bytes)?;
    stdout.flush()?;
    Ok(())
}

fn display_package(package: &str) -> &str {
    if package.is_empty() { "<root>" } else { package }
}
