//! stemcube CLI: inspect and convert 4D-STEM datasets.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use stemcube::config::FallbackPolicy;
use stemcube::{
    ContainerMetadata, DataCube, DataReader, ReaderConfig, read_native_metadata, save_native,
};

#[derive(Parser)]
#[command(name = "stemcube")]
#[command(about = "Load 4D-STEM datacubes from native containers and foreign formats")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report load failures instead of returning a placeholder datacube
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a file and print its shape and origin
    Info {
        /// File to load
        path: PathBuf,
    },

    /// Load a file and write it as a native container
    Convert {
        /// File to load
        input: PathBuf,

        /// Native container to write
        output: PathBuf,
    },

    /// Print dimension descriptors and metadata of a native container
    Metadata {
        /// Native container
        path: PathBuf,
    },

    /// List the foreign formats the loader can read
    Formats,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.strict) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let reader = DataReader::new(config);
    let result = match cli.command {
        Commands::Info { path } => cmd_info(&reader, &path),
        Commands::Convert { input, output } => cmd_convert(&reader, &input, &output),
        Commands::Metadata { path } => cmd_metadata(&path),
        Commands::Formats => cmd_formats(&reader),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&Path>,
    strict: bool,
) -> Result<ReaderConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => ReaderConfig::load(path)?,
        None => ReaderConfig::load_from_default_path().unwrap_or_default(),
    };
    if strict {
        config.fallback.policy = FallbackPolicy::Strict;
    }
    Ok(config)
}

fn describe(cube: &DataCube) {
    let origin = if cube.is_native() {
        "native container"
    } else if cube.metadata().is_some() {
        "foreign file"
    } else {
        "placeholder (random data)"
    };

    println!("Source:    {}", origin);
    match cube.filename() {
        Some(path) => println!("File:      {}", path.display()),
        None => println!("File:      -"),
    }
    println!("Scan:      {} x {} (R_Ny x R_Nx)", cube.r_ny(), cube.r_nx());
    println!("Detector:  {} x {} (Q_Ny x Q_Nx)", cube.q_ny(), cube.q_nx());
}

fn cmd_info(reader: &DataReader, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let cube = reader.read(path)?;
    describe(&cube);

    if let Some(metadata) = cube.metadata() {
        println!("Metadata:");
        println!("{}", serde_json::to_string_pretty(&metadata.shortlist)?);
    }
    Ok(())
}

fn cmd_convert(
    reader: &DataReader,
    input: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let cube = reader.read(input)?;
    if !cube.is_native() && cube.metadata().is_none() {
        return Err(format!(
            "{} could not be read; not writing a placeholder",
            input.display()
        )
        .into());
    }

    let metadata = match cube.metadata() {
        Some(foreign) => ContainerMetadata::from_foreign(foreign),
        None if cube.is_native() => read_native_metadata(input)?,
        None => ContainerMetadata::new(),
    };
    save_native(output, &cube, &metadata)?;

    println!("Wrote {} ({:?})", output.display(), cube.shape());
    Ok(())
}

fn cmd_metadata(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = read_native_metadata(path)?;

    println!("Dimensions:");
    for (axis, dim) in metadata.dims.iter().enumerate() {
        let step = if dim.coords.len() > 1 {
            dim.coords[1] - dim.coords[0]
        } else {
            0.0
        };
        println!(
            "  dim{}: {} {} (n={}, step={})",
            axis + 1,
            dim.name,
            dim.units,
            dim.coords.len(),
            step
        );
    }

    for (section, attrs) in &metadata.sections {
        if attrs.is_empty() {
            continue;
        }
        println!("{}:", section.name());
        for (key, value) in attrs {
            println!("  {} = {}", key, value);
        }
    }
    Ok(())
}

fn cmd_formats(reader: &DataReader) -> Result<(), Box<dyn std::error::Error>> {
    let registry = reader.registry();
    for foreign in registry.readers() {
        println!(
            "{:<6} {:<30} .{}",
            foreign.id(),
            foreign.display_name(),
            foreign.extensions().join(" .")
        );
    }
    println!("Extensions: {}", registry.supported_extensions().join(", "));
    Ok(())
}
