use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bootc_image_builder::config::loader::load_build_config;
use bootc_image_builder::preflight::{can_chown_in_path, ProcessIdentity};
use bootc_image_builder::{build, ContentMaps, ManifestConfig};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bootc-image-builder")]
#[command(about = "Generate image-assembly manifests for bootc containers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved manifest for a container image
    Manifest(ManifestArgs),

    /// Report whether files in a directory can be handed to the invoking user
    CanChown {
        /// Directory to check
        dir: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ManifestArgs {
    /// Base container image reference
    imgref: String,

    /// Image type (ami, raw, qcow2, iso)
    #[arg(short = 't', long = "type", default_value = "qcow2")]
    img_type: String,

    /// Build config (config.toml or config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Resolved content (packages, containers, commits per pipeline)
    #[arg(long)]
    content: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Manifest(args) => manifest(args),
        Commands::CanChown { dir } => can_chown(&dir),
    }
}

fn manifest(args: ManifestArgs) -> Result<()> {
    let mut config = ManifestConfig::new(args.imgref, args.img_type);
    if let Some(path) = &args.config {
        config = config.with_build_config(load_build_config(path)?);
    }
    let content = match &args.content {
        Some(path) => ContentMaps::load(path)?,
        None => ContentMaps::new(),
    };

    let manifest = build(&config).context("generating manifest")?;
    let bytes = manifest
        .serialize(&content)
        .context("resolving manifest content")?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&bytes).context("writing manifest")?;
    writeln!(stdout).context("writing manifest")?;
    Ok(())
}

fn can_chown(dir: &Path) -> Result<()> {
    let allowed = can_chown_in_path(dir, &ProcessIdentity)
        .with_context(|| format!("checking ownership changes in '{}'", dir.display()))?;
    println!("{allowed}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_args(argv: &[&str]) -> ManifestArgs {
        let argv = ["bootc-image-builder", "manifest"]
            .into_iter()
            .chain(argv.iter().copied());
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Manifest(args) => args,
            Commands::CanChown { .. } => panic!("expected manifest command"),
        }
    }

    #[test]
    fn test_parse_manifest_defaults() {
        let parsed = manifest_args(&["quay.io/x"]);
        assert_eq!(parsed.imgref, "quay.io/x");
        assert_eq!(parsed.img_type, "qcow2");
        assert!(parsed.config.is_none());
        assert!(parsed.content.is_none());
    }

    #[test]
    fn test_parse_manifest_flags() {
        let parsed = manifest_args(&[
            "--type", "iso", "quay.io/x", "--content", "c.json", "--config", "b.toml",
        ]);
        assert_eq!(parsed.imgref, "quay.io/x");
        assert_eq!(parsed.img_type, "iso");
        assert_eq!(parsed.content, Some(PathBuf::from("c.json")));
        assert_eq!(parsed.config, Some(PathBuf::from("b.toml")));
    }

    #[test]
    fn test_parse_can_chown() {
        let cli = Cli::try_parse_from(["bootc-image-builder", "can-chown", "/output"]).unwrap();
        match cli.command {
            Commands::CanChown { dir } => assert_eq!(dir, PathBuf::from("/output")),
            Commands::Manifest(_) => panic!("expected can-chown command"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        let cases: [&[&str]; 5] = [
            &["bootc-image-builder", "manifest", "--bogus", "x"],
            &["bootc-image-builder", "manifest", "a", "b"],
            &["bootc-image-builder", "manifest", "a", "--type"],
            &["bootc-image-builder", "manifest"],
            &["bootc-image-builder", "build"],
        ];
        for argv in cases {
            assert!(
                Cli::try_parse_from(argv.iter().copied()).is_err(),
                "{argv:?} should not parse"
            );
        }
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
