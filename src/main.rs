use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vitrina::remote::{HttpValidator, RemoteValidator, SkipValidator};
use vitrina::{config, output, pipeline};

#[derive(Parser)]
#[command(name = "vitrina")]
#[command(about = "Content pipeline for digital exhibit sites")]
#[command(long_about = "\
Content pipeline for digital exhibit sites

Curators author spreadsheets and markdown; vitrina validates the content,
cross-links it, and materializes what the static-site renderer consumes.

Project structure:

  components/
  ├── structures/
  │   ├── project.csv              # Site settings + the story list
  │   ├── objects.csv              # The object catalog
  │   ├── glossary.csv             # Glossary terms (optional)
  │   └── story-1.csv              # One CSV per story
  └── texts/
      ├── glossary/                # One markdown fragment per term
      └── panels/                  # Markdown panels referenced by steps
  images/objects/                  # Local object images, named by object_id
  iiif/objects/<id>/info.json      # Tiled objects (external tiling step)

Output:

  _data/*.json                     # JSON collections for the renderer
  _collections/{_objects,_glossary,_stories}/   # One document per entity
  iiif/objects/<id>/manifest.json  # IIIF Presentation v3 manifests

Content problems never fail the build: they become warnings carried in the
generated output where the curator will see them.

Run 'vitrina gen-config' to generate a documented vitrina.toml.")]
#[command(version)]
struct Cli {
    /// Project root directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert spreadsheets into JSON data documents
    Convert,
    /// Generate per-entity collection documents from the data
    Collections,
    /// Write IIIF Presentation manifests for tiled objects
    Manifests,
    /// Run the full pipeline: convert → collections → manifests
    Build,
    /// Validate all content without writing anything
    Check,
    /// Print a stock vitrina.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if matches!(cli.command, Command::GenConfig) {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let site_config = config::load_config(&cli.root)?;
    let validator: Box<dyn RemoteValidator> = if site_config.remote.validate {
        Box::new(HttpValidator::new(&site_config.remote)?)
    } else {
        Box::new(SkipValidator)
    };
    let ctx = pipeline::BuildContext {
        layout: config::Layout::resolve(&cli.root, &site_config),
        config: site_config,
        validator: validator.as_ref(),
    };

    match cli.command {
        Command::Convert => {
            let reports =
                pipeline::run_stages(&ctx, &["project", "catalog", "glossary", "stories"])?;
            for report in &reports {
                output::print_stage_report(report);
            }
        }
        Command::Collections => {
            let reports = pipeline::run_stages(&ctx, &["collections"])?;
            for report in &reports {
                output::print_stage_report(report);
            }
        }
        Command::Manifests => {
            let reports = pipeline::run_stages(&ctx, &["manifests"])?;
            for report in &reports {
                output::print_stage_report(report);
            }
        }
        Command::Build => {
            println!("==> Building {}", ctx.layout.root.display());
            let reports = pipeline::run(&ctx)?;
            for report in &reports {
                output::print_stage_report(report);
            }
            output::print_build_summary(&reports);
        }
        Command::Check => {
            println!("==> Checking {}", ctx.layout.root.display());
            let reports = pipeline::check(&ctx)?;
            for report in &reports {
                output::print_stage_report(report);
            }
            output::print_check_summary(&reports);
        }
        Command::GenConfig => unreachable!(),
    }

    Ok(())
}
