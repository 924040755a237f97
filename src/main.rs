use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use regex::Regex;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tree_press::plugins::{self, PluginKind, Site};
use tree_press::walk::WalkOptions;
use tree_press::{config, output};

#[derive(Parser)]
#[command(name = "tree-press")]
#[command(about = "Mirror a directory tree through a transformation plugin")]
#[command(long_about = "\
Mirror a directory tree through a transformation plugin

Every file under the source directory whose path matches --filepattern is
handed to the plugin, which writes its counterpart at the same relative
path under the target directory. Directories are finished bottom-up, so a
plugin can build per-directory and site-wide summaries.

Publishing a blog:

  site/
  ├── tree-press.toml              # Optional config (see gen-config)
  ├── index_template.html          # Recent posts page
  ├── section_index_template.html  # All posts in a directory
  ├── feed_template.xml            # Site-wide feed
  └── src/
      ├── .pandoc_options          # Converter options, inherited by subdirectories
      └── posts/
          └── 2024-01-01-hello.md

  tree-press run -p publish-html -d site -s src -t public -e '\\.md$' -k '\\.html$' -r -x

Without --execute nothing is written or removed; the run only reports what
it would do.

Run 'tree-press gen-config' to generate a documented tree-press.toml.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Transformation plugin
    #[arg(short, long, value_enum)]
    processor: PluginKind,

    /// Root directory; source and target are relative to it
    #[arg(short = 'd', long)]
    rootdir: PathBuf,

    /// Source directory, relative to the root
    #[arg(short, long)]
    sourcedir: PathBuf,

    /// Target directory, relative to the root
    #[arg(short, long)]
    targetdir: PathBuf,

    /// Regex matched against each source file's full path
    #[arg(short = 'e', long, default_value = r".*\.txt$")]
    filepattern: String,

    /// Remove target files matching this regex that the run did not produce
    #[arg(short = 'k', long = "remove-target-files", value_name = "PATTERN")]
    remove_target_files: Option<String>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recurse: bool,

    /// Actually write and remove files (default is a dry run)
    #[arg(short = 'x', long)]
    execute: bool,

    /// Do not open source and target files for the plugin
    #[arg(short, long)]
    no_file_open: bool,

    /// Config overrides, e.g. -o n_recent=5,AUTHOR=Ann (repeatable)
    #[arg(short = 'o', long = "extra-options", value_name = "KEY=VALUE,...")]
    extra_options: Vec<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Walk the source tree through a plugin
    Run(RunArgs),
    /// List the available plugins
    Plugins,
    /// Print a stock tree-press.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => {
            setup_logging(args.verbose);
            run_plugin(args)?;
        }
        Command::Plugins => output::print_plugin_list(),
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }
    Ok(())
}

fn run_plugin(args: RunArgs) -> Result<()> {
    let config = config::load_config(&args.rootdir, &args.extra_options)
        .context("Invalid configuration")?;
    let file_pattern = Regex::new(&args.filepattern)
        .with_context(|| format!("Invalid file pattern '{}'", args.filepattern))?;
    let remove_pattern = args
        .remove_target_files
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid removal pattern")?;

    let site = Site::new(&args.rootdir, &args.sourcedir, &args.targetdir);
    let options = WalkOptions {
        file_pattern,
        remove_pattern,
        recurse: args.recurse,
        open_files: !args.no_file_open,
        execute: args.execute,
    };

    info!(
        "{}: {} -> {}",
        args.processor.name(),
        site.source_root.display(),
        site.target_root.display()
    );
    let report = plugins::run(args.processor, &site, &options, &config)
        .with_context(|| format!("{} run failed", args.processor.name()))?;
    output::print_walk_report(&report, &site.source_root, &site.target_root);
    Ok(())
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("tree_press=debug,warn")
    } else {
        EnvFilter::new("tree_press=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
