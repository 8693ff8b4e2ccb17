//! Load a Kconfig tree and read, generate, or diff `.config` files.

use {
    clap::{Parser, Subcommand},
    kconfig_core::{configfile::read_config_entries, Model},
    std::{
        collections::BTreeMap,
        fs::File,
        io::{stdout, Result as IoResult, Write},
        path::PathBuf,
        process::ExitCode,
    },
};

/// Command line options for the driver.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Options {
    /// The top-level Kconfig file.
    #[arg(long, env = "KCONFIG", default_value = "Kconfig")]
    kconfig: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a .config with every symbol at its default value.
    Alldefconfig {
        /// An existing .config to merge before writing.
        #[arg(long)]
        load: Option<PathBuf>,

        /// The output file to write, or - for stdout.
        #[arg(long, short, default_value = "-")]
        output: String,
    },

    /// Write a C preprocessor auto-header for the current configuration.
    Autoheader {
        /// An existing .config to load first.
        #[arg(long)]
        load: Option<PathBuf>,

        /// The output file to write, or - for stdout.
        #[arg(long, short, default_value = "-")]
        output: String,
    },

    /// Show assignments that differ between two .config files.
    Diff {
        /// The old .config file.
        old: PathBuf,

        /// The new .config file.
        new: PathBuf,
    },
}

fn main() -> IoResult<ExitCode> {
    env_logger::init();
    let options = Options::parse();

    match &options.command {
        Command::Alldefconfig {
            load,
            output,
        } => {
            let mut model = load_model(&options)?;

            if let Some(config) = load {
                model.load_config(File::open(config)?, true).map_err(other_error)?;
            }

            report_warnings(&model);

            if output == "-" {
                model.write_config(&mut stdout())?;
            } else {
                let mut fd = File::create(output)?;
                model.write_config(&mut fd)?;
            }

            Ok(ExitCode::SUCCESS)
        }

        Command::Autoheader {
            load,
            output,
        } => {
            let mut model = load_model(&options)?;

            if let Some(config) = load {
                model.load_config(File::open(config)?, true).map_err(other_error)?;
            }

            report_warnings(&model);

            if output == "-" {
                model.write_autoconf(&mut stdout())?;
            } else {
                let mut fd = File::create(output)?;
                model.write_autoconf(&mut fd)?;
            }

            Ok(ExitCode::SUCCESS)
        }

        Command::Diff {
            old,
            new,
        } => {
            let old_entries: BTreeMap<_, _> = read_config_entries(File::open(old)?)?.into_iter().collect();
            let new_entries: BTreeMap<_, _> = read_config_entries(File::open(new)?)?.into_iter().collect();

            let mut changed = false;
            let mut out = stdout();

            for (name, old_value) in &old_entries {
                match new_entries.get(name) {
                    None => {
                        changed = true;
                        writeln!(out, "-CONFIG_{name}={}", render(old_value))?;
                    }
                    Some(new_value) if new_value != old_value => {
                        changed = true;
                        writeln!(out, " CONFIG_{name}={} -> {}", render(old_value), render(new_value))?;
                    }
                    Some(_) => {}
                }
            }

            for (name, new_value) in &new_entries {
                if !old_entries.contains_key(name) {
                    changed = true;
                    writeln!(out, "+CONFIG_{name}={}", render(new_value))?;
                }
            }

            Ok(if changed { ExitCode::from(1) } else { ExitCode::SUCCESS })
        }
    }
}

fn load_model(options: &Options) -> IoResult<Model> {
    Model::load(&options.kconfig).map_err(other_error)
}

fn other_error(e: kconfig_core::parser::KConfigError) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

fn report_warnings(model: &Model) {
    for warning in model.warnings().iter() {
        eprintln!("warning: {warning}");
    }
}

fn render(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("n (not set)")
}
