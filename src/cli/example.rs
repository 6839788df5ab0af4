//! Code related to the example models and the CLI commands for interacting with them.
use super::{RunOpts, handle_run_command};
use crate::output::OUTPUT_DIRECTORY_ROOT;
use crate::settings::Settings;
use anyhow::{Context, Result, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the example models.
const EXAMPLES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// The available subcommands for managing example models.
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List available examples.
    List,
    /// Provide information about the specified example.
    Info {
        /// The name of the example.
        name: String,
    },
    /// Extract an example model configuration to a new directory.
    Extract {
        /// The name of the example to extract.
        name: String,
        /// The destination folder for the example.
        new_path: Option<PathBuf>,
    },
    /// Run an example.
    Run {
        /// The name of the example to run.
        name: String,
        /// Directory for output files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Whether to overwrite the output directory if it already exists
        #[arg(long)]
        overwrite: bool,
        /// Whether to write bus prices and other debugging information to the output folder
        #[arg(long)]
        debug_model: bool,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_example_list_command(),
            Self::Info { name } => handle_example_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_example_extract_command(&name, dest.as_deref())?,
            Self::Run {
                name,
                output_dir,
                overwrite,
                debug_model,
            } => {
                let opts = RunOpts {
                    output_dir,
                    overwrite,
                    debug_model,
                };
                handle_example_run_command(&name, &opts, None)?;
            }
        }

        Ok(())
    }
}

/// Names of the bundled examples
pub fn example_names() -> impl Iterator<Item = &'static str> {
    EXAMPLES_DIR
        .dirs()
        .filter_map(|dir| dir.path().file_name()?.to_str())
}

/// Handle the `example list` command.
fn handle_example_list_command() {
    for name in example_names() {
        println!("{name}");
    }
}

/// Get the README of the named example
fn example_readme(name: &str) -> Result<&'static str> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    EXAMPLES_DIR
        .get_file(path)
        .with_context(|| format!("Example not found: {name}"))?
        .contents_utf8()
        .context("README.txt is not UTF-8 encoded")
}

/// Handle the `example info` command.
fn handle_example_info_command(name: &str) -> Result<()> {
    println!("{}", example_readme(name)?);

    Ok(())
}

/// Handle the `example extract` command
fn handle_example_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let dest = dest.unwrap_or(Path::new(name));
    extract_example(name, dest)
}

/// Extract the specified example to a new directory
fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    let sub_dir = EXAMPLES_DIR
        .get_dir(name)
        .with_context(|| format!("Example not found: {name}"))?;

    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    fs::create_dir_all(new_path)?;
    copy_entries(sub_dir, sub_dir.path(), new_path)
}

/// Copy the contents of an embedded folder, including subfolders, to `new_path`
fn copy_entries(dir: &Dir, root: &Path, new_path: &Path) -> Result<()> {
    for entry in dir.entries() {
        let dest = new_path.join(entry.path().strip_prefix(root)?);
        match entry {
            DirEntry::Dir(sub_dir) => {
                fs::create_dir(&dest)?;
                copy_entries(sub_dir, root, new_path)?;
            }
            DirEntry::File(file) => fs::write(&dest, file.contents())?,
        }
    }

    Ok(())
}

/// Handle the `example run` command.
pub fn handle_example_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let model_path = temp_dir.path().join(name);
    extract_example(name, &model_path)?;

    // Name the default output folder after the example rather than the temporary path
    let output_dir = match &opts.output_dir {
        Some(dir) => dir.clone(),
        None => [OUTPUT_DIRECTORY_ROOT, name].iter().collect(),
    };
    let opts = RunOpts {
        output_dir: Some(output_dir),
        overwrite: opts.overwrite,
        debug_model: opts.debug_model,
    };

    handle_run_command(&model_path, &opts, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{INPUT_FILE_NAME, TIME_SERIES_DIR_NAME};
    use tempfile::tempdir;

    #[test]
    fn test_example_names() {
        let names: Vec<_> = example_names().collect();
        assert!(names.contains(&"simple"));
        assert!(names.contains(&"storage"));
        assert!(names.contains(&"sector_coupling"));
    }

    #[test]
    fn test_example_readme() {
        for name in example_names() {
            assert!(!example_readme(name).unwrap().is_empty());
        }
        assert!(example_readme("no_such_example").is_err());
    }

    #[test]
    fn test_extract_example() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("simple");
        extract_example("simple", &dest).unwrap();
        assert!(dest.join(INPUT_FILE_NAME).is_file());
        assert!(dest.join("README.txt").is_file());
        assert!(dest.join(TIME_SERIES_DIR_NAME).is_dir());

        // Destination now exists
        assert!(extract_example("simple", &dest).is_err());
    }

    #[test]
    fn test_extract_example_unknown() {
        let dir = tempdir().unwrap();
        assert!(extract_example("no_such_example", &dir.path().join("x")).is_err());
    }
}
