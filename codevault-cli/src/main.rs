// Copyright 2025 Codevault (https://github.com/codevault)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Command-line frontend over a vault rooted at `--root`.
//!
//! Every command opens the vault, runs one operation, and persists the
//! indexes before exiting, so a sequence of invocations behaves like one
//! long-running process.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use codevault_core::{FileId, FolderId, Language, ProjectId, ReconcilePolicy, StorageConfig};
use codevault_storage::Vault;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codevault", about = "Snapshot versioning and project replication", version)]
struct Cli {
    /// Storage root directory.
    #[arg(long, global = true, default_value = "codevault-data")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the storage root and empty indexes.
    Init,
    /// Create a project.
    CreateProject {
        #[arg(long)]
        name: String,
        #[arg(long)]
        owner: String,
    },
    /// Delete a project and everything under it.
    DeleteProject {
        #[arg(long)]
        project: u64,
    },
    /// Create a folder in a project.
    CreateFolder {
        #[arg(long)]
        name: String,
        #[arg(long)]
        project: u64,
        #[arg(long)]
        parent: Option<u64>,
    },
    /// Snapshot a file's content (from a path, or stdin with `-`).
    Save {
        #[arg(long)]
        folder: u64,
        #[arg(long)]
        filename: String,
        #[arg(long)]
        author: String,
        #[arg(long, default_value = "edit")]
        summary: String,
        /// Content source.
        content: PathBuf,
    },
    /// Print the latest snapshot of a file.
    Latest {
        file_id: String,
    },
    /// Show a file's identity, language, and snapshot count.
    Info {
        file_id: String,
    },
    /// List a file's snapshots, most recent first.
    Log {
        file_id: String,
    },
    /// Line diff between two snapshots of a file, as JSON records.
    Diff {
        file_id: String,
        /// Timestamp key of the snapshot to diff against; omit for the
        /// initial-snapshot sentinel.
        #[arg(long)]
        previous: Option<String>,
        /// Timestamp key of the snapshot to diff to.
        #[arg(long)]
        current: String,
    },
    /// Fork a project.
    Fork {
        #[arg(long)]
        project: u64,
        #[arg(long)]
        owner: String,
    },
    /// Merge two projects into a new one.
    Merge {
        #[arg(long)]
        a: u64,
        #[arg(long)]
        b: u64,
        #[arg(long)]
        owner: String,
        #[arg(long, value_enum, default_value = "by-name")]
        policy: PolicyArg,
    },
    /// Export a project's latest contents as a zip.
    Archive {
        #[arg(long)]
        project: u64,
        /// Output path for the zip.
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    ByName,
    ByContentHash,
    Strict,
}

impl From<PolicyArg> for ReconcilePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::ByName => ReconcilePolicy::ByName,
            PolicyArg::ByContentHash => ReconcilePolicy::ByContentHash,
            PolicyArg::Strict => ReconcilePolicy::Strict,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let vault = Vault::open(&StorageConfig::at(&cli.root))
        .with_context(|| format!("opening vault at {}", cli.root.display()))?;

    run(&vault, cli.command)?;
    vault.persist().context("persisting indexes")?;
    Ok(())
}

fn run(vault: &Vault, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init => {
            println!("initialized");
        }
        Command::CreateProject { name, owner } => {
            let project = vault.create_project(&name, &owner)?;
            println!("project {} created", project.id);
        }
        Command::DeleteProject { project } => {
            vault.delete_project(ProjectId(project))?;
            println!("project {project} deleted");
        }
        Command::CreateFolder { name, project, parent } => {
            let folder =
                vault
                    .catalog()
                    .create_folder(&name, ProjectId(project), parent.map(FolderId))?;
            println!("folder {} created", folder.id);
        }
        Command::Save { folder, filename, author, summary, content } => {
            let bytes = read_content(&content)?;
            let file = vault
                .versions()
                .ensure_file(&filename, FolderId(folder), &author)?;
            let meta = vault.versions().save(&file.id, &bytes, &author, &summary)?;
            println!("{} {}", file.id, meta.timestamp_key);
        }
        Command::Latest { file_id } => {
            let (_, content) = vault.versions().latest(&FileId::from_string(&file_id))?;
            std::io::Write::write_all(&mut std::io::stdout(), &content)?;
        }
        Command::Info { file_id } => {
            let id = FileId::from_string(&file_id);
            let file = vault.catalog().file(&id)?;
            let language = Language::from_filename(&file.filename);
            let snapshots = vault.versions().list_snapshots(&id)?.len();
            println!("filename:  {}", file.filename);
            println!("folder:    {}", file.folder_id);
            println!("owner:     {}", file.owner);
            println!("language:  {}", language.key());
            println!("snapshots: {snapshots}");
        }
        Command::Log { file_id } => {
            for meta in vault.versions().list_snapshots(&FileId::from_string(&file_id))? {
                println!("{}  {}  {}", meta.timestamp_key, meta.author, meta.summary);
            }
        }
        Command::Diff { file_id, previous, current } => {
            let records = vault.differ().diff(
                &FileId::from_string(&file_id),
                previous.as_deref(),
                &current,
            )?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Fork { project, owner } => {
            let fork = vault.replicator().fork(ProjectId(project), &owner)?;
            println!("project {} created: {}", fork.id, fork.name);
        }
        Command::Merge { a, b, owner, policy } => {
            let merged =
                vault
                    .replicator()
                    .merge(ProjectId(a), ProjectId(b), &owner, policy.into())?;
            println!("project {} created: {}", merged.id, merged.name);
        }
        Command::Archive { project, out } => {
            let bytes = vault.replicator().archive(ProjectId(project))?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("{} ({} bytes)", out.display(), bytes.len());
        }
    }
    Ok(())
}

/// Read command content from a file, or stdin when the path is `-`.
fn read_content(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        Ok(bytes)
    } else {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))
    }
}
