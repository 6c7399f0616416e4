use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use uplift::compute::{compute_migration, ComputeOptions};
use uplift::env::{MigrateEnv, ToolkitInstall};
use uplift::manifest::{write_working_directory, Manifest};
use uplift::metadata::MigrateMetadata;
use uplift::model::types::{PlatformTag, RevisionId};

/// Non-destructive project upgrades for scaffolded toolkit apps
///
/// uplift regenerates the templates your project was scaffolded from, diffs
/// them against the installed toolkit's templates and your edits, and stages
/// the outcome under migrate_working_dir/ — your project tree is never
/// touched until you apply.
///
/// WORKFLOW:
///
///   1. Compute the migration:   uplift start
///   2. Inspect what changed:    uplift status
///   3. Resolve conflicts in migrate_working_dir/, then: uplift apply
///   4. Or throw it all away:    uplift abandon
#[derive(Parser)]
#[command(name = "uplift")]
#[command(version, about)]
#[command(after_help = "See 'uplift <command> --help' for more information on a specific command.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a migration and stage it in the working directory
    Start(StartArgs),

    /// Summarize the staged migration
    Status(ProjectArgs),

    /// Copy the staged files into the project and clear the working directory
    Apply(ApplyArgs),

    /// Discard the staged migration
    Abandon(ProjectArgs),
}

#[derive(Args, Debug)]
struct ProjectArgs {
    /// Project directory (defaults to the current directory)
    #[arg(long, default_value = ".")]
    project: PathBuf,
}

#[derive(Args, Debug)]
struct StartArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Use an existing directory as the base template
    #[arg(long)]
    base_app_path: Option<PathBuf>,

    /// Use an existing directory as the target template
    #[arg(long)]
    target_app_path: Option<PathBuf>,

    /// Treat every platform as scaffolded from this revision
    #[arg(long)]
    base_revision: Option<RevisionId>,

    /// Migrate to this revision instead of the installed one
    #[arg(long)]
    target_revision: Option<RevisionId>,

    /// Restrict the run to these platforms (comma-separated)
    #[arg(long, value_delimiter = ',')]
    platforms: Option<Vec<PlatformTag>>,

    /// Force two-way merges everywhere
    #[arg(long)]
    prefer_two_way: bool,

    /// Leave scratch directories on disk for inspection
    #[arg(long)]
    keep_temp: bool,

    /// Per-stage progress output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Apply even when conflict markers remain in staged files
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    uplift::telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Start(args) => start(&args),
        Commands::Status(args) => status(&args),
        Commands::Apply(args) => apply(&args),
        Commands::Abandon(args) => abandon(&args),
    }
}

fn start(args: &StartArgs) -> Result<()> {
    let env = MigrateEnv::new(locate_toolkit()?);
    let options = ComputeOptions {
        verbose: args.verbose,
        base_app_path: args.base_app_path.clone(),
        target_app_path: args.target_app_path.clone(),
        base_revision: args.base_revision.clone(),
        target_revision: args.target_revision.clone(),
        delete_temp_directories: !args.keep_temp,
        platforms: args.platforms.clone(),
        prefer_two_way: args.prefer_two_way,
    };

    let mut result = compute_migration(&env, &args.project.project, &options)?;
    if result.is_empty() {
        result.release_temp_dirs().context("releasing scratch directories")?;
        println!("Project is already up to date; nothing staged.");
        return Ok(());
    }
    let manifest = write_working_directory(&result, &args.project.project)?;
    result.release_temp_dirs().context("releasing scratch directories")?;

    println!(
        "Staged {} file(s) in {}:",
        manifest.file_count(),
        Manifest::working_dir(&args.project.project).display()
    );
    print_summary(&manifest);
    if !manifest.is_clean() {
        println!();
        println!("Resolve the conflict markers, then run: uplift apply");
    }
    Ok(())
}

fn status(project: &ProjectArgs) -> Result<()> {
    let working_dir = Manifest::working_dir(&project.project);
    if !working_dir.exists() {
        println!("No migration in progress. Start one with: uplift start");
        return Ok(());
    }
    let manifest = Manifest::read(&working_dir)?;
    println!("Migration staged in {}:", working_dir.display());
    print_summary(&manifest);
    for path in &manifest.conflict_files {
        println!("  conflict: {path}");
    }
    Ok(())
}

fn apply(args: &ApplyArgs) -> Result<()> {
    let project_root = &args.project.project;
    let working_dir = Manifest::working_dir(project_root);
    if !working_dir.exists() {
        bail!("No migration in progress. Start one with: uplift start");
    }
    let manifest = Manifest::read(&working_dir)?;
    if !manifest.is_clean() && !args.force {
        bail!(
            "{} file(s) still carry conflict markers.\n  \
             Resolve them under {} or re-run with --force.",
            manifest.conflict_files.len(),
            working_dir.display()
        );
    }

    for path in manifest
        .merged_files
        .iter()
        .chain(&manifest.conflict_files)
        .chain(&manifest.added_files)
    {
        let src = path.join_under(&working_dir);
        let dst = path.join_under(project_root);
        uplift::fsutil::copy_creating_dirs(&src, &dst)
            .with_context(|| format!("applying {path}"))?;
    }
    for path in &manifest.deleted_files {
        let victim = path.join_under(project_root);
        if victim.exists() {
            std::fs::remove_file(&victim).with_context(|| format!("deleting {path}"))?;
        }
    }

    record_applied_revision(project_root)?;
    std::fs::remove_dir_all(&working_dir).context("clearing the working directory")?;
    println!("Applied {} file(s).", manifest.file_count());
    Ok(())
}

fn abandon(project: &ProjectArgs) -> Result<()> {
    let working_dir = Manifest::working_dir(&project.project);
    if !working_dir.exists() {
        println!("No migration in progress.");
        return Ok(());
    }
    std::fs::remove_dir_all(&working_dir).context("removing the working directory")?;
    println!("Migration abandoned.");
    Ok(())
}

fn print_summary(manifest: &Manifest) {
    println!("  merged:    {}", manifest.merged_files.len());
    println!("  conflicts: {}", manifest.conflict_files.len());
    println!("  added:     {}", manifest.added_files.len());
    println!("  deleted:   {}", manifest.deleted_files.len());
}

/// Record the applied revision in the project metadata so the next migration
/// uses it as the base.
fn record_applied_revision(project_root: &Path) -> Result<()> {
    let install = locate_toolkit()?;
    let mut metadata = MigrateMetadata::load(project_root)?;
    metadata.version_revision = Some(install.revision.clone());
    for entry in metadata.platforms.values_mut() {
        entry.base_revision = Some(install.revision.clone());
    }
    metadata.save(project_root)?;
    Ok(())
}

/// Locate the installed SDK: `UPLIFT_SDK_ROOT` plus the `version` file at
/// its root.
fn locate_toolkit() -> Result<ToolkitInstall> {
    let root = std::env::var_os("UPLIFT_SDK_ROOT")
        .map(PathBuf::from)
        .context("UPLIFT_SDK_ROOT is not set; point it at the installed SDK root")?;
    let version_file = root.join("version");
    let raw = std::fs::read_to_string(&version_file)
        .with_context(|| format!("reading {}", version_file.display()))?;
    let revision: RevisionId = raw
        .trim()
        .parse()
        .with_context(|| format!("parsing revision from {}", version_file.display()))?;
    Ok(ToolkitInstall::new(root, revision))
}
