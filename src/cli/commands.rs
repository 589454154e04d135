//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::cli::progress::{
    format_bytes, print_error, print_header, print_info, print_success, print_warning, CliProgress,
};
use crate::cli::{Args, Commands};
use crate::core::classifier::{FileClassifier, SkipList};
use crate::core::config::{get_config_path, init_config, open_config_in_editor, Config};
use crate::core::error::OrganizerError;
use crate::core::organizer::Organizer;
use crate::core::relocation::{
    BaseDirDestinations, CategoryDestinations, CategoryPathResolver, Relocator,
};
use crate::core::retention::{plan_retention, KeepPolicy};
use crate::core::roots::{default_scan_roots, FolderResolver, FolderRole, SystemFolders};
use crate::duplicate::detector::{DuplicateGroup, FingerprintIndex, ScanStats};
use anyhow::{bail, Result};
use dialoguer::Confirm;
use log::{debug, error, info};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Run the appropriate command based on CLI arguments
///
/// Without a subcommand the configured source directory is organized.
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    match &args.command {
        Some(Commands::Organize {
            source,
            skip,
            into,
            dry_run,
        }) => {
            organize_files(
                config,
                source.clone(),
                skip,
                into.as_deref(),
                *dry_run,
                shutdown_flag,
            )?;
        }
        None => {
            organize_files(config, None, &[], None, false, shutdown_flag)?;
        }
        Some(Commands::Classify { source, skip }) => {
            classify_files(config, source.clone(), skip)?;
        }
        Some(Commands::Duplicates { roots, json }) => {
            list_duplicates(config, roots, *json, shutdown_flag)?;
        }
        Some(Commands::Clean {
            roots,
            keep,
            dry_run,
            yes,
        }) => {
            let keep = keep.unwrap_or(config.duplicates.keep);
            clean_duplicates(config, roots, keep, *dry_run, *yes, shutdown_flag)?;
        }
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
        }
    }

    Ok(())
}

/// Directory to organize: command line, then config, then Downloads
fn resolve_source(config: &Config, cli_source: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(source) = cli_source {
        return Ok(source);
    }
    if !config.organize.source_directory.as_os_str().is_empty() {
        return Ok(config.organize.source_directory.clone());
    }
    match SystemFolders.first_existing(FolderRole::Downloads) {
        Some(downloads) => Ok(downloads),
        None => bail!("No Downloads folder found; pass the directory to organize"),
    }
}

/// Skip list from config plus command line
fn build_skip_list(config: &Config, cli_skip: &[PathBuf]) -> SkipList {
    SkipList::from_paths(config.organize.skip_paths.iter().chain(cli_skip))
}

/// Roots to scan: command line, then config
fn resolve_roots(
    config: &Config,
    cli_roots: &[PathBuf],
    folders: &dyn FolderResolver,
) -> Result<Vec<PathBuf>> {
    let mut roots = if cli_roots.is_empty() {
        config.duplicates.roots.clone()
    } else {
        cli_roots.to_vec()
    };

    if roots.is_empty() {
        roots = default_scan_roots(folders);
        debug!("Using default scan folders: {:?}", roots);
    }

    if roots.is_empty() {
        bail!("No folders to scan; pass them on the command line or set [duplicates].roots");
    }
    Ok(roots)
}

/// Category destinations: everything under `into`, or the well-known folders
fn destination_resolver(config: &Config, into: Option<&Path>) -> Box<dyn CategoryPathResolver> {
    match into {
        Some(base) => Box::new(BaseDirDestinations::new(base)),
        None => Box::new(
            CategoryDestinations::new(SystemFolders)
                .with_overrides(config.categories.destination_overrides()),
        ),
    }
}

/// Move the files of a directory into their category folders
pub fn organize_files(
    config: &Config,
    source: Option<PathBuf>,
    skip: &[PathBuf],
    into: Option<&Path>,
    dry_run: bool,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<()> {
    let source = resolve_source(config, source)?;
    let skip = build_skip_list(config, skip);
    let dry_run = dry_run || config.organize.dry_run;

    print_header(if dry_run {
        "Organize Files (dry run)"
    } else {
        "Organize Files"
    });
    print_info(&format!("Source: {}", source.display()));
    if !skip.is_empty() {
        print_info(&format!("Skipping {} file(s)", skip.len()));
    }
    println!();

    let organizer = Organizer::new(
        FileClassifier::new(config.categories.category_map()),
        Relocator::new(destination_resolver(config, into)),
        shutdown_flag,
    )
    .with_dry_run(dry_run);

    let progress = CliProgress::new("Scanning...");
    let report = match organizer.organize(&source, &skip, &progress) {
        Ok(report) => report,
        Err(e) => {
            progress.clear();
            return Err(e.into());
        }
    };
    progress.finish("Done");
    println!();

    if dry_run {
        for moved in &report.moved {
            print_info(&format!(
                "{} -> {}",
                moved.from.display(),
                moved.to.display()
            ));
        }
        println!();
        print_success(&format!(
            "Would organize {} of {} files",
            report.moved_count(),
            report.attempted
        ));
    } else {
        print_success(&format!(
            "Organized {} of {} files",
            report.moved_count(),
            report.attempted
        ));
    }

    for failure in &report.failures {
        print_error(&format!("{}: {}", failure.path.display(), failure.message));
    }
    if report.interrupted {
        print_warning("Interrupted before all files were organized");
    }

    Ok(())
}

/// Print how the files of a directory would be categorised
pub fn classify_files(config: &Config, source: Option<PathBuf>, skip: &[PathBuf]) -> Result<()> {
    let source = resolve_source(config, source)?;
    let skip = build_skip_list(config, skip);

    let classifier = FileClassifier::new(config.categories.category_map());
    let classification = classifier.classify(&source, &skip)?;

    print_header("Classification");
    print_info(&format!("Source: {}", source.display()));
    println!();

    for (path, message) in classification.failures() {
        print_warning(&format!("Skipped {}: {}", path.display(), message));
    }

    if classification.is_empty() {
        print_info("No files found");
        return Ok(());
    }

    for (category, files) in classification.iter() {
        println!("  {} ({})", category, files.len());
        for file in files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            println!("      {}", name);
        }
    }
    println!();
    print_success(&format!(
        "{} files in {} categories",
        classification.total_files(),
        classification.categories().len()
    ));

    Ok(())
}

/// Scan roots and return the populated index, or `None` when interrupted
fn scan_for_duplicates(
    config: &Config,
    roots: &[PathBuf],
    progress: &CliProgress,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<Option<FingerprintIndex>> {
    let mut index = FingerprintIndex::new(config.duplicates.to_detector_config(), shutdown_flag);

    match index.find_duplicates(roots, progress) {
        Ok(_) => Ok(Some(index)),
        Err(OrganizerError::Cancelled) => {
            progress.clear();
            print_warning("Scan interrupted");
            Ok(None)
        }
        Err(e) => {
            progress.clear();
            Err(e.into())
        }
    }
}

#[derive(Serialize)]
struct DuplicateReport<'a> {
    roots: &'a [PathBuf],
    total_wasted_bytes: u64,
    stats: &'a ScanStats,
    groups: Vec<GroupReport<'a>>,
}

#[derive(Serialize)]
struct GroupReport<'a> {
    name: String,
    wasted_bytes: u64,
    #[serde(flatten)]
    group: &'a DuplicateGroup,
}

/// Find and print duplicate groups
pub fn list_duplicates(
    config: &Config,
    roots: &[PathBuf],
    json: bool,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<()> {
    let roots = resolve_roots(config, roots, &SystemFolders)?;

    let progress = if json {
        CliProgress::hidden()
    } else {
        print_header("Duplicate Files");
        for root in &roots {
            print_info(&format!("Scanning: {}", root.display()));
        }
        println!();
        CliProgress::new("Collecting files...")
    };

    let Some(index) = scan_for_duplicates(config, &roots, &progress, shutdown_flag)? else {
        return Ok(());
    };

    if json {
        let report = DuplicateReport {
            roots: &roots,
            total_wasted_bytes: index.total_wasted_space(),
            stats: index.stats(),
            groups: index
                .groups()
                .iter()
                .enumerate()
                .map(|(i, group)| GroupReport {
                    name: group.display_name(i + 1),
                    wasted_bytes: group.wasted_bytes(),
                    group,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    progress.finish(&format!("Scanned {} files", index.stats().files_found));
    println!();

    if index.is_empty() {
        print_success("No duplicate files found");
        return Ok(());
    }

    for (i, group) in index.groups().iter().enumerate() {
        println!(
            "  {} ({} copies, {} each)",
            group.display_name(i + 1),
            group.len(),
            format_bytes(group.size())
        );
        for member in &group.members {
            println!("      {}", member.path.display());
        }
    }
    println!();

    let stats = index.stats();
    print_info(&format!(
        "{} duplicate groups, {} redundant files",
        stats.duplicate_groups, stats.duplicate_files
    ));
    if stats.errors > 0 {
        print_warning(&format!("{} file(s) could not be read", stats.errors));
    }
    print_success(&format!(
        "Wasted space: {}",
        format_bytes(index.total_wasted_space())
    ));

    Ok(())
}

/// Find duplicates and delete all but one copy of each
pub fn clean_duplicates(
    config: &Config,
    roots: &[PathBuf],
    keep: KeepPolicy,
    dry_run: bool,
    assume_yes: bool,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<()> {
    let roots = resolve_roots(config, roots, &SystemFolders)?;

    print_header("Clean Duplicates");
    for root in &roots {
        print_info(&format!("Scanning: {}", root.display()));
    }
    print_info(&format!("Keeping the {} copy of each file", keep));
    println!();

    let progress = CliProgress::new("Collecting files...");
    let Some(mut index) = scan_for_duplicates(config, &roots, &progress, shutdown_flag)? else {
        return Ok(());
    };
    progress.finish(&format!("Scanned {} files", index.stats().files_found));
    println!();

    let plan = plan_retention(index.groups(), keep);
    if plan.is_empty() {
        print_success("No duplicate files to remove");
        return Ok(());
    }

    for decision in &plan.decisions {
        println!("  keep    {}", decision.keep.display());
        for path in &decision.delete {
            println!("  delete  {}", path.display());
        }
    }
    println!();
    print_info(&format!(
        "{} file(s) marked for deletion, {} would be freed",
        plan.files_to_delete(),
        format_bytes(plan.reclaimable_bytes)
    ));

    if dry_run {
        print_info("Dry run: nothing deleted");
        return Ok(());
    }

    if !assume_yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} file(s)?", plan.files_to_delete()))
            .default(false)
            .interact()
            .map_err(|e| OrganizerError::IoError(format!("Failed to read input: {}", e)))?;

        if !confirmed {
            print_info("Nothing deleted");
            return Ok(());
        }
    }

    let paths = plan.paths_to_delete();
    let progress = CliProgress::new("Deleting...");
    progress.set_total(paths.len() as u64);
    let deleted = index.delete_files(&paths, &progress);
    progress.finish("Done");
    println!();

    let marked: HashSet<&PathBuf> = paths.iter().collect();
    let freed: u64 = index
        .groups()
        .iter()
        .flat_map(|g| g.members.iter())
        .filter(|m| marked.contains(&m.path) && !m.path.exists())
        .map(|m| m.size)
        .sum();

    let pruned = index.prune_missing();
    debug!(
        "Pruned {} deleted members, {} groups left",
        pruned,
        index.len()
    );

    print_success(&format!(
        "Deleted {} of {} files, freed {}",
        deleted,
        paths.len(),
        format_bytes(freed)
    ));
    if !index.is_empty() {
        print_warning(&format!(
            "{} duplicate group(s) remain; re-run to retry",
            index.len()
        ));
    }

    Ok(())
}

/// Handle the `config` command - open, show path, or reset the config file
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                fs::remove_file(&config_path)?;
                info!("Removed existing config file");
            }
        }
        let path = init_config()?;
        info!("Created fresh config file at: {}", path.display());
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    info!("Opening configuration file in default editor...");
    match open_config_in_editor() {
        Ok(path) => {
            info!("Config file: {}", path.display());
            info!("Save the file after editing to apply changes.");
            info!("Run 'file-organizer show-config' to verify your settings.");
        }
        Err(e) => {
            error!("Failed to open config file: {}", e);
            if let Some(path) = get_config_path() {
                info!("You can manually edit the config at: {}", path.display());
            }
        }
    }

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            fs::write(&path, Config::generate_default_config())?;
            path
        }
        None => init_config()?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Edit this file to customize the organizer settings.");
    info!("");
    info!("Quick tip: Run 'file-organizer config' to open the config in your editor.");

    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("Current Configuration:");
    info!("----------------------");
    info!("[organize]");
    if config.organize.source_directory.as_os_str().is_empty() {
        info!("  source_directory = \"\" (Downloads)");
    } else {
        info!(
            "  source_directory = \"{}\"",
            config.organize.source_directory.display()
        );
    }
    info!("  skip_paths = {:?}", config.organize.skip_paths);
    info!("  dry_run = {}", config.organize.dry_run);
    info!("");
    info!("[categories]");
    info!("  destinations = {:?}", config.categories.destinations);
    info!(
        "  extra_extensions = {:?}",
        config.categories.extra_extensions
    );
    info!("");
    info!("[duplicates]");
    info!("  roots = {:?}", config.duplicates.roots);
    info!("  keep = \"{}\"", config.duplicates.keep);
    info!("  follow_symlinks = {}", config.duplicates.follow_symlinks);
    info!("  threads = {}", config.duplicates.threads);
    info!("  min_file_size = {}", config.duplicates.min_file_size);
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::roots::StaticFolders;
    use clap::Parser;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn no_shutdown() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn test_resolve_source_prefers_command_line() {
        let mut config = Config::default();
        config.organize.source_directory = PathBuf::from("/from/config");

        let cli = resolve_source(&config, Some(PathBuf::from("/from/cli"))).unwrap();
        assert_eq!(cli, PathBuf::from("/from/cli"));

        let configured = resolve_source(&config, None).unwrap();
        assert_eq!(configured, PathBuf::from("/from/config"));
    }

    #[test]
    fn test_resolve_roots_order() {
        let none = StaticFolders::new();
        let mut config = Config::default();
        assert!(resolve_roots(&config, &[], &none).is_err());

        let temp = TempDir::new().unwrap();
        let downloads = StaticFolders::new().with(FolderRole::Downloads, temp.path());
        assert_eq!(
            resolve_roots(&config, &[], &downloads).unwrap(),
            vec![temp.path().to_path_buf()]
        );

        config.duplicates.roots = vec![PathBuf::from("/configured")];
        assert_eq!(
            resolve_roots(&config, &[], &downloads).unwrap(),
            vec![PathBuf::from("/configured")]
        );
        assert_eq!(
            resolve_roots(&config, &[PathBuf::from("/cli")], &none).unwrap(),
            vec![PathBuf::from("/cli")]
        );
    }

    #[test]
    fn test_skip_list_merges_config_and_cli() {
        let mut config = Config::default();
        config.organize.skip_paths = vec![PathBuf::from("/a/one.txt")];

        let skip = build_skip_list(&config, &[PathBuf::from("/a/two.txt")]);
        assert_eq!(skip.len(), 2);
        assert!(skip.contains(Path::new("/A/ONE.txt")));
    }

    #[test]
    fn test_organize_command_into_directory() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(source.path().join("song.flac"), b"la").unwrap();
        fs::write(source.path().join("keep.txt"), b"stay").unwrap();

        let argv: Vec<OsString> = vec![
            "file-organizer".into(),
            "organize".into(),
            source.path().into(),
            "--into".into(),
            dest.path().into(),
            "--skip".into(),
            source.path().join("keep.txt").into(),
        ];
        let args = Args::parse_from(argv);
        run_command(&args, &Config::default(), no_shutdown()).unwrap();

        assert!(dest.path().join("Music").join("song.flac").is_file());
        assert!(source.path().join("keep.txt").is_file());
    }

    #[test]
    fn test_clean_command_keeps_one_copy() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("a.bin"), b"same bytes").unwrap();
        fs::create_dir(root.path().join("nested")).unwrap();
        fs::write(root.path().join("nested").join("b.bin"), b"same bytes").unwrap();
        fs::write(root.path().join("c.bin"), b"unique").unwrap();

        clean_duplicates(
            &Config::default(),
            &[root.path().to_path_buf()],
            KeepPolicy::Oldest,
            false,
            true,
            no_shutdown(),
        )
        .unwrap();

        let survivors = [
            root.path().join("a.bin"),
            root.path().join("nested").join("b.bin"),
        ]
        .iter()
        .filter(|p| p.exists())
        .count();
        assert_eq!(survivors, 1);
        assert!(root.path().join("c.bin").exists());
    }

    #[test]
    fn test_clean_dry_run_deletes_nothing() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("a.bin"), b"same").unwrap();
        fs::write(root.path().join("b.bin"), b"same").unwrap();

        clean_duplicates(
            &Config::default(),
            &[root.path().to_path_buf()],
            KeepPolicy::Newest,
            true,
            true,
            no_shutdown(),
        )
        .unwrap();

        assert!(root.path().join("a.bin").exists());
        assert!(root.path().join("b.bin").exists());
    }

    #[test]
    fn test_duplicates_command_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let err = list_duplicates(
            &Config::default(),
            &[temp.path().join("missing")],
            true,
            no_shutdown(),
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<OrganizerError>(),
            Some(OrganizerError::NotFound(_))
        ));
    }
}
