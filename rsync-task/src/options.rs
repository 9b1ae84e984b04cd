//! rsync run configuration and its translation into command-line flags

use std::fmt::Display;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Switches passed to rsync.
///
/// Field names follow the long option they enable; `to_args` emits them in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsyncOptions {
    /// Increase verbosity
    pub verbose: bool,
    /// Suppress non-error messages
    pub quiet: bool,
    /// Skip based on checksum, not mod-time & size
    pub checksum: bool,
    /// Archive mode, equals -rlptgoD
    pub archive: bool,
    /// Recurse into directories
    pub recursive: bool,
    /// Use relative path names
    pub relative: bool,
    /// Don't send implied dirs with `relative`
    pub no_implied_dirs: bool,
    /// Skip files that are newer on the receiver
    pub update: bool,
    /// Update destination files in-place
    pub inplace: bool,
    /// Append data onto shorter files
    pub append: bool,
    /// Like `append`, but with old data in file checksum
    pub append_verify: bool,
    /// Transfer directories without recursing
    pub dirs: bool,
    /// Copy symlinks as symlinks
    pub links: bool,
    /// Transform symlink into referent file/dir
    pub copy_links: bool,
    /// Only "unsafe" symlinks are transformed
    pub copy_unsafe_links: bool,
    /// Ignore symlinks that point outside the tree
    pub safe_links: bool,
    /// Preserve hard links
    pub hard_links: bool,
    /// Preserve permissions
    pub perms: bool,
    /// Preserve executability
    pub executability: bool,
    /// Affect file and/or directory permissions
    pub chmod: Option<String>,
    /// Preserve ACLs
    pub acls: bool,
    /// Preserve extended attributes
    pub xattrs: bool,
    /// Preserve owner
    pub owner: bool,
    /// Preserve group
    pub group: bool,
    /// Preserve device files
    pub devices: bool,
    /// Preserve special files
    pub specials: bool,
    /// Preserve modification times
    pub times: bool,
    /// Omit directories from `times`
    pub omit_dir_times: bool,
    /// Receiver attempts super-user activities
    pub super_user: bool,
    /// Store/recover privileged attrs using xattrs
    pub fake_super: bool,
    /// Handle sparse files efficiently
    pub sparse: bool,
    /// Perform a trial run with no changes made
    pub dry_run: bool,
    /// Copy files whole, without the delta-transfer algorithm
    pub whole_file: bool,
    /// Don't cross filesystem boundaries
    pub one_file_system: bool,
    /// Force a fixed checksum block-size
    pub block_size: Option<u32>,
    /// Remote shell to use
    pub rsh: Option<String>,
    /// Program to run on the remote machine
    pub rsync_path: Option<String>,
    /// Skip creating new files on the receiver
    pub existing: bool,
    /// Skip updating files that exist on the receiver
    pub ignore_existing: bool,
    /// Sender removes synchronized files
    pub remove_source_files: bool,
    /// Delete extraneous files from destination dirs
    pub delete: bool,
    /// Receiver deletes before transfer
    pub delete_before: bool,
    /// Receiver deletes during the transfer
    pub delete_during: bool,
    /// Find deletions during, delete after
    pub delete_delay: bool,
    /// Receiver deletes after transfer
    pub delete_after: bool,
    /// Also delete excluded files from destination dirs
    pub delete_excluded: bool,
    /// Delete even if there are I/O errors
    pub ignore_errors: bool,
    /// Force deletion of directories even if not empty
    pub force: bool,
    /// Don't delete more than this many files
    pub max_delete: Option<u32>,
    /// Don't transfer any file larger than this size
    pub max_size: Option<String>,
    /// Don't transfer any file smaller than this size
    pub min_size: Option<String>,
    /// Keep partially transferred files
    pub partial: bool,
    /// Put partially transferred files into this directory
    pub partial_dir: Option<PathBuf>,
    /// Put all updated files into place at the end
    pub delay_updates: bool,
    /// Prune empty directory chains from the file list
    pub prune_empty_dirs: bool,
    /// Don't map uid/gid values by user/group name
    pub numeric_ids: bool,
    /// I/O timeout in seconds
    pub timeout: Option<u32>,
    /// Daemon connection timeout in seconds
    pub contimeout: Option<u32>,
    /// Don't skip files that match size and time
    pub ignore_times: bool,
    /// Skip files that match in size
    pub size_only: bool,
    /// Compare mod-times with reduced accuracy
    pub modify_window: Option<i32>,
    /// Create temporary files in this directory
    pub temp_dir: Option<PathBuf>,
    /// Find similar file for basis if no dest file
    pub fuzzy: bool,
    /// Also compare received files relative to this directory
    pub compare_dest: Option<PathBuf>,
    /// Also include copies of unchanged files from this directory
    pub copy_dest: Option<PathBuf>,
    /// Hardlink to files in this directory when unchanged
    pub link_dest: Option<PathBuf>,
    /// Compress file data during the transfer
    pub compress: bool,
    /// Explicitly set compression level
    pub compress_level: Option<u8>,
    /// Auto-ignore files the same way CVS does
    pub cvs_exclude: bool,
    /// Exclude files matching these patterns
    pub exclude: Vec<String>,
    /// Read exclude patterns from this file
    pub exclude_from: Option<PathBuf>,
    /// Don't exclude files matching these patterns
    pub include: Vec<String>,
    /// Read include patterns from this file
    pub include_from: Option<PathBuf>,
    /// Read list of source-file names from this file
    pub files_from: Option<PathBuf>,
    /// All *-from lists are delimited by nulls
    pub from0: bool,
    /// Give some file-transfer stats
    pub stats: bool,
    /// Output numbers in a human-readable format
    pub human_readable: bool,
    /// Show progress during transfer
    pub progress: bool,
    /// Fine-grained informational verbosity, e.g. `progress2`
    pub info: Option<String>,
    /// List the files instead of copying them
    pub list_only: bool,
    /// Limit socket I/O bandwidth, e.g. `1.5m`
    pub bwlimit: Option<String>,
    /// Prefer IPv4
    pub ipv4: bool,
    /// Prefer IPv6
    pub ipv6: bool,
    /// Alternate rsync daemon port
    pub port: Option<u16>,
    /// Read daemon-access password from this file
    pub password_file: Option<PathBuf>,
    /// Output a change-summary for all updates
    pub itemize_changes: bool,
    /// Output updates using the specified format
    pub out_format: Option<String>,
    /// Log what we're doing to the specified file
    pub log_file: Option<PathBuf>,
    /// No space-splitting; wildcard chars only
    pub protect_args: bool,
}

impl RsyncOptions {
    /// Turn on the switches the progress parser relies on
    pub fn force_progress_output(&mut self) {
        self.human_readable = true;
        self.partial = true;
        self.progress = true;
    }

    /// Translate the options into rsync arguments
    pub fn to_args(&self) -> Vec<String> {
        let mut args = ArgList::default();

        args.flag(self.verbose, "--verbose");
        args.flag(self.quiet, "--quiet");
        args.flag(self.checksum, "--checksum");
        args.flag(self.archive, "--archive");
        args.flag(self.recursive, "--recursive");
        args.flag(self.relative, "--relative");
        args.flag(self.no_implied_dirs, "--no-implied-dirs");
        args.flag(self.update, "--update");
        args.flag(self.inplace, "--inplace");
        args.flag(self.append, "--append");
        args.flag(self.append_verify, "--append-verify");
        args.flag(self.dirs, "--dirs");
        args.flag(self.links, "--links");
        args.flag(self.copy_links, "--copy-links");
        args.flag(self.copy_unsafe_links, "--copy-unsafe-links");
        args.flag(self.safe_links, "--safe-links");
        args.flag(self.hard_links, "--hard-links");
        args.flag(self.perms, "--perms");
        args.flag(self.executability, "--executability");
        args.value("--chmod", self.chmod.as_ref());
        args.flag(self.acls, "--acls");
        args.flag(self.xattrs, "--xattrs");
        args.flag(self.owner, "--owner");
        args.flag(self.group, "--group");
        args.flag(self.devices, "--devices");
        args.flag(self.specials, "--specials");
        args.flag(self.times, "--times");
        args.flag(self.omit_dir_times, "--omit-dir-times");
        args.flag(self.super_user, "--super");
        args.flag(self.fake_super, "--fake-super");
        args.flag(self.sparse, "--sparse");
        args.flag(self.dry_run, "--dry-run");
        args.flag(self.whole_file, "--whole-file");
        args.flag(self.one_file_system, "--one-file-system");
        args.value("--block-size", self.block_size.as_ref());
        args.value("--rsh", self.rsh.as_ref());
        args.value("--rsync-path", self.rsync_path.as_ref());
        args.flag(self.existing, "--existing");
        args.flag(self.ignore_existing, "--ignore-existing");
        args.flag(self.remove_source_files, "--remove-source-files");
        args.flag(self.delete, "--delete");
        args.flag(self.delete_before, "--delete-before");
        args.flag(self.delete_during, "--delete-during");
        args.flag(self.delete_delay, "--delete-delay");
        args.flag(self.delete_after, "--delete-after");
        args.flag(self.delete_excluded, "--delete-excluded");
        args.flag(self.ignore_errors, "--ignore-errors");
        args.flag(self.force, "--force");
        args.value("--max-delete", self.max_delete.as_ref());
        args.value("--max-size", self.max_size.as_ref());
        args.value("--min-size", self.min_size.as_ref());
        args.flag(self.partial, "--partial");
        args.path("--partial-dir", self.partial_dir.as_ref());
        args.flag(self.delay_updates, "--delay-updates");
        args.flag(self.prune_empty_dirs, "--prune-empty-dirs");
        args.flag(self.numeric_ids, "--numeric-ids");
        args.value("--timeout", self.timeout.as_ref());
        args.value("--contimeout", self.contimeout.as_ref());
        args.flag(self.ignore_times, "--ignore-times");
        args.flag(self.size_only, "--size-only");
        args.value("--modify-window", self.modify_window.as_ref());
        args.path("--temp-dir", self.temp_dir.as_ref());
        args.flag(self.fuzzy, "--fuzzy");
        args.path("--compare-dest", self.compare_dest.as_ref());
        args.path("--copy-dest", self.copy_dest.as_ref());
        args.path("--link-dest", self.link_dest.as_ref());
        args.flag(self.compress, "--compress");
        args.value("--compress-level", self.compress_level.as_ref());
        args.flag(self.cvs_exclude, "--cvs-exclude");
        for pattern in &self.exclude {
            args.value("--exclude", Some(pattern));
        }
        args.path("--exclude-from", self.exclude_from.as_ref());
        for pattern in &self.include {
            args.value("--include", Some(pattern));
        }
        args.path("--include-from", self.include_from.as_ref());
        args.path("--files-from", self.files_from.as_ref());
        args.flag(self.from0, "--from0");
        args.flag(self.stats, "--stats");
        args.flag(self.human_readable, "--human-readable");
        args.flag(self.progress, "--progress");
        args.value("--info", self.info.as_ref());
        args.flag(self.list_only, "--list-only");
        args.value("--bwlimit", self.bwlimit.as_ref());
        args.flag(self.ipv4, "--ipv4");
        args.flag(self.ipv6, "--ipv6");
        args.value("--port", self.port.as_ref());
        args.path("--password-file", self.password_file.as_ref());
        args.flag(self.itemize_changes, "--itemize-changes");
        args.value("--out-format", self.out_format.as_ref());
        args.path("--log-file", self.log_file.as_ref());
        args.flag(self.protect_args, "--protect-args");

        args.0
    }
}

#[derive(Default)]
struct ArgList(Vec<String>);

impl ArgList {
    fn flag(&mut self, enabled: bool, name: &str) {
        if enabled {
            self.0.push(name.to_string());
        }
    }

    fn value<T: Display>(&mut self, name: &str, value: Option<&T>) {
        if let Some(value) = value {
            self.0.push(format!("{name}={value}"));
        }
    }

    fn path(&mut self, name: &str, value: Option<&PathBuf>) {
        self.value(name, value.map(|p| p.display()).as_ref());
    }
}

/// Everything needed to launch one rsync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Source path, local or `[user@]host:path`
    pub source: String,
    /// Destination path, local or `[user@]host:path`
    pub destination: String,
    /// Wrap rsync in `sshpass -e`, reading the password from `SSHPASS`
    #[serde(default)]
    pub use_sshpass: bool,
    /// Create missing destination path components
    #[serde(default)]
    pub create_dir: bool,
    /// rsync executable to run instead of `rsync` from `PATH`
    #[serde(default)]
    pub rsync_binary: Option<String>,
    /// rsync switches
    #[serde(default)]
    pub options: RsyncOptions,
}

impl TaskConfig {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_produce_no_args() {
        assert!(RsyncOptions::default().to_args().is_empty());
    }

    #[test]
    fn test_force_progress_output() {
        let mut options = RsyncOptions::default();
        options.force_progress_output();

        assert_eq!(
            options.to_args(),
            vec!["--partial", "--human-readable", "--progress"]
        );
    }

    #[test]
    fn test_value_and_repeated_options() {
        let options = RsyncOptions {
            archive: true,
            delete: true,
            exclude: vec!["*.tmp".to_string(), ".git/".to_string()],
            bwlimit: Some("1.5m".to_string()),
            timeout: Some(30),
            partial_dir: Some(PathBuf::from(".rsync-partial")),
            ..Default::default()
        };

        assert_eq!(
            options.to_args(),
            vec![
                "--archive",
                "--delete",
                "--partial-dir=.rsync-partial",
                "--timeout=30",
                "--exclude=*.tmp",
                "--exclude=.git/",
                "--bwlimit=1.5m",
            ]
        );
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: RsyncOptions = serde_json::from_str(r#"{"archive": true, "rsh": "ssh -p 2222"}"#).unwrap();

        assert!(options.archive);
        assert_eq!(options.rsh.as_deref(), Some("ssh -p 2222"));
        assert!(!options.progress);
        assert_eq!(options.to_args(), vec!["--archive", "--rsh=ssh -p 2222"]);
    }
}
