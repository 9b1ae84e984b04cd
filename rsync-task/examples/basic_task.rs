//! Basic task example: copy a directory with rsync while polling progress

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use rsync_task::{Task, TaskConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("Basic rsync Task Example");
    println!("========================");

    // Create temporary directories for testing
    let temp_dir = tempfile::TempDir::new()?;
    let source_dir = temp_dir.path().join("source");
    let dest_dir = temp_dir.path().join("destination");

    tokio::fs::create_dir_all(source_dir.join("subdir")).await?;
    tokio::fs::write(source_dir.join("file1.txt"), b"This is file 1 content").await?;
    tokio::fs::write(source_dir.join("file2.txt"), vec![b'x'; 4 * 1024 * 1024]).await?;
    tokio::fs::write(source_dir.join("subdir").join("file3.txt"), b"This is file 3 content").await?;

    println!("Source directory: {}", source_dir.display());
    println!("Destination directory: {}", dest_dir.display());
    println!();

    let mut config = TaskConfig::new(
        format!("{}/", source_dir.display()),
        dest_dir.display().to_string(),
    );
    config.create_dir = true;
    config.options.archive = true;
    config.options.bwlimit = Some("2m".to_string());

    let task = Arc::new(Task::new(config));
    if let Some(argv) = task.argv() {
        println!("Running: {}", argv.join(" "));
    }

    let runner = tokio::spawn({
        let task = Arc::clone(&task);
        async move { task.run().await }
    });

    while !runner.is_finished() {
        println!("  {}", task.state());
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    match runner.await? {
        Ok(()) => println!("Sync completed: {}", task.state()),
        Err(e) => {
            println!("Sync failed: {e}");
            print!("{}", task.log().stderr);
        }
    }

    // List what arrived
    let mut listing = TaskConfig::new(format!("{}/", dest_dir.display()), "");
    listing.options.recursive = true;
    listing.options.list_only = true;
    let lister = Task::new(listing);
    lister.run().await?;

    println!();
    println!("Destination contents:");
    for record in lister.file_list() {
        println!("  {:>10}  {}", record.size, record.name);
    }

    Ok(())
}
