use std::path::{Path, PathBuf};

use airship_core::{
    NewRelease, Release, ReleaseId, Screenshot, ScreenshotSource, sniff_image_type,
};
use airship_storage::ReleaseRepository;
use anyhow::{Context, Result, bail};
use time::Date;
use tracing::{debug, warn};

use crate::cli::ReleaseCommands;

/// Separates a screenshot location from its caption on the command line.
const CAPTION_SEPARATOR: &str = "::";

pub async fn handle(cmd: ReleaseCommands, repo: &ReleaseRepository) -> Result<()> {
    match cmd {
        ReleaseCommands::List { json } => list(repo, json).await,
        ReleaseCommands::Show {
            release,
            export_dir,
            json,
        } => show(repo, release, export_dir, json).await,
        ReleaseCommands::Create {
            title,
            date,
            description,
            documentation,
            documentation_file,
            screenshots,
            screenshot_urls,
        } => {
            let documentation = read_documentation(documentation, documentation_file)
                .await?
                .unwrap_or_default();
            let mut new = NewRelease::new(title, date)
                .with_description(description)
                .with_documentation(documentation);
            for screenshot in collect_screenshots(&screenshots, &screenshot_urls).await? {
                new = new.with_screenshot(screenshot);
            }
            create(repo, new).await
        }
        ReleaseCommands::Update {
            id,
            title,
            date,
            description,
            documentation,
            documentation_file,
            remove_screenshots,
            add_screenshots,
            add_screenshot_urls,
        } => {
            let changes = Changes {
                title,
                date,
                description,
                documentation: read_documentation(documentation, documentation_file).await?,
                remove: remove_screenshots,
                add: collect_screenshots(&add_screenshots, &add_screenshot_urls).await?,
            };
            update(repo, ReleaseId(id), changes).await
        }
        ReleaseCommands::Delete { id, force } => delete(repo, ReleaseId(id), force).await,
    }
}

async fn list(repo: &ReleaseRepository, json: bool) -> Result<()> {
    let releases = repo.list().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&releases)?);
        return Ok(());
    }

    if releases.is_empty() {
        println!("No releases found.");
        return Ok(());
    }

    println!("Releases:");
    for release in releases {
        println!("  [{}] {} ({})", release.id, release.title, release.slug);
        println!(
            "    {} · {} · {} screenshot(s)",
            release.date,
            release.status,
            release.screenshots.len()
        );
        if !release.description.is_empty() {
            println!("    {}", release.description);
        }
    }

    Ok(())
}

async fn show(
    repo: &ReleaseRepository,
    id_or_slug: String,
    export_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let release = repo
        .get(&id_or_slug)
        .await
        .with_context(|| format!("Release not found: {}", id_or_slug))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&release)?);
    } else {
        print_release(&release);
    }

    if let Some(dir) = export_dir {
        let written = export_images(&release, &dir).await?;
        println!("✓ Exported {} screenshot(s) to {}", written, dir.display());
    }

    Ok(())
}

fn print_release(release: &Release) {
    println!("{}", release.title);
    println!("  ID: {}", release.id);
    println!("  Slug: {}", release.slug);
    println!("  Date: {}", release.date);
    println!("  Status: {}", release.status);
    println!("  Created: {}", release.created_at);
    if let Some(updated_at) = release.updated_at {
        println!("  Updated: {}", updated_at);
    }
    if !release.description.is_empty() {
        println!("\n{}", release.description);
    }

    if !release.screenshots.is_empty() {
        println!("\nScreenshots:");
        for (index, screenshot) in release.screenshots.iter().enumerate() {
            let location = match (&screenshot.source, &screenshot.image) {
                (ScreenshotSource::External { url }, _) => url.clone(),
                (ScreenshotSource::Stored { key }, Some(image)) => {
                    format!("stored {} ({}, {} bytes)", key, image.content_type, image.data.len())
                }
                (ScreenshotSource::Stored { key }, None) => format!("stored {} (unavailable)", key),
                (ScreenshotSource::Pending { .. }, _) => "pending upload".to_string(),
            };
            println!("  {}. {}", index + 1, screenshot.caption);
            println!("     {}", location);
        }
    }

    if !release.documentation.is_empty() {
        println!("\n{}", release.documentation);
    }
}

async fn export_images(release: &Release, dir: &Path) -> Result<usize> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut written = 0;
    for screenshot in &release.screenshots {
        let (Some(key), Some(image)) = (screenshot.source.blob_key(), &screenshot.image) else {
            continue;
        };
        let path = dir.join(format!("{}.{}", key, image.extension()));
        tokio::fs::write(&path, &image.data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }

    Ok(written)
}

async fn create(repo: &ReleaseRepository, new: NewRelease) -> Result<()> {
    let title = new.title.clone();
    let id = repo.create(new).await?;
    let release = repo
        .get_by_id(id)
        .await
        .with_context(|| format!("Release {} vanished after create", id))?;

    println!("✓ Created release: {}", title);
    println!("  ID: {}", id);
    println!("  Slug: {}", release.slug);
    println!("  Screenshots: {}", release.screenshots.len());

    Ok(())
}

/// Field edits requested by `release update`
struct Changes {
    title: Option<String>,
    date: Option<Date>,
    description: Option<String>,
    documentation: Option<String>,
    remove: Vec<usize>,
    add: Vec<Screenshot>,
}

impl Changes {
    fn apply(self, release: &mut Release) -> Result<()> {
        if let Some(title) = self.title {
            release.title = title;
        }
        if let Some(date) = self.date {
            release.date = date;
        }
        if let Some(description) = self.description {
            release.description = description;
        }
        if let Some(documentation) = self.documentation {
            release.documentation = documentation;
        }

        let mut remove = self.remove;
        remove.sort_unstable();
        remove.dedup();
        for &position in remove.iter().rev() {
            if position == 0 || position > release.screenshots.len() {
                bail!(
                    "No screenshot at position {} (release has {})",
                    position,
                    release.screenshots.len()
                );
            }
            release.screenshots.remove(position - 1);
        }

        release.screenshots.extend(self.add);
        Ok(())
    }
}

async fn update(repo: &ReleaseRepository, id: ReleaseId, changes: Changes) -> Result<()> {
    let mut release = repo
        .get_by_id(id)
        .await
        .with_context(|| format!("Release not found: {}", id))?;

    changes.apply(&mut release)?;
    let title = release.title.clone();
    repo.update(release).await?;

    let updated = repo
        .get_by_id(id)
        .await
        .with_context(|| format!("Release {} vanished after update", id))?;
    println!("✓ Updated release: {}", title);
    println!("  Slug: {}", updated.slug);
    println!("  Screenshots: {}", updated.screenshots.len());

    Ok(())
}

async fn delete(repo: &ReleaseRepository, id: ReleaseId, force: bool) -> Result<()> {
    let release = repo
        .get_by_id(id)
        .await
        .with_context(|| format!("Release not found: {}", id))?;

    if !force {
        print!(
            "Delete release '{}' and its stored screenshots? [y/N] ",
            release.title
        );
        std::io::Write::flush(&mut std::io::stdout())?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    repo.delete(id).await?;
    println!("✓ Deleted release: {}", release.title);

    Ok(())
}

async fn read_documentation(
    inline: Option<String>,
    file: Option<PathBuf>,
) -> Result<Option<String>> {
    match file {
        Some(path) => {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(Some(content))
        }
        None => Ok(inline),
    }
}

/// Split `LOCATION[::CAPTION]`. A missing caption is empty.
fn split_caption(arg: &str) -> (&str, &str) {
    match arg.split_once(CAPTION_SEPARATOR) {
        Some((location, caption)) => (location.trim(), caption.trim()),
        None => (arg.trim(), ""),
    }
}

/// Uploaded files come first, then hosted URLs, each in command-line order.
async fn collect_screenshots(files: &[String], urls: &[String]) -> Result<Vec<Screenshot>> {
    let mut screenshots = Vec::with_capacity(files.len() + urls.len());

    for arg in files {
        let (path, caption) = split_caption(arg);
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read screenshot {}", path))?;
        let Some(content_type) = sniff_image_type(&data) else {
            bail!("Not a PNG, JPEG, GIF or WebP image: {}", path);
        };
        let guessed = mime_guess::from_path(path).first_or_octet_stream();
        if guessed.essence_str() != content_type {
            warn!(
                path,
                extension_type = %guessed,
                content_type,
                "Screenshot extension does not match its contents"
            );
        }
        debug!(path, content_type, bytes = data.len(), "Read screenshot");
        screenshots.push(Screenshot::upload(data, content_type, caption));
    }

    for arg in urls {
        let (url, caption) = split_caption(arg);
        if url.is_empty() {
            bail!("Empty screenshot URL");
        }
        screenshots.push(Screenshot::external(url, caption));
    }

    Ok(screenshots)
}
