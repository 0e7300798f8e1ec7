use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use crate::models::Category;

/// The external scraping and aggregation steps a task drives.
#[async_trait]
pub trait SearchPipeline: Send + Sync {
    /// Collects per-term result files for the keywords within a sector.
    async fn fetch_terms(&self, keywords: &[String], category: Category) -> Result<()>;

    /// Merges the per-term files into the day's filtered artifact.
    async fn aggregate(&self) -> Result<()>;
}

/// Runs the two steps as external commands inside the output directory.
pub struct CommandPipeline {
    search_command: Vec<String>,
    aggregate_command: Vec<String>,
    work_dir: PathBuf,
}

impl CommandPipeline {
    pub fn new(search_command: Vec<String>, aggregate_command: Vec<String>, work_dir: PathBuf) -> Self {
        Self { search_command, aggregate_command, work_dir }
    }

    async fn run(&self, command: &[String], extra_args: Vec<String>) -> Result<()> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("pipeline command is empty"))?;

        tracing::debug!("Running {} {:?} {:?} in {}", program, args, extra_args, self.work_dir.display());

        let output = tokio::process::Command::new(program)
            .args(args)
            .args(&extra_args)
            .current_dir(&self.work_dir)
            .output()
            .await
            .with_context(|| format!("failed to execute {}", program))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            tracing::error!("{} exited with {}: {}", program, output.status, error);
            bail!("{} exited with {}: {}", program, output.status, error.trim());
        }

        Ok(())
    }
}

fn search_args(keywords: &[String], category: Category) -> Vec<String> {
    let mut args = vec!["--category".to_string(), category.label().to_string()];
    args.extend(keywords.iter().cloned());
    args
}

#[async_trait]
impl SearchPipeline for CommandPipeline {
    async fn fetch_terms(&self, keywords: &[String], category: Category) -> Result<()> {
        self.run(&self.search_command, search_args(keywords, category)).await
    }

    async fn aggregate(&self) -> Result<()> {
        self.run(&self.aggregate_command, Vec::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(search: &[&str], aggregate: &[&str], dir: &std::path::Path) -> CommandPipeline {
        CommandPipeline::new(
            search.iter().map(|s| s.to_string()).collect(),
            aggregate.iter().map(|s| s.to_string()).collect(),
            dir.to_path_buf(),
        )
    }

    #[test]
    fn category_precedes_keywords() {
        let args = search_args(&["pumps".into(), "valves".into()], Category::Contracting);
        assert_eq!(args, vec!["--category", "المقاولات", "pumps", "valves"]);
    }

    #[tokio::test]
    async fn commands_run_in_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(
            &["sh", "-c", "echo \"$@\" > searched", "sh"],
            &["sh", "-c", "touch aggregated"],
            dir.path(),
        );

        p.fetch_terms(&["pumps".into()], Category::Trade).await.unwrap();
        p.aggregate().await.unwrap();

        let searched = std::fs::read_to_string(dir.path().join("searched")).unwrap();
        assert_eq!(searched.trim(), "--category التجارة pumps");
        assert!(dir.path().join("aggregated").exists());
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(&["false"], &["false"], dir.path());
        assert!(p.aggregate().await.is_err());
    }

    #[tokio::test]
    async fn empty_command_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(&[], &[], dir.path());
        assert!(p.fetch_terms(&[], Category::Trade).await.is_err());
    }
}
